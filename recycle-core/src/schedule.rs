use serde::{Deserialize, Serialize};

/// Decides when training stops. Iterations count joint generator/discriminator updates, epochs
/// count full passes over the clip windows of the shorter video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningSchedule {
    IterationBound {
        total_iterations: usize,
        current_iteration: usize,
    },
    EpochBound {
        total_epochs: usize,
        current_epoch: usize,
    },
}

impl LearningSchedule {
    pub fn iteration_bound(total_iterations: usize) -> Self {
        Self::IterationBound {
            total_iterations,
            current_iteration: 0,
        }
    }

    pub fn epoch_bound(total_epochs: usize) -> Self {
        Self::EpochBound {
            total_epochs,
            current_epoch: 0,
        }
    }

    /// Registers a finished iteration, returns true if training should stop.
    pub fn step(&mut self) -> bool {
        match self {
            Self::IterationBound {
                total_iterations,
                current_iteration,
            } => {
                *current_iteration += 1;
                current_iteration >= total_iterations
            }
            Self::EpochBound { .. } => false,
        }
    }

    /// Registers a finished epoch, returns true if training should stop.
    pub fn end_epoch(&mut self) -> bool {
        match self {
            Self::IterationBound { .. } => false,
            Self::EpochBound {
                total_epochs,
                current_epoch,
            } => {
                *current_epoch += 1;
                current_epoch >= total_epochs
            }
        }
    }

    pub fn total(&self) -> usize {
        match self {
            Self::IterationBound {
                total_iterations, ..
            } => *total_iterations,
            Self::EpochBound { total_epochs, .. } => *total_epochs,
        }
    }
}

impl Default for LearningSchedule {
    fn default() -> Self {
        Self::iteration_bound(10_000)
    }
}
