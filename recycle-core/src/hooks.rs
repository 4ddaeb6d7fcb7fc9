use crate::schedule::LearningSchedule;
use anyhow::Result;
use std::{collections::VecDeque, time::Duration};

/// Step reports kept by `DefaultTrainingHooks` unless set otherwise.
pub const DEFAULT_HISTORY_LEN: usize = 100;

/// Summary of a single joint update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub iteration: usize,
    pub epoch: usize,
    pub generator_loss: f32,
    pub discriminator_loss: f32,
    pub elapsed: Duration,
}

/// Hooks called by the training loop. Returning true from a hook stops training.
pub trait TrainingHooks {
    fn init_hook(&mut self) -> bool {
        false
    }

    fn post_step_hook(&mut self, report: &StepReport) -> bool;

    fn post_epoch_hook(&mut self, _epoch: usize) -> bool {
        false
    }

    fn shutdown_hook(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct DefaultTrainingHooks {
    learning_schedule: LearningSchedule,
    log_every: usize,
    history: VecDeque<StepReport>,
    history_len: usize,
}

impl DefaultTrainingHooks {
    pub fn new(learning_schedule: LearningSchedule, log_every: usize) -> Self {
        Self {
            learning_schedule,
            log_every,
            history: VecDeque::new(),
            history_len: DEFAULT_HISTORY_LEN,
        }
    }

    /// Keep at most the last `history_len` step reports.
    pub fn with_history_len(mut self, history_len: usize) -> Self {
        self.history_len = history_len;
        let excess = self.history.len().saturating_sub(history_len);
        self.history.drain(..excess);
        self
    }

    /// The most recent step reports, oldest first.
    pub fn history(&self) -> &VecDeque<StepReport> {
        &self.history
    }
}

impl TrainingHooks for DefaultTrainingHooks {
    fn post_step_hook(&mut self, report: &StepReport) -> bool {
        if self.log_every > 0 && report.iteration % self.log_every == 0 {
            println!(
                "iteration: {:<6} epoch: {:<4} generator loss: {:<10.4} discriminator loss: {:<10.4} elapsed: {:.2?}",
                report.iteration,
                report.epoch,
                report.generator_loss,
                report.discriminator_loss,
                report.elapsed
            );
        }
        if self.history_len > 0 {
            if self.history.len() == self.history_len {
                self.history.pop_front();
            }
            self.history.push_back(*report);
        }
        self.learning_schedule.step()
    }

    fn post_epoch_hook(&mut self, epoch: usize) -> bool {
        if self.log_every > 0 {
            println!("epoch {epoch} done");
        }
        self.learning_schedule.end_epoch()
    }

    fn shutdown_hook(&mut self) -> Result<()> {
        if let Some(last) = self.history.back() {
            println!(
                "training finished after {} iterations in {:.2?}",
                last.iteration, last.elapsed
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{DefaultTrainingHooks, StepReport, TrainingHooks};
    use crate::schedule::LearningSchedule;
    use std::time::Duration;

    fn report(iteration: usize) -> StepReport {
        StepReport {
            iteration,
            epoch: 0,
            generator_loss: 1.,
            discriminator_loss: 0.5,
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn default_hooks_follow_schedule() {
        let mut hooks = DefaultTrainingHooks::new(LearningSchedule::iteration_bound(2), 0);
        assert!(!hooks.init_hook());
        assert!(!hooks.post_step_hook(&report(1)));
        assert!(!hooks.post_epoch_hook(0));
        assert!(hooks.post_step_hook(&report(2)));
        assert_eq!(hooks.history().len(), 2);
        hooks.shutdown_hook().unwrap();
    }

    #[test]
    fn history_keeps_latest_reports() {
        let mut hooks =
            DefaultTrainingHooks::new(LearningSchedule::iteration_bound(10), 0).with_history_len(3);
        for iteration in 1..=5 {
            hooks.post_step_hook(&report(iteration));
        }
        let iterations = hooks
            .history()
            .iter()
            .map(|report| report.iteration)
            .collect::<Vec<_>>();
        assert_eq!(iterations, [3, 4, 5]);

        let mut quiet =
            DefaultTrainingHooks::new(LearningSchedule::iteration_bound(10), 0).with_history_len(0);
        quiet.post_step_hook(&report(1));
        assert!(quiet.history().is_empty());
    }
}
