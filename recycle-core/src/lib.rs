pub mod clips;
pub mod error;
pub mod geometry;
pub mod hooks;
pub mod replay;
pub mod rng;
pub mod schedule;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A training algorithm. `ReCycleTrainer` is the only implementor for now, the trait is the seam
/// other trainers (e.g. a plain CycleGAN without predictors) plug into.
pub trait Algorithm {
    fn train(&mut self) -> Result<()>;
}

/// One of the two visual domains the translators map between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    A,
    B,
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}
