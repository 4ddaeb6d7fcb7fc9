use crate::error::ReCycleError;
use serde::{Deserialize, Serialize};

/// Frame sides a set of networks can process: multiples of `multiple`, no smaller than
/// `min_side`. Height and width are checked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub multiple: usize,
    pub min_side: usize,
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self {
            multiple: 1,
            min_side: 1,
        }
    }
}

impl FrameGeometry {
    pub fn new(multiple: usize, min_side: usize) -> Self {
        Self {
            multiple: multiple.max(1),
            min_side: min_side.max(1),
        }
    }

    /// Geometry accepted by every network behind both `self` and `other`. Multiples are powers of
    /// two for all networks in this workspace, so the larger one is also the common multiple.
    pub fn merge(self, other: Self) -> Self {
        Self::new(
            self.multiple.max(other.multiple),
            self.min_side.max(other.min_side),
        )
    }

    pub fn accepts(&self, side: usize) -> bool {
        side >= self.min_side && side % self.multiple == 0
    }

    /// Smallest side that passes `accepts`.
    pub fn smallest_side(&self) -> usize {
        self.min_side.div_ceil(self.multiple) * self.multiple
    }

    pub fn check(&self, height: usize, width: usize) -> Result<(), ReCycleError> {
        if self.accepts(height) && self.accepts(width) {
            return Ok(());
        }
        Err(ReCycleError::InvalidClip(format!(
            "frames of {height}x{width} are not supported, height and width have to be multiples of {} and at least {} (e.g. {})",
            self.multiple,
            self.min_side,
            self.smallest_side()
        )))
    }
}
