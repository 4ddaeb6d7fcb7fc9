use crate::{error::ReCycleError, rng::with_rng};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClipSampling {
    /// Windows in temporal order.
    Sequential,
    /// Windows in a fresh random order every epoch.
    #[default]
    Shuffled,
}

/// Hands out start offsets of `clip_len` long windows over a video of `frames` frames. Windows
/// are `stride` frames apart. One pass over all windows is an epoch.
#[derive(Debug, Clone)]
pub struct ClipSampler {
    frames: usize,
    clip_len: usize,
    stride: usize,
    sampling: ClipSampling,
    order: Vec<usize>,
    cursor: usize,
}

impl ClipSampler {
    pub fn new(
        frames: usize,
        clip_len: usize,
        stride: usize,
        sampling: ClipSampling,
    ) -> Result<Self, ReCycleError> {
        if clip_len == 0 || stride == 0 {
            return Err(ReCycleError::InvalidConfig(
                "clip length and stride have to be positive".to_owned(),
            ));
        }
        if frames < clip_len {
            return Err(ReCycleError::EmptySource { frames, clip_len });
        }
        let mut sampler = Self {
            frames,
            clip_len,
            stride,
            sampling,
            order: vec![],
            cursor: 0,
        };
        sampler.reset();
        Ok(sampler)
    }

    pub fn windows(&self) -> usize {
        (self.frames - self.clip_len) / self.stride + 1
    }

    pub fn clip_len(&self) -> usize {
        self.clip_len
    }

    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    /// Next start offset of the current epoch, `None` once the epoch is exhausted.
    pub fn next_offset(&mut self) -> Option<usize> {
        let offset = self.order.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(offset)
    }

    /// Starts a new epoch.
    pub fn reset(&mut self) {
        self.order = (0..self.windows()).map(|w| w * self.stride).collect();
        if self.sampling == ClipSampling::Shuffled {
            with_rng(|rng| self.order.shuffle(rng));
        }
        self.cursor = 0;
    }
}

#[cfg(test)]
mod test {
    use super::{ClipSampler, ClipSampling};
    use crate::error::ReCycleError;

    #[test]
    fn sequential_windows_cover_video() {
        let mut sampler = ClipSampler::new(10, 4, 3, ClipSampling::Sequential).unwrap();
        assert_eq!(sampler.windows(), 3);
        let offsets: Vec<_> = std::iter::from_fn(|| sampler.next_offset()).collect();
        assert_eq!(offsets, vec![0, 3, 6]);
        assert_eq!(sampler.next_offset(), None);
        sampler.reset();
        assert_eq!(sampler.next_offset(), Some(0));
    }

    #[test]
    fn shuffled_windows_are_a_permutation() {
        let mut sampler = ClipSampler::new(20, 5, 1, ClipSampling::Shuffled).unwrap();
        let mut offsets: Vec<_> = std::iter::from_fn(|| sampler.next_offset()).collect();
        offsets.sort();
        assert_eq!(offsets, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn short_video_is_rejected() {
        assert!(matches!(
            ClipSampler::new(3, 4, 1, ClipSampling::Sequential),
            Err(ReCycleError::EmptySource {
                frames: 3,
                clip_len: 4
            })
        ));
        assert!(ClipSampler::new(4, 4, 1, ClipSampling::Sequential).is_ok());
    }
}
