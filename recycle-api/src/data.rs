use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use recycle_core::{
    Domain,
    clips::{ClipSampler, ClipSampling},
    error::ReCycleError,
};
use std::path::Path;

/// Default tensor name of a video inside a safetensors file.
pub const VIDEO_KEY: &str = "frames";

/// A video of one domain, addressable by frame index.
pub trait VideoSource {
    /// Number of frames.
    fn frames(&self) -> usize;

    /// Frames `start..start + len` as an `(len, C, H, W)` f32 tensor with values in `[-1, 1]`.
    fn clip(&self, start: usize, len: usize) -> candle_core::Result<Tensor>;

    /// `(H, W)` of the frames.
    fn frame_size(&self) -> candle_core::Result<(usize, usize)> {
        let frame = self.clip(0, 1)?;
        Ok((frame.dim(2)?, frame.dim(3)?))
    }
}

/// A whole video held in one `(N, C, H, W)` tensor.
#[derive(Debug, Clone)]
pub struct InMemoryVideo {
    frames: Tensor,
}

impl InMemoryVideo {
    /// Wraps `frames`. `u8` videos are rescaled from `[0, 255]` to `[-1, 1]`, other dtypes are
    /// taken as already normalized.
    pub fn new(frames: Tensor) -> Result<Self> {
        if frames.rank() != 4 {
            return Err(ReCycleError::InvalidClip(format!(
                "video has shape {:?}, expected (N, C, H, W)",
                frames.dims()
            ))
            .into());
        }
        let frames = match frames.dtype() {
            DType::U8 => frames.to_dtype(DType::F32)?.affine(1. / 127.5, -1.)?,
            _ => frames.to_dtype(DType::F32)?,
        };
        Ok(Self { frames })
    }

    /// Loads the tensor named `key` from a safetensors file.
    pub fn from_safetensors(path: impl AsRef<Path>, key: &str, device: &Device) -> Result<Self> {
        let path = path.as_ref();
        let mut tensors = candle_core::safetensors::load(path, device)?;
        let frames = tensors.remove(key).ok_or_else(|| {
            ReCycleError::InvalidClip(format!("{} has no tensor named {key}", path.display()))
        })?;
        Self::new(frames)
    }

    pub fn tensor(&self) -> &Tensor {
        &self.frames
    }

    pub fn channels(&self) -> usize {
        self.frames.dims()[1]
    }
}

impl VideoSource for InMemoryVideo {
    fn frames(&self) -> usize {
        self.frames.dims()[0]
    }

    fn clip(&self, start: usize, len: usize) -> candle_core::Result<Tensor> {
        self.frames.narrow(0, start, len)
    }

    fn frame_size(&self) -> candle_core::Result<(usize, usize)> {
        Ok((self.frames.dim(2)?, self.frames.dim(3)?))
    }
}

/// Writes an `(N, C, H, W)` video to a safetensors file under `key`.
pub fn save_video(frames: &Tensor, path: impl AsRef<Path>, key: &str) -> Result<()> {
    frames.save_safetensors(key, path)?;
    Ok(())
}

/// Draws unpaired clip batches from two videos. The clips of the two domains are sampled
/// independently, an epoch ends once the video with fewer windows runs out of full batches.
pub struct UnpairedClips {
    a: Box<dyn VideoSource>,
    b: Box<dyn VideoSource>,
    a_sampler: ClipSampler,
    b_sampler: ClipSampler,
    batch_size: usize,
}

impl UnpairedClips {
    pub fn new(
        a: Box<dyn VideoSource>,
        b: Box<dyn VideoSource>,
        clip_len: usize,
        batch_size: usize,
        stride: usize,
        sampling: ClipSampling,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(ReCycleError::InvalidConfig("batch size has to be positive".to_owned()).into());
        }
        let a_sampler = ClipSampler::new(a.frames(), clip_len, stride, sampling)?;
        let b_sampler = ClipSampler::new(b.frames(), clip_len, stride, sampling)?;
        for (domain, sampler) in [(Domain::A, &a_sampler), (Domain::B, &b_sampler)] {
            if sampler.windows() < batch_size {
                return Err(ReCycleError::InvalidConfig(format!(
                    "video of domain {domain} has {} clip windows, fewer than the batch size {batch_size}",
                    sampler.windows()
                ))
                .into());
            }
        }
        Ok(Self {
            a,
            b,
            a_sampler,
            b_sampler,
            batch_size,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn clip_len(&self) -> usize {
        self.a_sampler.clip_len()
    }

    /// Full batches per epoch.
    pub fn batches_per_epoch(&self) -> usize {
        self.a_sampler.windows().min(self.b_sampler.windows()) / self.batch_size
    }

    /// Next pair of `(B, T', C, H, W)` batches, `None` once the epoch is over.
    pub fn next_batch(&mut self) -> Result<Option<(Tensor, Tensor)>> {
        if self.a_sampler.remaining() < self.batch_size
            || self.b_sampler.remaining() < self.batch_size
        {
            return Ok(None);
        }
        let a = Self::batch(self.a.as_ref(), &mut self.a_sampler, self.batch_size)?;
        let b = Self::batch(self.b.as_ref(), &mut self.b_sampler, self.batch_size)?;
        Ok(Some((a, b)))
    }

    fn batch(
        source: &dyn VideoSource,
        sampler: &mut ClipSampler,
        batch_size: usize,
    ) -> Result<Tensor> {
        let clip_len = sampler.clip_len();
        let clips = (0..batch_size)
            .filter_map(|_| sampler.next_offset())
            .map(|start| source.clip(start, clip_len))
            .collect::<candle_core::Result<Vec<_>>>()?;
        Ok(Tensor::stack(&clips, 0)?)
    }

    /// Starts a new epoch on both videos.
    pub fn reset(&mut self) {
        self.a_sampler.reset();
        self.b_sampler.reset();
    }
}
