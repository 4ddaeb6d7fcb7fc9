use candle_core::{Result, Tensor};
use derive_more::{Deref, DerefMut, Display};

#[derive(Deref, DerefMut, Debug, Display, Clone)]
pub struct GeneratorLoss(pub Tensor);

#[derive(Deref, DerefMut, Debug, Display, Clone)]
pub struct DiscriminatorLoss(pub Tensor);

/// `t` consecutive BCHW frames concatenated along the channel axis.
#[derive(Deref, DerefMut, Debug, Display, Clone)]
pub struct FrameTuple(pub Tensor);

impl FrameTuple {
    pub fn from_frames(frames: &[Tensor]) -> Result<Self> {
        Ok(Self(Tensor::cat(frames, 1)?))
    }
}
