use candle_core::{Result, Tensor};
use recycle_core::{error::ReCycleError, replay::ReplayBuffer};

/// Replay buffer over batched frames. Every sample of the batch is handled separately and stored
/// detached, so the history never keeps generator graphs alive.
#[derive(Debug, Clone)]
pub struct FrameReplayBuffer(ReplayBuffer<Tensor>);

impl FrameReplayBuffer {
    pub fn new(max_size: usize) -> std::result::Result<Self, ReCycleError> {
        Ok(Self(ReplayBuffer::new(max_size)?))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push_and_pop(&mut self, batch: &Tensor) -> Result<Tensor> {
        let batch_size = batch.dim(0)?;
        let samples = (0..batch_size)
            .map(|idx| batch.narrow(0, idx, 1).map(|sample| sample.detach()))
            .collect::<Result<Vec<_>>>()?;
        let returned = self.0.push_and_pop(samples);
        Tensor::cat(&returned, 0)
    }
}

#[cfg(test)]
mod test {
    use super::FrameReplayBuffer;
    use candle_core::{Device, Result, Tensor, Var};

    #[test]
    fn batches_keep_their_shape() -> Result<()> {
        let mut buffer = FrameReplayBuffer::new(3).unwrap();
        for _ in 0..5 {
            let batch = Tensor::randn(0f32, 1., (2, 3, 4, 4), &Device::Cpu)?;
            let returned = buffer.push_and_pop(&batch)?;
            assert_eq!(returned.dims(), batch.dims());
        }
        assert_eq!(buffer.len(), 3);
        Ok(())
    }

    #[test]
    fn returned_frames_are_detached() -> Result<()> {
        let mut buffer = FrameReplayBuffer::new(2).unwrap();
        let var = Var::ones((1, 1, 2, 2), candle_core::DType::F32, &Device::Cpu)?;
        let fake = var.as_tensor().affine(2., 0.)?;
        let returned = buffer.push_and_pop(&fake)?;
        let grads = returned.sum_all()?.backward()?;
        assert!(grads.get(var.as_tensor()).is_none());
        Ok(())
    }
}
