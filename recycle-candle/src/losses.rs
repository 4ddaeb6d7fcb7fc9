use candle_core::{Result, Tensor};
use candle_nn::loss::{binary_cross_entropy_with_logit, mse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GanMode {
    /// LSGAN, mean squared error against 1 (real) or 0 (fake).
    #[default]
    LeastSquares,
    /// Binary cross entropy on logits.
    Vanilla,
}

/// Adversarial criterion. Compares discriminator output with an all-real or all-fake target of
/// the same shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct GanLoss {
    pub mode: GanMode,
}

impl GanLoss {
    pub fn new(mode: GanMode) -> Self {
        Self { mode }
    }

    pub fn loss(&self, prediction: &Tensor, target_is_real: bool) -> Result<Tensor> {
        let target = if target_is_real {
            prediction.ones_like()?
        } else {
            prediction.zeros_like()?
        };
        match self.mode {
            GanMode::LeastSquares => mse(prediction, &target),
            GanMode::Vanilla => binary_cross_entropy_with_logit(prediction, &target),
        }
    }
}

pub fn l2(prediction: &Tensor, target: &Tensor) -> Result<Tensor> {
    mse(prediction, target)
}

#[cfg(test)]
mod test {
    use super::{GanLoss, GanMode, l2};
    use candle_core::{DType, Device, Result, Tensor};

    #[test]
    fn least_squares_targets() -> Result<()> {
        let criterion = GanLoss::default();
        let ones = Tensor::ones((2, 1, 3, 3), DType::F32, &Device::Cpu)?;
        assert_eq!(criterion.loss(&ones, true)?.to_scalar::<f32>()?, 0.);
        assert_eq!(criterion.loss(&ones, false)?.to_scalar::<f32>()?, 1.);
        Ok(())
    }

    #[test]
    fn vanilla_at_zero_logit_is_ln2() -> Result<()> {
        let criterion = GanLoss::new(GanMode::Vanilla);
        let zeros = Tensor::zeros((1, 1, 2, 2), DType::F32, &Device::Cpu)?;
        let real = criterion.loss(&zeros, true)?.to_scalar::<f32>()?;
        let fake = criterion.loss(&zeros, false)?.to_scalar::<f32>()?;
        assert!((real - std::f32::consts::LN_2).abs() < 1e-5);
        assert!((fake - std::f32::consts::LN_2).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn l2_is_mean_squared_error() -> Result<()> {
        let a = Tensor::new(&[1f32, 2., 3.], &Device::Cpu)?;
        let b = Tensor::new(&[1f32, 0., 0.], &Device::Cpu)?;
        // (0 + 4 + 9) / 3
        assert!((l2(&a, &b)?.to_scalar::<f32>()? - 13. / 3.).abs() < 1e-6);
        Ok(())
    }
}
