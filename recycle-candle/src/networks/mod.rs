pub mod discriminator;
pub mod predictor;
pub mod translator;

use candle_core::{Result, Tensor};
use candle_nn::{
    Activation, Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig, Module, VarBuilder,
    conv_transpose2d, conv2d,
};
use either::Either;

pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use predictor::{TemporalPredictor, TemporalPredictorConfig};
pub use translator::{SpatialTranslator, SpatialTranslatorConfig};

const INSTANCE_NORM_EPS: f64 = 1e-5;

/// Channel width after dividing by the reduction ratio `r`. Never drops below one channel.
pub fn scaled(channels: usize, reduction: usize) -> usize {
    (channels / reduction.max(1)).max(1)
}

/// Per-sample, per-channel normalisation over the spatial axes of a BCHW tensor, without affine
/// parameters.
pub fn instance_norm(xs: &Tensor) -> Result<Tensor> {
    let (b, c, h, w) = xs.dims4()?;
    let flat = xs.reshape((b, c, h * w))?;
    let mean = flat.mean_keepdim(2)?;
    let centered = flat.broadcast_sub(&mean)?;
    let var = centered.sqr()?.mean_keepdim(2)?;
    let std = var.affine(1., INSTANCE_NORM_EPS)?.sqrt()?;
    centered.broadcast_div(&std)?.reshape((b, c, h, w))
}

/// Convolution (or transposed convolution) followed by optional instance norm and activation.
#[derive(Debug, Clone)]
pub struct ConvBlock {
    conv: Either<Conv2d, ConvTranspose2d>,
    normalize: bool,
    activation: Option<Activation>,
}

impl ConvBlock {
    pub fn conv(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let config = Conv2dConfig {
            padding,
            stride,
            ..Default::default()
        };
        let conv = conv2d(in_channels, out_channels, kernel, config, vb)?;
        Ok(Self {
            conv: Either::Left(conv),
            normalize: false,
            activation: None,
        })
    }

    /// Stride 2 transposed convolution.
    pub fn up(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        padding: usize,
        output_padding: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let config = ConvTranspose2dConfig {
            padding,
            output_padding,
            stride: 2,
            ..Default::default()
        };
        let conv = conv_transpose2d(in_channels, out_channels, kernel, config, vb)?;
        Ok(Self {
            conv: Either::Right(conv),
            normalize: false,
            activation: None,
        })
    }

    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }
}

impl Module for ConvBlock {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = match &self.conv {
            Either::Left(conv) => conv.forward(xs)?,
            Either::Right(conv) => conv.forward(xs)?,
        };
        let xs = if self.normalize {
            instance_norm(&xs)?
        } else {
            xs
        };
        match &self.activation {
            Some(activation) => activation.forward(&xs),
            None => Ok(xs),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{instance_norm, scaled};
    use candle_core::{Device, Result, Tensor};

    #[test]
    fn scaled_never_reaches_zero() {
        assert_eq!(scaled(64, 1), 64);
        assert_eq!(scaled(64, 4), 16);
        assert_eq!(scaled(64, 128), 1);
        assert_eq!(scaled(64, 0), 64);
    }

    #[test]
    fn instance_norm_zero_mean_unit_var() -> Result<()> {
        let xs = Tensor::arange(0f32, 32., &Device::Cpu)?.reshape((2, 1, 4, 4))?;
        let normed = instance_norm(&xs)?;
        let flat = normed.reshape((2, 16))?;
        let means: Vec<f32> = flat.mean(1)?.to_vec1()?;
        let vars: Vec<f32> = flat.sqr()?.mean(1)?.to_vec1()?;
        for (mean, var) in means.into_iter().zip(vars) {
            assert!(mean.abs() < 1e-5);
            assert!((var - 1.).abs() < 1e-3);
        }
        Ok(())
    }
}
