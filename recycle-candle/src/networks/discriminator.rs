use super::{ConvBlock, scaled};
use candle_core::{Result, Tensor};
use candle_nn::{Activation, Module, VarBuilder};
use recycle_core::geometry::FrameGeometry;
use serde::{Deserialize, Serialize};

const MAX_WIDTH_MULTIPLIER: usize = 8;
const LEAKY_SLOPE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscriminatorConfig {
    pub base_channels: usize,
    pub layers: usize,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            base_channels: 64,
            layers: 3,
        }
    }
}

/// PatchGAN discriminator, outputs one real/fake logit per receptive field patch.
#[derive(Debug, Clone)]
pub struct Discriminator {
    layers: Vec<ConvBlock>,
}

impl Discriminator {
    /// The stride-2 layers floor-halve the side, the two trailing 4x4 convs then take one pixel
    /// each. With `n` stride-2 layers a side of `3 * 2^n` is the smallest that leaves a patch.
    pub fn geometry(config: &DiscriminatorConfig) -> FrameGeometry {
        FrameGeometry::new(1, 3 * (1usize << config.layers.max(1)))
    }

    pub fn new(
        in_channels: usize,
        reduction: usize,
        config: &DiscriminatorConfig,
        vb: &VarBuilder,
    ) -> Result<Self> {
        let ndf = scaled(config.base_channels, reduction);
        let width = |n: usize| ndf * (1usize << n).min(MAX_WIDTH_MULTIPLIER);
        let mut layers = vec![
            ConvBlock::conv(in_channels, ndf, 4, 2, 1, vb.pp("layer0"))?
                .with_activation(Activation::LeakyRelu(LEAKY_SLOPE)),
        ];
        for n in 1..config.layers.max(1) {
            let vb = vb.pp(format!("layer{n}"));
            let layer = ConvBlock::conv(width(n - 1), width(n), 4, 2, 1, vb)?
                .normalized()
                .with_activation(Activation::LeakyRelu(LEAKY_SLOPE));
            layers.push(layer);
        }
        let last = config.layers.max(1);
        layers.push(
            ConvBlock::conv(width(last - 1), width(last), 4, 1, 1, vb.pp(format!("layer{last}")))?
                .normalized()
                .with_activation(Activation::LeakyRelu(LEAKY_SLOPE)),
        );
        layers.push(ConvBlock::conv(width(last), 1, 4, 1, 1, vb.pp("patch"))?);
        Ok(Self { layers })
    }
}

impl Module for Discriminator {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for layer in self.layers.iter() {
            xs = layer.forward(&xs)?;
        }
        Ok(xs)
    }
}
