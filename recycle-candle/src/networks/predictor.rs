use super::{ConvBlock, scaled};
use candle_core::{Result, Tensor};
use candle_nn::{Activation, Module, VarBuilder};
use recycle_core::geometry::FrameGeometry;
use serde::{Deserialize, Serialize};

const MAX_WIDTH_MULTIPLIER: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalPredictorConfig {
    pub base_channels: usize,
    pub depth: usize,
}

impl Default for TemporalPredictorConfig {
    fn default() -> Self {
        Self {
            base_channels: 64,
            depth: 4,
        }
    }
}

/// U-Net predicting the next frame from the previous `t` frames stacked along the channel axis.
/// Frame sizes have to be multiples of `2^depth`.
#[derive(Debug, Clone)]
pub struct TemporalPredictor {
    encoders: Vec<ConvBlock>,
    // deepest level first
    decoders: Vec<ConvBlock>,
    head: ConvBlock,
}

impl TemporalPredictor {
    pub fn geometry(config: &TemporalPredictorConfig) -> FrameGeometry {
        let multiple = 1usize << config.depth.max(1);
        FrameGeometry::new(multiple, multiple)
    }

    pub fn new(
        in_channels: usize,
        out_channels: usize,
        reduction: usize,
        config: &TemporalPredictorConfig,
        vb: &VarBuilder,
    ) -> Result<Self> {
        let depth = config.depth.max(1);
        let ngf = scaled(config.base_channels, reduction);
        let widths: Vec<usize> = (0..depth)
            .map(|level| ngf * (1usize << level).min(MAX_WIDTH_MULTIPLIER))
            .collect();
        let mut encoders = Vec::with_capacity(depth);
        for (level, width) in widths.iter().enumerate() {
            let block = if level == 0 {
                ConvBlock::conv(in_channels, *width, 4, 2, 1, vb.pp("enc0"))?
            } else {
                let vb = vb.pp(format!("enc{level}"));
                ConvBlock::conv(widths[level - 1], *width, 4, 2, 1, vb)?.normalized()
            };
            encoders.push(block.with_activation(Activation::LeakyRelu(0.2)));
        }
        let mut decoders = Vec::with_capacity(depth);
        for level in (0..depth).rev() {
            let in_width = if level == depth - 1 {
                widths[level]
            } else {
                2 * widths[level]
            };
            let out_width = if level > 0 { widths[level - 1] } else { ngf };
            let block = ConvBlock::up(in_width, out_width, 4, 1, 0, vb.pp(format!("dec{level}")))?
                .normalized()
                .with_activation(Activation::Relu);
            decoders.push(block);
        }
        let head = ConvBlock::conv(ngf, out_channels, 1, 1, 0, vb.pp("head"))?;
        Ok(Self {
            encoders,
            decoders,
            head,
        })
    }
}

impl Module for TemporalPredictor {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut skips = Vec::with_capacity(self.encoders.len());
        let mut xs = xs.clone();
        for encoder in self.encoders.iter() {
            xs = encoder.forward(&xs)?;
            skips.push(xs.clone());
        }
        // the deepest activation feeds the first decoder directly
        skips.pop();
        for decoder in self.decoders.iter() {
            xs = decoder.forward(&xs)?;
            if let Some(skip) = skips.pop() {
                xs = Tensor::cat(&[&xs, &skip], 1)?;
            }
        }
        self.head.forward(&xs)?.tanh()
    }
}

#[cfg(test)]
mod test {
    use super::{TemporalPredictor, TemporalPredictorConfig};
    use candle_core::{DType, Device, Result, Tensor};
    use candle_nn::{Module, VarBuilder, VarMap};

    #[test]
    fn predictor_maps_tuple_to_frame() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        for depth in 1..=3 {
            let config = TemporalPredictorConfig {
                base_channels: 8,
                depth,
            };
            let predictor =
                TemporalPredictor::new(6, 3, 1, &config, &vb.pp(format!("depth{depth}")))?;
            let xs = Tensor::randn(0f32, 1., (1, 6, 16, 16), &Device::Cpu)?;
            assert_eq!(predictor.forward(&xs)?.dims(), &[1, 3, 16, 16]);
            assert_eq!(TemporalPredictor::geometry(&config).multiple, 1 << depth);
        }
        Ok(())
    }
}
