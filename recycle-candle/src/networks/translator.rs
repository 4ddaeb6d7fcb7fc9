use super::{ConvBlock, scaled};
use candle_core::{Result, Tensor};
use candle_nn::{Activation, Module, VarBuilder};
use recycle_core::geometry::FrameGeometry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialTranslatorConfig {
    pub base_channels: usize,
    pub residual_blocks: usize,
}

impl Default for SpatialTranslatorConfig {
    fn default() -> Self {
        Self {
            base_channels: 64,
            residual_blocks: 6,
        }
    }
}

#[derive(Debug, Clone)]
struct ResidualBlock {
    first: ConvBlock,
    second: ConvBlock,
}

impl ResidualBlock {
    fn new(channels: usize, vb: &VarBuilder) -> Result<Self> {
        let first = ConvBlock::conv(channels, channels, 3, 1, 1, vb.pp("first"))?
            .normalized()
            .with_activation(Activation::Relu);
        let second = ConvBlock::conv(channels, channels, 3, 1, 1, vb.pp("second"))?.normalized();
        Ok(Self { first, second })
    }
}

impl Module for ResidualBlock {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let out = self.second.forward(&self.first.forward(xs)?)?;
        xs.add(&out)
    }
}

/// ResNet style frame-to-frame translator. Downsamples twice, so frame height and width have to be
/// multiples of four.
#[derive(Debug, Clone)]
pub struct SpatialTranslator {
    stem: ConvBlock,
    down: [ConvBlock; 2],
    blocks: Vec<ResidualBlock>,
    up: [ConvBlock; 2],
    head: ConvBlock,
}

impl SpatialTranslator {
    /// Two stride-2 downsamplings have to be undone exactly by the upsamplers.
    pub fn geometry() -> FrameGeometry {
        FrameGeometry::new(4, 4)
    }

    pub fn new(
        in_channels: usize,
        out_channels: usize,
        reduction: usize,
        config: &SpatialTranslatorConfig,
        vb: &VarBuilder,
    ) -> Result<Self> {
        let ngf = scaled(config.base_channels, reduction);
        let stem = ConvBlock::conv(in_channels, ngf, 7, 1, 3, vb.pp("stem"))?
            .normalized()
            .with_activation(Activation::Relu);
        let down = [
            ConvBlock::conv(ngf, ngf * 2, 3, 2, 1, vb.pp("down0"))?
                .normalized()
                .with_activation(Activation::Relu),
            ConvBlock::conv(ngf * 2, ngf * 4, 3, 2, 1, vb.pp("down1"))?
                .normalized()
                .with_activation(Activation::Relu),
        ];
        let blocks = (0..config.residual_blocks)
            .map(|idx| ResidualBlock::new(ngf * 4, &vb.pp(format!("block{idx}"))))
            .collect::<Result<Vec<_>>>()?;
        let up = [
            ConvBlock::up(ngf * 4, ngf * 2, 3, 1, 1, vb.pp("up0"))?
                .normalized()
                .with_activation(Activation::Relu),
            ConvBlock::up(ngf * 2, ngf, 3, 1, 1, vb.pp("up1"))?
                .normalized()
                .with_activation(Activation::Relu),
        ];
        let head = ConvBlock::conv(ngf, out_channels, 7, 1, 3, vb.pp("head"))?;
        Ok(Self {
            stem,
            down,
            blocks,
            up,
            head,
        })
    }
}

impl Module for SpatialTranslator {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = self.stem.forward(xs)?;
        for layer in self.down.iter() {
            xs = layer.forward(&xs)?;
        }
        for block in self.blocks.iter() {
            xs = block.forward(&xs)?;
        }
        for layer in self.up.iter() {
            xs = layer.forward(&xs)?;
        }
        self.head.forward(&xs)?.tanh()
    }
}
