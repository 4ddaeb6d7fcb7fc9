use anyhow::Result;
use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use recycle_candle::{
    losses::GanMode,
    networks::{
        Discriminator, DiscriminatorConfig, SpatialTranslator, SpatialTranslatorConfig,
        TemporalPredictor, TemporalPredictorConfig,
    },
    optimizer::OptimizerConfig,
};
use recycle_core::{error::ReCycleError, geometry::FrameGeometry, replay::DEFAULT_REPLAY_SIZE};
use recycle_model::{DefaultReCycleGan, LossWeights, ReCycleGan, ReCycleOptions, ReCycleParts};
use serde::{Deserialize, Serialize};

/// Everything needed to rebuild a `DefaultReCycleGan`. Serialized next to the weights of a
/// checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReCycleGanBuilder {
    pub a_channels: usize,
    pub b_channels: usize,
    /// Loss-bearing frames per clip.
    pub frames: usize,
    pub tuple_size: usize,
    /// Divides every channel width of the networks.
    pub reduction: usize,
    pub translator: SpatialTranslatorConfig,
    pub predictor: TemporalPredictorConfig,
    pub discriminator: DiscriminatorConfig,
    pub generator_optimizer: OptimizerConfig,
    pub discriminator_optimizer: OptimizerConfig,
    pub gan_mode: GanMode,
    pub weights: LossWeights,
    pub buffer_size: usize,
    pub warn_on_forward: bool,
    pub detach_tuples: bool,
}

impl Default for ReCycleGanBuilder {
    fn default() -> Self {
        Self {
            a_channels: 3,
            b_channels: 3,
            frames: 30,
            tuple_size: 2,
            reduction: 1,
            translator: SpatialTranslatorConfig::default(),
            predictor: TemporalPredictorConfig::default(),
            discriminator: DiscriminatorConfig::default(),
            generator_optimizer: OptimizerConfig::adam(1e-3),
            discriminator_optimizer: OptimizerConfig::adam(1e-4),
            gan_mode: GanMode::default(),
            weights: LossWeights::default(),
            buffer_size: DEFAULT_REPLAY_SIZE,
            warn_on_forward: true,
            detach_tuples: true,
        }
    }
}

impl ReCycleGanBuilder {
    pub fn set_channels(&mut self, a_channels: usize, b_channels: usize) {
        self.a_channels = a_channels;
        self.b_channels = b_channels;
    }

    pub fn set_clip(&mut self, frames: usize, tuple_size: usize) {
        self.frames = frames;
        self.tuple_size = tuple_size;
    }

    pub fn set_reduction(&mut self, reduction: usize) {
        self.reduction = reduction;
    }

    pub fn set_learning_rates(&mut self, generator: f64, discriminator: f64) {
        self.generator_optimizer.learning_rate = generator;
        self.discriminator_optimizer.learning_rate = discriminator;
    }

    pub fn set_betas(&mut self, beta1: f64, beta2: f64) {
        for config in [
            &mut self.generator_optimizer,
            &mut self.discriminator_optimizer,
        ] {
            config.beta1 = beta1;
            config.beta2 = beta2;
        }
    }

    pub fn set_max_grad_norm(&mut self, max_grad_norm: Option<f32>) {
        self.generator_optimizer.max_grad_norm = max_grad_norm;
        self.discriminator_optimizer.max_grad_norm = max_grad_norm;
    }

    /// Frames per training clip, history included.
    pub fn clip_len(&self) -> usize {
        self.frames + self.tuple_size
    }

    pub fn validate(&self) -> Result<(), ReCycleError> {
        let positive = [
            ("a_channels", self.a_channels),
            ("b_channels", self.b_channels),
            ("frames", self.frames),
            ("tuple_size", self.tuple_size),
            ("reduction", self.reduction),
            ("buffer_size", self.buffer_size),
            ("predictor depth", self.predictor.depth),
            ("discriminator layers", self.discriminator.layers),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ReCycleError::InvalidConfig(format!(
                "{name} has to be positive"
            )));
        }
        for (name, config) in [
            ("generator", &self.generator_optimizer),
            ("discriminator", &self.discriminator_optimizer),
        ] {
            if config.learning_rate < 0. || !config.learning_rate.is_finite() {
                return Err(ReCycleError::InvalidConfig(format!(
                    "{name} learning rate {} is invalid",
                    config.learning_rate
                )));
            }
        }
        Ok(())
    }

    /// Frame sizes all six networks can process.
    pub fn geometry(&self) -> FrameGeometry {
        SpatialTranslator::geometry()
            .merge(TemporalPredictor::geometry(&self.predictor))
            .merge(Discriminator::geometry(&self.discriminator))
    }

    /// Checks frames of `height` x `width` against `geometry`.
    pub fn validate_frames(&self, height: usize, width: usize) -> Result<(), ReCycleError> {
        self.geometry().check(height, width)
    }

    pub fn build(&self, device: &Device) -> Result<DefaultReCycleGan> {
        self.validate()?;
        let generator_varmap = VarMap::new();
        let gvb = VarBuilder::from_varmap(&generator_varmap, DType::F32, device);
        let discriminator_varmap = VarMap::new();
        let dvb = VarBuilder::from_varmap(&discriminator_varmap, DType::F32, device);
        let (a, b, t, r) = (
            self.a_channels,
            self.b_channels,
            self.tuple_size,
            self.reduction,
        );
        let parts = ReCycleParts {
            g_ab: SpatialTranslator::new(a, b, r, &self.translator, &gvb.pp("g_ab"))?,
            g_ba: SpatialTranslator::new(b, a, r, &self.translator, &gvb.pp("g_ba"))?,
            p_a: TemporalPredictor::new(t * a, a, r, &self.predictor, &gvb.pp("p_a"))?,
            p_b: TemporalPredictor::new(t * b, b, r, &self.predictor, &gvb.pp("p_b"))?,
            d_a: Discriminator::new(a, r, &self.discriminator, &dvb.pp("d_a"))?,
            d_b: Discriminator::new(b, r, &self.discriminator, &dvb.pp("d_b"))?,
        };
        let options = ReCycleOptions {
            frames: self.frames,
            tuple_size: self.tuple_size,
            buffer_size: self.buffer_size,
            gan_mode: self.gan_mode,
            weights: self.weights,
            warn_on_forward: self.warn_on_forward,
            detach_tuples: self.detach_tuples,
            geometry: self.geometry(),
        };
        ReCycleGan::new(
            parts,
            self.generator_optimizer.build(generator_varmap)?,
            self.discriminator_optimizer.build(discriminator_varmap)?,
            &options,
            device,
        )
    }
}

#[cfg(test)]
mod test {
    use super::ReCycleGanBuilder;
    use recycle_core::error::ReCycleError;

    #[test]
    fn defaults() {
        let builder = ReCycleGanBuilder::default();
        assert_eq!((builder.a_channels, builder.b_channels), (3, 3));
        assert_eq!(builder.clip_len(), 32);
        assert_eq!(builder.generator_optimizer.learning_rate, 1e-3);
        assert_eq!(builder.discriminator_optimizer.learning_rate, 1e-4);
        assert_eq!(builder.generator_optimizer.beta1, 0.9);
        assert_eq!(builder.weights.recycle, 10.);
        assert!(builder.detach_tuples);
        assert!(builder.validate().is_ok());
    }

    #[test]
    fn rejects_zero_tuple_size() {
        let mut builder = ReCycleGanBuilder::default();
        builder.set_clip(4, 0);
        let err = builder.validate().unwrap_err();
        assert!(matches!(err, ReCycleError::InvalidConfig(msg) if msg.contains("tuple_size")));
    }

    #[test]
    fn rejects_negative_learning_rate() {
        let mut builder = ReCycleGanBuilder::default();
        builder.set_learning_rates(-1., 1e-4);
        assert!(builder.validate().is_err());
    }

    #[test]
    fn config_roundtrips_through_json() {
        let mut builder = ReCycleGanBuilder::default();
        builder.set_reduction(8);
        builder.set_max_grad_norm(Some(1.));
        builder.set_betas(0.5, 0.999);
        assert_eq!(builder.discriminator_optimizer.beta1, 0.5);
        let json = serde_json::to_string(&builder).unwrap();
        let restored: ReCycleGanBuilder = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, builder);
    }

    #[test]
    fn geometry_covers_every_network() {
        let builder = ReCycleGanBuilder::default();
        // predictor depth 4 needs multiples of 16, three discriminator layers need at least 24
        let geometry = builder.geometry();
        assert_eq!((geometry.multiple, geometry.min_side), (16, 24));
        assert_eq!(geometry.smallest_side(), 32);
        assert!(builder.validate_frames(32, 48).is_ok());
        assert!(matches!(
            builder.validate_frames(16, 16),
            Err(ReCycleError::InvalidClip(_))
        ));
        assert!(builder.validate_frames(32, 40).is_err());
    }
}
