pub mod recycle_gan;
pub mod translation;

use recycle_candle::networks::{Discriminator, SpatialTranslator, TemporalPredictor};

pub use recycle_gan::{LossWeights, ReCycleGan, ReCycleLosses, ReCycleOptions, ReCycleParts};
pub use translation::{DirectionOutput, DomainInput, Translation};

/// Re-cycle GAN with the stock ResNet translators, U-Net predictors and PatchGAN discriminators.
pub type DefaultReCycleGan = ReCycleGan<SpatialTranslator, TemporalPredictor, Discriminator>;
