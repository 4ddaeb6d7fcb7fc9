use crate::builders::{recycle_gan::ReCycleGanBuilder, trainer::TrainerBuilder};
use candle_core::{Device, Result, Tensor};
use recycle_candle::networks::{DiscriminatorConfig, SpatialTranslatorConfig, TemporalPredictorConfig};
use recycle_core::{clips::ClipSampling, schedule::LearningSchedule};

/// `(frames, channels, size, size)` video of a bright square on a dark background, moving one
/// pixel to the right per frame (wrapping around) starting at column `offset`.
pub fn moving_square(
    frames: usize,
    channels: usize,
    size: usize,
    offset: usize,
    device: &Device,
) -> Result<Tensor> {
    let side = (size / 4).max(1);
    let top = (size - side) / 2;
    let mut data = vec![-1f32; frames * channels * size * size];
    for frame in 0..frames {
        let left = (offset + frame) % size;
        for channel in 0..channels {
            for row in top..top + side {
                for col in 0..side {
                    let col = (left + col) % size;
                    data[((frame * channels + channel) * size + row) * size + col] = 1.;
                }
            }
        }
    }
    Tensor::from_vec(data, (frames, channels, size, size), device)
}

/// Small networks for 16x16 frames, fast enough for cpu tests.
pub fn tiny_model_builder() -> ReCycleGanBuilder {
    ReCycleGanBuilder {
        frames: 2,
        tuple_size: 2,
        reduction: 16,
        translator: SpatialTranslatorConfig {
            base_channels: 64,
            residual_blocks: 1,
        },
        predictor: TemporalPredictorConfig {
            base_channels: 64,
            depth: 2,
        },
        discriminator: DiscriminatorConfig {
            base_channels: 64,
            layers: 2,
        },
        buffer_size: 4,
        warn_on_forward: false,
        ..Default::default()
    }
}

pub fn tiny_trainer_builder(iterations: usize) -> TrainerBuilder {
    TrainerBuilder {
        learning_schedule: LearningSchedule::iteration_bound(iterations),
        batch_size: 1,
        stride: 1,
        sampling: ClipSampling::Sequential,
        seed: Some(7),
        log_every: 0,
        ..Default::default()
    }
}
