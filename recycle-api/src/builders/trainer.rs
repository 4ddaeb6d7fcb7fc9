use crate::{
    builders::recycle_gan::ReCycleGanBuilder,
    data::{UnpairedClips, VideoSource},
    trainer::{Checkpointing, ReCycleTrainer},
};
use anyhow::Result;
use candle_core::Device;
use recycle_core::{
    Domain,
    clips::ClipSampling, error::ReCycleError, hooks::DefaultTrainingHooks,
    schedule::LearningSchedule, rng::set_seed,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerBuilder {
    pub learning_schedule: LearningSchedule,
    pub batch_size: usize,
    /// Frames between the start offsets of two clip windows.
    pub stride: usize,
    pub sampling: ClipSampling,
    pub checkpoint_dir: Option<PathBuf>,
    pub checkpoint_every: usize,
    pub seed: Option<u64>,
    /// Print every n-th iteration, 0 keeps the default hooks quiet.
    pub log_every: usize,
}

impl Default for TrainerBuilder {
    fn default() -> Self {
        Self {
            learning_schedule: LearningSchedule::default(),
            batch_size: 1,
            stride: 1,
            sampling: ClipSampling::default(),
            checkpoint_dir: None,
            checkpoint_every: 1_000,
            seed: None,
            log_every: 10,
        }
    }
}

impl TrainerBuilder {
    pub fn set_learning_schedule(&mut self, learning_schedule: LearningSchedule) {
        self.learning_schedule = learning_schedule;
    }

    pub fn set_checkpointing(&mut self, dir: impl Into<PathBuf>, every: usize) {
        self.checkpoint_dir = Some(dir.into());
        self.checkpoint_every = every;
    }

    /// Seeds the rng driving replay swaps and clip order. Weight init is only seeded on gpu devices.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    /// Builds the model from `model_builder` and a trainer drawing clips from the two videos.
    pub fn build(
        &self,
        model_builder: &ReCycleGanBuilder,
        a: Box<dyn VideoSource>,
        b: Box<dyn VideoSource>,
        device: &Device,
    ) -> Result<ReCycleTrainer<DefaultTrainingHooks>> {
        if self.stride == 0 {
            return Err(ReCycleError::InvalidConfig("stride has to be positive".to_owned()).into());
        }
        if self.learning_schedule.total() == 0 {
            return Err(ReCycleError::InvalidConfig(
                "learning schedule has to run for at least one iteration or epoch".to_owned(),
            )
            .into());
        }
        model_builder.validate()?;
        for (domain, video) in [(Domain::A, &a), (Domain::B, &b)] {
            if video.frames() == 0 {
                continue;
            }
            let (height, width) = video.frame_size()?;
            model_builder
                .validate_frames(height, width)
                .map_err(|err| match err {
                    ReCycleError::InvalidClip(msg) => {
                        ReCycleError::InvalidClip(format!("video of domain {domain}: {msg}"))
                    }
                    err => err,
                })?;
        }
        if let Some(seed) = self.seed {
            set_seed(seed);
            // candle's cpu backend draws weight init from its own unseedable rng
            if !device.is_cpu() {
                device.set_seed(seed)?;
            }
        }
        let model = model_builder.build(device)?;
        let clips = UnpairedClips::new(
            a,
            b,
            model_builder.clip_len(),
            self.batch_size,
            self.stride,
            self.sampling,
        )?;
        let hooks = DefaultTrainingHooks::new(self.learning_schedule, self.log_every);
        let checkpointing = self.checkpoint_dir.as_ref().map(|dir| Checkpointing {
            dir: dir.clone(),
            every: self.checkpoint_every,
        });
        Ok(ReCycleTrainer::new(
            model,
            clips,
            hooks,
            model_builder.clone(),
            checkpointing,
        ))
    }
}
