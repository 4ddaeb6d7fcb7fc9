use crate::{builders::recycle_gan::ReCycleGanBuilder, checkpoint::save_checkpoint, data::UnpairedClips};
use anyhow::Result;
use recycle_core::{
    Algorithm,
    hooks::{DefaultTrainingHooks, StepReport, TrainingHooks},
};
use recycle_model::DefaultReCycleGan;
use std::{path::PathBuf, time::Instant};

/// Name of the checkpoint written when training ends.
pub const FINAL_CHECKPOINT: &str = "final";

pub fn checkpoint_name(iteration: usize) -> String {
    format!("iteration_{iteration:06}")
}

/// Where and how often the trainer checkpoints. `every == 0` only writes the final checkpoint.
#[derive(Debug, Clone)]
pub struct Checkpointing {
    pub dir: PathBuf,
    pub every: usize,
}

pub struct ReCycleTrainer<H: TrainingHooks = DefaultTrainingHooks> {
    pub model: DefaultReCycleGan,
    pub clips: UnpairedClips,
    pub hooks: H,
    /// Configuration the model was built from, written next to every checkpoint.
    pub config: ReCycleGanBuilder,
    pub checkpointing: Option<Checkpointing>,
    iteration: usize,
    epoch: usize,
}

impl<H: TrainingHooks> ReCycleTrainer<H> {
    pub fn new(
        model: DefaultReCycleGan,
        clips: UnpairedClips,
        hooks: H,
        config: ReCycleGanBuilder,
        checkpointing: Option<Checkpointing>,
    ) -> Self {
        Self {
            model,
            clips,
            hooks,
            config,
            checkpointing,
            iteration: 0,
            epoch: 0,
        }
    }

    /// Joint updates done so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Finished passes over the clip windows.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    fn checkpoint(&self, name: &str) -> Result<()> {
        if let Some(checkpointing) = &self.checkpointing {
            save_checkpoint(checkpointing.dir.join(name), &self.config, &self.model)?;
        }
        Ok(())
    }

    fn periodic_checkpoint(&self) -> Result<()> {
        match &self.checkpointing {
            Some(Checkpointing { every, .. }) if *every > 0 && self.iteration % every == 0 => {
                self.checkpoint(&checkpoint_name(self.iteration))
            }
            _ => Ok(()),
        }
    }
}

impl<H: TrainingHooks> Algorithm for ReCycleTrainer<H> {
    fn train(&mut self) -> Result<()> {
        if self.hooks.init_hook() {
            return Ok(());
        }
        let start = Instant::now();
        'training: loop {
            while let Some((true_a_seq, true_b_seq)) = self.clips.next_batch()? {
                self.model.set_input(&true_a_seq, &true_b_seq)?;
                let losses = self.model.backward()?;
                self.iteration += 1;
                self.periodic_checkpoint()?;
                let report = StepReport {
                    iteration: self.iteration,
                    epoch: self.epoch,
                    generator_loss: losses.generator,
                    discriminator_loss: losses.discriminator,
                    elapsed: start.elapsed(),
                };
                if self.hooks.post_step_hook(&report) {
                    break 'training;
                }
            }
            self.clips.reset();
            let stop = self.hooks.post_epoch_hook(self.epoch);
            self.epoch += 1;
            if stop {
                break;
            }
        }
        self.checkpoint(FINAL_CHECKPOINT)?;
        self.hooks.shutdown_hook()
    }
}
