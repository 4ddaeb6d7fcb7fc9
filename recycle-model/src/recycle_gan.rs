use crate::translation::{DirectionOutput, DomainInput, Translation};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::Module;
use recycle_candle::{
    losses::{GanLoss, GanMode, l2},
    optimizer::OptimizerWithMaxGrad,
    replay::FrameReplayBuffer,
    tensors::{DiscriminatorLoss, FrameTuple, GeneratorLoss},
};
use recycle_core::{
    Domain, error::ReCycleError, geometry::FrameGeometry, replay::DEFAULT_REPLAY_SIZE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const GENERATOR_WEIGHTS: &str = "generator.safetensors";
pub const DISCRIMINATOR_WEIGHTS: &str = "discriminator.safetensors";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossWeights {
    /// Weight of `|G_YX(P_Y(G_XY(x_{i-t..i}))) - x_i|^2`.
    pub recycle: f64,
    /// Weight of `|P_X(x_{i-t..i}) - x_i|^2`.
    pub recurrent: f64,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self {
            recycle: 10.,
            recurrent: 10.,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReCycleOptions {
    /// Number of loss-bearing frames `T` per clip.
    pub frames: usize,
    /// Number of past frames `t` the predictors see.
    pub tuple_size: usize,
    pub buffer_size: usize,
    pub gan_mode: GanMode,
    pub weights: LossWeights,
    pub warn_on_forward: bool,
    /// Cut the history tuples out of the graph, so the recycle loss trains `P_Y` and `G_YX` but
    /// not the `G_XY` that rendered the fake tuple.
    pub detach_tuples: bool,
    /// Frame sizes the networks can process.
    pub geometry: FrameGeometry,
}

impl Default for ReCycleOptions {
    fn default() -> Self {
        Self {
            frames: 30,
            tuple_size: 2,
            buffer_size: DEFAULT_REPLAY_SIZE,
            gan_mode: GanMode::default(),
            weights: LossWeights::default(),
            warn_on_forward: true,
            detach_tuples: true,
            geometry: FrameGeometry::default(),
        }
    }
}

/// The six networks of a Re-cycle GAN.
pub struct ReCycleParts<G, P, D> {
    pub g_ab: G,
    pub g_ba: G,
    pub p_a: P,
    pub p_b: P,
    pub d_a: D,
    pub d_b: D,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReCycleLosses {
    pub generator: f32,
    pub discriminator: f32,
}

/// Two spatial translators, two temporal predictors and two discriminators trained jointly.
///
/// The generator optimizer owns the variables of `g_ab`, `g_ba`, `p_a` and `p_b`, the
/// discriminator optimizer the variables of `d_a` and `d_b`. Training clips hold
/// `T' = T + t` frames: the first `t` only serve as history for the predictors.
pub struct ReCycleGan<G: Module, P: Module, D: Module> {
    pub g_ab: G,
    pub g_ba: G,
    pub p_a: P,
    pub p_b: P,
    pub d_a: D,
    pub d_b: D,
    pub generator_optimizer: OptimizerWithMaxGrad,
    pub discriminator_optimizer: OptimizerWithMaxGrad,
    pub fake_a_buffer: FrameReplayBuffer,
    pub fake_b_buffer: FrameReplayBuffer,
    pub criterion: GanLoss,
    pub weights: LossWeights,
    pub warn_on_forward: bool,
    pub detach_tuples: bool,
    geometry: FrameGeometry,
    tuple_size: usize,
    clip_len: usize,
    device: Device,
    input: Option<(Tensor, Tensor)>,
}

fn blend(lhs: &Tensor, rhs: &Tensor) -> candle_core::Result<Tensor> {
    lhs.add(rhs)?.affine(0.5, 0.)
}

fn split_frames(clip: &Tensor) -> candle_core::Result<Vec<Tensor>> {
    let frames = clip.dim(1)?;
    (0..frames)
        .map(|idx| clip.narrow(1, idx, 1)?.squeeze(1))
        .collect()
}

impl<G: Module, P: Module, D: Module> ReCycleGan<G, P, D> {
    pub fn new(
        parts: ReCycleParts<G, P, D>,
        generator_optimizer: OptimizerWithMaxGrad,
        discriminator_optimizer: OptimizerWithMaxGrad,
        options: &ReCycleOptions,
        device: &Device,
    ) -> Result<Self> {
        if options.tuple_size == 0 || options.frames == 0 {
            return Err(ReCycleError::InvalidConfig(
                "frames per clip and tuple size have to be positive".to_owned(),
            )
            .into());
        }
        let ReCycleParts {
            g_ab,
            g_ba,
            p_a,
            p_b,
            d_a,
            d_b,
        } = parts;
        Ok(Self {
            g_ab,
            g_ba,
            p_a,
            p_b,
            d_a,
            d_b,
            generator_optimizer,
            discriminator_optimizer,
            fake_a_buffer: FrameReplayBuffer::new(options.buffer_size)?,
            fake_b_buffer: FrameReplayBuffer::new(options.buffer_size)?,
            criterion: GanLoss::new(options.gan_mode),
            weights: options.weights,
            warn_on_forward: options.warn_on_forward,
            detach_tuples: options.detach_tuples,
            geometry: options.geometry,
            tuple_size: options.tuple_size,
            clip_len: options.frames + options.tuple_size,
            device: device.clone(),
            input: None,
        })
    }

    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    /// Frames per training clip, `T + t`.
    pub fn clip_len(&self) -> usize {
        self.clip_len
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// Channel-stacks consecutive frames into a predictor input, detached when `detach_tuples`
    /// is set.
    pub fn frame_tuple(&self, frames: &[Tensor]) -> Result<FrameTuple> {
        let tuple = FrameTuple::from_frames(frames)?;
        if self.detach_tuples {
            Ok(FrameTuple(tuple.detach()))
        } else {
            Ok(tuple)
        }
    }

    fn check_frame(&self, frame: &Tensor, domain: Domain) -> Result<()> {
        match frame.dims() {
            &[_, _, height, width] => Ok(self.geometry.check(height, width)?),
            dims => Err(ReCycleError::InvalidClip(format!(
                "frame of domain {domain} has shape {dims:?}, expected (B, C, H, W)"
            ))
            .into()),
        }
    }

    /// Stores the training clips of both domains. Both have to be `(B, T + t, C, H, W)`.
    pub fn set_input(&mut self, true_a_seq: &Tensor, true_b_seq: &Tensor) -> Result<()> {
        let true_a_seq = self.prepare_clip(true_a_seq, Domain::A)?;
        let true_b_seq = self.prepare_clip(true_b_seq, Domain::B)?;
        self.input = Some((true_a_seq, true_b_seq));
        Ok(())
    }

    fn prepare_clip(&self, clip: &Tensor, domain: Domain) -> Result<Tensor> {
        if clip.rank() != 5 {
            return Err(ReCycleError::InvalidClip(format!(
                "clip of domain {domain} has shape {:?}, expected (B, T', C, H, W)",
                clip.dims()
            ))
            .into());
        }
        let frames = clip.dim(1)?;
        self.geometry.check(clip.dim(3)?, clip.dim(4)?)?;
        if frames != self.clip_len {
            return Err(ReCycleError::InvalidClip(format!(
                "clip of domain {domain} has {frames} frames, expected {}",
                self.clip_len
            ))
            .into());
        }
        Ok(clip.to_dtype(DType::F32)?.to_device(&self.device)?)
    }

    /// Inference pass. Renders A -> B for `a` and B -> A for `b`, whichever are given. Outputs are
    /// detached from the graph, call `backward` to train.
    pub fn forward(&self, a: Option<&DomainInput>, b: Option<&DomainInput>) -> Result<Translation> {
        if self.warn_on_forward {
            eprintln!("forward is meant for inference, call backward to update the model");
        }
        if a.is_none() && b.is_none() {
            return Err(ReCycleError::NoInput.into());
        }
        let a_to_b = a
            .map(|input| {
                self.translate(input, Domain::A, &self.g_ab, &self.g_ba, &self.p_a, &self.p_b)
            })
            .transpose()?;
        let b_to_a = b
            .map(|input| {
                self.translate(input, Domain::B, &self.g_ba, &self.g_ab, &self.p_b, &self.p_a)
            })
            .transpose()?;
        Ok(Translation { a_to_b, b_to_a })
    }

    fn translate(
        &self,
        input: &DomainInput,
        domain: Domain,
        g_xy: &G,
        g_yx: &G,
        p_x: &P,
        p_y: &P,
    ) -> Result<DirectionOutput> {
        if input.previous.len() != self.tuple_size {
            return Err(ReCycleError::IncompleteInput {
                domain,
                expected: self.tuple_size,
                got: input.previous.len(),
            }
            .into());
        }
        self.check_frame(&input.current, domain)?;
        for frame in input.previous.iter() {
            self.check_frame(frame, domain)?;
        }
        let real = input.current.to_device(&self.device)?;
        let previous = input
            .previous
            .iter()
            .map(|frame| frame.to_device(&self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let fake_previous = previous
            .iter()
            .map(|frame| g_xy.forward(frame))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let fake_tuple = FrameTuple::from_frames(&fake_previous)?;
        let real_tuple = FrameTuple::from_frames(&previous)?;

        let fake_spatial = g_xy.forward(&real)?;
        let fake_temporal = p_y.forward(&fake_tuple)?;
        let fake = blend(&fake_spatial, &fake_temporal)?;
        let reconstructed = blend(&g_yx.forward(&fake_temporal)?, &p_x.forward(&real_tuple)?)?;
        Ok(DirectionOutput {
            real,
            fake_spatial: fake_spatial.detach(),
            fake_temporal: fake_temporal.detach(),
            fake: fake.detach(),
            reconstructed: reconstructed.detach(),
        })
    }

    /// Generator side loss of the direction X -> Y at one time step: adversarial loss of the
    /// translated frame, recycle loss through `P_Y` and back, and recurrent loss of `P_X`.
    #[allow(clippy::too_many_arguments)]
    pub fn generator_loss(
        &self,
        true_x_tuple: &FrameTuple,
        fake_y_tuple: &FrameTuple,
        true_x_next: &Tensor,
        fake_y_next: &Tensor,
        p_x: &P,
        p_y: &P,
        g_yx: &G,
        d_y: &D,
    ) -> Result<GeneratorLoss> {
        let fake_x_next = p_x.forward(true_x_tuple)?;
        let reco_x_next = g_yx.forward(&p_y.forward(fake_y_tuple)?)?;
        let fake_pred = d_y.forward(fake_y_next)?;
        let adversarial = self.criterion.loss(&fake_pred, true)?;
        let recycle = l2(&reco_x_next, true_x_next)?.affine(self.weights.recycle, 0.)?;
        let recurrent = l2(&fake_x_next, true_x_next)?.affine(self.weights.recurrent, 0.)?;
        Ok(GeneratorLoss(adversarial.add(&recycle)?.add(&recurrent)?))
    }

    /// Discriminator loss for one domain. `fake_frame` is detached, so no gradient reaches the
    /// translators.
    pub fn discriminator_loss(
        &self,
        fake_frame: &Tensor,
        true_frame: &Tensor,
        d: &D,
    ) -> Result<DiscriminatorLoss> {
        let fake_pred = d.forward(&fake_frame.detach())?;
        let true_pred = d.forward(true_frame)?;
        let loss = self
            .criterion
            .loss(&true_pred, true)?
            .add(&self.criterion.loss(&fake_pred, false)?)?;
        Ok(DiscriminatorLoss(loss))
    }

    /// One joint update over the clips given to `set_input`. Losses of all time steps
    /// `t..T + t` are summed, then the generator side and the discriminator side take one
    /// optimizer step each.
    pub fn backward(&mut self) -> Result<ReCycleLosses> {
        let (true_a_seq, true_b_seq) = self.input.clone().ok_or(ReCycleError::NoInput)?;
        let true_a = split_frames(&true_a_seq)?;
        let true_b = split_frames(&true_b_seq)?;
        let fake_b = true_a
            .iter()
            .map(|frame| self.g_ab.forward(frame))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let fake_a = true_b
            .iter()
            .map(|frame| self.g_ba.forward(frame))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let mut generator_loss = GeneratorLoss(Tensor::zeros((), DType::F32, &self.device)?);
        let mut discriminator_loss =
            DiscriminatorLoss(Tensor::zeros((), DType::F32, &self.device)?);
        for i in self.tuple_size..self.clip_len {
            let window = i - self.tuple_size..i;
            let true_a_tuple = self.frame_tuple(&true_a[window.clone()])?;
            let fake_b_tuple = self.frame_tuple(&fake_b[window.clone()])?;
            let true_b_tuple = self.frame_tuple(&true_b[window.clone()])?;
            let fake_a_tuple = self.frame_tuple(&fake_a[window])?;

            let a_to_b = self.generator_loss(
                &true_a_tuple,
                &fake_b_tuple,
                &true_a[i],
                &fake_b[i],
                &self.p_a,
                &self.p_b,
                &self.g_ba,
                &self.d_b,
            )?;
            let b_to_a = self.generator_loss(
                &true_b_tuple,
                &fake_a_tuple,
                &true_b[i],
                &fake_a[i],
                &self.p_b,
                &self.p_a,
                &self.g_ab,
                &self.d_a,
            )?;
            generator_loss = GeneratorLoss(generator_loss.add(&a_to_b)?.add(&b_to_a)?);

            let replayed_fake_b = self.fake_b_buffer.push_and_pop(&fake_b[i])?;
            let replayed_fake_a = self.fake_a_buffer.push_and_pop(&fake_a[i])?;
            let d_b = self.discriminator_loss(&replayed_fake_b, &true_b[i], &self.d_b)?;
            let d_a = self.discriminator_loss(&replayed_fake_a, &true_a[i], &self.d_a)?;
            discriminator_loss = DiscriminatorLoss(discriminator_loss.add(&d_b)?.add(&d_a)?);
        }

        self.generator_optimizer.backward_step(&generator_loss)?;
        self.discriminator_optimizer
            .backward_step(&discriminator_loss)?;
        Ok(ReCycleLosses {
            generator: generator_loss.to_scalar::<f32>()?,
            discriminator: discriminator_loss.to_scalar::<f32>()?,
        })
    }

    /// Writes generator side and discriminator side variables into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        self.generator_optimizer
            .varmap
            .save(dir.join(GENERATOR_WEIGHTS))?;
        self.discriminator_optimizer
            .varmap
            .save(dir.join(DISCRIMINATOR_WEIGHTS))?;
        Ok(())
    }

    /// Overwrites the variables with the ones saved in `dir`.
    pub fn load(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        self.generator_optimizer
            .varmap
            .load(dir.join(GENERATOR_WEIGHTS))?;
        self.discriminator_optimizer
            .varmap
            .load(dir.join(DISCRIMINATOR_WEIGHTS))?;
        Ok(())
    }
}
