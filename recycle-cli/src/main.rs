use anyhow::Result;
use candle_core::Device;
use clap::{Parser, Subcommand, ValueEnum};
use recycle_api::{
    InMemoryVideo, ReCycleGanBuilder, TrainerBuilder, data::VIDEO_KEY, data::save_video,
    load_checkpoint, translate_video,
};
use recycle_core::{Algorithm, Domain, schedule::LearningSchedule};
use std::{fs::File, io::BufReader, path::PathBuf};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum DeviceType {
    Cpu,
    Cuda,
}

impl DeviceType {
    fn device(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda => Ok(Device::new_cuda(0)?),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Direction {
    AToB,
    BToA,
}

impl From<Direction> for Domain {
    fn from(value: Direction) -> Self {
        match value {
            Direction::AToB => Domain::A,
            Direction::BToA => Domain::B,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "recycle", about = "Unpaired video-to-video translation with Re-cycle GAN")]
struct Args {
    #[arg(long, value_enum, default_value = "cpu")]
    device: DeviceType,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train on two unpaired videos stored as (N, C, H, W) tensors in safetensors files.
    Train {
        #[arg(long)]
        domain_a: PathBuf,

        #[arg(long)]
        domain_b: PathBuf,

        /// Tensor name inside both video files.
        #[arg(long, default_value = VIDEO_KEY)]
        key: String,

        /// Model configuration as written into checkpoints. Flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Loss-bearing frames per clip.
        #[arg(long)]
        frames: Option<usize>,

        #[arg(long)]
        tuple_size: Option<usize>,

        /// Channel reduction ratio of all networks.
        #[arg(long)]
        reduction: Option<usize>,

        #[arg(long, default_value_t = 1)]
        batch_size: usize,

        #[arg(long, conflicts_with = "epochs")]
        iterations: Option<usize>,

        #[arg(long)]
        epochs: Option<usize>,

        #[arg(long, default_value = "checkpoints")]
        checkpoint_dir: PathBuf,

        #[arg(long, default_value_t = 1_000)]
        checkpoint_every: usize,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value_t = 10)]
        log_every: usize,
    },
    /// Translate a video with a trained checkpoint.
    Translate {
        #[arg(long)]
        checkpoint: PathBuf,

        #[arg(long)]
        input: PathBuf,

        #[arg(long, value_enum, default_value = "a-to-b")]
        direction: Direction,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value = VIDEO_KEY)]
        key: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let device = args.device.device()?;
    match args.command {
        Command::Train {
            domain_a,
            domain_b,
            key,
            config,
            frames,
            tuple_size,
            reduction,
            batch_size,
            iterations,
            epochs,
            checkpoint_dir,
            checkpoint_every,
            seed,
            log_every,
        } => {
            let mut model_builder: ReCycleGanBuilder = match config {
                Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
                None => ReCycleGanBuilder::default(),
            };
            model_builder.set_clip(
                frames.unwrap_or(model_builder.frames),
                tuple_size.unwrap_or(model_builder.tuple_size),
            );
            if let Some(reduction) = reduction {
                model_builder.set_reduction(reduction);
            }
            let a = InMemoryVideo::from_safetensors(&domain_a, &key, &device)?;
            let b = InMemoryVideo::from_safetensors(&domain_b, &key, &device)?;
            model_builder.set_channels(a.channels(), b.channels());

            let mut trainer_builder = TrainerBuilder {
                batch_size,
                log_every,
                ..Default::default()
            };
            match (iterations, epochs) {
                (_, Some(epochs)) => {
                    trainer_builder.set_learning_schedule(LearningSchedule::epoch_bound(epochs))
                }
                (Some(iterations), None) => trainer_builder
                    .set_learning_schedule(LearningSchedule::iteration_bound(iterations)),
                (None, None) => {}
            }
            trainer_builder.set_checkpointing(&checkpoint_dir, checkpoint_every);
            if let Some(seed) = seed {
                trainer_builder.set_seed(seed);
            }
            let mut trainer =
                trainer_builder.build(&model_builder, Box::new(a), Box::new(b), &device)?;
            trainer.train()?;
            println!("checkpoints written to {}", checkpoint_dir.display());
            Ok(())
        }
        Command::Translate {
            checkpoint,
            input,
            direction,
            output,
            key,
        } => {
            let (_, mut model) = load_checkpoint(&checkpoint, &device)?;
            model.warn_on_forward = false;
            let video = InMemoryVideo::from_safetensors(&input, &key, &device)?;
            let translated = translate_video(&model, video.tensor(), direction.into())?;
            save_video(&translated, &output, &key)?;
            println!(
                "translated {} frames into {}",
                translated.dim(0)?,
                output.display()
            );
            Ok(())
        }
    }
}
