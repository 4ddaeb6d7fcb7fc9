// builders + data loading + training loop + higher level helpers
pub mod builders;
pub mod checkpoint;
pub mod data;
pub mod inference;
pub mod trainer;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use builders::{recycle_gan::ReCycleGanBuilder, trainer::TrainerBuilder};
pub use checkpoint::{load_checkpoint, save_checkpoint};
pub use data::{InMemoryVideo, UnpairedClips, VideoSource};
pub use inference::translate_video;
pub use trainer::ReCycleTrainer;
