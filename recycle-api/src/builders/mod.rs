pub mod recycle_gan;
pub mod trainer;
