use crate::builders::recycle_gan::ReCycleGanBuilder;
use anyhow::Result;
use candle_core::Device;
use recycle_model::DefaultReCycleGan;
use std::{fs::File, io::BufReader, path::Path};

pub const CONFIG_FILE: &str = "config.json";

/// Writes the model configuration and both weight files into `dir`.
pub fn save_checkpoint(
    dir: impl AsRef<Path>,
    builder: &ReCycleGanBuilder,
    model: &DefaultReCycleGan,
) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let file = File::create(dir.join(CONFIG_FILE))?;
    serde_json::to_writer_pretty(file, builder)?;
    model.save(dir)
}

/// Rebuilds the model saved by `save_checkpoint` on `device`.
pub fn load_checkpoint(
    dir: impl AsRef<Path>,
    device: &Device,
) -> Result<(ReCycleGanBuilder, DefaultReCycleGan)> {
    let dir = dir.as_ref();
    let file = File::open(dir.join(CONFIG_FILE))?;
    let builder: ReCycleGanBuilder = serde_json::from_reader(BufReader::new(file))?;
    let mut model = builder.build(device)?;
    model.load(dir)?;
    Ok((builder, model))
}
