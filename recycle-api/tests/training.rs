use anyhow::Result;
use candle_core::Device;
use recycle_api::{
    InMemoryVideo,
    checkpoint::CONFIG_FILE,
    test_utils::{moving_square, tiny_model_builder, tiny_trainer_builder},
    trainer::{FINAL_CHECKPOINT, checkpoint_name},
};
use recycle_core::{Algorithm, error::ReCycleError, schedule::LearningSchedule};
use recycle_model::recycle_gan::{DISCRIMINATOR_WEIGHTS, GENERATOR_WEIGHTS};

fn videos(frames: usize) -> Result<(Box<InMemoryVideo>, Box<InMemoryVideo>)> {
    sized_videos(frames, 16)
}

fn sized_videos(frames: usize, size: usize) -> Result<(Box<InMemoryVideo>, Box<InMemoryVideo>)> {
    let device = Device::Cpu;
    let a = InMemoryVideo::new(moving_square(frames, 3, size, 0, &device)?)?;
    let b = InMemoryVideo::new(moving_square(frames, 3, size, 5, &device)?.neg()?)?;
    Ok((Box::new(a), Box::new(b)))
}

#[test]
fn iteration_bound_training() -> Result<()> {
    let (a, b) = videos(8)?;
    let mut trainer =
        tiny_trainer_builder(3).build(&tiny_model_builder(), a, b, &Device::Cpu)?;
    trainer.train()?;
    assert_eq!(trainer.iteration(), 3);
    let history = trainer.hooks.history();
    assert_eq!(history.len(), 3);
    for (idx, report) in history.iter().enumerate() {
        assert_eq!(report.iteration, idx + 1);
        assert!(report.generator_loss.is_finite());
        assert!(report.discriminator_loss.is_finite());
    }
    Ok(())
}

#[test]
fn epoch_bound_training() -> Result<()> {
    // clips of 4 frames over 5 frames leave two windows per epoch
    let (a, b) = videos(5)?;
    let mut builder = tiny_trainer_builder(0);
    builder.set_learning_schedule(LearningSchedule::epoch_bound(2));
    let mut trainer = builder.build(&tiny_model_builder(), a, b, &Device::Cpu)?;
    assert_eq!(trainer.clips.batches_per_epoch(), 2);
    trainer.train()?;
    assert_eq!(trainer.epoch(), 2);
    assert_eq!(trainer.iteration(), 4);
    Ok(())
}

#[test]
fn training_writes_checkpoints() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (a, b) = videos(8)?;
    let mut builder = tiny_trainer_builder(4);
    builder.set_checkpointing(dir.path(), 2);
    let mut trainer = builder.build(&tiny_model_builder(), a, b, &Device::Cpu)?;
    trainer.train()?;
    for name in [checkpoint_name(2), checkpoint_name(4), FINAL_CHECKPOINT.to_owned()] {
        let checkpoint = dir.path().join(name);
        for file in [CONFIG_FILE, GENERATOR_WEIGHTS, DISCRIMINATOR_WEIGHTS] {
            assert!(checkpoint.join(file).is_file(), "{file} missing in {checkpoint:?}");
        }
    }
    assert!(!dir.path().join(checkpoint_name(1)).exists());
    Ok(())
}

#[test]
fn invalid_configurations_are_rejected() -> Result<()> {
    let (a, b) = videos(8)?;
    let mut model_builder = tiny_model_builder();
    model_builder.set_clip(2, 0);
    let err = tiny_trainer_builder(1)
        .build(&model_builder, a, b, &Device::Cpu)
        .err()
        .expect("tuple size 0 is invalid");
    assert!(matches!(
        err.downcast_ref::<ReCycleError>(),
        Some(ReCycleError::InvalidConfig(_))
    ));

    // 3 frames cannot hold a clip of 4
    let (a, b) = videos(3)?;
    let err = tiny_trainer_builder(1)
        .build(&tiny_model_builder(), a, b, &Device::Cpu)
        .err()
        .expect("videos are too short");
    assert!(matches!(
        err.downcast_ref::<ReCycleError>(),
        Some(ReCycleError::EmptySource { .. })
    ));
    Ok(())
}

#[test]
fn unsupported_frame_sizes_are_rejected() -> Result<()> {
    // the tiny networks need multiples of 4 of at least 12
    let geometry = tiny_model_builder().geometry();
    assert_eq!((geometry.multiple, geometry.min_side), (4, 12));
    for size in [8, 18] {
        let (a, b) = sized_videos(8, size)?;
        let err = tiny_trainer_builder(1)
            .build(&tiny_model_builder(), a, b, &Device::Cpu)
            .err()
            .expect("frame size is unsupported");
        assert!(matches!(
            err.downcast_ref::<ReCycleError>(),
            Some(ReCycleError::InvalidClip(msg)) if msg.contains("domain A")
        ));
    }

    let (a, _) = sized_videos(8, 16)?;
    let (_, b) = sized_videos(8, 8)?;
    let err = tiny_trainer_builder(1)
        .build(&tiny_model_builder(), a, b, &Device::Cpu)
        .err()
        .expect("video b is too small");
    assert!(matches!(
        err.downcast_ref::<ReCycleError>(),
        Some(ReCycleError::InvalidClip(msg)) if msg.contains("domain B")
    ));
    Ok(())
}

#[test]
fn empty_schedules_are_rejected() -> Result<()> {
    for schedule in [
        LearningSchedule::iteration_bound(0),
        LearningSchedule::epoch_bound(0),
    ] {
        let (a, b) = videos(8)?;
        let mut builder = tiny_trainer_builder(1);
        builder.set_learning_schedule(schedule);
        let err = builder
            .build(&tiny_model_builder(), a, b, &Device::Cpu)
            .err()
            .expect("schedule never runs");
        assert!(matches!(
            err.downcast_ref::<ReCycleError>(),
            Some(ReCycleError::InvalidConfig(_))
        ));
    }
    Ok(())
}
