use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::Module;
use recycle_api::{
    ReCycleGanBuilder, load_checkpoint, save_checkpoint,
    test_utils::{moving_square, tiny_model_builder},
    translate_video,
};
use recycle_core::{Domain, error::ReCycleError};
use recycle_model::DomainInput;

fn max_abs_diff(lhs: &Tensor, rhs: &Tensor) -> Result<f32> {
    Ok(lhs
        .sub(rhs)?
        .abs()?
        .flatten_all()?
        .max(0)?
        .to_scalar::<f32>()?)
}

#[test]
fn translate_video_keeps_length_and_switches_channels() -> Result<()> {
    let device = Device::Cpu;
    let mut builder = tiny_model_builder();
    builder.set_channels(3, 1);
    let model = builder.build(&device)?;
    let video = moving_square(5, 3, 16, 0, &device)?;
    let translated = translate_video(&model, &video, Domain::A)?;
    assert_eq!(translated.dims(), &[5, 1, 16, 16]);
    let max = translated.abs()?.flatten_all()?.max(0)?.to_scalar::<f32>()?;
    assert!(max <= 1.);

    // no history yet, the first frames are spatial translations only
    let first = model.g_ab.forward(&video.narrow(0, 0, 1)?)?;
    assert!(max_abs_diff(&translated.narrow(0, 0, 1)?, &first)? < 1e-6);

    let back = translate_video(&model, &translated, Domain::B)?;
    assert_eq!(back.dims(), &[5, 3, 16, 16]);
    Ok(())
}

#[test]
fn translate_video_rejects_frames() -> Result<()> {
    let device = Device::Cpu;
    let model = tiny_model_builder().build(&device)?;
    let frame = moving_square(1, 3, 16, 0, &device)?.squeeze(0)?;
    assert!(translate_video(&model, &frame, Domain::A).is_err());

    // 10 is no multiple of 4
    let video = moving_square(3, 3, 10, 0, &device)?;
    let err = translate_video(&model, &video, Domain::A).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ReCycleError>(),
        Some(ReCycleError::InvalidClip(_))
    ));
    Ok(())
}

#[test]
fn checkpoint_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let device = Device::Cpu;
    let mut builder = tiny_model_builder();
    builder.set_reduction(32);
    let model = builder.build(&device)?;
    save_checkpoint(dir.path(), &builder, &model)?;

    let (restored_builder, restored) = load_checkpoint(dir.path(), &device)?;
    assert_eq!(restored_builder, builder);

    let video = moving_square(3, 3, 16, 2, &device)?;
    let frames = (0..3)
        .map(|idx| video.narrow(0, idx, 1))
        .collect::<candle_core::Result<Vec<_>>>()?;
    let input = DomainInput::new(frames[2].clone(), frames[..2].to_vec());
    let expected = model.forward(Some(&input), Some(&input))?;
    let actual = restored.forward(Some(&input), Some(&input))?;
    for (lhs, rhs) in [
        (expected.fake_b(), actual.fake_b()),
        (expected.reco_a(), actual.reco_a()),
        (expected.fake_a(), actual.fake_a()),
    ] {
        let (lhs, rhs) = (lhs.expect("rendered"), rhs.expect("rendered"));
        assert!(max_abs_diff(lhs, rhs)? < 1e-6);
    }
    Ok(())
}

#[test]
fn default_networks_check_frame_sizes() -> Result<()> {
    let device = Device::Cpu;
    let mut builder = ReCycleGanBuilder::default();
    builder.set_reduction(16);
    builder.set_clip(1, 2);
    builder.warn_on_forward = false;
    let mut model = builder.build(&device)?;
    assert_eq!(model.geometry().smallest_side(), 32);

    // three discriminator layers reduce 16x16 frames to nothing
    let small = moving_square(3, 3, 16, 0, &device)?.unsqueeze(0)?;
    let err = model.set_input(&small, &small).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ReCycleError>(),
        Some(ReCycleError::InvalidClip(msg)) if msg.contains("16x16")
    ));
    let frames = (0..3)
        .map(|idx| moving_square(1, 3, 16, idx, &device))
        .collect::<candle_core::Result<Vec<_>>>()?;
    let input = DomainInput::new(frames[2].clone(), frames[..2].to_vec());
    assert!(model.forward(Some(&input), None).is_err());

    let clip = moving_square(3, 3, 32, 0, &device)?.unsqueeze(0)?;
    model.set_input(&clip, &clip.neg()?)?;
    let losses = model.backward()?;
    assert!(losses.generator.is_finite());
    assert!(losses.discriminator.is_finite());
    Ok(())
}
