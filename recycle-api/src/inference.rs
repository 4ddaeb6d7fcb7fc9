use anyhow::Result;
use candle_core::{DType, Tensor};
use candle_nn::Module;
use recycle_core::{Domain, error::ReCycleError};
use recycle_model::{DomainInput, ReCycleGan};

/// Translates a whole `(N, C, H, W)` video from `source` into the opposite domain, one frame at a
/// time. Frame `i >= t` is the blended spatial and temporal rendering of frames `i - t..=i`, the
/// first `t` frames have no history and only go through the spatial translator.
pub fn translate_video<G: Module, P: Module, D: Module>(
    model: &ReCycleGan<G, P, D>,
    video: &Tensor,
    source: Domain,
) -> Result<Tensor> {
    if video.rank() != 4 || video.dims()[0] == 0 {
        return Err(ReCycleError::InvalidClip(format!(
            "video has shape {:?}, expected (N, C, H, W) with N > 0",
            video.dims()
        ))
        .into());
    }
    model.geometry().check(video.dim(2)?, video.dim(3)?)?;
    let video = video.to_dtype(DType::F32)?.to_device(model.device())?;
    let frames = (0..video.dim(0)?)
        .map(|idx| video.narrow(0, idx, 1))
        .collect::<candle_core::Result<Vec<_>>>()?;
    let t = model.tuple_size();
    let spatial = match source {
        Domain::A => &model.g_ab,
        Domain::B => &model.g_ba,
    };
    let mut translated = Vec::with_capacity(frames.len());
    for (idx, frame) in frames.iter().enumerate() {
        if idx < t {
            translated.push(spatial.forward(frame)?.detach());
            continue;
        }
        let input = DomainInput::new(frame.clone(), frames[idx - t..idx].to_vec());
        let translation = match source {
            Domain::A => model.forward(Some(&input), None)?.a_to_b,
            Domain::B => model.forward(None, Some(&input))?.b_to_a,
        };
        let output = translation.ok_or(ReCycleError::NoInput)?;
        translated.push(output.fake);
    }
    Ok(Tensor::cat(&translated, 0)?)
}
