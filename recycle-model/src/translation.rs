use candle_core::Tensor;

/// Inference input of one domain: the current frame and the `t` frames right before it, oldest
/// first. All frames are BCHW.
#[derive(Debug, Clone)]
pub struct DomainInput {
    pub current: Tensor,
    pub previous: Vec<Tensor>,
}

impl DomainInput {
    pub fn new(current: Tensor, previous: Vec<Tensor>) -> Self {
        Self { current, previous }
    }
}

/// Everything rendered for one translation direction X -> Y.
#[derive(Debug, Clone)]
pub struct DirectionOutput {
    /// The input frame in X.
    pub real: Tensor,
    /// `G_XY(x)`.
    pub fake_spatial: Tensor,
    /// `P_Y` applied to the translated previous frames.
    pub fake_temporal: Tensor,
    /// Average of the spatial and temporal renderings.
    pub fake: Tensor,
    /// The frame mapped back to X through the predictors.
    pub reconstructed: Tensor,
}

/// Result of `ReCycleGan::forward`. A direction is `None` when its source domain was not given.
#[derive(Debug, Clone, Default)]
pub struct Translation {
    pub a_to_b: Option<DirectionOutput>,
    pub b_to_a: Option<DirectionOutput>,
}

impl Translation {
    pub fn true_a(&self) -> Option<&Tensor> {
        self.a_to_b.as_ref().map(|out| &out.real)
    }

    pub fn fake_b_spat(&self) -> Option<&Tensor> {
        self.a_to_b.as_ref().map(|out| &out.fake_spatial)
    }

    pub fn fake_b_temp(&self) -> Option<&Tensor> {
        self.a_to_b.as_ref().map(|out| &out.fake_temporal)
    }

    pub fn fake_b(&self) -> Option<&Tensor> {
        self.a_to_b.as_ref().map(|out| &out.fake)
    }

    pub fn reco_a(&self) -> Option<&Tensor> {
        self.a_to_b.as_ref().map(|out| &out.reconstructed)
    }

    pub fn true_b(&self) -> Option<&Tensor> {
        self.b_to_a.as_ref().map(|out| &out.real)
    }

    pub fn fake_a_spat(&self) -> Option<&Tensor> {
        self.b_to_a.as_ref().map(|out| &out.fake_spatial)
    }

    pub fn fake_a_temp(&self) -> Option<&Tensor> {
        self.b_to_a.as_ref().map(|out| &out.fake_temporal)
    }

    pub fn fake_a(&self) -> Option<&Tensor> {
        self.b_to_a.as_ref().map(|out| &out.fake)
    }

    pub fn reco_b(&self) -> Option<&Tensor> {
        self.b_to_a.as_ref().map(|out| &out.reconstructed)
    }
}
