use candle_core::{Result, Tensor, backprop::GradStore};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Backpropagates `loss` and rescales the gradients of the variables in `varmap` so that their
/// global norm does not exceed `max_norm`. Gradients of variables outside `varmap` are left alone.
pub fn clip_grad(loss: &Tensor, varmap: &VarMap, max_norm: f32) -> Result<GradStore> {
    let mut grad_store = loss.backward()?;
    let mut owned_grads = vec![];
    let mut total_norm_squared = 0.0f32;
    for var in varmap.all_vars() {
        if let Some(grad) = grad_store.get_id(var.id()) {
            total_norm_squared += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
            owned_grads.push((var, grad.clone()));
        }
    }
    let total_norm = total_norm_squared.sqrt();
    if total_norm > max_norm {
        let clip_coef = (max_norm / (total_norm + 1e-6)) as f64;
        for (var, grad) in owned_grads {
            grad_store.insert(var.as_tensor(), grad.affine(clip_coef, 0.)?);
        }
    }
    Ok(grad_store)
}

/// Global l2 norm of the gradients `grads` holds for the variables of `varmap`.
pub fn grad_norm(grads: &GradStore, varmap: &VarMap) -> Result<f32> {
    let mut total = 0.0f32;
    for var in varmap.all_vars() {
        if let Some(grad) = grads.get_id(var.id()) {
            total += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
        }
    }
    Ok(total.sqrt())
}

/// Adam(W) settings of one optimizer. With `weight_decay == 0` this is plain Adam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub weight_decay: f64,
    pub max_grad_norm: Option<f32>,
}

impl OptimizerConfig {
    pub fn adam(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.,
            max_grad_norm: None,
        }
    }

    pub fn build(&self, varmap: VarMap) -> Result<OptimizerWithMaxGrad> {
        let params = ParamsAdamW {
            lr: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            eps: self.eps,
            weight_decay: self.weight_decay,
        };
        let optimizer = AdamW::new(varmap.all_vars(), params)?;
        Ok(OptimizerWithMaxGrad::new(
            optimizer,
            self.max_grad_norm,
            varmap,
        ))
    }
}

/// An optimizer owning the variables it updates. Gradients are recomputed from scratch on every
/// `backward_step`, so there is nothing to zero between steps.
pub struct OptimizerWithMaxGrad {
    pub optimizer: AdamW,
    pub max_grad_norm: Option<f32>,
    pub varmap: VarMap,
}

impl Debug for OptimizerWithMaxGrad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerWithMaxGrad")
            .field("optimizer", &self.optimizer)
            .field("max_grad_norm", &self.max_grad_norm)
            .finish()
    }
}

impl OptimizerWithMaxGrad {
    pub fn new(optimizer: AdamW, max_grad_norm: Option<f32>, varmap: VarMap) -> Self {
        Self {
            optimizer,
            max_grad_norm,
            varmap,
        }
    }

    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        let grads = if let Some(max_norm) = self.max_grad_norm {
            clip_grad(loss, &self.varmap, max_norm)?
        } else {
            loss.backward()?
        };
        self.optimizer.step(&grads)?;
        Ok(())
    }
}
