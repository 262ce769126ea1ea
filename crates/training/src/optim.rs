//! Parameter updates behind a small trait so epoch loops can be tested with fakes.

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{GradientsParams, Optimizer, Sgd, SgdConfig};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

pub trait ParameterStep<B: AutodiffBackend, M: AutodiffModule<B>> {
    fn zero_grad(&mut self);

    /// Backpropagate `loss` and return the updated model.
    fn step(&mut self, model: M, loss: Tensor<B, 1>) -> M;
}

/// Any Burn [`Optimizer`] at a fixed learning rate.
#[derive(Clone)]
pub struct OptimizerStep<O> {
    optim: O,
    lr: f64,
}

impl<O> OptimizerStep<O> {
    pub fn new(optim: O, lr: f64) -> Self {
        Self { optim, lr }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }
}

impl<B, M, O> ParameterStep<B, M> for OptimizerStep<O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    // Burn builds a fresh gradient set on every backward pass.
    fn zero_grad(&mut self) {}

    fn step(&mut self, model: M, loss: Tensor<B, 1>) -> M {
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        self.optim.step(self.lr, model, grads)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SgdSettings {
    pub lr: f64,
    pub momentum: f64,
    pub weight_decay: f64,
}

impl Default for SgdSettings {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            momentum: 0.9,
            weight_decay: 1e-4,
        }
    }
}

pub type SgdStep<B, M> =
    OptimizerStep<OptimizerAdaptor<Sgd<<B as AutodiffBackend>::InnerBackend>, M, B>>;

/// SGD with optional momentum and L2 weight decay.
pub fn sgd<B: AutodiffBackend, M: AutodiffModule<B>>(settings: &SgdSettings) -> SgdStep<B, M> {
    let mut config = SgdConfig::new();
    if settings.momentum > 0.0 {
        config = config.with_momentum(Some(
            MomentumConfig::new()
                .with_momentum(settings.momentum)
                .with_dampening(0.0),
        ));
    }
    if settings.weight_decay > 0.0 {
        config = config.with_weight_decay(Some(WeightDecayConfig::new(
            settings.weight_decay as f32,
        )));
    }
    OptimizerStep::new(config.init::<B, M>(), settings.lr)
}
