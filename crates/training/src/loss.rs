use burn::nn::loss::{MseLoss, Reduction};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Scalar training loss over `[n, 5]` predictions and targets.
pub trait GraspLoss {
    fn loss<B: Backend>(&self, output: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1>;
}

/// Mean squared error over all grasp parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseGraspLoss;

impl GraspLoss for MseGraspLoss {
    fn loss<B: Backend>(&self, output: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
        MseLoss::new().forward(output, target, Reduction::Mean)
    }
}
