//! Burn models that regress one grasp rectangle per image.
//!
//! These are plain Burn modules; training and checkpoint handling live in the
//! `training` crate. Train vs inference mode follows Burn: the autodiff module
//! keeps dropout active, `AutodiffModule::valid()` turns it off.

use burn::module::Module;
use burn::nn;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use grasp_contracts::GRASP_PARAMS;
use serde::{Deserialize, Serialize};

/// A model mapping `[n, 3, H, W]` images to `[n, 5]` grasp parameters.
pub trait GraspRegressor<B: Backend> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraspNetConfig {
    /// Output channels of the three strided conv stages.
    pub channels: [usize; 3],
    pub hidden: usize,
    pub dropout: f64,
}

impl Default for GraspNetConfig {
    fn default() -> Self {
        Self {
            channels: [32, 64, 128],
            hidden: 256,
            dropout: 0.5,
        }
    }
}

#[derive(Debug, Module)]
pub struct Backbone<B: Backend> {
    stages: Vec<Conv2d<B>>,
    pool: AdaptiveAvgPool2d,
}

impl<B: Backend> Backbone<B> {
    fn new(channels: [usize; 3], device: &B::Device) -> Self {
        let mut stages = Vec::with_capacity(channels.len());
        let mut in_ch = 3;
        for out_ch in channels {
            stages.push(
                Conv2dConfig::new([in_ch, out_ch], [3, 3])
                    .with_stride([2, 2])
                    .with_padding(nn::PaddingConfig2d::Explicit(1, 1))
                    .init(device),
            );
            in_ch = out_ch;
        }
        let pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        Self { stages, pool }
    }

    /// `[n, 3, H, W]` -> `[n, C]` pooled features.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for conv in &self.stages {
            x = relu(conv.forward(x));
        }
        self.pool.forward(x).flatten(1, 3)
    }
}

/// Conv backbone followed by a two-layer regression head.
#[derive(Debug, Module)]
pub struct GraspNet<B: Backend> {
    backbone: Backbone<B>,
    fc1: nn::Linear<B>,
    dropout: nn::Dropout,
    fc2: nn::Linear<B>,
}

impl<B: Backend> GraspNet<B> {
    pub fn new(cfg: &GraspNetConfig, device: &B::Device) -> Self {
        let backbone = Backbone::new(cfg.channels, device);
        let features = cfg.channels[2];
        Self {
            backbone,
            fc1: nn::LinearConfig::new(features, cfg.hidden).init(device),
            dropout: nn::DropoutConfig::new(cfg.dropout).init(),
            fc2: nn::LinearConfig::new(cfg.hidden, GRASP_PARAMS).init(device),
        }
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.backbone.forward(images);
        let x = relu(self.fc1.forward(x));
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Stop gradients through the backbone; only the head keeps training.
    pub fn freeze_backbone(self) -> Self {
        Self {
            backbone: self.backbone.no_grad(),
            ..self
        }
    }
}

impl<B: Backend> GraspRegressor<B> for GraspNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        GraspNet::forward(self, images)
    }
}

pub mod prelude {
    pub use super::{Backbone, GraspNet, GraspNetConfig, GraspRegressor};
}
