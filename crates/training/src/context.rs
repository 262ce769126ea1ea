//! Device placement and cooperative cancellation.

use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The device every tensor of a run lives on.
#[derive(Debug, Clone)]
pub struct ExecutionContext<B: Backend> {
    device: B::Device,
}

impl<B: Backend> ExecutionContext<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn place<const D: usize>(&self, tensor: Tensor<B, D>) -> Tensor<B, D> {
        tensor.to_device(&self.device)
    }
}

impl<B: AutodiffBackend> ExecutionContext<B> {
    /// Same device, inference backend.
    pub fn inner(&self) -> ExecutionContext<B::InnerBackend> {
        ExecutionContext::new(self.device.clone())
    }
}

impl<B: Backend> Default for ExecutionContext<B> {
    fn default() -> Self {
        Self::new(B::Device::default())
    }
}

/// Shared flag polled once per batch; setting it aborts the running epoch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
