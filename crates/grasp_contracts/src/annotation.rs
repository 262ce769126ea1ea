use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::GraspBox;

/// One row of the grasp annotation CSV: a single grasp rectangle on an image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraspAnnotation {
    /// Image path, relative to the dataset directory.
    pub image: String,
    /// Object identifier; used when folds are split by object.
    pub object: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Rotation in radians.
    pub angle: f32,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing image path")]
    MissingImage,
    #[error("non-finite grasp parameters: {0:?}")]
    NonFinite([f32; 5]),
    #[error("grasp extents must be positive, got width={width} height={height}")]
    NonPositiveExtent { width: f32, height: f32 },
}

impl GraspAnnotation {
    pub fn grasp(&self) -> GraspBox {
        GraspBox::new(self.x, self.y, self.width, self.height, self.angle)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.image.trim().is_empty() {
            return Err(ValidationError::MissingImage);
        }
        let grasp = self.grasp();
        if !grasp.is_finite() {
            return Err(ValidationError::NonFinite(grasp.to_array()));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ValidationError::NonPositiveExtent {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}
