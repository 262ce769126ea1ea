use serde::{Deserialize, Serialize};

/// Number of scalars in the grasp parameterisation `(cx, cy, width, height, angle)`.
pub const GRASP_PARAMS: usize = 5;

/// Oriented grasp rectangle.
///
/// `(cx, cy)` is the rectangle centre, `width`/`height` its side lengths and
/// `angle` the rotation in radians. Predicted boxes are taken as-is, so a
/// regressor may produce negative extents; annotated targets are checked by
/// [`crate::GraspAnnotation::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GraspBox {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl GraspBox {
    pub const fn new(cx: f32, cy: f32, width: f32, height: f32, angle: f32) -> Self {
        Self {
            cx,
            cy,
            width,
            height,
            angle,
        }
    }

    pub fn from_array(v: [f32; GRASP_PARAMS]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4])
    }

    pub fn to_array(self) -> [f32; GRASP_PARAMS] {
        [self.cx, self.cy, self.width, self.height, self.angle]
    }

    /// Parse a flat `[n * 5]` buffer (row-major `[n, 5]` tensor data).
    ///
    /// Returns `None` when the buffer length is not a multiple of five.
    pub fn from_flat(values: &[f32]) -> Option<Vec<Self>> {
        if values.len() % GRASP_PARAMS != 0 {
            return None;
        }
        Some(
            values
                .chunks_exact(GRASP_PARAMS)
                .map(|c| Self::new(c[0], c[1], c[2], c[3], c[4]))
                .collect(),
        )
    }

    /// Area of the rectangle; signed when a predicted extent is negative.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Corners in counter-clockwise order for a y-up frame.
    pub fn corners(&self) -> [(f32, f32); 4] {
        let (sin, cos) = self.angle.sin_cos();
        let hw = self.width * 0.5;
        let hh = self.height * 0.5;
        let offsets = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)];
        offsets.map(|(dx, dy)| {
            (
                self.cx + dx * cos - dy * sin,
                self.cy + dx * sin + dy * cos,
            )
        })
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl From<[f32; GRASP_PARAMS]> for GraspBox {
    fn from(v: [f32; GRASP_PARAMS]) -> Self {
        Self::from_array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_buffer_rejects_partial_rows() {
        assert!(GraspBox::from_flat(&[0.0; 7]).is_none());
        let boxes = GraspBox::from_flat(&[1.0, 2.0, 3.0, 4.0, 0.5, 0.0, 0.0, 1.0, 1.0, 0.0])
            .expect("two rows");
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0], GraspBox::new(1.0, 2.0, 3.0, 4.0, 0.5));
    }

    #[test]
    fn unrotated_corners_span_the_extents() {
        let b = GraspBox::new(10.0, 5.0, 4.0, 2.0, 0.0);
        let corners = b.corners();
        assert_eq!(corners[0], (8.0, 4.0));
        assert_eq!(corners[2], (12.0, 6.0));
    }
}
