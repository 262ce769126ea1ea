//! Grasp correctness: orientation agreement plus overlap agreement.

use std::f32::consts::PI;

use grasp_contracts::GraspBox;
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, MetricsResult};
use crate::intersection::{IntersectionArea, IntersectionKind};

/// How predicted and target angles are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleRule {
    /// Plain `|predicted - target|`, no wrap-around handling.
    #[default]
    Raw,
    /// Difference taken modulo pi, so a rectangle and its half-turn agree.
    Symmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchCriteria {
    /// Orientation must differ by strictly less than this (radians).
    pub max_angle_diff: f32,
    /// IoU must be strictly greater than this.
    pub min_iou: f32,
    pub angle_rule: AngleRule,
}

impl Default for MatchCriteria {
    fn default() -> Self {
        Self {
            max_angle_diff: 30.0f32.to_radians(),
            min_iou: 0.25,
            angle_rule: AngleRule::Raw,
        }
    }
}

/// Per-sample outcome, exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleMatch {
    pub angle_diff: f32,
    pub iou: f32,
    pub orientation: bool,
    pub overlap: bool,
}

impl SampleMatch {
    pub fn is_match(&self) -> bool {
        self.orientation && self.overlap
    }
}

/// Scores a batch of predicted grasps against their paired targets.
#[derive(Debug, Clone, Default)]
pub struct GeometricMatchEvaluator<I = IntersectionKind> {
    criteria: MatchCriteria,
    intersection: I,
}

impl GeometricMatchEvaluator<IntersectionKind> {
    pub fn new(criteria: MatchCriteria, kind: IntersectionKind) -> Self {
        Self::with_intersection(criteria, kind)
    }
}

impl<I: IntersectionArea> GeometricMatchEvaluator<I> {
    pub fn with_intersection(criteria: MatchCriteria, intersection: I) -> Self {
        Self {
            criteria,
            intersection,
        }
    }

    pub fn criteria(&self) -> &MatchCriteria {
        &self.criteria
    }

    pub fn score_sample(
        &self,
        index: usize,
        predicted: &GraspBox,
        target: &GraspBox,
    ) -> MetricsResult<SampleMatch> {
        // A diverged prediction is a miss, not a broken batch.
        if !predicted.is_finite() {
            return Ok(SampleMatch {
                angle_diff: f32::NAN,
                iou: 0.0,
                orientation: false,
                overlap: false,
            });
        }
        let angle_diff = match self.criteria.angle_rule {
            AngleRule::Raw => (predicted.angle - target.angle).abs(),
            AngleRule::Symmetric => {
                let d = (predicted.angle - target.angle).rem_euclid(PI);
                d.min(PI - d)
            }
        };
        let orientation = angle_diff < self.criteria.max_angle_diff;

        // Extents count by magnitude, matching the intersection primitives.
        let intersection = self.intersection.area(predicted, target);
        let union = predicted.area().abs() + target.area().abs() - intersection;
        if !union.is_finite() || union <= 0.0 {
            return Err(MetricsError::DegenerateGeometry { index, union });
        }
        let iou = intersection / union;

        Ok(SampleMatch {
            angle_diff,
            iou,
            orientation,
            overlap: iou > self.criteria.min_iou,
        })
    }

    /// Fraction of samples in `[0, 1]` whose prediction matches its target.
    pub fn evaluate(&self, predicted: &[GraspBox], target: &[GraspBox]) -> MetricsResult<f64> {
        if predicted.is_empty() || predicted.len() != target.len() {
            return Err(MetricsError::InvalidBatchSize {
                predicted: predicted.len(),
                target: target.len(),
            });
        }
        let mut matches = 0usize;
        for (index, (p, t)) in predicted.iter().zip(target).enumerate() {
            if self.score_sample(index, p, t)?.is_match() {
                matches += 1;
            }
        }
        Ok(matches as f64 / predicted.len() as f64)
    }

    /// Score row-major `[n, 5]` buffers, e.g. tensors pulled back to the host.
    pub fn evaluate_flat(&self, predicted: &[f32], target: &[f32]) -> MetricsResult<f64> {
        let p = GraspBox::from_flat(predicted)
            .ok_or_else(|| MetricsError::InvalidShape(vec![predicted.len()]))?;
        let t = GraspBox::from_flat(target)
            .ok_or_else(|| MetricsError::InvalidShape(vec![target.len()]))?;
        self.evaluate(&p, &t)
    }
}
