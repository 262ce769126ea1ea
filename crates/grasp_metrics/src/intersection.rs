//! Overlap area between two grasp rectangles.

use grasp_contracts::GraspBox;
use serde::{Deserialize, Serialize};

/// Overlap area primitive used by the evaluator. Implementations return a
/// non-negative area.
pub trait IntersectionArea {
    fn area(&self, a: &GraspBox, b: &GraspBox) -> f32;
}

/// Overlap of the axis-aligned rectangles `(cx, cy, width, height)`; the
/// angle is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisAligned;

impl IntersectionArea for AxisAligned {
    fn area(&self, a: &GraspBox, b: &GraspBox) -> f32 {
        let (ax0, ax1) = span(a.cx, a.width);
        let (ay0, ay1) = span(a.cy, a.height);
        let (bx0, bx1) = span(b.cx, b.width);
        let (by0, by1) = span(b.cy, b.height);

        let inter_w = (ax1.min(bx1) - ax0.max(bx0)).max(0.0);
        let inter_h = (ay1.min(by1) - ay0.max(by0)).max(0.0);
        inter_w * inter_h
    }
}

fn span(center: f32, extent: f32) -> (f32, f32) {
    let half = extent.abs() * 0.5;
    (center - half, center + half)
}

/// Exact overlap of the oriented rectangles, clipping one against the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rotated;

impl IntersectionArea for Rotated {
    fn area(&self, a: &GraspBox, b: &GraspBox) -> f32 {
        let subject = positive_extent(a).corners();
        let clipper = positive_extent(b).corners();
        let clipped = clip_convex(&subject, &clipper);
        polygon_area(&clipped)
    }
}

/// Selects an [`IntersectionArea`] at runtime (config driven).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntersectionKind {
    #[default]
    AxisAligned,
    Rotated,
}

impl IntersectionArea for IntersectionKind {
    fn area(&self, a: &GraspBox, b: &GraspBox) -> f32 {
        match self {
            IntersectionKind::AxisAligned => AxisAligned.area(a, b),
            IntersectionKind::Rotated => Rotated.area(a, b),
        }
    }
}

// Corners are counter-clockwise only for positive extents.
fn positive_extent(b: &GraspBox) -> GraspBox {
    GraspBox {
        width: b.width.abs(),
        height: b.height.abs(),
        ..*b
    }
}

/// Sutherland-Hodgman clip of a convex polygon against a convex,
/// counter-clockwise clip polygon.
fn clip_convex(subject: &[(f32, f32)], clipper: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut output: Vec<(f32, f32)> = subject.to_vec();
    for i in 0..clipper.len() {
        if output.is_empty() {
            break;
        }
        let edge_start = clipper[i];
        let edge_end = clipper[(i + 1) % clipper.len()];
        let input = std::mem::take(&mut output);
        for j in 0..input.len() {
            let current = input[j];
            let previous = input[(j + input.len() - 1) % input.len()];
            let current_inside = side(edge_start, edge_end, current) >= 0.0;
            let previous_inside = side(edge_start, edge_end, previous) >= 0.0;
            if current_inside {
                if !previous_inside {
                    if let Some(p) = line_intersection(previous, current, edge_start, edge_end) {
                        output.push(p);
                    }
                }
                output.push(current);
            } else if previous_inside {
                if let Some(p) = line_intersection(previous, current, edge_start, edge_end) {
                    output.push(p);
                }
            }
        }
    }
    output
}

fn side(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn line_intersection(
    p1: (f32, f32),
    p2: (f32, f32),
    q1: (f32, f32),
    q2: (f32, f32),
) -> Option<(f32, f32)> {
    let d1 = (p2.0 - p1.0, p2.1 - p1.1);
    let d2 = (q2.0 - q1.0, q2.1 - q1.1);
    let denom = d1.0 * d2.1 - d1.1 * d2.0;
    if denom.abs() < f32::EPSILON {
        return None;
    }
    let t = ((q1.0 - p1.0) * d2.1 - (q1.1 - p1.1) * d2.0) / denom;
    Some((p1.0 + t * d1.0, p1.1 + t * d1.1))
}

fn polygon_area(points: &[(f32, f32)]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    // Shoelace formula
    let mut twice_area = 0.0;
    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        twice_area += points[i].0 * points[j].1;
        twice_area -= points[j].0 * points[i].1;
    }
    (twice_area * 0.5).abs()
}
