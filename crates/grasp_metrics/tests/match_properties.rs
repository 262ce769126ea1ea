use grasp_contracts::GraspBox;
use grasp_metrics::{
    GeometricMatchEvaluator, IntersectionArea, IntersectionKind, MatchCriteria,
};

fn targets() -> Vec<GraspBox> {
    vec![
        GraspBox::new(100.0, 80.0, 40.0, 20.0, 0.1),
        GraspBox::new(50.0, 60.0, 30.0, 12.0, -0.7),
        GraspBox::new(10.0, 10.0, 8.0, 8.0, 1.4),
        GraspBox::new(200.0, 150.0, 60.0, 25.0, 0.0),
    ]
}

struct NoOverlap;

impl IntersectionArea for NoOverlap {
    fn area(&self, _a: &GraspBox, _b: &GraspBox) -> f32 {
        0.0
    }
}

#[test]
fn identical_boxes_score_one() {
    for kind in [IntersectionKind::AxisAligned, IntersectionKind::Rotated] {
        let eval = GeometricMatchEvaluator::new(MatchCriteria::default(), kind);
        let t = targets();
        assert_eq!(eval.evaluate(&t, &t).unwrap(), 1.0);
    }
}

#[test]
fn orientation_off_by_thirty_degrees_scores_zero() {
    let eval: GeometricMatchEvaluator = Default::default();
    let t = targets();
    let p: Vec<_> = t
        .iter()
        .enumerate()
        .map(|(i, b)| GraspBox {
            angle: b.angle + 30f32.to_radians() + 0.001 + 0.01 * i as f32,
            ..*b
        })
        .collect();
    assert_eq!(eval.evaluate(&p, &t).unwrap(), 0.0);
}

#[test]
fn zero_overlap_scores_zero_regardless_of_angle() {
    let eval = GeometricMatchEvaluator::with_intersection(MatchCriteria::default(), NoOverlap);
    let t = targets();
    assert_eq!(eval.evaluate(&t, &t).unwrap(), 0.0);
}

#[test]
fn three_of_four_matching_scores_three_quarters() {
    let eval: GeometricMatchEvaluator = Default::default();
    let t = targets();
    let mut p = t.clone();
    // Shift the last prediction far away: orientation agrees, overlap fails.
    p[3].cx += 1_000.0;
    assert_eq!(eval.evaluate(&p, &t).unwrap(), 0.75);
}

#[test]
fn score_stays_within_unit_interval() {
    let eval: GeometricMatchEvaluator = Default::default();
    let t = targets();
    for shift in [0.0f32, 5.0, 12.0, 25.0, 80.0] {
        for turn in [0.0f32, 0.2, 0.5, 1.0] {
            let p: Vec<_> = t
                .iter()
                .map(|b| GraspBox {
                    cx: b.cx + shift,
                    angle: b.angle + turn,
                    ..*b
                })
                .collect();
            let score = eval.evaluate(&p, &t).unwrap();
            assert!((0.0..=1.0).contains(&score), "score {score} out of range");
        }
    }
}

#[test]
fn orientation_off_by_exactly_thirty_degrees_scores_zero() {
    let eval: GeometricMatchEvaluator = Default::default();
    let t: Vec<_> = targets()
        .into_iter()
        .map(|b| GraspBox { angle: 0.0, ..b })
        .collect();
    let limit = 30f32.to_radians();
    for angle in [limit, -limit] {
        let p: Vec<_> = t.iter().map(|b| GraspBox { angle, ..*b }).collect();
        assert_eq!(eval.evaluate(&p, &t).unwrap(), 0.0);
    }
}

#[test]
fn non_finite_predictions_count_as_misses() {
    let eval: GeometricMatchEvaluator = Default::default();
    let t = targets();
    let mut p = t.clone();
    p[0].cx = f32::NAN;
    p[1].cy = f32::NAN;
    p[2].width = f32::INFINITY;
    assert_eq!(eval.evaluate(&p, &t).unwrap(), 0.25);

    p[3].height = f32::NAN;
    assert_eq!(eval.evaluate(&p, &t).unwrap(), 0.0);
}
