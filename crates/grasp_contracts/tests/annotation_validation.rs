use grasp_contracts::{GraspAnnotation, ValidationError};

fn annotation() -> GraspAnnotation {
    GraspAnnotation {
        image: "pcd0100r.png".into(),
        object: "mug".into(),
        x: 320.0,
        y: 240.0,
        width: 40.0,
        height: 20.0,
        angle: 0.3,
    }
}

#[test]
fn valid_annotation_passes() {
    assert!(annotation().validate().is_ok());
}

#[test]
fn zero_extent_rejected() {
    let mut ann = annotation();
    ann.height = 0.0;
    assert!(matches!(
        ann.validate(),
        Err(ValidationError::NonPositiveExtent { .. })
    ));
}

#[test]
fn nan_angle_rejected() {
    let mut ann = annotation();
    ann.angle = f32::NAN;
    assert!(matches!(ann.validate(), Err(ValidationError::NonFinite(_))));
}

#[test]
fn blank_image_rejected() {
    let mut ann = annotation();
    ann.image = "  ".into();
    assert_eq!(ann.validate(), Err(ValidationError::MissingImage));
}
