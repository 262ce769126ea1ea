//! Image and grasp transform pipelines.
//!
//! A [`TransformSet`] runs in four stages: an image-only `pre` jitter, the
//! `co` transforms that move image and grasp together, the `post`
//! normalisation into CHW floats, and the `target` encoding of the grasp.

use grasp_contracts::GraspBox;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use rand::Rng;
use std::f32::consts::FRAC_PI_2;
use std::f32::consts::PI;

use crate::types::{DatasetError, DatasetResult, GraspRecord, GraspSample, SampleMeta};

/// Random brightness/contrast/saturation scaling; each factor is drawn from
/// `1 ± strength`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorJitter {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl ColorJitter {
    /// Same strength for all three factors.
    pub fn uniform(strength: f32) -> Self {
        Self {
            brightness: strength,
            contrast: strength,
            saturation: strength,
        }
    }

    pub fn apply(&self, img: &mut RgbImage, rng: &mut dyn rand::RngCore) {
        let bright = jitter_factor(self.brightness, rng);
        let contrast = jitter_factor(self.contrast, rng);
        let saturation = jitter_factor(self.saturation, rng);
        for pixel in img.pixels_mut() {
            let mut v = [0.0f32; 3];
            for c in 0..3 {
                let x = pixel[c] as f32 / 255.0 * bright;
                v[c] = (x - 0.5) * contrast + 0.5;
            }
            let gray = 0.299 * v[0] + 0.587 * v[1] + 0.114 * v[2];
            for c in 0..3 {
                let x = gray + (v[c] - gray) * saturation;
                pixel[c] = (x.clamp(0.0, 1.0) * 255.0) as u8;
            }
        }
    }
}

fn jitter_factor(strength: f32, rng: &mut dyn rand::RngCore) -> f32 {
    if strength <= 0.0 {
        return 1.0;
    }
    (1.0 + rng.random_range(-strength..strength)).max(0.0)
}

/// Transforms applied jointly to the image and its grasp rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoTransform {
    /// Rotate about the image centre by a uniform angle in `±max_degrees`.
    RandomRotation { max_degrees: f32 },
    /// Shift by whole pixels drawn uniformly from `±max_pixels` per axis.
    RandomTranslation { max_pixels: u32 },
    CenterCrop { size: u32 },
    Resize { size: u32 },
    RandomVerticalFlip { prob: f32 },
    RandomHorizontalFlip { prob: f32 },
}

impl CoTransform {
    pub fn apply(
        &self,
        img: RgbImage,
        grasp: GraspBox,
        rng: &mut dyn rand::RngCore,
    ) -> (RgbImage, GraspBox) {
        match *self {
            CoTransform::RandomRotation { max_degrees } => {
                if max_degrees <= 0.0 {
                    return (img, grasp);
                }
                let theta = rng
                    .random_range(-max_degrees..=max_degrees)
                    .to_radians();
                rotate(img, grasp, theta)
            }
            CoTransform::RandomTranslation { max_pixels } => {
                if max_pixels == 0 {
                    return (img, grasp);
                }
                let m = max_pixels as i64;
                let dx = rng.random_range(-m..=m);
                let dy = rng.random_range(-m..=m);
                translate(img, grasp, dx, dy)
            }
            CoTransform::CenterCrop { size } => center_crop(img, grasp, size),
            CoTransform::Resize { size } => resize(img, grasp, size),
            CoTransform::RandomVerticalFlip { prob } => {
                if prob > 0.0 && rng.random_range(0.0..1.0) < prob {
                    vflip(img, grasp)
                } else {
                    (img, grasp)
                }
            }
            CoTransform::RandomHorizontalFlip { prob } => {
                if prob > 0.0 && rng.random_range(0.0..1.0) < prob {
                    hflip(img, grasp)
                } else {
                    (img, grasp)
                }
            }
        }
    }
}

/// Angles are kept in `[-pi/2, pi/2)`; a grasp rectangle is unchanged by a half turn.
pub fn wrap_half_turn(angle: f32) -> f32 {
    (angle + FRAC_PI_2).rem_euclid(PI) - FRAC_PI_2
}

pub(crate) fn rotate(img: RgbImage, grasp: GraspBox, theta: f32) -> (RgbImage, GraspBox) {
    let (w, h) = img.dimensions();
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let (sin, cos) = theta.sin_cos();
    // Inverse map each output pixel back into the source.
    let out = RgbImage::from_fn(w, h, |x, y| {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let sx = cos * dx + sin * dy + cx;
        let sy = -sin * dx + cos * dy + cy;
        sample_nearest(&img, sx, sy)
    });
    let (dx, dy) = (grasp.cx - cx, grasp.cy - cy);
    let moved = GraspBox {
        cx: cx + cos * dx - sin * dy,
        cy: cy + sin * dx + cos * dy,
        angle: wrap_half_turn(grasp.angle + theta),
        ..grasp
    };
    (out, moved)
}

fn sample_nearest(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    if x < 0.0 || y < 0.0 {
        return Rgb([0, 0, 0]);
    }
    let (xi, yi) = (x as u32, y as u32);
    if xi >= img.width() || yi >= img.height() {
        return Rgb([0, 0, 0]);
    }
    *img.get_pixel(xi, yi)
}

pub(crate) fn translate(img: RgbImage, grasp: GraspBox, dx: i64, dy: i64) -> (RgbImage, GraspBox) {
    let (w, h) = img.dimensions();
    let out = RgbImage::from_fn(w, h, |x, y| {
        let sx = x as i64 - dx;
        let sy = y as i64 - dy;
        if sx < 0 || sy < 0 || sx >= w as i64 || sy >= h as i64 {
            Rgb([0, 0, 0])
        } else {
            *img.get_pixel(sx as u32, sy as u32)
        }
    });
    let moved = GraspBox {
        cx: grasp.cx + dx as f32,
        cy: grasp.cy + dy as f32,
        ..grasp
    };
    (out, moved)
}

pub(crate) fn center_crop(img: RgbImage, grasp: GraspBox, size: u32) -> (RgbImage, GraspBox) {
    let (w, h) = img.dimensions();
    let (cw, ch) = (size.min(w), size.min(h));
    let (x0, y0) = ((w - cw) / 2, (h - ch) / 2);
    let out = image::imageops::crop_imm(&img, x0, y0, cw, ch).to_image();
    let moved = GraspBox {
        cx: grasp.cx - x0 as f32,
        cy: grasp.cy - y0 as f32,
        ..grasp
    };
    (out, moved)
}

pub(crate) fn resize(img: RgbImage, grasp: GraspBox, size: u32) -> (RgbImage, GraspBox) {
    let (w, h) = img.dimensions();
    if size == 0 || (w == size && h == size) {
        return (img, grasp);
    }
    let sx = size as f32 / w as f32;
    let sy = size as f32 / h as f32;
    let out = image::imageops::resize(&img, size, size, FilterType::Triangle);
    // Anisotropic scaling: stretch each rectangle axis by its own factor.
    let (sin, cos) = grasp.angle.sin_cos();
    let scaled = GraspBox {
        cx: grasp.cx * sx,
        cy: grasp.cy * sy,
        width: grasp.width * (sx * cos).hypot(sy * sin),
        height: grasp.height * (sx * sin).hypot(sy * cos),
        angle: wrap_half_turn((sy * sin).atan2(sx * cos)),
    };
    (out, scaled)
}

pub(crate) fn hflip(mut img: RgbImage, grasp: GraspBox) -> (RgbImage, GraspBox) {
    image::imageops::flip_horizontal_in_place(&mut img);
    let flipped = GraspBox {
        cx: img.width() as f32 - grasp.cx,
        angle: wrap_half_turn(-grasp.angle),
        ..grasp
    };
    (img, flipped)
}

pub(crate) fn vflip(mut img: RgbImage, grasp: GraspBox) -> (RgbImage, GraspBox) {
    image::imageops::flip_vertical_in_place(&mut img);
    let flipped = GraspBox {
        cy: img.height() as f32 - grasp.cy,
        angle: wrap_half_turn(-grasp.angle),
        ..grasp
    };
    (img, flipped)
}

/// Per-channel `(x - mean) / std` on values already scaled to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalize {
    pub const IMAGENET: Normalize = Normalize {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };
    pub const IDENTITY: Normalize = Normalize {
        mean: [0.0; 3],
        std: [1.0; 3],
    };

    fn to_chw(&self, img: &RgbImage) -> Vec<f32> {
        let (w, h) = img.dimensions();
        let plane = (w * h) as usize;
        let mut chw = vec![0.0f32; plane * 3];
        for (x, y, pixel) in img.enumerate_pixels() {
            let base = (y * w + x) as usize;
            for c in 0..3 {
                chw[c * plane + base] = (pixel[c] as f32 / 255.0 - self.mean[c]) / self.std[c];
            }
        }
        chw
    }
}

impl Default for Normalize {
    fn default() -> Self {
        Self::IMAGENET
    }
}

/// How the grasp target is expressed to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEncoding {
    /// Pixel coordinates of the transformed image.
    #[default]
    Pixels,
    /// Centre and extents divided by the output width/height.
    Normalized,
}

impl TargetEncoding {
    pub fn encode(&self, grasp: GraspBox, width: u32, height: u32) -> [f32; 5] {
        match self {
            TargetEncoding::Pixels => grasp.to_array(),
            TargetEncoding::Normalized => {
                let (w, h) = (width as f32, height as f32);
                [
                    grasp.cx / w,
                    grasp.cy / h,
                    grasp.width / w,
                    grasp.height / h,
                    grasp.angle,
                ]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformSet {
    pub pre: Option<ColorJitter>,
    pub co: Vec<CoTransform>,
    pub post: Normalize,
    pub target: TargetEncoding,
}

impl TransformSet {
    /// Rotation 40°, translation 50 px, centre crop 320, resize 224, random flips.
    pub fn train_default() -> Self {
        TransformSetBuilder::new()
            .co(CoTransform::RandomRotation { max_degrees: 40.0 })
            .co(CoTransform::RandomTranslation { max_pixels: 50 })
            .co(CoTransform::CenterCrop { size: 320 })
            .co(CoTransform::Resize { size: 224 })
            .co(CoTransform::RandomVerticalFlip { prob: 0.5 })
            .co(CoTransform::RandomHorizontalFlip { prob: 0.5 })
            .build()
    }

    pub fn val_default() -> Self {
        TransformSetBuilder::new()
            .co(CoTransform::CenterCrop { size: 320 })
            .co(CoTransform::Resize { size: 224 })
            .build()
    }

    pub fn describe(&self) -> String {
        let co = self
            .co
            .iter()
            .map(|t| format!("{t:?}"))
            .collect::<Vec<_>>()
            .join(" -> ");
        format!(
            "pre={:?} co=[{}] post(mean={:?} std={:?}) target={:?}",
            self.pre, co, self.post.mean, self.post.std, self.target
        )
    }

    pub(crate) fn apply(
        &self,
        mut img: RgbImage,
        record: &GraspRecord,
        rng: &mut dyn rand::RngCore,
    ) -> DatasetResult<GraspSample> {
        if img.width() == 0 || img.height() == 0 {
            return Err(DatasetError::ShapeMismatch(format!(
                "empty image at {}",
                record.image.display()
            )));
        }
        if let Some(jitter) = &self.pre {
            jitter.apply(&mut img, rng);
        }
        let mut grasp = record.grasp;
        for t in &self.co {
            (img, grasp) = t.apply(img, grasp, rng);
        }
        let (width, height) = img.dimensions();
        Ok(GraspSample {
            index: record.index,
            image_chw: self.post.to_chw(&img),
            width,
            height,
            target: self.target.encode(grasp, width, height),
            meta: SampleMeta {
                image: record.image.clone(),
                object: record.object.clone(),
            },
        })
    }
}

impl Default for TransformSet {
    fn default() -> Self {
        TransformSetBuilder::new().build()
    }
}

#[derive(Debug, Clone)]
pub struct TransformSetBuilder {
    inner: TransformSet,
}

impl Default for TransformSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformSetBuilder {
    pub fn new() -> Self {
        Self {
            inner: TransformSet {
                pre: None,
                co: Vec::new(),
                post: Normalize::IMAGENET,
                target: TargetEncoding::Pixels,
            },
        }
    }
    pub fn color_jitter(mut self, jitter: Option<ColorJitter>) -> Self {
        self.inner.pre = jitter;
        self
    }
    pub fn co(mut self, t: CoTransform) -> Self {
        self.inner.co.push(t);
        self
    }
    pub fn normalize(mut self, post: Normalize) -> Self {
        self.inner.post = post;
        self
    }
    pub fn target(mut self, encoding: TargetEncoding) -> Self {
        self.inner.target = encoding;
        self
    }
    pub fn build(self) -> TransformSet {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::path::PathBuf;

    fn marked(w: u32, h: u32, at: (u32, u32)) -> RgbImage {
        let mut img = RgbImage::new(w, h);
        img.put_pixel(at.0, at.1, Rgb([255, 255, 255]));
        img
    }

    fn lit(img: &RgbImage) -> Vec<(u32, u32)> {
        img.enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn quarter_turn_moves_pixel_and_grasp_together() {
        let img = marked(10, 10, (7, 5));
        let grasp = GraspBox::new(7.5, 5.5, 4.0, 2.0, 0.0);
        let (out, g) = rotate(img, grasp, FRAC_PI_2);
        assert_eq!(lit(&out), vec![(4, 7)]);
        assert!((g.cx - 4.5).abs() < 1e-4 && (g.cy - 7.5).abs() < 1e-4);
        assert!((g.angle + FRAC_PI_2).abs() < 1e-5, "angle {}", g.angle);
        assert_eq!((g.width, g.height), (4.0, 2.0));
    }

    #[test]
    fn horizontal_flip_mirrors_centre_and_angle() {
        let img = marked(8, 4, (1, 2));
        let (out, g) = hflip(img, GraspBox::new(1.5, 2.5, 3.0, 1.0, 0.3));
        assert_eq!(lit(&out), vec![(6, 2)]);
        assert_eq!(g.cx, 6.5);
        assert_eq!(g.cy, 2.5);
        assert!((g.angle + 0.3).abs() < 1e-6);
    }

    #[test]
    fn vertical_flip_mirrors_row() {
        let (out, g) = vflip(marked(4, 8, (2, 1)), GraspBox::new(2.5, 1.5, 3.0, 1.0, -0.2));
        assert_eq!(lit(&out), vec![(2, 6)]);
        assert_eq!(g.cy, 6.5);
        assert!((g.angle - 0.2).abs() < 1e-6);
    }

    #[test]
    fn translation_shifts_and_blanks_the_border() {
        let (out, g) = translate(marked(6, 6, (0, 0)), GraspBox::new(0.5, 0.5, 1.0, 1.0, 0.0), 2, 3);
        assert_eq!(lit(&out), vec![(2, 3)]);
        assert_eq!((g.cx, g.cy), (2.5, 3.5));
    }

    #[test]
    fn crop_then_resize_rescales_grasp() {
        let img = RgbImage::new(40, 20);
        let (img, g) = center_crop(img, GraspBox::new(20.0, 10.0, 8.0, 4.0, 0.0), 20);
        assert_eq!(img.dimensions(), (20, 20));
        assert_eq!(g.cx, 10.0);
        let (img, g) = resize(img, g, 10);
        assert_eq!(img.dimensions(), (10, 10));
        assert_eq!((g.cx, g.cy, g.width, g.height), (5.0, 5.0, 4.0, 2.0));
    }

    #[test]
    fn anisotropic_resize_stretches_along_the_axes() {
        let (_, g) = resize(RgbImage::new(20, 10), GraspBox::new(10.0, 5.0, 4.0, 2.0, FRAC_PI_2), 20);
        // width runs along y and is doubled, height runs along x and is kept
        assert!((g.width - 8.0).abs() < 1e-4);
        assert!((g.height - 2.0).abs() < 1e-4);
        assert!((g.angle.abs() - FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn wrap_keeps_half_open_range() {
        assert!((wrap_half_turn(PI) - 0.0).abs() < 1e-6);
        assert!((wrap_half_turn(FRAC_PI_2) + FRAC_PI_2).abs() < 1e-6);
        assert!((wrap_half_turn(0.4) - 0.4).abs() < 1e-6);
        assert!((wrap_half_turn(-0.4 - PI) + 0.4).abs() < 1e-5);
    }

    #[test]
    fn post_normalises_to_chw() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(1, 0, Rgb([255, 0, 51]));
        let chw = Normalize::IDENTITY.to_chw(&img);
        assert_eq!(chw.len(), 6);
        assert_eq!(chw[1], 1.0);
        assert_eq!(chw[3], 0.0);
        assert!((chw[5] - 0.2).abs() < 1e-6);
        let imagenet = Normalize::IMAGENET.to_chw(&img);
        assert!((imagenet[0] + 0.485 / 0.229).abs() < 1e-5);
    }

    #[test]
    fn validation_pipeline_outputs_224() {
        let record = GraspRecord {
            index: 3,
            image: PathBuf::from("x.png"),
            object: "mug".into(),
            grasp: GraspBox::new(320.0, 240.0, 64.0, 32.0, 0.1),
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let set = TransformSet::val_default();
        let sample = set.apply(RgbImage::new(640, 480), &record, &mut rng).unwrap();
        assert_eq!((sample.width, sample.height), (224, 224));
        assert_eq!(sample.image_chw.len(), 3 * 224 * 224);
        assert!((sample.target[0] - 112.0).abs() < 1e-3);
        assert!((sample.target[2] - 64.0 * 0.7).abs() < 1e-3);
        assert_eq!(sample.index, 3);

        let norm = TransformSetBuilder::new()
            .target(TargetEncoding::Normalized)
            .build()
            .apply(RgbImage::new(100, 50), &record, &mut rng)
            .unwrap();
        assert!((norm.target[0] - 3.2).abs() < 1e-5);
        assert!((norm.target[3] - 32.0 / 50.0).abs() < 1e-5);
    }

    #[test]
    fn jitter_with_zero_strength_is_identity() {
        let mut img = RgbImage::from_pixel(3, 3, Rgb([10, 120, 200]));
        let before = img.clone();
        let jitter = ColorJitter {
            brightness: 0.0,
            contrast: 0.0,
            saturation: 0.0,
        };
        jitter.apply(&mut img, &mut rand::rngs::StdRng::seed_from_u64(1));
        for (a, b) in img.pixels().zip(before.pixels()) {
            for c in 0..3 {
                assert!((a[c] as i32 - b[c] as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn empty_image_is_rejected() {
        let record = GraspRecord {
            index: 0,
            image: PathBuf::from("x.png"),
            object: String::new(),
            grasp: GraspBox::default(),
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        assert!(TransformSet::default()
            .apply(RgbImage::new(0, 0), &record, &mut rng)
            .is_err());
    }
}
