//! Run configuration: an optional TOML file layered under command-line flags.

use std::path::{Path, PathBuf};

use clap::Parser;
use grasp_dataset::{ColorJitter, SplitType, TargetEncoding};
use grasp_metrics::{AngleRule, IntersectionKind, MatchCriteria};
use models::GraspNetConfig;
use serde::{Deserialize, Serialize};

use crate::cross_validation::CrossValidation;
use crate::error::{TrainingError, TrainingResult};
use crate::optim::SgdSettings;
use crate::session::ModelInit;

pub const CONFIG_ENV: &str = "GRASP_TRAIN_CONFIG";

/// Only one grasp per image is regressed, as `[x, y, width, height, angle]`.
pub const SUPPORTED_GRASP_CONFIG: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Directory that annotation image paths are relative to.
    pub dataset: PathBuf,
    /// Annotation CSV; defaults to `<dataset>/grasps.csv`.
    pub annotations: Option<PathBuf>,
    pub workers: usize,
    pub epochs: usize,
    pub start_epoch: usize,
    pub batch_size: usize,
    pub lr: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    pub batch_print_freq: usize,
    pub epoch_print_freq: usize,
    pub grasp_config: usize,
    pub num_folds: usize,
    pub split: SplitType,
    pub split_seed: u64,
    /// Seeds shuffling and augmentation; unseeded when absent.
    pub seed: Option<u64>,
    pub symmetric_angles: bool,
    pub intersection: IntersectionKind,
    pub target_encoding: TargetEncoding,
    /// Photometric jitter on training images; off when absent.
    pub color_jitter: Option<ColorJitter>,
    pub crop_size: u32,
    pub input_size: u32,
    pub evaluate_only: bool,
    pub resume: Option<PathBuf>,
    pub pretrained: Option<PathBuf>,
    pub train_all: bool,
    pub checkpoint_dir: PathBuf,
    pub model: GraspNetConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/cornell"),
            annotations: None,
            workers: 4,
            epochs: 1000,
            start_epoch: 0,
            batch_size: 64,
            lr: 1e-3,
            momentum: 0.9,
            weight_decay: 1e-4,
            batch_print_freq: 10,
            epoch_print_freq: 1,
            grasp_config: SUPPORTED_GRASP_CONFIG,
            num_folds: 5,
            split: SplitType::Image,
            split_seed: 0,
            seed: None,
            symmetric_angles: false,
            intersection: IntersectionKind::AxisAligned,
            target_encoding: TargetEncoding::Pixels,
            color_jitter: None,
            crop_size: 320,
            input_size: 224,
            evaluate_only: false,
            resume: None,
            pretrained: None,
            train_all: false,
            checkpoint_dir: PathBuf::from("checkpoints"),
            model: GraspNetConfig::default(),
        }
    }
}

impl TrainConfig {
    pub fn from_path(path: &Path) -> TrainingResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TrainingError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| TrainingError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// `explicit` wins over `$GRASP_TRAIN_CONFIG`; with neither, defaults.
    pub fn load(explicit: Option<&Path>) -> TrainingResult<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> TrainingResult<()> {
        if self.grasp_config != SUPPORTED_GRASP_CONFIG {
            return Err(TrainingError::Config(format!(
                "grasp_config {} is not supported (only {})",
                self.grasp_config, SUPPORTED_GRASP_CONFIG
            )));
        }
        if self.num_folds < 2 {
            return Err(TrainingError::Config(format!(
                "num_folds must be at least 2, got {}",
                self.num_folds
            )));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::Config("batch_size must be at least 1".into()));
        }
        if self.crop_size == 0 || self.input_size == 0 {
            return Err(TrainingError::Config(
                "crop_size and input_size must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.model.dropout) {
            return Err(TrainingError::Config(format!(
                "dropout {} outside [0, 1)",
                self.model.dropout
            )));
        }
        if let Some(j) = &self.color_jitter {
            let strengths = [j.brightness, j.contrast, j.saturation];
            if !strengths.iter().all(|s| (0.0..=1.0).contains(s)) {
                return Err(TrainingError::Config(format!(
                    "color_jitter strengths must lie in [0, 1], got {strengths:?}"
                )));
            }
        }
        if self.resume.is_some() && self.pretrained.is_some() {
            return Err(TrainingError::Config(
                "resume and pretrained are mutually exclusive".into(),
            ));
        }
        self.cross_validation().validate()
    }

    pub fn annotations_path(&self) -> PathBuf {
        self.annotations
            .clone()
            .unwrap_or_else(|| self.dataset.join("grasps.csv"))
    }

    pub fn criteria(&self) -> MatchCriteria {
        MatchCriteria {
            angle_rule: if self.symmetric_angles {
                AngleRule::Symmetric
            } else {
                AngleRule::Raw
            },
            ..MatchCriteria::default()
        }
    }

    pub fn sgd(&self) -> SgdSettings {
        SgdSettings {
            lr: self.lr,
            momentum: self.momentum,
            weight_decay: self.weight_decay,
        }
    }

    pub fn cross_validation(&self) -> CrossValidation {
        CrossValidation {
            num_folds: self.num_folds,
            epochs: self.epochs,
            start_epoch: self.start_epoch,
            epoch_print_freq: self.epoch_print_freq,
            evaluate_only: self.evaluate_only,
        }
    }

    pub fn model_init(&self) -> ModelInit {
        ModelInit {
            resume: self.resume.clone(),
            pretrained: self.pretrained.clone(),
            train_all: self.train_all,
        }
    }
}

fn parse_split(s: &str) -> Result<SplitType, String> {
    match s.to_ascii_lowercase().as_str() {
        "image" => Ok(SplitType::Image),
        "object" => Ok(SplitType::Object),
        other => Err(format!("unknown split '{other}' (expected image or object)")),
    }
}

fn parse_intersection(s: &str) -> Result<IntersectionKind, String> {
    match s.to_ascii_lowercase().replace('-', "_").as_str() {
        "axis_aligned" => Ok(IntersectionKind::AxisAligned),
        "rotated" => Ok(IntersectionKind::Rotated),
        other => Err(format!(
            "unknown intersection '{other}' (expected axis-aligned or rotated)"
        )),
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "train", about = "K-fold cross-validated grasp regression training")]
pub struct TrainArgs {
    /// TOML config file (falls back to $GRASP_TRAIN_CONFIG).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Dataset directory.
    #[arg(long)]
    pub dataset: Option<PathBuf>,
    /// Annotation CSV (defaults to <dataset>/grasps.csv).
    #[arg(long)]
    pub annotations: Option<PathBuf>,
    /// Data loading threads.
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,
    #[arg(long)]
    pub epochs: Option<usize>,
    /// Epoch to start counting from (useful with --resume).
    #[arg(long)]
    pub start_epoch: Option<usize>,
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,
    #[arg(long, alias = "learning-rate")]
    pub lr: Option<f64>,
    #[arg(long)]
    pub momentum: Option<f64>,
    #[arg(long, alias = "wd")]
    pub weight_decay: Option<f64>,
    /// Batch progress frequency.
    #[arg(long, alias = "bp")]
    pub batch_print_freq: Option<usize>,
    /// Epoch summary frequency.
    #[arg(long, alias = "ep")]
    pub epoch_print_freq: Option<usize>,
    /// Grasp parameterisation; only 5 is supported.
    #[arg(long)]
    pub grasp_config: Option<usize>,
    #[arg(long)]
    pub num_folds: Option<usize>,
    /// Fold grouping: image or object.
    #[arg(long, value_parser = parse_split)]
    pub split: Option<SplitType>,
    #[arg(long)]
    pub split_seed: Option<u64>,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Compare angles modulo pi.
    #[arg(long)]
    pub symmetric_angles: bool,
    /// Overlap primitive: axis-aligned or rotated.
    #[arg(long, value_parser = parse_intersection)]
    pub intersection: Option<IntersectionKind>,
    /// Brightness, contrast and saturation jitter strength for training.
    #[arg(long)]
    pub color_jitter: Option<f32>,
    /// Only evaluate; no training.
    #[arg(short = 'e', long)]
    pub evaluate: bool,
    /// Resume from a checkpoint file or directory.
    #[arg(long)]
    pub resume: Option<PathBuf>,
    /// Start from pretrained weights.
    #[arg(long)]
    pub pretrained: Option<PathBuf>,
    /// With --pretrained, also fine-tune the backbone.
    #[arg(long)]
    pub train_all: bool,
    /// Where fold checkpoints and report.json are written.
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,
}

impl TrainArgs {
    /// Resolve the config file, then apply every flag that was given.
    pub fn into_config(self) -> TrainingResult<TrainConfig> {
        let mut cfg = TrainConfig::load(self.config.as_deref())?;
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = self.$field { cfg.$field = v; })*
            };
        }
        overlay!(
            dataset,
            workers,
            epochs,
            start_epoch,
            batch_size,
            lr,
            momentum,
            weight_decay,
            batch_print_freq,
            epoch_print_freq,
            grasp_config,
            num_folds,
            split,
            split_seed,
            intersection,
            checkpoint_dir,
        );
        if let Some(strength) = self.color_jitter {
            cfg.color_jitter = Some(ColorJitter::uniform(strength));
        }
        if self.annotations.is_some() {
            cfg.annotations = self.annotations;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if self.resume.is_some() {
            cfg.resume = self.resume;
        }
        if self.pretrained.is_some() {
            cfg.pretrained = self.pretrained;
        }
        cfg.symmetric_angles |= self.symmetric_angles;
        cfg.evaluate_only |= self.evaluate;
        cfg.train_all |= self.train_all;
        Ok(cfg)
    }
}

#[derive(Parser, Debug)]
#[command(name = "eval", about = "Score a grasp checkpoint on one fold's validation split")]
pub struct EvalArgs {
    /// TOML config file (falls back to $GRASP_TRAIN_CONFIG).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Checkpoint file, or a directory holding fold_<k>.bin.
    #[arg(long)]
    pub checkpoint: PathBuf,
    #[arg(long, default_value_t = 0)]
    pub fold: usize,
    #[arg(long)]
    pub dataset: Option<PathBuf>,
    #[arg(long)]
    pub annotations: Option<PathBuf>,
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,
    #[arg(long)]
    pub symmetric_angles: bool,
}

impl EvalArgs {
    pub fn into_config(self) -> TrainingResult<(TrainConfig, PathBuf, usize)> {
        let mut cfg = TrainConfig::load(self.config.as_deref())?;
        if let Some(v) = self.dataset {
            cfg.dataset = v;
        }
        if self.annotations.is_some() {
            cfg.annotations = self.annotations;
        }
        if let Some(v) = self.batch_size {
            cfg.batch_size = v;
        }
        if let Some(v) = self.workers {
            cfg.workers = v;
        }
        cfg.symmetric_angles |= self.symmetric_angles;
        Ok((cfg, self.checkpoint, self.fold))
    }
}
