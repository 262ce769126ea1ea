//! Core types and error definitions for grasp_dataset.

use grasp_contracts::{GraspBox, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("annotation validation failed at {path} row {row}: {source}")]
    Validation {
        path: PathBuf,
        row: usize,
        #[source]
        source: ValidationError,
    },
    #[error("fold {fold} has an empty {split} split")]
    EmptySplit { fold: usize, split: Split },
    #[error("fold {fold} out of range for {num_folds} folds")]
    InvalidFold { fold: usize, num_folds: usize },
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Val,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => f.write_str("train"),
            Split::Val => f.write_str("val"),
        }
    }
}

/// What a fold partitions on. Grasps sharing a key always land in the same fold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    #[default]
    Image,
    Object,
}

/// One annotated grasp, resolved against the dataset directory.
#[derive(Debug, Clone, PartialEq)]
pub struct GraspRecord {
    /// Row index in the annotation file; travels with the batch as its auxiliary index.
    pub index: usize,
    pub image: PathBuf,
    pub object: String,
    pub grasp: GraspBox,
}

/// Auxiliary per-sample metadata carried alongside a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMeta {
    pub image: PathBuf,
    pub object: String,
}

/// A decoded and transformed sample, ready to be stacked into a batch.
#[derive(Debug, Clone)]
pub struct GraspSample {
    pub index: usize,
    /// Image in CHW layout after post-transform normalisation.
    pub image_chw: Vec<f32>,
    pub width: u32,
    pub height: u32,
    pub target: [f32; 5],
    pub meta: SampleMeta,
}
