//! Shared data contracts for grasp boxes and their CSV annotations.

pub mod annotation;
pub mod grasp;

pub use annotation::{GraspAnnotation, ValidationError};
pub use grasp::{GraspBox, GRASP_PARAMS};
