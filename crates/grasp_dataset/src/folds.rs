//! Deterministic k-fold assignment of grasp records.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashMap};

use crate::types::{DatasetError, DatasetResult, GraspRecord, Split, SplitType};

/// Fold membership for a fixed record list.
///
/// Grasps are grouped by image (or object), the sorted group keys are shuffled
/// with `seed`, and group `i` goes to fold `i % num_folds`. The same inputs
/// always produce the same plan.
#[derive(Debug, Clone)]
pub struct FoldPlan {
    num_folds: usize,
    assignment: Vec<usize>,
}

impl FoldPlan {
    pub fn new(
        records: &[GraspRecord],
        num_folds: usize,
        split_type: SplitType,
        seed: u64,
    ) -> DatasetResult<Self> {
        if num_folds == 0 {
            return Err(DatasetError::InvalidFold {
                fold: 0,
                num_folds: 0,
            });
        }
        let key_of = |r: &GraspRecord| match split_type {
            SplitType::Image => r.image.to_string_lossy().into_owned(),
            SplitType::Object => r.object.clone(),
        };
        let mut keys: Vec<String> = records
            .iter()
            .map(key_of)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        keys.shuffle(&mut rng);
        let fold_of_key: HashMap<String, usize> = keys
            .into_iter()
            .enumerate()
            .map(|(i, k)| (k, i % num_folds))
            .collect();

        let assignment = records
            .iter()
            .map(|r| fold_of_key.get(&key_of(r)).copied().unwrap_or(0))
            .collect();
        Ok(Self {
            num_folds,
            assignment,
        })
    }

    pub fn num_folds(&self) -> usize {
        self.num_folds
    }

    /// Fold of the record at position `pos` in the list the plan was built from.
    pub fn fold_of(&self, pos: usize) -> Option<usize> {
        self.assignment.get(pos).copied()
    }

    /// Records of `split` for `fold`: validation is the fold itself, training
    /// is everything else. Order follows `records`.
    pub fn split(
        &self,
        records: &[GraspRecord],
        fold: usize,
        split: Split,
    ) -> DatasetResult<Vec<GraspRecord>> {
        if fold >= self.num_folds {
            return Err(DatasetError::InvalidFold {
                fold,
                num_folds: self.num_folds,
            });
        }
        if records.len() != self.assignment.len() {
            return Err(DatasetError::ShapeMismatch(format!(
                "fold plan covers {} records, got {}",
                self.assignment.len(),
                records.len()
            )));
        }
        let selected: Vec<GraspRecord> = records
            .iter()
            .zip(&self.assignment)
            .filter(|(_, f)| match split {
                Split::Val => **f == fold,
                Split::Train => **f != fold,
            })
            .map(|(r, _)| r.clone())
            .collect();
        if selected.is_empty() {
            return Err(DatasetError::EmptySplit { fold, split });
        }
        Ok(selected)
    }
}
