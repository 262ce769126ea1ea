//! Grasp annotation CSV loading.

use grasp_contracts::GraspAnnotation;
use std::path::Path;

use crate::types::{DatasetError, DatasetResult, GraspRecord};

/// Load and validate every row of `csv_path`.
///
/// Expected header: `image,object,x,y,width,height,angle` (angle in radians).
/// Image paths are resolved relative to `data_dir`; the files themselves are
/// only opened when a batch is assembled.
pub fn load_annotations(csv_path: &Path, data_dir: &Path) -> DatasetResult<Vec<GraspRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .map_err(|source| DatasetError::Csv {
            path: csv_path.to_path_buf(),
            source,
        })?;

    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<GraspAnnotation>().enumerate() {
        let annotation = result.map_err(|source| DatasetError::Csv {
            path: csv_path.to_path_buf(),
            source,
        })?;
        annotation
            .validate()
            .map_err(|source| DatasetError::Validation {
                path: csv_path.to_path_buf(),
                row,
                source,
            })?;
        records.push(GraspRecord {
            index: row,
            image: data_dir.join(&annotation.image),
            object: annotation.object.clone(),
            grasp: annotation.grasp(),
        });
    }
    tracing::debug!(
        path = %csv_path.display(),
        grasps = records.len(),
        "loaded grasp annotations"
    );
    Ok(records)
}
