use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use ndarray::Array5;

use crate::{
    error::{ImseqError, ImseqResult},
    indexing::IndexSpec,
    motion::Displacements,
    sequence::{ArraySequence, Sequence},
};

/// A path argument stored redundantly as an absolute form and a
/// project-directory-relative form, so a serialized sequence survives the
/// project being moved alongside its backing files.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredPath {
    #[serde(rename = "_abspath")]
    pub abspath: PathBuf,
    #[serde(rename = "_relpath", default, skip_serializing_if = "Option::is_none")]
    pub relpath: Option<PathBuf>,
}

impl StoredPath {
    pub fn new(path: &Path) -> ImseqResult<Self> {
        let abspath = std::path::absolute(path)
            .map_err(|e| ImseqError::store(format!("cannot absolutize '{}': {e}", path.display())))?;
        Ok(Self {
            abspath,
            relpath: None,
        })
    }

    /// Record the form of this path relative to `project_dir`, when the path
    /// lies under it. Called at project save time, not at serialization.
    pub fn rebase(&mut self, project_dir: &Path) {
        self.relpath = self
            .abspath
            .strip_prefix(project_dir)
            .ok()
            .map(Path::to_path_buf);
    }

    /// Resolve to the unique existing location. Candidates are the stored
    /// relative form joined onto `project_dir` and the stored absolute form;
    /// candidates that do not exist are discarded. Multiple surviving
    /// candidates must be the identical underlying file.
    pub fn resolve(&self, project_dir: &Path) -> ImseqResult<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(rel) = &self.relpath {
            candidates.push(project_dir.join(rel));
        }
        if !candidates.contains(&self.abspath) {
            candidates.push(self.abspath.clone());
        }
        let existing: Vec<PathBuf> = candidates.into_iter().filter(|p| p.is_file()).collect();
        match existing.as_slice() {
            [] => Err(ImseqError::missing_file(format!(
                "no existing file for '{}' (relative form {:?})",
                self.abspath.display(),
                self.relpath
            ))),
            [only] => Ok(only.clone()),
            [first, rest @ ..] => {
                let identity = std::fs::canonicalize(first).map_err(|e| {
                    ImseqError::store(format!("cannot canonicalize '{}': {e}", first.display()))
                })?;
                for other in rest {
                    let other_identity = std::fs::canonicalize(other).map_err(|e| {
                        ImseqError::store(format!(
                            "cannot canonicalize '{}': {e}",
                            other.display()
                        ))
                    })?;
                    if other_identity != identity {
                        return Err(ImseqError::ambiguous_path(format!(
                            "files have been moved; '{}' and '{}' are distinct files",
                            first.display(),
                            other.display()
                        )));
                    }
                }
                Ok(first.clone())
            }
        }
    }
}

/// Tagged, recursive representation of a sequence. The tag vocabulary is
/// closed: reconstruction only ever dispatches over these variants, never
/// over type names taken from the serialized data.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "__class__")]
pub enum SerializedForm {
    #[serde(rename = "HDF5")]
    Hdf5 {
        path: StoredPath,
        dim_order: String,
        group: String,
        key: String,
    },
    #[serde(rename = "ndarray")]
    Array { data: Array5<f64> },
    #[serde(rename = "Indexed")]
    Indexed {
        base: Box<SerializedForm>,
        indices: IndexSpec,
    },
    #[serde(rename = "MotionCorrected")]
    MotionCorrected {
        base: Box<SerializedForm>,
        displacements: Displacements,
        frame_shape: (usize, usize, usize),
    },
}

impl SerializedForm {
    /// Fill in directory-relative path forms, recursively.
    pub fn rebase(&mut self, project_dir: &Path) {
        match self {
            Self::Hdf5 { path, .. } => path.rebase(project_dir),
            Self::Indexed { base, .. } | Self::MotionCorrected { base, .. } => {
                base.rebase(project_dir)
            }
            Self::Array { .. } => {}
        }
    }
}

/// Rebuild a sequence from its serialized form. Wrapper variants pop their
/// nested base form and reconstruct it recursively; path arguments are
/// resolved against `project_dir`.
#[tracing::instrument(skip(form))]
pub fn reconstruct(form: &SerializedForm, project_dir: &Path) -> ImseqResult<Arc<dyn Sequence>> {
    match form {
        SerializedForm::Hdf5 {
            path,
            dim_order,
            group,
            key,
        } => reconstruct_hdf5(path, project_dir, dim_order, group, key),
        SerializedForm::Array { data } => Ok(Arc::new(ArraySequence::new(data.clone()))),
        SerializedForm::Indexed { base, indices } => {
            let base = reconstruct(base, project_dir)?;
            Ok(Arc::new(crate::indexed::IndexedSequence::new(
                base,
                indices.clone(),
            )?))
        }
        SerializedForm::MotionCorrected {
            base,
            displacements,
            frame_shape,
        } => {
            let base = reconstruct(base, project_dir)?;
            Ok(Arc::new(crate::motion::MotionCorrectedSequence::new(
                base,
                displacements.clone(),
                *frame_shape,
            )))
        }
    }
}

#[cfg(feature = "hdf5")]
fn reconstruct_hdf5(
    path: &StoredPath,
    project_dir: &Path,
    dim_order: &str,
    group: &str,
    key: &str,
) -> ImseqResult<Arc<dyn Sequence>> {
    let resolved = path.resolve(project_dir)?;
    Ok(Arc::new(crate::hdf5_store::Hdf5Sequence::open(
        &resolved,
        dim_order,
        Some(group),
        Some(key),
    )?))
}

#[cfg(not(feature = "hdf5"))]
fn reconstruct_hdf5(
    _path: &StoredPath,
    _project_dir: &Path,
    _dim_order: &str,
    _group: &str,
    _key: &str,
) -> ImseqResult<Arc<dyn Sequence>> {
    Err(ImseqError::missing_dependency(
        "HDF5 support requires building with the `hdf5` feature",
    ))
}

pub const PROJECT_FILE: &str = "sequence.json";

/// Serialize a sequence into `project_dir/sequence.json`, recording
/// directory-relative path forms so the project directory can be relocated
/// together with its backing files.
pub fn save_project(seq: &dyn Sequence, project_dir: &Path) -> ImseqResult<PathBuf> {
    std::fs::create_dir_all(project_dir).map_err(|e| {
        ImseqError::store(format!(
            "failed to create project directory '{}': {e}",
            project_dir.display()
        ))
    })?;
    let root = std::path::absolute(project_dir).map_err(|e| {
        ImseqError::store(format!(
            "cannot absolutize project directory '{}': {e}",
            project_dir.display()
        ))
    })?;
    let mut form = seq.serialize()?;
    form.rebase(&root);
    let out = root.join(PROJECT_FILE);
    let json = serde_json::to_string_pretty(&form).map_err(|e| ImseqError::serde(e.to_string()))?;
    std::fs::write(&out, json)
        .map_err(|e| ImseqError::store(format!("failed to write '{}': {e}", out.display())))?;
    Ok(out)
}

/// Load the sequence saved in `project_dir`.
pub fn load_project(project_dir: &Path) -> ImseqResult<Arc<dyn Sequence>> {
    load_project_file(&project_dir.join(PROJECT_FILE))
}

/// Load a serialized sequence from an explicit file, resolving relative
/// paths against the file's directory.
pub fn load_project_file(path: &Path) -> ImseqResult<Arc<dyn Sequence>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| ImseqError::store(format!("failed to read '{}': {e}", path.display())))?;
    let form: SerializedForm =
        serde_json::from_str(&json).map_err(|e| ImseqError::serde(e.to_string()))?;
    let project_dir = path.parent().unwrap_or_else(|| Path::new("."));
    reconstruct(&form, project_dir)
}
