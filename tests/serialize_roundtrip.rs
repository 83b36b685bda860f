use std::{path::PathBuf, sync::Arc};

use ndarray::{Array2, Array5};

use imseq::{
    ArraySequence, Displacements, ImseqError, IndexSpec, MotionCorrectedSequence, Selector,
    Sequence, SerializedForm, StoredPath, load_project, reconstruct, save_project,
};

fn ramp(shape: (usize, usize, usize, usize, usize)) -> Array5<f64> {
    let n = shape.0 * shape.1 * shape.2 * shape.3 * shape.4;
    Array5::from_shape_vec(shape, (0..n).map(|v| v as f64).collect()).unwrap()
}

fn bitwise_eq(a: &Array5<f64>, b: &Array5<f64>) {
    assert_eq!(a.shape(), b.shape());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.to_bits(), y.to_bits());
    }
}

#[test]
fn three_level_wrapper_chain_round_trips() {
    let rows = 4;
    let base = Arc::new(ArraySequence::new(ramp((12, 1, rows, 5, 2))));
    let mut offsets = Array2::<i64>::zeros((12 * rows, 2));
    for (i, mut row) in offsets.outer_iter_mut().enumerate() {
        row[0] = (i % 2) as i64;
        row[1] = -((i % 3) as i64);
    }
    let mc = Arc::new(MotionCorrectedSequence::new(
        base,
        Displacements::new(offsets, rows).unwrap(),
        (1, rows, 5),
    ));
    let sliced = mc
        .slice(
            IndexSpec::all()
                .with_time(Selector::range(2, 10))
                .with_rows(Selector::range(1, 3)),
        )
        .unwrap();

    let form = sliced.serialize().unwrap();
    let json = serde_json::to_string(&form).unwrap();
    let parsed: SerializedForm = serde_json::from_str(&json).unwrap();
    let rebuilt = reconstruct(&parsed, std::path::Path::new(".")).unwrap();

    assert_eq!(rebuilt.len(), sliced.len());
    assert_eq!(rebuilt.shape().unwrap(), sliced.shape().unwrap());
    bitwise_eq(&rebuilt.to_array().unwrap(), &sliced.to_array().unwrap());
}

#[test]
fn save_and_load_project() {
    let dir = tempfile::tempdir().unwrap();
    let seq = ArraySequence::new(ramp((3, 1, 2, 2, 1)));
    let written = save_project(&seq, dir.path()).unwrap();
    assert!(written.ends_with("sequence.json"));
    let loaded = load_project(dir.path()).unwrap();
    assert_eq!(loaded.len(), 3);
    bitwise_eq(&loaded.to_array().unwrap(), &seq.to_array().unwrap());
}

#[test]
fn path_resolution_prefers_the_unique_existing_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("imaging.h5");
    std::fs::write(&real, b"data").unwrap();

    // Absolute form points at a location that no longer exists; the relative
    // form resolves against the project directory.
    let stored = StoredPath {
        abspath: PathBuf::from("/nonexistent/elsewhere/imaging.h5"),
        relpath: Some(PathBuf::from("imaging.h5")),
    };
    assert_eq!(stored.resolve(dir.path()).unwrap(), real);
}

#[test]
fn identical_candidates_resolve_and_distinct_ones_are_ambiguous() {
    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("imaging.h5");
    std::fs::write(&real, b"data").unwrap();

    let same = StoredPath {
        abspath: real.clone(),
        relpath: Some(PathBuf::from("imaging.h5")),
    };
    assert_eq!(same.resolve(dir.path()).unwrap(), real);

    let other_dir = tempfile::tempdir().unwrap();
    let decoy = other_dir.path().join("imaging.h5");
    std::fs::write(&decoy, b"other").unwrap();
    let ambiguous = StoredPath {
        abspath: decoy,
        relpath: Some(PathBuf::from("imaging.h5")),
    };
    assert!(matches!(
        ambiguous.resolve(dir.path()).unwrap_err(),
        ImseqError::AmbiguousPath(_)
    ));
}

#[test]
fn no_existing_candidate_is_a_missing_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let stored = StoredPath {
        abspath: PathBuf::from("/nonexistent/imaging.h5"),
        relpath: Some(PathBuf::from("also-missing.h5")),
    };
    assert!(matches!(
        stored.resolve(dir.path()).unwrap_err(),
        ImseqError::MissingFile(_)
    ));
}

#[test]
fn rebase_is_recursive_through_wrappers() {
    let mut form = SerializedForm::Indexed {
        base: Box::new(SerializedForm::Hdf5 {
            path: StoredPath {
                abspath: PathBuf::from("/proj/data/imaging.h5"),
                relpath: None,
            },
            dim_order: "tyx".to_string(),
            group: "/".to_string(),
            key: "imaging".to_string(),
        }),
        indices: IndexSpec::all(),
    };
    form.rebase(std::path::Path::new("/proj"));
    match form {
        SerializedForm::Indexed { base, .. } => match *base {
            SerializedForm::Hdf5 { path, .. } => {
                assert_eq!(path.relpath.as_deref(), Some(std::path::Path::new("data/imaging.h5")));
            }
            other => panic!("unexpected form {other:?}"),
        },
        other => panic!("unexpected form {other:?}"),
    }
}
