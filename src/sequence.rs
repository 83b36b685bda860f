use std::fmt;
use std::sync::Arc;

use ndarray::{Array5, Axis};

use crate::{
    error::{ImseqError, ImseqResult},
    frame::{Frame, FrameShape, SequenceShape},
    indexed::IndexedSequence,
    indexing::IndexSpec,
    serial::SerializedForm,
};

/// A single, independently-obtained traversal of a sequence's frames.
pub type FrameCursor<'a> = Box<dyn Iterator<Item = ImseqResult<Frame>> + 'a>;

/// A lazily-evaluated, ordered list of frames.
///
/// Obtaining a cursor has no side effect on the sequence, so two cursors may
/// be walked concurrently and each observes the full frame list (several
/// consumers, gap filling among them, rely on exactly this). A concrete
/// variant must provide at least one of random frame access (`frame_at`,
/// with `random_access` returning true) or its own cursor (`frames`); a
/// variant providing neither yields a capability error when pulled.
pub trait Sequence {
    /// Number of frames.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `frame_at` can fetch arbitrary frames directly. Wrappers
    /// forward their base's answer.
    fn random_access(&self) -> bool {
        false
    }

    /// Fetch the frame at time index `t`.
    fn frame_at(&self, t: usize) -> ImseqResult<Frame> {
        let _ = t;
        Err(ImseqError::capability(
            "this sequence does not support random frame access",
        ))
    }

    /// Produce a fresh cursor over all frames, in time order.
    fn frames(&self) -> FrameCursor<'_> {
        Box::new((0..self.len()).map(move |t| self.frame_at(t)))
    }

    /// (frames, planes, rows, columns, channels). The default pulls one
    /// frame; adapters that know their geometry override this.
    fn shape(&self) -> ImseqResult<SequenceShape> {
        let frames = self.len();
        match self.frames().next() {
            Some(first) => Ok(SequenceShape::new(frames, FrameShape::of(&first?))),
            None => Ok(SequenceShape {
                frames,
                planes: 0,
                rows: 0,
                columns: 0,
                channels: 0,
            }),
        }
    }

    /// Build a new lazy view selecting a multi-axis slice of this sequence.
    fn slice(self: Arc<Self>, spec: IndexSpec) -> ImseqResult<Arc<dyn Sequence>>;

    /// Tagged, relocation-tolerant representation sufficient to reconstruct
    /// this sequence (recursively, for wrappers).
    fn serialize(&self) -> ImseqResult<SerializedForm>;

    /// Materialize the whole sequence as a dense array.
    fn to_array(&self) -> ImseqResult<Array5<f64>> {
        let shape = self.shape()?;
        let mut out = Array5::zeros(shape.as_tuple());
        for (t, frame) in self.frames().enumerate() {
            out.index_axis_mut(Axis(0), t).assign(&frame?);
        }
        Ok(out)
    }
}

impl fmt::Debug for dyn Sequence + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Random-access adapter over an in-memory dense array of shape
/// (frames, planes, rows, columns, channels).
pub struct ArraySequence {
    data: Array5<f64>,
}

impl ArraySequence {
    pub fn new(data: Array5<f64>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Array5<f64> {
        &self.data
    }
}

impl Sequence for ArraySequence {
    fn len(&self) -> usize {
        self.data.shape()[0]
    }

    fn random_access(&self) -> bool {
        true
    }

    fn frame_at(&self, t: usize) -> ImseqResult<Frame> {
        if t >= self.len() {
            return Err(ImseqError::config(format!(
                "frame index {t} out of range for sequence of length {}",
                self.len()
            )));
        }
        Ok(self.data.index_axis(Axis(0), t).to_owned())
    }

    fn shape(&self) -> ImseqResult<SequenceShape> {
        let s = self.data.shape();
        Ok(SequenceShape {
            frames: s[0],
            planes: s[1],
            rows: s[2],
            columns: s[3],
            channels: s[4],
        })
    }

    fn slice(self: Arc<Self>, spec: IndexSpec) -> ImseqResult<Arc<dyn Sequence>> {
        Ok(Arc::new(IndexedSequence::new(self, spec)?))
    }

    fn serialize(&self) -> ImseqResult<SerializedForm> {
        Ok(SerializedForm::Array {
            data: self.data.clone(),
        })
    }

    fn to_array(&self) -> ImseqResult<Array5<f64>> {
        Ok(self.data.clone())
    }
}

/// Open a backing store by kind name. Currently the only kind is `"HDF5"`.
pub fn open_sequence(
    kind: &str,
    path: &std::path::Path,
    dim_order: &str,
    group: Option<&str>,
    key: Option<&str>,
) -> ImseqResult<Arc<dyn Sequence>> {
    match kind {
        "HDF5" => open_hdf5(path, dim_order, group, key),
        other => Err(ImseqError::config(format!(
            "unknown backing store kind '{other}'"
        ))),
    }
}

#[cfg(feature = "hdf5")]
fn open_hdf5(
    path: &std::path::Path,
    dim_order: &str,
    group: Option<&str>,
    key: Option<&str>,
) -> ImseqResult<Arc<dyn Sequence>> {
    Ok(Arc::new(crate::hdf5_store::Hdf5Sequence::open(
        path, dim_order, group, key,
    )?))
}

#[cfg(not(feature = "hdf5"))]
fn open_hdf5(
    _path: &std::path::Path,
    _dim_order: &str,
    _group: Option<&str>,
    _key: Option<&str>,
) -> ImseqResult<Arc<dyn Sequence>> {
    Err(ImseqError::missing_dependency(
        "HDF5 support requires building with the `hdf5` feature",
    ))
}
