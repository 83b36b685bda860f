use std::sync::Arc;

use ndarray::{Array2, ArrayView2, Axis, Slice};

use crate::{
    align::{FrameAligner, align_frame},
    error::{ImseqError, ImseqResult},
    frame::{Frame, SequenceShape},
    indexed::IndexedSequence,
    indexing::IndexSpec,
    sequence::{FrameCursor, Sequence},
    serial::SerializedForm,
};

/// Per-row 2-D correction offsets, one (dy, dx) pair per (frame, row) pair,
/// stored as a `(frames * rows, 2)` block in frame order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Displacements {
    offsets: Array2<i64>,
    rows_per_frame: usize,
}

impl Displacements {
    pub fn new(offsets: Array2<i64>, rows_per_frame: usize) -> ImseqResult<Self> {
        if offsets.shape()[1] != 2 {
            return Err(ImseqError::config(format!(
                "displacements must have 2 columns (dy, dx), got {}",
                offsets.shape()[1]
            )));
        }
        if rows_per_frame == 0 || offsets.shape()[0] % rows_per_frame != 0 {
            return Err(ImseqError::config(format!(
                "displacement row count {} is not a multiple of rows per frame {rows_per_frame}",
                offsets.shape()[0]
            )));
        }
        Ok(Self {
            offsets,
            rows_per_frame,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.offsets.shape()[0] / self.rows_per_frame
    }

    pub fn rows_per_frame(&self) -> usize {
        self.rows_per_frame
    }

    pub fn offsets(&self) -> &Array2<i64> {
        &self.offsets
    }

    /// The per-row offsets for frame `t`, shape (rows, 2).
    pub fn for_frame(&self, t: usize) -> ImseqResult<ArrayView2<'_, i64>> {
        if t >= self.num_frames() {
            return Err(ImseqError::config(format!(
                "no displacements for frame {t}; only {} frames covered",
                self.num_frames()
            )));
        }
        let lo = t * self.rows_per_frame;
        Ok(self
            .offsets
            .slice_axis(Axis(0), Slice::from(lo..lo + self.rows_per_frame)))
    }

    /// Gather the row-blocks for the given frame indices, in order.
    pub fn select_times(&self, times: &[usize]) -> ImseqResult<Self> {
        let mut out = Array2::zeros((times.len() * self.rows_per_frame, 2));
        for (i, &t) in times.iter().enumerate() {
            let lo = i * self.rows_per_frame;
            out.slice_axis_mut(Axis(0), Slice::from(lo..lo + self.rows_per_frame))
                .assign(&self.for_frame(t)?);
        }
        Ok(Self {
            offsets: out,
            rows_per_frame: self.rows_per_frame,
        })
    }
}

/// Lazy view applying per-frame motion correction over a base sequence.
///
/// Alignment is deferred: the length and time selection never touch pixel
/// data. If the displacement array covers fewer frames than the base, the
/// cursor silently truncates at the shorter of the two.
pub struct MotionCorrectedSequence {
    base: Arc<dyn Sequence>,
    displacements: Displacements,
    frame_shape: (usize, usize, usize),
    aligner: FrameAligner,
}

impl MotionCorrectedSequence {
    pub fn new(
        base: Arc<dyn Sequence>,
        displacements: Displacements,
        frame_shape: (usize, usize, usize),
    ) -> Self {
        Self {
            base,
            displacements,
            frame_shape,
            aligner: align_frame,
        }
    }

    /// Substitute the alignment primitive. The aligner is not serialized;
    /// reconstruction always starts from the default.
    pub fn with_aligner(mut self, aligner: FrameAligner) -> Self {
        self.aligner = aligner;
        self
    }

    pub fn displacements(&self) -> &Displacements {
        &self.displacements
    }

    pub fn frame_shape(&self) -> (usize, usize, usize) {
        self.frame_shape
    }
}

impl Sequence for MotionCorrectedSequence {
    fn len(&self) -> usize {
        self.base.len()
    }

    fn random_access(&self) -> bool {
        self.base.random_access()
    }

    fn frame_at(&self, t: usize) -> ImseqResult<Frame> {
        let frame = self.base.frame_at(t)?;
        Ok((self.aligner)(
            &frame,
            self.displacements.for_frame(t)?,
            self.frame_shape,
        ))
    }

    fn frames(&self) -> FrameCursor<'_> {
        let covered = self.displacements.num_frames();
        let mut cursor = self.base.frames().enumerate();
        Box::new(std::iter::from_fn(move || {
            let (t, frame) = cursor.next()?;
            if t >= covered {
                return None;
            }
            let frame = match frame {
                Ok(f) => f,
                Err(e) => return Some(Err(e)),
            };
            let disp = match self.displacements.for_frame(t) {
                Ok(d) => d,
                Err(e) => return Some(Err(e)),
            };
            Some(Ok((self.aligner)(&frame, disp, self.frame_shape)))
        }))
    }

    fn shape(&self) -> ImseqResult<SequenceShape> {
        let channels = self.base.shape()?.channels;
        Ok(SequenceShape {
            frames: self.len(),
            planes: self.frame_shape.0,
            rows: self.frame_shape.1,
            columns: self.frame_shape.2,
            channels,
        })
    }

    /// Time and channel slices are pushed down through base and
    /// displacements before re-wrapping, so frames that will be discarded
    /// are never aligned. Row/column slices have no pushdown shortcut and
    /// fall back to an `IndexedSequence` over the corrected view.
    fn slice(self: Arc<Self>, spec: IndexSpec) -> ImseqResult<Arc<dyn Sequence>> {
        let (time, rest) = spec.split_time();
        if !time.is_all() {
            let times = time.select(self.len())?;
            let base = self
                .base
                .clone()
                .slice(IndexSpec::all().with_time(time))?;
            let pushed = Arc::new(MotionCorrectedSequence {
                base,
                displacements: self.displacements.select_times(&times)?,
                frame_shape: self.frame_shape,
                aligner: self.aligner,
            });
            return if rest.is_identity() {
                Ok(pushed)
            } else {
                pushed.slice(rest)
            };
        }
        if !spec.channels().is_all() {
            let channels = spec.channels().clone();
            let base = self
                .base
                .clone()
                .slice(IndexSpec::all().with_channels(channels))?;
            // Displacements carry no channel axis, so the pushdown leaves
            // them unchanged.
            let pushed = Arc::new(MotionCorrectedSequence {
                base,
                displacements: self.displacements.clone(),
                frame_shape: self.frame_shape,
                aligner: self.aligner,
            });
            let rest = spec.with_channels(crate::indexing::Selector::All);
            return if rest.is_identity() {
                Ok(pushed)
            } else {
                Ok(Arc::new(IndexedSequence::new(pushed, rest)?))
            };
        }
        Ok(Arc::new(IndexedSequence::new(self, spec)?))
    }

    fn serialize(&self) -> ImseqResult<SerializedForm> {
        Ok(SerializedForm::MotionCorrected {
            base: Box::new(self.base.serialize()?),
            displacements: self.displacements.clone(),
            frame_shape: self.frame_shape,
        })
    }
}
