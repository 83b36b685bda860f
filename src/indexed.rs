use std::sync::Arc;

use crate::{
    error::{ImseqError, ImseqResult},
    frame::Frame,
    indexing::IndexSpec,
    sequence::{FrameCursor, Sequence},
    serial::SerializedForm,
};

/// Lazy view of a multi-axis slice of a base sequence.
///
/// The selected time indices are precomputed against the base length at
/// construction; the spatial selectors are applied per frame as frames are
/// pulled.
pub struct IndexedSequence {
    base: Arc<dyn Sequence>,
    spec: IndexSpec,
    times: Vec<usize>,
}

impl IndexedSequence {
    pub fn new(base: Arc<dyn Sequence>, spec: IndexSpec) -> ImseqResult<Self> {
        spec.validate()?;
        let times = spec.time().select(base.len())?;
        Ok(Self { base, spec, times })
    }

    /// Base-sequence time indices selected by this view, ascending.
    pub fn times(&self) -> &[usize] {
        &self.times
    }

    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }
}

impl Sequence for IndexedSequence {
    fn len(&self) -> usize {
        self.times.len()
    }

    fn random_access(&self) -> bool {
        self.base.random_access()
    }

    fn frame_at(&self, t: usize) -> ImseqResult<Frame> {
        if !self.base.random_access() {
            return Err(ImseqError::capability(
                "base sequence does not support random frame access",
            ));
        }
        let base_t = *self.times.get(t).ok_or_else(|| {
            ImseqError::config(format!(
                "frame index {t} out of range for sequence of length {}",
                self.times.len()
            ))
        })?;
        Ok(self.spec.apply_to_frame(&self.base.frame_at(base_t)?))
    }

    fn frames(&self) -> FrameCursor<'_> {
        if self.base.random_access() {
            return Box::new(
                self.times
                    .iter()
                    .map(move |&t| Ok(self.spec.apply_to_frame(&self.base.frame_at(t)?))),
            );
        }
        // Sequential fallback: walk the base cursor once, yielding frames
        // whose position matches the next pending selected index, and stop
        // consuming the base as soon as the selection is exhausted.
        let mut pending = self.times.iter().copied().peekable();
        let mut cursor = self.base.frames().enumerate();
        Box::new(std::iter::from_fn(move || {
            let target = *pending.peek()?;
            loop {
                match cursor.next() {
                    None => return None,
                    Some((_, Err(e))) => return Some(Err(e)),
                    Some((t, Ok(frame))) if t == target => {
                        pending.next();
                        return Some(Ok(self.spec.apply_to_frame(&frame)));
                    }
                    Some(_) => {}
                }
            }
        }))
    }

    fn slice(self: Arc<Self>, spec: IndexSpec) -> ImseqResult<Arc<dyn Sequence>> {
        Ok(Arc::new(IndexedSequence::new(self, spec)?))
    }

    fn serialize(&self) -> ImseqResult<SerializedForm> {
        Ok(SerializedForm::Indexed {
            base: Box::new(self.base.serialize()?),
            indices: self.spec.clone(),
        })
    }
}
