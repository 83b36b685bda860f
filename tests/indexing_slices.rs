use std::{cell::Cell, sync::Arc};

use ndarray::{Array5, s};

use imseq::{
    ArraySequence, Frame, FrameCursor, ImseqError, ImseqResult, IndexSpec, Selector, Sequence,
    SerializedForm,
};

fn ramp(shape: (usize, usize, usize, usize, usize)) -> Array5<f64> {
    let n = shape.0 * shape.1 * shape.2 * shape.3 * shape.4;
    Array5::from_shape_vec(shape, (0..n).map(|v| v as f64).collect()).unwrap()
}

/// Cursor-only sequence: no random access, counts how many frames have been
/// pulled out of it.
struct StreamOnly {
    data: Array5<f64>,
    pulled: Cell<usize>,
}

impl StreamOnly {
    fn new(data: Array5<f64>) -> Self {
        Self {
            data,
            pulled: Cell::new(0),
        }
    }
}

impl Sequence for StreamOnly {
    fn len(&self) -> usize {
        self.data.shape()[0]
    }

    fn frames(&self) -> FrameCursor<'_> {
        Box::new((0..self.len()).map(move |t| {
            self.pulled.set(self.pulled.get() + 1);
            Ok(self.data.index_axis(ndarray::Axis(0), t).to_owned())
        }))
    }

    fn slice(self: Arc<Self>, spec: IndexSpec) -> ImseqResult<Arc<dyn Sequence>> {
        Ok(Arc::new(imseq::IndexedSequence::new(self, spec)?))
    }

    fn serialize(&self) -> ImseqResult<SerializedForm> {
        Ok(SerializedForm::Array {
            data: self.data.clone(),
        })
    }
}

#[test]
fn length_matches_cursor_exhaustion() {
    let seq = ArraySequence::new(ramp((7, 1, 3, 4, 2)));
    assert_eq!(seq.len(), seq.frames().count());
}

#[test]
fn two_cursors_are_independent_and_identical() {
    let seq = ArraySequence::new(ramp((5, 1, 3, 4, 2)));
    let a: Vec<Frame> = seq.frames().map(Result::unwrap).collect();
    let mut second = seq.frames();
    // Interleave with a third traversal to check independence.
    for frame in seq.frames() {
        let other = second.next().unwrap().unwrap();
        assert_eq!(frame.unwrap(), other);
    }
    assert_eq!(a.len(), 5);
}

#[test]
fn time_slice_selects_expected_frames() {
    let base = Arc::new(ArraySequence::new(ramp((10, 1, 3, 4, 2))));
    let sliced = base
        .clone()
        .slice(IndexSpec::all().with_time(Selector::range(2, 5)))
        .unwrap();
    assert_eq!(sliced.len(), 3);
    let frames: Vec<Frame> = sliced.frames().map(Result::unwrap).collect();
    for (i, t) in (2..5).enumerate() {
        assert_eq!(frames[i], base.frame_at(t).unwrap());
    }
}

#[test]
fn sliced_cursor_matches_dense_array_slicing() {
    let data = ramp((9, 2, 4, 5, 3));
    let base = Arc::new(ArraySequence::new(data.clone()));
    let spec = IndexSpec::new([
        Selector::stepped(1, 8, 2),
        Selector::Index(0),
        Selector::range(1, 3),
        Selector::All,
        Selector::Index(-1),
    ]);
    let sliced = base.slice(spec).unwrap();
    let expected = data.slice(s![1..8;2, 0..1, 1..3, .., -1..]).to_owned();
    assert_eq!(sliced.to_array().unwrap(), expected);
    assert_eq!(sliced.shape().unwrap().as_tuple(), (4, 1, 2, 5, 1));
}

#[test]
fn slicing_never_collapses_rank() {
    let base = Arc::new(ArraySequence::new(ramp((4, 2, 3, 3, 2))));
    let sliced = base
        .slice(IndexSpec::new([
            Selector::Index(1),
            Selector::Index(1),
            Selector::Index(0),
            Selector::Index(2),
            Selector::Index(0),
        ]))
        .unwrap();
    assert_eq!(sliced.shape().unwrap().as_tuple(), (1, 1, 1, 1, 1));
}

#[test]
fn slices_compose() {
    let data = ramp((10, 1, 4, 4, 2));
    let base = Arc::new(ArraySequence::new(data.clone()));
    let once = base
        .slice(IndexSpec::all().with_time(Selector::range(2, 9)))
        .unwrap();
    let twice = once
        .slice(IndexSpec::all().with_time(Selector::stepped(1, None, 3)))
        .unwrap();
    // Local indices 1, 4 of [2..9) are base frames 3 and 6.
    assert_eq!(twice.len(), 2);
    assert_eq!(twice.frame_at(0).unwrap(), data.slice(s![3, .., .., .., ..]).to_owned());
    assert_eq!(twice.frame_at(1).unwrap(), data.slice(s![6, .., .., .., ..]).to_owned());
}

#[test]
fn cursor_only_base_uses_sequential_fallback() {
    let data = ramp((8, 1, 2, 2, 1));
    let stream = Arc::new(StreamOnly::new(data.clone()));
    let random = Arc::new(ArraySequence::new(data));
    let spec = IndexSpec::all()
        .with_time(Selector::stepped(0, 4, 2))
        .with_rows(Selector::Index(1));

    let via_stream: Vec<Frame> = stream
        .clone()
        .slice(spec.clone())
        .unwrap()
        .frames()
        .map(Result::unwrap)
        .collect();
    let via_random: Vec<Frame> = random
        .slice(spec)
        .unwrap()
        .frames()
        .map(Result::unwrap)
        .collect();
    assert_eq!(via_stream, via_random);
    // Selected times are 0 and 2: the base cursor must stop after frame 2.
    assert_eq!(stream.pulled.get(), 3);
}

#[test]
fn zero_step_spatial_selector_is_rejected_at_slice_time() {
    let base = Arc::new(ArraySequence::new(ramp((4, 1, 2, 2, 1))));
    let err = base
        .slice(IndexSpec::all().with_rows(Selector::stepped(None, None, 0)))
        .unwrap_err();
    assert!(matches!(err, ImseqError::Config(_)));
}

#[test]
fn random_access_on_cursor_only_base_is_a_capability_error() {
    let stream = Arc::new(StreamOnly::new(ramp((4, 1, 2, 2, 1))));
    let err = stream.frame_at(0).unwrap_err();
    assert!(matches!(err, ImseqError::Capability(_)));

    let sliced = Arc::new(StreamOnly::new(ramp((4, 1, 2, 2, 1))))
        .slice(IndexSpec::all())
        .unwrap();
    assert!(matches!(
        sliced.frame_at(0).unwrap_err(),
        ImseqError::Capability(_)
    ));
}
