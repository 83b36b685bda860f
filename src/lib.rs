#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Lazy, composable frame sequences over multi-dimensional imaging data.
//!
//! A [`Sequence`] is an ordered list of frames with axes (plane, row,
//! column, channel) that is never materialized in full: backing-store
//! adapters produce frames on demand, wrappers transform them on demand, and
//! consumers pull frames through the composed chain strictly sequentially.

pub mod align;
pub mod dim_order;
pub mod error;
pub mod export;
pub mod fill;
pub mod frame;
pub mod indexed;
pub mod indexing;
pub mod motion;
pub mod sequence;
pub mod serial;

#[cfg(feature = "hdf5")]
#[cfg_attr(docsrs, doc(cfg(feature = "hdf5")))]
pub mod hdf5_store;

pub use align::{FrameAligner, align_frame};
pub use dim_order::DimensionOrder;
pub use error::{ImseqError, ImseqResult};
pub use export::{ExportKind, ExportOptions, FrameSink, export_frames};
pub use fill::fill_gaps;
pub use frame::{Frame, FrameShape, SequenceShape};
pub use indexed::IndexedSequence;
pub use indexing::{IndexSpec, Selector};
pub use motion::{Displacements, MotionCorrectedSequence};
pub use sequence::{ArraySequence, FrameCursor, Sequence, open_sequence};
pub use serial::{
    SerializedForm, StoredPath, load_project, load_project_file, reconstruct, save_project,
};

#[cfg(feature = "hdf5")]
pub use export::Hdf5Sink;
#[cfg(feature = "hdf5")]
pub use hdf5_store::Hdf5Sequence;
