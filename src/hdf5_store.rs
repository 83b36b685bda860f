use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use ndarray::{ArrayD, IxDyn, SliceInfo, SliceInfoElem};

use crate::{
    dim_order::{DimensionOrder, reorder_frame},
    error::{ImseqError, ImseqResult},
    frame::{Frame, SequenceShape},
    indexed::IndexedSequence,
    indexing::IndexSpec,
    sequence::Sequence,
    serial::{SerializedForm, StoredPath},
};

/// Random-access adapter reading frames from an HDF5 dataset.
///
/// The file handle is opened read-only at construction and held for the
/// adapter's lifetime; it is released when the adapter is dropped. The axis
/// order of the stored tensor is caller-supplied, not self-describing.
pub struct Hdf5Sequence {
    // Keeps the read-only handle open for the adapter's lifetime; released
    // on drop.
    _file: hdf5::File,
    dataset: hdf5::Dataset,
    path: PathBuf,
    order: DimensionOrder,
    group: String,
    key: String,
}

impl Hdf5Sequence {
    /// Open `path` and bind to the dataset at `group`/`key`. `group`
    /// defaults to the root group; `key` may be omitted only when the group
    /// holds exactly one member.
    pub fn open(
        path: &Path,
        dim_order: &str,
        group: Option<&str>,
        key: Option<&str>,
    ) -> ImseqResult<Self> {
        let order = DimensionOrder::parse(dim_order)?;
        let file = hdf5::File::open(path)
            .map_err(|e| ImseqError::store(format!("cannot open '{}': {e}", path.display())))?;
        let group_name = group.unwrap_or("/").to_string();
        let group_obj = file.group(&group_name)?;
        let key = match key {
            Some(k) => k.to_string(),
            None => {
                let names = group_obj.member_names()?;
                match names.as_slice() {
                    [only] => only.clone(),
                    _ => {
                        return Err(ImseqError::config(format!(
                            "group '{group_name}' holds {} members; a key must be provided to \
                             resolve the ambiguity",
                            names.len()
                        )));
                    }
                }
            }
        };
        let dataset = group_obj.dataset(&key)?;
        if order.len() != dataset.ndim() {
            return Err(ImseqError::config(format!(
                "dim_order '{dim_order}' has length {} but dataset '{key}' has rank {}",
                order.len(),
                dataset.ndim()
            )));
        }
        let path = std::path::absolute(path)
            .map_err(|e| ImseqError::store(format!("cannot absolutize '{}': {e}", path.display())))?;
        tracing::debug!(path = %path.display(), order = %order, key, "opened hdf5 backing store");
        Ok(Self {
            _file: file,
            dataset,
            path,
            order,
            group: group_name,
            key,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dim_order(&self) -> &DimensionOrder {
        &self.order
    }

    fn read_hyperslab(&self, t: usize) -> ImseqResult<ArrayD<f64>> {
        let mut elems = vec![
            SliceInfoElem::Slice {
                start: 0,
                end: None,
                step: 1,
            };
            self.dataset.ndim()
        ];
        elems[self.order.time_axis()] = SliceInfoElem::Index(t as isize);
        let info: SliceInfo<_, IxDyn, IxDyn> = SliceInfo::try_from(elems)
            .map_err(|e| ImseqError::store(format!("invalid hyperslab selection: {e}")))?;
        Ok(self.dataset.read_slice(info)?)
    }
}

impl Sequence for Hdf5Sequence {
    fn len(&self) -> usize {
        self.dataset.shape()[self.order.time_axis()]
    }

    fn random_access(&self) -> bool {
        true
    }

    /// Select the hyperslab at time `t`, reorder the remaining axes into
    /// canonical (plane, row, column, channel) order and cast to f64.
    fn frame_at(&self, t: usize) -> ImseqResult<Frame> {
        if t >= self.len() {
            return Err(ImseqError::config(format!(
                "frame index {t} out of range for sequence of length {}",
                self.len()
            )));
        }
        reorder_frame(self.read_hyperslab(t)?, &self.order)
    }

    fn shape(&self) -> ImseqResult<SequenceShape> {
        let extents = self.dataset.shape();
        Ok(SequenceShape {
            frames: extents[self.order.time_axis()],
            planes: self.order.plane_axis().map_or(1, |i| extents[i]),
            rows: extents[self.order.row_axis()],
            columns: extents[self.order.column_axis()],
            channels: self.order.channel_axis().map_or(1, |i| extents[i]),
        })
    }

    fn slice(self: Arc<Self>, spec: IndexSpec) -> ImseqResult<Arc<dyn Sequence>> {
        Ok(Arc::new(IndexedSequence::new(self, spec)?))
    }

    fn serialize(&self) -> ImseqResult<SerializedForm> {
        Ok(SerializedForm::Hdf5 {
            path: StoredPath::new(&self.path)?,
            dim_order: self.order.to_string(),
            group: self.group.clone(),
            key: self.key.clone(),
        })
    }
}
