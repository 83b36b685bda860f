use ndarray::{ArrayD, Axis, Ix4};

use crate::{
    error::{ImseqError, ImseqResult},
    frame::Frame,
};

/// Declared mapping from on-disk tensor axes to logical (time, plane, row,
/// column, channel) semantics.
///
/// The string is a permutation over `{t, z, y, x, c}` whose length equals the
/// rank of the stored tensor. `t`, `y` and `x` are mandatory; `z` and `c` are
/// optional, and their absence means the axis is not present in the raw data
/// (not merely size 1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimensionOrder {
    symbols: Vec<char>,
    t: usize,
    z: Option<usize>,
    y: usize,
    x: usize,
    c: Option<usize>,
}

impl DimensionOrder {
    pub fn parse(order: &str) -> ImseqResult<Self> {
        let symbols: Vec<char> = order.chars().collect();
        for &sym in &symbols {
            if !matches!(sym, 't' | 'z' | 'y' | 'x' | 'c') {
                return Err(ImseqError::config(format!(
                    "dim_order '{order}' contains '{sym}'; only t, z, y, x, c are allowed"
                )));
            }
            if symbols.iter().filter(|&&s| s == sym).count() > 1 {
                return Err(ImseqError::config(format!(
                    "dim_order '{order}' repeats '{sym}'"
                )));
            }
        }
        let find = |sym| symbols.iter().position(|&s| s == sym);
        let (Some(t), Some(y), Some(x)) = (find('t'), find('y'), find('x')) else {
            return Err(ImseqError::config(format!(
                "dim_order '{order}' must contain 't', 'y' and 'x'"
            )));
        };
        Ok(Self {
            z: find('z'),
            c: find('c'),
            symbols,
            t,
            y,
            x,
        })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Position of the time axis in the raw tensor.
    pub fn time_axis(&self) -> usize {
        self.t
    }

    pub fn has_planes(&self) -> bool {
        self.z.is_some()
    }

    pub fn has_channels(&self) -> bool {
        self.c.is_some()
    }

    pub fn plane_axis(&self) -> Option<usize> {
        self.z
    }

    pub fn row_axis(&self) -> usize {
        self.y
    }

    pub fn column_axis(&self) -> usize {
        self.x
    }

    pub fn channel_axis(&self) -> Option<usize> {
        self.c
    }

    /// Target positions (z=0, y=1, x=2, c=3) of the raw axes that remain
    /// after the time axis is dropped, in declared order.
    fn placement(&self) -> Vec<usize> {
        self.symbols
            .iter()
            .filter_map(|&sym| match sym {
                'z' => Some(0),
                'y' => Some(1),
                'x' => Some(2),
                'c' => Some(3),
                _ => None,
            })
            .collect()
    }
}

impl std::fmt::Display for DimensionOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for sym in &self.symbols {
            write!(f, "{sym}")?;
        }
        Ok(())
    }
}

/// Reorder a raw hyperslab (the stored tensor with the time axis dropped)
/// into canonical (plane, row, column, channel) order and synthesize
/// singleton axes for any plane/channel axis the declared order omits.
///
/// Placement is a selection sort over the target positions: at each step the
/// leading unplaced axis is swapped with the axis whose target position is
/// the smallest remaining one.
pub fn reorder_frame(raw: ArrayD<f64>, order: &DimensionOrder) -> ImseqResult<Frame> {
    let mut swapper = order.placement();
    if raw.ndim() != swapper.len() {
        return Err(ImseqError::config(format!(
            "raw frame has rank {} but dim_order '{order}' declares {} spatial axes",
            raw.ndim(),
            swapper.len()
        )));
    }
    let mut frame = raw;
    for i in 0..swapper.len() {
        let rel = swapper[i..]
            .iter()
            .enumerate()
            .min_by_key(|&(_, &target)| target)
            .map(|(rel, _)| rel)
            .unwrap_or(0);
        let idx = i + rel;
        if idx != i {
            swapper.swap(i, idx);
            frame.swap_axes(i, idx);
        }
    }
    if !order.has_planes() {
        frame = frame.insert_axis(Axis(0));
    }
    if !order.has_channels() {
        let rank = frame.ndim();
        frame = frame.insert_axis(Axis(rank));
    }
    frame
        .into_dimensionality::<Ix4>()
        .map_err(|e| ImseqError::config(format!("frame is not rank 4 after reordering: {e}")))
}
