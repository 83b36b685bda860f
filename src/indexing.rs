use ndarray::Slice;

use crate::{
    error::{ImseqError, ImseqResult},
    frame::Frame,
};

/// Per-axis selector. Negative values count from the end of the axis, as in
/// `ndarray::Slice`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Selector {
    All,
    Index(isize),
    Range {
        start: Option<isize>,
        stop: Option<isize>,
        #[serde(default = "default_step")]
        step: isize,
    },
}

fn default_step() -> isize {
    1
}

impl Selector {
    pub fn range(start: impl Into<Option<isize>>, stop: impl Into<Option<isize>>) -> Self {
        Self::Range {
            start: start.into(),
            stop: stop.into(),
            step: 1,
        }
    }

    pub fn stepped(
        start: impl Into<Option<isize>>,
        stop: impl Into<Option<isize>>,
        step: isize,
    ) -> Self {
        Self::Range {
            start: start.into(),
            stop: stop.into(),
            step,
        }
    }

    /// Rewrite a bare integer as the equivalent single-element range so that
    /// applying the selector never collapses an axis.
    fn normalized(self) -> Self {
        match self {
            Self::Index(i) => Self::Range {
                start: Some(i),
                // i == -1 must select through the end of the axis.
                stop: if i == -1 { None } else { Some(i + 1) },
                step: 1,
            },
            other => other,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Concrete axis positions selected out of `[0, len)`.
    pub fn select(&self, len: usize) -> ImseqResult<Vec<usize>> {
        match self {
            Self::All => Ok((0..len).collect()),
            Self::Index(i) => Ok(vec![resolve_index(*i, len)?]),
            Self::Range { start, stop, step } => {
                if *step < 1 {
                    return Err(ImseqError::config(format!(
                        "selector step must be >= 1, got {step}"
                    )));
                }
                let n = len as isize;
                let clamp = |v: isize| {
                    if v < 0 { (v + n).max(0) } else { v.min(n) }
                };
                let lo = start.map(clamp).unwrap_or(0);
                let hi = stop.map(clamp).unwrap_or(n);
                Ok((lo..hi.max(lo))
                    .step_by(*step as usize)
                    .map(|v| v as usize)
                    .collect())
            }
        }
    }

    /// Equivalent `ndarray` slice for in-frame application.
    pub fn to_ndslice(&self) -> Slice {
        match self {
            Self::All => Slice::new(0, None, 1),
            Self::Index(i) => Slice::new(*i, if *i == -1 { None } else { Some(*i + 1) }, 1),
            Self::Range { start, stop, step } => Slice::new(start.unwrap_or(0), *stop, *step),
        }
    }
}

fn resolve_index(i: isize, len: usize) -> ImseqResult<usize> {
    let n = len as isize;
    let resolved = if i < 0 { i + n } else { i };
    if resolved < 0 || resolved >= n {
        return Err(ImseqError::config(format!(
            "index {i} out of range for axis of length {len}"
        )));
    }
    Ok(resolved as usize)
}

/// Exactly five per-axis selectors, in (time, plane, row, column, channel)
/// order. All selectors are kept in normalized form: a bare integer becomes a
/// single-element range at construction, so slicing preserves rank 5.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IndexSpec([Selector; 5]);

impl IndexSpec {
    pub fn all() -> Self {
        Self([
            Selector::All,
            Selector::All,
            Selector::All,
            Selector::All,
            Selector::All,
        ])
    }

    pub fn new(selectors: [Selector; 5]) -> Self {
        Self(selectors.map(Selector::normalized))
    }

    /// Build from a partial selector list, padding trailing axes with `All`.
    /// More than five selectors is a configuration error.
    pub fn from_selectors(selectors: Vec<Selector>) -> ImseqResult<Self> {
        if selectors.len() > 5 {
            return Err(ImseqError::config(format!(
                "index spec has {} selectors; a sequence has only 5 axes",
                selectors.len()
            )));
        }
        let mut spec = Self::all();
        for (axis, sel) in selectors.into_iter().enumerate() {
            spec.0[axis] = sel.normalized();
        }
        Ok(spec)
    }

    pub fn with_time(mut self, sel: Selector) -> Self {
        self.0[0] = sel.normalized();
        self
    }

    pub fn with_planes(mut self, sel: Selector) -> Self {
        self.0[1] = sel.normalized();
        self
    }

    pub fn with_rows(mut self, sel: Selector) -> Self {
        self.0[2] = sel.normalized();
        self
    }

    pub fn with_columns(mut self, sel: Selector) -> Self {
        self.0[3] = sel.normalized();
        self
    }

    pub fn with_channels(mut self, sel: Selector) -> Self {
        self.0[4] = sel.normalized();
        self
    }

    pub fn time(&self) -> &Selector {
        &self.0[0]
    }

    pub fn channels(&self) -> &Selector {
        &self.0[4]
    }

    pub fn selectors(&self) -> &[Selector; 5] {
        &self.0
    }

    /// True when every spatial (non-time) selector is `All`.
    pub fn is_spatial_identity(&self) -> bool {
        self.0[1..].iter().all(Selector::is_all)
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().all(Selector::is_all)
    }

    /// Check every selector for a usable step. Invoked when a spec is bound
    /// to a sequence, so a bad spatial step surfaces as a configuration
    /// error instead of a panic when the first frame is pulled.
    pub fn validate(&self) -> ImseqResult<()> {
        for sel in &self.0 {
            if let Selector::Range { step, .. } = sel {
                if *step < 1 {
                    return Err(ImseqError::config(format!(
                        "selector step must be >= 1, got {step}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Split off the time selector, leaving a spec that selects all times.
    pub fn split_time(&self) -> (Selector, IndexSpec) {
        let mut rest = self.clone();
        let time = std::mem::replace(&mut rest.0[0], Selector::All);
        (time, rest)
    }

    /// Apply the four spatial selectors to a single frame.
    pub fn apply_to_frame(&self, frame: &Frame) -> Frame {
        frame
            .slice_each_axis(|ax| self.0[ax.axis.index() + 1].to_ndslice())
            .to_owned()
    }
}
