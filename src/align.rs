use ndarray::{Array4, ArrayView2};

use crate::frame::Frame;

/// Per-frame alignment primitive: raw frame, per-row (dy, dx) displacements
/// and a target (planes, rows, columns) geometry in, aligned frame out.
/// Regions of the target with no source data are marked NaN.
pub type FrameAligner = fn(&Frame, ArrayView2<'_, i64>, (usize, usize, usize)) -> Frame;

/// Reference aligner: place each source row at its displaced position in the
/// target geometry. Rows and columns displaced outside the target are
/// dropped; target pixels never written stay NaN. Registration numerics
/// beyond integer placement are the caller's concern.
pub fn align_frame(
    frame: &Frame,
    displacements: ArrayView2<'_, i64>,
    target: (usize, usize, usize),
) -> Frame {
    let (planes, rows, columns) = target;
    let (src_planes, src_rows, src_columns, channels) = {
        let s = frame.shape();
        (s[0], s[1], s[2], s[3])
    };
    let mut out = Array4::from_elem((planes, rows, columns, channels), f64::NAN);
    for p in 0..src_planes.min(planes) {
        for r in 0..src_rows.min(displacements.shape()[0]) {
            let dy = displacements[[r, 0]];
            let dx = displacements[[r, 1]];
            let tr = r as i64 + dy;
            if tr < 0 || tr >= rows as i64 {
                continue;
            }
            for c in 0..src_columns {
                let tc = c as i64 + dx;
                if tc < 0 || tc >= columns as i64 {
                    continue;
                }
                for ch in 0..channels {
                    out[[p, tr as usize, tc as usize, ch]] = frame[[p, r, c, ch]];
                }
            }
        }
    }
    out
}
