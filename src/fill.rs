use ndarray::Zip;

use crate::{error::ImseqResult, frame::Frame};

/// Two-pass temporal gap filling over NaN-marked pixels.
///
/// Two independent cursors over the same logical sequence are required: the
/// first is consumed up front to build a per-pixel baseline (the first
/// finite observation anywhere in the stream), the second drives lazy
/// output. Each output frame holds, per pixel, the most recent finite
/// observation; where none has been seen yet, the baseline; where the
/// baseline itself never resolved, zero.
pub fn fill_gaps<B, I>(baseline: B, frames: I) -> ImseqResult<GapFill<I>>
where
    B: Iterator<Item = ImseqResult<Frame>>,
    I: Iterator<Item = ImseqResult<Frame>>,
{
    let mut baseline = baseline;
    let mut first_obs = match baseline.next() {
        Some(frame) => Some(frame?),
        None => None,
    };
    if let Some(obs) = first_obs.as_mut() {
        for frame in baseline {
            let frame = frame?;
            Zip::from(&mut *obs).and(&frame).for_each(|o, &v| {
                if o.is_nan() {
                    *o = v;
                }
            });
            // Pixels still NaN when this cursor runs dry stay permanently
            // missing in the baseline; that degrades the fill, it is not an
            // error.
            if obs.iter().all(|v| v.is_finite()) {
                break;
            }
        }
    }
    Ok(GapFill {
        first_obs,
        most_recent: None,
        frames,
    })
}

pub struct GapFill<I> {
    first_obs: Option<Frame>,
    most_recent: Option<Frame>,
    frames: I,
}

impl<I> Iterator for GapFill<I>
where
    I: Iterator<Item = ImseqResult<Frame>>,
{
    type Item = ImseqResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = match self.frames.next()? {
            Ok(frame) => frame,
            Err(e) => return Some(Err(e)),
        };
        let recent = self
            .most_recent
            .get_or_insert_with(|| Frame::from_elem(frame.raw_dim(), f64::NAN));
        Zip::from(&mut *recent).and(&frame).for_each(|m, &v| {
            if v.is_finite() {
                *m = v;
            }
        });
        let mut out = recent.clone();
        match &self.first_obs {
            Some(first) => Zip::from(&mut out).and(first).for_each(|o, &b| {
                if o.is_nan() {
                    *o = if b.is_finite() { b } else { 0.0 };
                }
            }),
            None => out.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v }),
        }
        Some(Ok(out))
    }
}
