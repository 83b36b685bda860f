use std::str::FromStr;

use crate::{
    error::{ImseqError, ImseqResult},
    fill::fill_gaps,
    frame::Frame,
    sequence::Sequence,
};

/// Output kinds understood by the export driver. The TIFF kinds are consumed
/// by caller-supplied sinks; the crate ships an HDF5 sink behind the `hdf5`
/// feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    Tiff16,
    Tiff8,
    Hdf5,
}

impl ExportKind {
    pub fn bit_depth(&self) -> u32 {
        match self {
            Self::Tiff16 | Self::Hdf5 => 16,
            Self::Tiff8 => 8,
        }
    }
}

impl FromStr for ExportKind {
    type Err = ImseqError;

    fn from_str(s: &str) -> ImseqResult<Self> {
        match s {
            "TIFF16" => Ok(Self::Tiff16),
            "TIFF8" => Ok(Self::Tiff8),
            "HDF5" => Ok(Self::Hdf5),
            other => Err(ImseqError::config(format!(
                "unrecognized output format '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    /// Route frames through the two-pass gap filler, feeding both of its
    /// cursors from the exported sequence.
    pub fill_gaps: bool,
    /// Rescale each frame's dynamic range to the full target depth before
    /// conversion; otherwise values are clamped.
    pub scale_values: bool,
    /// One label per channel, attached as container metadata. Only the
    /// hierarchical output kind carries metadata.
    pub channel_names: Option<Vec<String>>,
}

/// A sink consuming the depth-converted frame stream.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> ImseqResult<()>;

    fn finish(&mut self) -> ImseqResult<()> {
        Ok(())
    }
}

/// Rescale a frame so its maximum maps to the top of the target depth.
pub fn scale_to_depth(frame: &Frame, bits: u32) -> Frame {
    let top = (2f64.powi(bits as i32)) - 1.0;
    let max = frame.iter().copied().filter(|v| v.is_finite()).fold(0.0, f64::max);
    if max <= 0.0 {
        return Frame::zeros(frame.raw_dim());
    }
    frame.mapv(|v| if v.is_finite() { (v * top / max).round() } else { 0.0 })
}

/// Clamp a frame into the representable range of the target depth.
pub fn clamp_to_depth(frame: &Frame, bits: u32) -> Frame {
    let top = (2f64.powi(bits as i32)) - 1.0;
    frame.mapv(|v| if v.is_finite() { v.clamp(0.0, top).round() } else { 0.0 })
}

/// Stream a sequence into a sink, applying the requested options. The sink
/// is expected to match `kind`; unknown kind names are rejected when parsed.
#[tracing::instrument(skip(seq, sink))]
pub fn export_frames(
    seq: &dyn Sequence,
    kind: ExportKind,
    sink: &mut dyn FrameSink,
    options: &ExportOptions,
) -> ImseqResult<()> {
    if options.channel_names.is_some() && kind != ExportKind::Hdf5 {
        return Err(ImseqError::config(
            "channel_names are only supported for HDF5 export",
        ));
    }
    let depth = kind.bit_depth();
    let convert = |frame: &Frame| {
        if options.scale_values {
            scale_to_depth(frame, depth)
        } else {
            clamp_to_depth(frame, depth)
        }
    };
    if options.fill_gaps {
        for frame in fill_gaps(seq.frames(), seq.frames())? {
            sink.write_frame(&convert(&frame?))?;
        }
    } else {
        for frame in seq.frames() {
            sink.write_frame(&convert(&frame?))?;
        }
    }
    sink.finish()
}

/// Sink writing the stream as a (t, z, y, x, c) u16 dataset named "imaging",
/// with the dimension order and optional channel names stored as attributes.
#[cfg(feature = "hdf5")]
pub struct Hdf5Sink {
    file: hdf5::File,
    frames: Vec<ndarray::Array4<u16>>,
    channel_names: Option<Vec<String>>,
}

#[cfg(feature = "hdf5")]
impl Hdf5Sink {
    pub fn create(
        path: &std::path::Path,
        channel_names: Option<Vec<String>>,
    ) -> ImseqResult<Self> {
        let file = hdf5::File::create(path)
            .map_err(|e| ImseqError::store(format!("cannot create '{}': {e}", path.display())))?;
        Ok(Self {
            file,
            frames: Vec::new(),
            channel_names,
        })
    }
}

#[cfg(feature = "hdf5")]
impl FrameSink for Hdf5Sink {
    fn write_frame(&mut self, frame: &Frame) -> ImseqResult<()> {
        self.frames.push(frame.mapv(|v| v as u16));
        Ok(())
    }

    fn finish(&mut self) -> ImseqResult<()> {
        use hdf5::types::VarLenUnicode;
        use ndarray::Axis;

        let frames = std::mem::take(&mut self.frames);
        let Some(first) = frames.first() else {
            return Err(ImseqError::config("no frames to export"));
        };
        let (p, r, c, ch) = {
            let s = first.shape();
            (s[0], s[1], s[2], s[3])
        };
        let mut stacked = ndarray::Array5::<u16>::zeros((frames.len(), p, r, c, ch));
        for (t, frame) in frames.iter().enumerate() {
            stacked.index_axis_mut(Axis(0), t).assign(frame);
        }
        let dataset = self
            .file
            .new_dataset::<u16>()
            .shape(stacked.shape())
            .create("imaging")?;
        dataset.write(&stacked)?;
        let order: VarLenUnicode = "tzyxc"
            .parse()
            .map_err(|_| ImseqError::serde("invalid dim_order attribute"))?;
        dataset
            .new_attr::<VarLenUnicode>()
            .create("dim_order")?
            .write_scalar(&order)?;
        if let Some(names) = &self.channel_names {
            if names.len() != ch {
                return Err(ImseqError::config(format!(
                    "{} channel names supplied for {ch} channels",
                    names.len()
                )));
            }
            let values: Vec<VarLenUnicode> = names
                .iter()
                .map(|n| {
                    n.parse()
                        .map_err(|_| ImseqError::serde(format!("invalid channel name '{n}'")))
                })
                .collect::<ImseqResult<_>>()?;
            dataset
                .new_attr::<VarLenUnicode>()
                .shape(values.len())
                .create("channel_names")?
                .write_raw(&values)?;
        }
        Ok(())
    }
}
