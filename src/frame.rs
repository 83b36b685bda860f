use ndarray::Array4;

/// One dense image frame with axes (plane, row, column, channel).
///
/// Every frame produced by one sequence instance has the same shape; a
/// missing plane or channel axis in the backing data is synthesized as a
/// singleton axis so the rank is always 4.
pub type Frame = Array4<f64>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameShape {
    pub planes: usize,
    pub rows: usize,
    pub columns: usize,
    pub channels: usize,
}

impl FrameShape {
    pub fn of(frame: &Frame) -> Self {
        let s = frame.shape();
        Self {
            planes: s[0],
            rows: s[1],
            columns: s[2],
            channels: s[3],
        }
    }

    pub fn as_tuple(&self) -> (usize, usize, usize, usize) {
        (self.planes, self.rows, self.columns, self.channels)
    }
}

/// Full sequence shape: (frames, planes, rows, columns, channels).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SequenceShape {
    pub frames: usize,
    pub planes: usize,
    pub rows: usize,
    pub columns: usize,
    pub channels: usize,
}

impl SequenceShape {
    pub fn new(frames: usize, frame: FrameShape) -> Self {
        Self {
            frames,
            planes: frame.planes,
            rows: frame.rows,
            columns: frame.columns,
            channels: frame.channels,
        }
    }

    pub fn frame(&self) -> FrameShape {
        FrameShape {
            planes: self.planes,
            rows: self.rows,
            columns: self.columns,
            channels: self.channels,
        }
    }

    pub fn as_tuple(&self) -> (usize, usize, usize, usize, usize) {
        (self.frames, self.planes, self.rows, self.columns, self.channels)
    }
}
