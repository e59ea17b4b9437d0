//! Frame descriptors and chroma subsampling inference
//!
//! A frame arrives as a flat buffer of three concatenated planes (Y, U, V)
//! plus its logical dimensions. The subsampling mode is not carried out of
//! band; it is inferred from the buffer length, and a length matching neither
//! layout is rejected rather than guessed.

use thiserror::Error;

use crate::pow2::min_pow2;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("buffer of {len} bytes matches no supported frame layout for {width}x{height}")]
    MalformedLength { width: u32, height: u32, len: usize },
}

/// Chroma subsampling mode of a planar frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chroma {
    /// Chroma planes halved in both dimensions (buffer length 1.5 * w * h).
    Yuv420,
    /// Chroma planes halved horizontally only (buffer length 2 * w * h).
    Yuv422,
}

/// Logical dimensions and subsampling mode of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDesc {
    pub width: u32,
    pub height: u32,
    pub chroma: Chroma,
}

impl FrameDesc {
    /// Infer the subsampling mode from the buffer length.
    ///
    /// Expected lengths use integer plane arithmetic, which coincides with
    /// the 2*w*h / 1.5*w*h formulas for even dimensions and stays exact for
    /// odd ones. Widths below 2 make both layouts identical; 4:2:0 wins the
    /// tie.
    pub fn infer(width: u32, height: u32, len: usize) -> Result<Self, FrameError> {
        if len == Self::expected_len(width, height, Chroma::Yuv420) {
            Ok(Self { width, height, chroma: Chroma::Yuv420 })
        } else if len == Self::expected_len(width, height, Chroma::Yuv422) {
            Ok(Self { width, height, chroma: Chroma::Yuv422 })
        } else {
            Err(FrameError::MalformedLength { width, height, len })
        }
    }

    /// Exact buffer length for the given dimensions and mode.
    pub fn expected_len(width: u32, height: u32, chroma: Chroma) -> usize {
        let luma = width as usize * height as usize;
        let chroma_rows = match chroma {
            Chroma::Yuv420 => height / 2,
            Chroma::Yuv422 => height,
        };
        luma + 2 * (width / 2) as usize * chroma_rows as usize
    }

    /// Width of one chroma row in the input buffer.
    pub fn chroma_width(&self) -> u32 {
        self.width / 2
    }

    /// Number of chroma rows in the input buffer.
    pub fn chroma_height(&self) -> u32 {
        match self.chroma {
            Chroma::Yuv420 => self.height / 2,
            Chroma::Yuv422 => self.height,
        }
    }

    /// Power-of-two texture dimensions covering the logical size.
    pub fn padded(&self) -> (u32, u32) {
        (min_pow2(self.width), min_pow2(self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_yuv420() {
        let desc = FrameDesc::infer(1024, 576, 1024 * 576 * 3 / 2).unwrap();
        assert_eq!(desc.chroma, Chroma::Yuv420);
        assert_eq!(desc.chroma_width(), 512);
        assert_eq!(desc.chroma_height(), 288);
    }

    #[test]
    fn test_infer_yuv422() {
        let desc = FrameDesc::infer(640, 480, 640 * 480 * 2).unwrap();
        assert_eq!(desc.chroma, Chroma::Yuv422);
        assert_eq!(desc.chroma_width(), 320);
        assert_eq!(desc.chroma_height(), 480);
    }

    #[test]
    fn test_malformed_length_rejected() {
        // One byte short of a 4:2:0 frame
        let err = FrameDesc::infer(640, 480, 640 * 480 * 3 / 2 - 1).unwrap_err();
        assert_eq!(
            err,
            FrameError::MalformedLength { width: 640, height: 480, len: 640 * 480 * 3 / 2 - 1 }
        );
        // Way off
        assert!(FrameDesc::infer(640, 480, 17).is_err());
        assert!(FrameDesc::infer(640, 480, 0).is_err());
    }

    #[test]
    fn test_degenerate_tie_prefers_yuv420() {
        // A 1-wide frame has empty chroma rows, so both layouts collapse to
        // the luma plane alone.
        let desc = FrameDesc::infer(1, 1, 1).unwrap();
        assert_eq!(desc.chroma, Chroma::Yuv420);
        assert_eq!(FrameDesc::expected_len(1, 1, Chroma::Yuv420), 1);
        assert_eq!(FrameDesc::expected_len(1, 1, Chroma::Yuv422), 1);
    }

    #[test]
    fn test_odd_dimensions_stay_exact() {
        // 9x5 4:2:0: luma 45, chroma 2 * (4 * 2) = 16
        assert_eq!(FrameDesc::expected_len(9, 5, Chroma::Yuv420), 61);
        assert_eq!(FrameDesc::infer(9, 5, 61).unwrap().chroma, Chroma::Yuv420);
        // 9x5 4:2:2: luma 45, chroma 2 * (4 * 5) = 40
        assert_eq!(FrameDesc::expected_len(9, 5, Chroma::Yuv422), 85);
        assert_eq!(FrameDesc::infer(9, 5, 85).unwrap().chroma, Chroma::Yuv422);
    }

    #[test]
    fn test_padded_dimensions() {
        let desc = FrameDesc { width: 1024, height: 576, chroma: Chroma::Yuv420 };
        assert_eq!(desc.padded(), (1024, 1024));
        let desc = FrameDesc { width: 640, height: 320, chroma: Chroma::Yuv420 };
        assert_eq!(desc.padded(), (1024, 512));
    }
}
