//! Plane buffers at padded texture stride
//!
//! The flat input buffer is de-interleaved into three contiguous plane
//! buffers sized for the padded texture dimensions. Because the destination
//! stride is the padded width while the source rows are the logical width,
//! the copy must walk row by row; it cannot be a single bulk copy. Bytes
//! beyond the logical region keep whatever they held before, which is fine:
//! only the valid region is ever shown.

use crate::frame::{Chroma, FrameDesc};

/// CPU staging buffers for the Y, U and V planes.
///
/// Allocated once per padded size and overwritten in place every frame, so
/// the steady-state submit path performs no allocation.
pub struct PlaneBuffers {
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
    y_width: u32,
    y_height: u32,
    uv_width: u32,
    uv_height: u32,
}

impl PlaneBuffers {
    /// Allocate plane buffers for the given padded dimensions and mode.
    ///
    /// Chroma planes are clamped to at least 1x1 so a 1x1 frame still gets
    /// valid textures.
    pub fn new(padded_width: u32, padded_height: u32, chroma: Chroma) -> Self {
        let uv_width = (padded_width / 2).max(1);
        let uv_height = match chroma {
            Chroma::Yuv420 => (padded_height / 2).max(1),
            Chroma::Yuv422 => padded_height,
        };
        Self {
            y: vec![0; padded_width as usize * padded_height as usize],
            u: vec![0; uv_width as usize * uv_height as usize],
            v: vec![0; uv_width as usize * uv_height as usize],
            y_width: padded_width,
            y_height: padded_height,
            uv_width,
            uv_height,
        }
    }

    /// Padded dimensions of the luma plane.
    pub fn y_size(&self) -> (u32, u32) {
        (self.y_width, self.y_height)
    }

    /// Padded dimensions of each chroma plane.
    pub fn uv_size(&self) -> (u32, u32) {
        (self.uv_width, self.uv_height)
    }

    /// De-interleave a flat Y/U/V buffer into the plane buffers.
    ///
    /// The source offset advances by the logical row width, the destination
    /// offset by the padded plane width. The caller must have validated the
    /// buffer length via [`FrameDesc::infer`].
    pub fn pack(&mut self, desc: &FrameDesc, data: &[u8]) {
        debug_assert_eq!(
            data.len(),
            FrameDesc::expected_len(desc.width, desc.height, desc.chroma)
        );

        let width = desc.width as usize;
        let y_stride = self.y_width as usize;
        let mut src = 0;
        let mut dst = 0;
        for _ in 0..desc.height {
            self.y[dst..dst + width].copy_from_slice(&data[src..src + width]);
            src += width;
            dst += y_stride;
        }

        let chroma_width = desc.chroma_width() as usize;
        let chroma_rows = desc.chroma_height();
        let uv_stride = self.uv_width as usize;
        for plane in [&mut self.u, &mut self.v] {
            let mut dst = 0;
            for _ in 0..chroma_rows {
                plane[dst..dst + chroma_width].copy_from_slice(&data[src..src + chroma_width]);
                src += chroma_width;
                dst += uv_stride;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(width: u32, height: u32, chroma: Chroma) -> FrameDesc {
        FrameDesc { width, height, chroma }
    }

    #[test]
    fn test_buffer_sizes_yuv420() {
        let planes = PlaneBuffers::new(1024, 1024, Chroma::Yuv420);
        assert_eq!(planes.y.len(), 1024 * 1024);
        assert_eq!(planes.uv_size(), (512, 512));
        assert_eq!(planes.u.len(), 512 * 512);
        assert_eq!(planes.v.len(), 512 * 512);
    }

    #[test]
    fn test_buffer_sizes_yuv422() {
        let planes = PlaneBuffers::new(1024, 512, Chroma::Yuv422);
        assert_eq!(planes.uv_size(), (512, 512));
        assert_eq!(planes.u.len(), 512 * 512);
    }

    #[test]
    fn test_minimum_chroma_plane() {
        // 1x1 frame: half of 1 rounds to 0, clamped back to a 1x1 plane
        let planes = PlaneBuffers::new(1, 1, Chroma::Yuv420);
        assert_eq!(planes.y.len(), 1);
        assert_eq!(planes.uv_size(), (1, 1));
        assert_eq!(planes.u.len(), 1);
    }

    #[test]
    fn test_pack_writes_at_padded_stride() {
        // 4x2 frame into 8x2 padded luma; chroma 2x1 into 4x1
        let d = desc(4, 2, Chroma::Yuv420);
        let mut planes = PlaneBuffers::new(8, 2, Chroma::Yuv420);
        let data: Vec<u8> = vec![
            1, 2, 3, 4, // y row 0
            5, 6, 7, 8, // y row 1
            9, 10, // u row 0
            11, 12, // v row 0
        ];
        planes.pack(&d, &data);
        assert_eq!(&planes.y[0..4], &[1, 2, 3, 4]);
        assert_eq!(&planes.y[8..12], &[5, 6, 7, 8]);
        assert_eq!(&planes.u[0..2], &[9, 10]);
        assert_eq!(&planes.v[0..2], &[11, 12]);
    }

    #[test]
    fn test_pack_retains_stale_padding() {
        let d = desc(4, 2, Chroma::Yuv420);
        let mut planes = PlaneBuffers::new(8, 2, Chroma::Yuv420);
        planes.y.fill(0xAA);
        planes.pack(&d, &vec![0u8; FrameDesc::expected_len(4, 2, Chroma::Yuv420)]);
        // Columns beyond the logical width are untouched
        assert_eq!(&planes.y[4..8], &[0xAA; 4]);
        assert_eq!(&planes.y[0..4], &[0; 4]);
    }

    #[test]
    fn test_steady_state_pack_does_not_reallocate() {
        let d = desc(640, 320, Chroma::Yuv420);
        let mut planes = PlaneBuffers::new(1024, 512, Chroma::Yuv420);
        let data = vec![0u8; FrameDesc::expected_len(640, 320, Chroma::Yuv420)];
        let (py, pu, pv) = (planes.y.as_ptr(), planes.u.as_ptr(), planes.v.as_ptr());
        planes.pack(&d, &data);
        planes.pack(&d, &data);
        assert_eq!(planes.y.as_ptr(), py);
        assert_eq!(planes.u.as_ptr(), pu);
        assert_eq!(planes.v.as_ptr(), pv);
    }

    #[test]
    fn test_chroma_switch_changes_plane_height() {
        // Same padded size, different mode: 4:2:2 chroma planes are twice as
        // tall and must come from a fresh allocation
        let p420 = PlaneBuffers::new(1024, 512, Chroma::Yuv420);
        let p422 = PlaneBuffers::new(1024, 512, Chroma::Yuv422);
        assert_eq!(p420.uv_size(), (512, 256));
        assert_eq!(p422.uv_size(), (512, 512));
        assert_eq!(p422.u.len(), 2 * p420.u.len());
    }

    #[test]
    fn test_pack_1x1_does_not_panic() {
        let d = desc(1, 1, Chroma::Yuv420);
        let mut planes = PlaneBuffers::new(1, 1, Chroma::Yuv420);
        planes.pack(&d, &[128]);
        assert_eq!(planes.y[0], 128);
    }
}
