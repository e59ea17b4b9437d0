// Software fallback renderer
// Copies display-ready RGBA pixels straight into a memory surface

use super::{FrameSink, RendererError, RendererOptions};
use crate::frame::FrameError;

/// Plain RGBA pixel surface backing the fallback path.
pub struct PixelSurface {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PixelSurface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }
}

/// Degraded-environment path used when no GPU adapter exists.
///
/// Performs no colorspace work: frames submitted here must already be RGBA
/// at the logical dimensions.
pub struct SoftwareRenderer {
    surface: PixelSurface,
}

impl SoftwareRenderer {
    pub fn new(options: &RendererOptions) -> Self {
        Self {
            surface: PixelSurface::new(options.width, options.height),
        }
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }
}

impl FrameSink for SoftwareRenderer {
    fn submit(&mut self, width: u32, height: u32, data: &[u8]) -> Result<(), RendererError> {
        if data.is_empty() {
            return Ok(());
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(FrameError::MalformedLength {
                width,
                height,
                len: data.len(),
            }
            .into());
        }
        if self.surface.width != width || self.surface.height != height {
            log::debug!("Fallback surface resized to {}x{}", width, height);
            self.surface = PixelSurface::new(width, height);
        }
        self.surface.pixels.copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(width: u32, height: u32) -> SoftwareRenderer {
        SoftwareRenderer::new(&RendererOptions {
            width,
            height,
            ..Default::default()
        })
    }

    #[test]
    fn test_verbatim_copy() {
        let mut r = renderer(2, 2);
        let data: Vec<u8> = (0..16).collect();
        r.submit(2, 2, &data).unwrap();
        assert_eq!(r.surface().pixels, data);
    }

    #[test]
    fn test_empty_buffer_is_noop() {
        let mut r = renderer(2, 2);
        r.submit(2, 2, &vec![7u8; 16]).unwrap();
        r.submit(2, 2, &[]).unwrap();
        assert_eq!(r.surface().pixels, vec![7u8; 16]);
    }

    #[test]
    fn test_resizes_on_dimension_change() {
        let mut r = renderer(2, 2);
        r.submit(4, 2, &vec![1u8; 32]).unwrap();
        assert_eq!(r.surface().width, 4);
        assert_eq!(r.surface().height, 2);
        assert_eq!(r.surface().pixels.len(), 32);
    }

    #[test]
    fn test_rejects_malformed_length() {
        let mut r = renderer(2, 2);
        let err = r.submit(2, 2, &[0u8; 15]).unwrap_err();
        assert!(matches!(err, RendererError::MalformedFrame(_)));
        // Surface untouched
        assert_eq!(r.surface().pixels, vec![0u8; 16]);
    }
}
