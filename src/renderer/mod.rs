// Frame renderer module
// GPU YUV->RGB compositing with a CPU blit fallback

pub mod hardware;
pub mod software;
pub mod window;

pub use hardware::HardwareRenderer;
pub use software::{PixelSurface, SoftwareRenderer};

use std::sync::Arc;

use thiserror::Error;

use crate::frame::{Chroma, FrameError};

#[derive(Error, Debug)]
pub enum RendererError {
    #[error("Failed to initialize renderer: {0}")]
    InitError(String),
    #[error("Render failed: {0}")]
    RenderError(String),
    #[error("Window error: {0}")]
    WindowError(String),
    #[error("GPU not available: {0}")]
    GpuNotAvailable(String),
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] FrameError),
}

/// Construction options for [`YuvRenderer`].
#[derive(Clone)]
pub struct RendererOptions {
    /// Initial logical frame width.
    pub width: u32,
    /// Initial logical frame height.
    pub height: u32,
    /// Initial chroma subsampling mode.
    pub chroma: Chroma,
    /// Window to present into. When absent the renderer draws to an
    /// offscreen canvas readable via [`YuvRenderer::read_rgba`].
    pub window: Option<Arc<winit::window::Window>>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 320,
            chroma: Chroma::Yuv420,
            window: None,
        }
    }
}

/// Common submit-frame interface over the hardware and software paths.
pub trait FrameSink {
    /// Submit one frame and update the output surface.
    ///
    /// An empty buffer is a no-op. A buffer whose length matches no known
    /// layout for the given dimensions is rejected without touching the
    /// surface.
    fn submit(&mut self, width: u32, height: u32, data: &[u8]) -> Result<(), RendererError>;
}

enum Backend {
    Hardware(HardwareRenderer),
    Software(SoftwareRenderer),
}

/// Planar-frame renderer with the backend fixed at construction.
///
/// Owns either the wgpu compositing path or, when no adapter can be
/// acquired, the plain RGBA blitting fallback. One instance per output
/// surface; calls must arrive from a single thread.
pub struct YuvRenderer {
    backend: Backend,
}

impl YuvRenderer {
    /// Probe for a GPU and build the renderer.
    ///
    /// Adapter acquisition failure downgrades to the software path with a
    /// warning. Any other initialization failure (device, surface, pipeline)
    /// is fatal and propagates.
    pub fn new(options: RendererOptions) -> Result<Self, RendererError> {
        match pollster::block_on(HardwareRenderer::new(&options)) {
            Ok(renderer) => Ok(Self {
                backend: Backend::Hardware(renderer),
            }),
            Err(RendererError::GpuNotAvailable(reason)) => {
                log::warn!("GPU not available ({}), using software blitting", reason);
                Ok(Self {
                    backend: Backend::Software(SoftwareRenderer::new(&options)),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Submit one frame; see [`FrameSink::submit`].
    pub fn submit(&mut self, width: u32, height: u32, data: &[u8]) -> Result<(), RendererError> {
        match &mut self.backend {
            Backend::Hardware(renderer) => renderer.submit(width, height, data),
            Backend::Software(renderer) => renderer.submit(width, height, data),
        }
    }

    /// Whether the hardware path is in use.
    pub fn is_accelerated(&self) -> bool {
        matches!(self.backend, Backend::Hardware(_))
    }

    /// Dimensions of the output surface: padded texture size on the
    /// hardware path, logical size on the fallback.
    pub fn output_size(&self) -> (u32, u32) {
        match &self.backend {
            Backend::Hardware(renderer) => renderer.padded_size(),
            Backend::Software(renderer) => {
                let surface = renderer.surface();
                (surface.width, surface.height)
            }
        }
    }

    /// Tightly packed RGBA snapshot of the output surface.
    pub fn read_rgba(&self) -> Result<Vec<u8>, RendererError> {
        match &self.backend {
            Backend::Hardware(renderer) => renderer.read_rgba(),
            Backend::Software(renderer) => Ok(renderer.surface().pixels.clone()),
        }
    }

    /// Track a window resize; only meaningful with a window attached.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Backend::Hardware(renderer) = &mut self.backend {
            renderer.resize(width, height);
        }
    }

    /// The fallback pixel surface, if the software path is active.
    pub fn software_surface(&self) -> Option<&PixelSurface> {
        match &self.backend {
            Backend::Hardware(_) => None,
            Backend::Software(renderer) => Some(renderer.surface()),
        }
    }
}
