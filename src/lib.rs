// yuv-surface - GPU rendering of planar YUV video frames
// Library entry point

pub mod frame;
pub mod planes;
pub mod pow2;
pub mod renderer;

pub use frame::{Chroma, FrameDesc, FrameError};
pub use renderer::window::{RenderWindow, RenderWindowHandle, WindowEvent};
pub use renderer::{FrameSink, RendererError, RendererOptions, YuvRenderer};
