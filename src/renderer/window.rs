// On-screen frame viewer
// Runs a winit event loop on its own thread; frames arrive over a channel
// through a cloneable handle

use super::{RendererError, RendererOptions, YuvRenderer};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent as WinitWindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

/// Events from the viewer window
#[derive(Debug, Clone)]
pub enum WindowEvent {
    Resized(u32, u32),
    CloseRequested,
    Focused(bool),
}

/// Command to the viewer window
enum WindowCommand {
    Frame {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    SetTitle(String),
    Close,
}

/// Handle to drive the viewer window from another thread
#[derive(Clone)]
pub struct RenderWindowHandle {
    command_tx: Sender<WindowCommand>,
    event_rx: Receiver<WindowEvent>,
    is_open: Arc<AtomicBool>,
}

impl RenderWindowHandle {
    /// Send a frame to be rendered
    pub fn submit_frame(
        &self,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Result<(), RendererError> {
        if !self.is_open.load(Ordering::Relaxed) {
            return Err(RendererError::WindowError("Window closed".to_string()));
        }
        self.command_tx
            .send(WindowCommand::Frame {
                width,
                height,
                data,
            })
            .map_err(|_| RendererError::WindowError("Failed to send frame".to_string()))
    }

    /// Set window title
    pub fn set_title(&self, title: &str) -> Result<(), RendererError> {
        self.command_tx
            .send(WindowCommand::SetTitle(title.to_string()))
            .map_err(|_| RendererError::WindowError("Failed to send command".to_string()))
    }

    /// Close the window
    pub fn close(&self) {
        let _ = self.command_tx.send(WindowCommand::Close);
    }

    /// Check if the window is still open
    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::Relaxed)
    }

    /// Try to receive a window event (non-blocking)
    pub fn try_recv_event(&self) -> Option<WindowEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive a window event (blocking)
    pub fn recv_event(&self) -> Option<WindowEvent> {
        self.event_rx.recv().ok()
    }
}

/// Viewer window state
pub struct RenderWindow {
    title: String,
    width: u32,
    height: u32,
    command_rx: Receiver<WindowCommand>,
    event_tx: Sender<WindowEvent>,
    is_open: Arc<AtomicBool>,
    window: Option<Arc<Window>>,
    renderer: Option<YuvRenderer>,
    // Retained so expose and resize events can re-present it
    last_frame: Option<(u32, u32, Vec<u8>)>,
}

impl RenderWindow {
    /// Create a viewer window and return a handle to control it
    pub fn create(
        title: &str,
        width: u32,
        height: u32,
    ) -> Result<RenderWindowHandle, RendererError> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let is_open = Arc::new(AtomicBool::new(true));
        let is_open_clone = is_open.clone();

        let title = title.to_string();

        std::thread::spawn(move || {
            let event_loop = EventLoop::new().expect("Failed to create event loop");
            event_loop.set_control_flow(ControlFlow::Poll);

            let mut app = RenderWindow {
                title,
                width,
                height,
                command_rx,
                event_tx,
                is_open: is_open_clone,
                window: None,
                renderer: None,
                last_frame: None,
            };

            event_loop.run_app(&mut app).ok();
        });

        Ok(RenderWindowHandle {
            command_tx,
            event_rx,
            is_open,
        })
    }

    fn process_commands(&mut self) {
        while let Ok(cmd) = self.command_rx.try_recv() {
            match cmd {
                WindowCommand::Frame {
                    width,
                    height,
                    data,
                } => {
                    if let Some(renderer) = &mut self.renderer {
                        if let Err(e) = renderer.submit(width, height, &data) {
                            log::error!("Failed to render frame: {}", e);
                        }
                    }
                    self.last_frame = Some((width, height, data));
                }
                WindowCommand::SetTitle(title) => {
                    if let Some(window) = &self.window {
                        window.set_title(&title);
                    }
                }
                WindowCommand::Close => {
                    self.is_open.store(false, Ordering::Relaxed);
                }
            }
        }
    }

    fn redraw_last_frame(&mut self) {
        if let (Some(renderer), Some((width, height, data))) =
            (&mut self.renderer, &self.last_frame)
        {
            if let Err(e) = renderer.submit(*width, *height, data) {
                log::error!("Failed to render frame: {}", e);
            }
        }
    }
}

impl ApplicationHandler for RenderWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(&self.title)
            .with_inner_size(PhysicalSize::new(self.width, self.height));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );

        match YuvRenderer::new(RendererOptions {
            width: self.width,
            height: self.height,
            window: Some(window.clone()),
            ..Default::default()
        }) {
            Ok(renderer) => {
                self.renderer = Some(renderer);
                log::info!("Viewer window created: {}x{}", self.width, self.height);
            }
            Err(e) => {
                log::error!("Failed to create renderer: {}", e);
            }
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WinitWindowEvent,
    ) {
        match event {
            WinitWindowEvent::CloseRequested => {
                self.is_open.store(false, Ordering::Relaxed);
                let _ = self.event_tx.send(WindowEvent::CloseRequested);
                event_loop.exit();
            }
            WinitWindowEvent::Resized(size) => {
                self.width = size.width;
                self.height = size.height;
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                }
                self.redraw_last_frame();
                let _ = self
                    .event_tx
                    .send(WindowEvent::Resized(size.width, size.height));
            }
            WinitWindowEvent::Focused(focused) => {
                let _ = self.event_tx.send(WindowEvent::Focused(focused));
            }
            WinitWindowEvent::RedrawRequested => {
                self.process_commands();
                self.redraw_last_frame();
            }
            _ => {}
        }

        if !self.is_open.load(Ordering::Relaxed) {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Drain frames even when no window events arrive
        self.process_commands();
    }
}
