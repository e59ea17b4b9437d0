// Viewer demo: renders a moving synthetic 4:2:0 pattern
// Run with RUST_LOG=debug for renderer diagnostics

use std::time::Duration;

use anyhow::Result;
use yuv_surface::RenderWindow;

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 576;

fn main() -> Result<()> {
    env_logger::init();

    let handle = RenderWindow::create("yuv-surface viewer", WIDTH, HEIGHT)?;

    let mut tick = 0u32;
    while handle.is_open() {
        if handle
            .submit_frame(WIDTH, HEIGHT, test_pattern(WIDTH, HEIGHT, tick))
            .is_err()
        {
            break;
        }
        while let Some(event) = handle.try_recv_event() {
            log::debug!("Window event: {:?}", event);
        }
        tick = tick.wrapping_add(1);
        std::thread::sleep(Duration::from_millis(33));
    }
    Ok(())
}

/// Diagonal luma ramp sweeping with time, chroma split into quadrants.
fn test_pattern(width: u32, height: u32, tick: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let (cw, ch) = (w / 2, h / 2);
    let mut data = Vec::with_capacity(w * h + 2 * cw * ch);
    for row in 0..h {
        for col in 0..w {
            data.push(((col + row + tick as usize * 4) & 0xFF) as u8);
        }
    }
    for _ in 0..ch {
        for col in 0..cw {
            data.push(if col < cw / 2 { 90 } else { 170 });
        }
    }
    for row in 0..ch {
        for _ in 0..cw {
            data.push(if row < ch / 2 { 90 } else { 170 });
        }
    }
    data
}
