// Hardware-path rendering tests
// Each test skips itself when the host exposes no GPU adapter

use yuv_surface::renderer::HardwareRenderer;
use yuv_surface::{Chroma, FrameDesc, FrameSink, RendererError, RendererOptions, YuvRenderer};

fn headless() -> Option<HardwareRenderer> {
    match pollster::block_on(HardwareRenderer::new(&RendererOptions::default())) {
        Ok(renderer) => Some(renderer),
        Err(RendererError::GpuNotAvailable(reason)) => {
            eprintln!("skipping hardware test: {}", reason);
            None
        }
        Err(err) => panic!("renderer init failed: {}", err),
    }
}

fn yuv420_frame(width: u32, height: u32, y: u8, u: u8, v: u8) -> Vec<u8> {
    let luma = width as usize * height as usize;
    let total = FrameDesc::expected_len(width, height, Chroma::Yuv420);
    let mut data = vec![y; luma];
    data.resize(luma + (total - luma) / 2, u);
    data.resize(total, v);
    data
}

#[test]
fn test_mid_gray_renders_uniform_gray() {
    let Some(mut renderer) = headless() else { return };
    let (width, height) = (64u32, 64u32);
    renderer
        .submit(width, height, &yuv420_frame(width, height, 128, 128, 128))
        .unwrap();
    assert_eq!(renderer.padded_size(), (64, 64));

    let pixels = renderer.read_rgba().unwrap();
    assert_eq!(pixels.len(), 64 * 64 * 4);
    for px in pixels.chunks_exact(4) {
        assert_eq!(px[3], 255);
        assert!(
            px[0].abs_diff(px[1]) <= 3 && px[1].abs_diff(px[2]) <= 3,
            "tinted pixel {:?}",
            px
        );
    }
}

#[test]
fn test_luma_ramp_renders_grayscale_at_padded_resolution() {
    let Some(mut renderer) = headless() else { return };
    let (width, height) = (1024u32, 576u32);

    // Y ramps 0..255 down the rows, chroma pinned at 128
    let mut data = Vec::with_capacity((width * height * 3 / 2) as usize);
    for row in 0..height {
        let y = (row * 255 / (height - 1)) as u8;
        data.extend(std::iter::repeat_n(y, width as usize));
    }
    data.resize(FrameDesc::expected_len(width, height, Chroma::Yuv420), 128);
    assert_eq!(data.len(), 884_736);

    renderer.submit(width, height, &data).unwrap();
    assert_eq!(renderer.padded_size(), (1024, 1024));

    let pixels = renderer.read_rgba().unwrap();
    let stride = 1024usize * 4;
    let mut prev_luma = 0u8;
    for row in (32..544).step_by(64) {
        let px = &pixels[row * stride..row * stride + 4];
        // No color tint anywhere on the ramp
        assert!(
            px[0].abs_diff(px[1]) <= 3 && px[1].abs_diff(px[2]) <= 3,
            "tinted pixel {:?} at row {}",
            px,
            row
        );
        // Brightness grows down the frame
        assert!(px[0] >= prev_luma, "ramp not monotonic at row {}", row);
        prev_luma = px[0];
    }
}

#[test]
fn test_steady_state_keeps_padded_size_and_chroma_switch_survives() {
    let Some(mut renderer) = headless() else { return };
    let (width, height) = (320u32, 240u32);

    renderer
        .submit(width, height, &yuv420_frame(width, height, 64, 128, 128))
        .unwrap();
    let first = renderer.padded_size();
    assert_eq!(first, (512, 256));

    // Same dimensions again: the steady-state path, nothing re-derived
    renderer
        .submit(width, height, &yuv420_frame(width, height, 200, 128, 128))
        .unwrap();
    assert_eq!(renderer.padded_size(), first);

    // Switch to 4:2:2 input at the same logical size
    let len_422 = FrameDesc::expected_len(width, height, Chroma::Yuv422);
    let mut data = vec![128u8; len_422];
    data[..(width * height) as usize].fill(90);
    renderer.submit(width, height, &data).unwrap();
    assert_eq!(renderer.padded_size(), first);
}

#[test]
fn test_one_by_one_frame_does_not_crash() {
    let Some(mut renderer) = headless() else { return };
    renderer.submit(1, 1, &[128u8]).unwrap();
    assert_eq!(renderer.padded_size(), (1, 1));
    let pixels = renderer.read_rgba().unwrap();
    assert_eq!(pixels.len(), 4);
}

#[test]
fn test_facade_ignores_empty_and_rejects_malformed() {
    // Works on both backends: empty is always a no-op, 17 bytes never
    // matches any layout for 64x64
    let Ok(mut renderer) = YuvRenderer::new(RendererOptions::default()) else {
        eprintln!("skipping facade test: renderer init failed");
        return;
    };
    renderer.submit(64, 64, &[]).unwrap();
    let err = renderer.submit(64, 64, &[0u8; 17]).unwrap_err();
    assert!(matches!(err, RendererError::MalformedFrame(_)));
}
