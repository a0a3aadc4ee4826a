use std::sync::Arc;

use tokenmill::{Framing, Surface, auto_frame};

/// A deterministic gradient so resampling differences are visible.
fn gradient_source(width: u32, height: u32) -> Arc<Surface> {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push((x % 256) as u8);
            data.push((y % 256) as u8);
            data.push(((x + y) % 256) as u8);
            data.push(255);
        }
    }
    Arc::new(Surface::from_rgba8_straight(width, height, data).unwrap())
}

#[test]
fn min_cover_maps_narrow_side_to_512() {
    let f = Framing::begin(gradient_source(1000, 500));
    let (mw, mh) = f.min_cover_size();
    assert!((mw - (1000.0 / 500.0) * 512.0).abs() < 1e-9);
    assert!((mh - 512.0).abs() < 1e-9);

    let f = Framing::begin(gradient_source(500, 1000));
    let (mw, mh) = f.min_cover_size();
    assert!((mw - 512.0).abs() < 1e-9);
    assert!((mh - (1000.0 / 500.0) * 512.0).abs() < 1e-9);
}

#[test]
fn render_after_pan_and_zoom_leaves_no_gap_pixels() {
    let source = gradient_source(1000, 640);
    for (zoom, dx, dy) in [
        (0u32, -10_000.0, -10_000.0),
        (37, -123.4, 55.9),
        (80, 10_000.0, 10_000.0),
        (150, 3.0, -9999.0),
    ] {
        let mut f = Framing::begin(source.clone());
        f.set_zoom(zoom);
        f.pan(dx, dy);
        let framed = f.render().unwrap();
        assert_eq!((framed.width(), framed.height()), (512, 512));
        assert!(
            framed.data().chunks_exact(4).all(|px| px[3] == 255),
            "zoom {zoom} pan ({dx},{dy}) exposed background"
        );
    }
}

#[test]
fn fresh_square_render_matches_direct_resample() {
    let source = gradient_source(1000, 1000);
    let framed = auto_frame(source.clone()).unwrap();
    let direct = source.resampled(512, 512).unwrap();
    assert_eq!(framed.data(), direct.data());
}

#[test]
fn fresh_512_square_render_is_byte_identical_to_source() {
    let source = gradient_source(512, 512);
    let framed = auto_frame(source.clone()).unwrap();
    assert_eq!(framed.data(), source.data());
}

#[test]
fn same_state_renders_identically() {
    let source = gradient_source(900, 700);
    let mut f = Framing::begin(source);
    f.set_zoom(42);
    f.pan(-31.0, 17.0);
    let a = f.render().unwrap();
    let b = f.render().unwrap();
    assert_eq!(a.data(), b.data());
}

#[test]
fn setting_same_zoom_twice_changes_nothing() {
    let source = gradient_source(1000, 640);
    let mut f = Framing::begin(source);
    f.pan(-50.0, -20.0);
    f.set_zoom(60);
    let (offset, size) = (f.offset(), f.scaled_size());
    f.set_zoom(60);
    assert_eq!(f.offset(), offset);
    assert_eq!(f.scaled_size(), size);
}
