use std::sync::Arc;

use crate::{
    error::{TokenmillError, TokenmillResult},
    surface::Surface,
};

/// Token canvas edge length in pixels.
pub const TOKEN_SIZE: u32 = 512;

/// Upper zoom bound, in percent over the minimum covering scale.
pub const MAX_ZOOM: u32 = 150;

/// Interactive framing state: maps a source image onto the 512x512 token
/// canvas through a minimum covering scale, an optional zoom and a clamped
/// pan offset.
///
/// Invariant: the scaled image always fully covers the 512x512 target, i.e.
/// `offset_x` stays within `[root_x + 512 - scaled_width, root_x]` (same for
/// y). `root_x`/`root_y` locate the target inside a larger editing surface
/// and are zero for the non-interactive path.
///
/// Mutating operations on a state whose source has been cleared are silent
/// no-ops; hosts drive these only while a framing session is active.
#[derive(Clone, Debug)]
pub struct Framing {
    source: Option<Arc<Surface>>,
    min_width: f64,
    min_height: f64,
    zoom: u32,
    offset_x: f64,
    offset_y: f64,
    root_x: f64,
    root_y: f64,
}

impl Framing {
    /// Begin framing with the target at the origin (non-interactive layout).
    pub fn begin(source: Arc<Surface>) -> Self {
        Self::begin_at(source, 0.0, 0.0)
    }

    /// Begin framing with the 512x512 target rooted at `(root_x, root_y)`.
    ///
    /// The narrower source dimension maps to exactly 512 with aspect
    /// preserved, the scaled image is centered over the target, zoom is 0.
    pub fn begin_at(source: Arc<Surface>, root_x: f64, root_y: f64) -> Self {
        let w = f64::from(source.width());
        let h = f64::from(source.height());
        let size = f64::from(TOKEN_SIZE);

        let (min_width, min_height) = if w > h {
            (w / h * size, size)
        } else {
            (size, h / w * size)
        };

        Self {
            source: Some(source),
            min_width,
            min_height,
            zoom: 0,
            offset_x: root_x + (size - min_width) / 2.0,
            offset_y: root_y + (size - min_height) / 2.0,
            root_x,
            root_y,
        }
    }

    /// Drop the source; every further mutation becomes a silent no-op.
    pub fn clear(&mut self) {
        self.source = None;
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    pub fn scaled_size(&self) -> (f64, f64) {
        let factor = self.factor();
        (self.min_width * factor, self.min_height * factor)
    }

    pub fn min_cover_size(&self) -> (f64, f64) {
        (self.min_width, self.min_height)
    }

    /// Set the zoom percentage, clamped to `[0, 150]`.
    ///
    /// The offset shifts by half the dimension delta per axis so the visual
    /// center holds, then re-clamps; at a clamped border the apparent center
    /// drifts instead.
    pub fn set_zoom(&mut self, zoom: u32) {
        if self.source.is_none() {
            return;
        }

        let (w_before, h_before) = self.scaled_size();
        self.zoom = zoom.min(MAX_ZOOM);
        let (w_after, h_after) = self.scaled_size();

        self.offset_x -= (w_after - w_before) / 2.0;
        self.offset_y -= (h_after - h_before) / 2.0;
        self.clamp_offset();
    }

    /// Move the image by a pixel delta, then re-clamp to the covering
    /// invariant. Pointer drags and touch drags both funnel into this.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        if self.source.is_none() {
            return;
        }
        self.offset_x += dx;
        self.offset_y += dy;
        self.clamp_offset();
    }

    /// Resample the source to the current scale and copy the 512x512 window
    /// at the current offset into a fresh buffer.
    pub fn render(&self) -> TokenmillResult<Surface> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| TokenmillError::state("framing has no source image"))?;

        let (scaled_w, scaled_h) = self.scaled_size();
        let scaled = source.resampled(scaled_w.round() as u32, scaled_h.round() as u32)?;

        let mut out = Surface::new(TOKEN_SIZE, TOKEN_SIZE)?;
        out.draw_over(
            &scaled,
            (self.offset_x - self.root_x).round() as i64,
            (self.offset_y - self.root_y).round() as i64,
        );
        Ok(out)
    }

    fn factor(&self) -> f64 {
        f64::from(100 + self.zoom) / 100.0
    }

    fn clamp_offset(&mut self) {
        let size = f64::from(TOKEN_SIZE);
        let (scaled_w, scaled_h) = self.scaled_size();
        self.offset_x = self
            .offset_x
            .clamp(self.root_x + size - scaled_w, self.root_x);
        self.offset_y = self
            .offset_y
            .clamp(self.root_y + size - scaled_h, self.root_y);
    }
}

/// Non-interactive framing: minimum covering scale, centered, no zoom or pan.
pub fn auto_frame(source: Arc<Surface>) -> TokenmillResult<Surface> {
    Framing::begin(source).render()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(w: u32, h: u32) -> Arc<Surface> {
        Arc::new(Surface::filled(w, h, [90, 120, 150, 255]).unwrap())
    }

    fn covering_bounds_hold(f: &Framing) -> bool {
        let (w, h) = f.scaled_size();
        let (x, y) = f.offset();
        let eps = 1e-9;
        x <= eps && x >= 512.0 - w - eps && y <= eps && y >= 512.0 - h - eps
    }

    #[test]
    fn begin_landscape_maps_height_to_512() {
        let f = Framing::begin(src(1000, 500));
        let (mw, mh) = f.min_cover_size();
        assert!((mw - 1024.0).abs() < 1e-9);
        assert!((mh - 512.0).abs() < 1e-9);
    }

    #[test]
    fn begin_portrait_maps_width_to_512() {
        let f = Framing::begin(src(500, 1000));
        let (mw, mh) = f.min_cover_size();
        assert!((mw - 512.0).abs() < 1e-9);
        assert!((mh - 1024.0).abs() < 1e-9);
    }

    #[test]
    fn begin_centers_the_overhang() {
        let f = Framing::begin(src(1000, 500));
        let (x, y) = f.offset();
        assert!((x - (512.0 - 1024.0) / 2.0).abs() < 1e-9);
        assert!((y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_is_clamped_to_150() {
        let mut f = Framing::begin(src(800, 800));
        f.set_zoom(400);
        assert_eq!(f.zoom(), 150);
        assert!(covering_bounds_hold(&f));
    }

    #[test]
    fn zoom_twice_is_idempotent() {
        let mut f = Framing::begin(src(1000, 700));
        f.set_zoom(40);
        let offset = f.offset();
        let size = f.scaled_size();
        f.set_zoom(40);
        assert_eq!(f.offset(), offset);
        assert_eq!(f.scaled_size(), size);
    }

    #[test]
    fn zoom_preserves_center_when_unclamped() {
        let mut f = Framing::begin(src(1000, 1000));
        f.set_zoom(50);
        // Centered before and after: offset = (512 - scaled) / 2.
        let (w, _) = f.scaled_size();
        let (x, _) = f.offset();
        assert!((x - (512.0 - w) / 2.0).abs() < 1e-9);
        assert!(covering_bounds_hold(&f));
    }

    #[test]
    fn every_zoom_value_respects_covering_bounds() {
        let mut f = Framing::begin(src(900, 600));
        f.pan(-10_000.0, 10_000.0);
        for z in 0..=150 {
            f.set_zoom(z);
            assert!(covering_bounds_hold(&f), "zoom {z} broke the invariant");
        }
    }

    #[test]
    fn pan_clamps_to_borders() {
        let mut f = Framing::begin(src(1000, 500));
        f.pan(10_000.0, 10_000.0);
        let (x, y) = f.offset();
        assert_eq!(x, 0.0);
        assert_eq!(y, 0.0);

        f.pan(-10_000.0, -10_000.0);
        let (x, y) = f.offset();
        let (w, h) = f.scaled_size();
        assert!((x - (512.0 - w)).abs() < 1e-9);
        assert!((y - (512.0 - h)).abs() < 1e-9);
    }

    #[test]
    fn square_source_pan_is_fully_pinned() {
        let mut f = Framing::begin(src(640, 640));
        f.pan(37.0, -11.0);
        assert_eq!(f.offset(), (0.0, 0.0));
    }

    #[test]
    fn cleared_state_ignores_mutations() {
        let mut f = Framing::begin(src(1000, 500));
        f.clear();
        let before = (f.offset(), f.zoom());
        f.pan(50.0, 50.0);
        f.set_zoom(80);
        assert_eq!((f.offset(), f.zoom()), before);
        assert!(f.render().is_err());
    }

    #[test]
    fn root_offsets_shift_the_clamp_window() {
        let mut f = Framing::begin_at(src(1000, 500), 100.0, 40.0);
        f.pan(10_000.0, 10_000.0);
        assert_eq!(f.offset(), (100.0, 40.0));
        f.pan(-10_000.0, -10_000.0);
        let (w, _) = f.scaled_size();
        let (x, y) = f.offset();
        assert!((x - (100.0 + 512.0 - w)).abs() < 1e-9);
        assert!((y - 40.0).abs() < 1e-9);
    }

    #[test]
    fn fresh_square_512_render_is_the_source_itself() {
        let source = src(512, 512);
        let framed = auto_frame(source.clone()).unwrap();
        assert_eq!(framed.data(), source.data());
    }

    #[test]
    fn render_covers_every_pixel() {
        let framed = auto_frame(src(1000, 640)).unwrap();
        assert!(
            framed
                .data()
                .chunks_exact(4)
                .all(|px| px[3] == 255)
        );
    }
}
