//! Freehand stroke capture onto a raster surface.
//!
//! Pointer and single-touch input arrive here already translated to
//! surface-local logical coordinates. The capture itself is stateless; the
//! narrowly-scoped per-surface [`StrokeSession`] is the only drawing state
//! in the crate.

use crate::surface::RasterSurface;
use crate::Point;
use image::Rgba;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

/// Fixed ink style: solid colour, logical stroke width, round caps/joins.
#[derive(Debug, Clone, Copy)]
pub struct StrokeStyle {
    /// Stroke width in logical (device-independent) units
    pub width: f32,
    pub color: Rgba<u8>,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 2.0,
            color: Rgba([0, 0, 0, 255]),
        }
    }
}

/// Per-surface ephemeral drawing state. Exactly one per surface.
///
/// Draw operations are no-ops unless `active` — a move event before any
/// press, or after a release, must not put ink down.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrokeSession {
    active: bool,
    last: Option<Point>,
}

impl StrokeSession {
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Converts a sequence of pointer positions into rendered ink.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrokeCapture {
    style: StrokeStyle,
}

impl StrokeCapture {
    pub fn new(style: StrokeStyle) -> Self {
        Self { style }
    }

    /// Pointer-down / touch-start: activate the session and record the
    /// anchor point, overwriting any prior state.
    pub fn begin(&self, session: &mut StrokeSession, point: Point) {
        session.active = true;
        session.last = Some(point);
    }

    /// Pointer-move / touch-move: draw a round-capped segment from the last
    /// point to `point`, then advance. No-op while the session is inactive.
    pub fn extend(&self, session: &mut StrokeSession, surface: &mut RasterSurface, point: Point) {
        if !session.active {
            return;
        }
        let from = match session.last {
            Some(p) => p,
            None => point,
        };
        self.draw_segment(surface, from, point);
        surface.mark_inked();
        session.last = Some(point);
    }

    /// Pointer-up / pointer-leave / touch-end: deactivate. Idempotent.
    pub fn end(&self, session: &mut StrokeSession) {
        session.active = false;
    }

    /// Stamp filled circles along the segment at one-pixel steps; round
    /// caps and joins fall out of the stamping, and the circle radius gives
    /// the stroke its width. A thin core segment keeps fast strokes
    /// gap-free at radius 1.
    fn draw_segment(&self, surface: &mut RasterSurface, from: Point, to: Point) {
        let dpr = surface.dpr();
        let (x0, y0) = (from.x * dpr, from.y * dpr);
        let (x1, y1) = (to.x * dpr, to.y * dpr);
        let radius = ((self.style.width * dpr) / 2.0).round().max(1.0) as i32;
        let color = self.style.color;

        draw_line_segment_mut(surface.pixels_mut(), (x0, y0), (x1, y1), color);

        let dist = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let steps = dist.ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let cx = (x0 + (x1 - x0) * t).round() as i32;
            let cy = (y0 + (y1 - y0) * t).round() as i32;
            draw_filled_circle_mut(surface.pixels_mut(), (cx, cy), radius, color);
        }
    }
}
