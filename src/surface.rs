//! Raster signing surfaces: RGBA pixel grids with a blank scan and a
//! scaled cross-surface transfer.
//!
//! A surface is owned by whoever mounted it (normally the
//! [`SigningSession`](crate::session::SigningSession)); stroke capture and
//! the emptiness check borrow it, they never copy it implicitly.

use crate::error::{Error, Result};
use image::{Rgba, RgbaImage};

/// A fixed-size RGBA raster, device-pixel-ratio aware.
///
/// Logical width/height are what callers draw against; the backing store is
/// `logical × dpr` physical pixels. Created fully transparent; `clear`
/// returns it to that state.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixels: RgbaImage,
    logical_width: u32,
    logical_height: u32,
    dpr: f32,
    has_ink: bool,
}

impl RasterSurface {
    /// Create a blank surface of `width × height` logical units at the
    /// given device pixel ratio.
    pub fn new(width: u32, height: u32, dpr: f32) -> Self {
        let dpr = if dpr > 0.0 { dpr } else { 1.0 };
        let pw = ((width as f32) * dpr).round().max(1.0) as u32;
        let ph = ((height as f32) * dpr).round().max(1.0) as u32;
        Self {
            pixels: RgbaImage::new(pw, ph),
            logical_width: width,
            logical_height: height,
            dpr,
            has_ink: false,
        }
    }

    pub fn logical_width(&self) -> u32 {
        self.logical_width
    }

    pub fn logical_height(&self) -> u32 {
        self.logical_height
    }

    /// Physical (backing-store) width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Physical (backing-store) height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Erase all pixel content and drop the ink affordance hint.
    ///
    /// Safe at any time, including mid-stroke: an in-progress stroke session
    /// is left active — clearing affects pixels, not session state.
    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
        self.has_ink = false;
    }

    /// Full-buffer blank scan: `true` iff every pixel is exactly
    /// `(0,0,0,0)`, the initial-clear state. Short-circuits on the first
    /// non-blank pixel. No minimum-ink-area heuristic: a single touched
    /// pixel anywhere counts as signed.
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|px| px.0 == [0, 0, 0, 0])
    }

    /// Whether any stroke has landed since the last clear. This is the
    /// "has ink" visual affordance hint the UI host reads to flip borders;
    /// it is a hint, not the presence gate — the gate is `is_blank`.
    pub fn has_ink(&self) -> bool {
        self.has_ink
    }

    pub(crate) fn mark_inked(&mut self) {
        self.has_ink = true;
    }

    /// Freeze the surface into lossless PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(self.pixels.clone())
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .map_err(|e| Error::EncodingFailure(e.to_string()))?;
        Ok(bytes)
    }
}

/// Copy all ink from `source` onto `target` with independent axis scaling.
///
/// Used when signing happened on an auxiliary (rotated or enlarged) surface
/// and must be committed back onto the form field. The target is cleared
/// first; scale factors are `target.width / source.width` and
/// `target.height / source.height`. The mapping is a pure per-pixel inverse
/// transform, so no scale state can leak into subsequent draws.
///
/// A blank source yields a blank target; that is not an error — the
/// emptiness check at the session level is the actual gate.
pub fn transfer(source: &RasterSurface, target: &mut RasterSurface) {
    target.clear();

    let (sw, sh) = (source.width(), source.height());
    let (tw, th) = (target.width(), target.height());
    if sw == 0 || sh == 0 {
        return;
    }

    for ty in 0..th {
        // Inverse map: which source pixel covers this target pixel
        let sy = ((ty as u64 * sh as u64) / th as u64).min(sh as u64 - 1) as u32;
        for tx in 0..tw {
            let sx = ((tx as u64 * sw as u64) / tw as u64).min(sw as u64 - 1) as u32;
            let px = *source.pixels().get_pixel(sx, sy);
            if px.0 != [0, 0, 0, 0] {
                target.pixels_mut().put_pixel(tx, ty, px);
            }
        }
    }

    if source.has_ink() {
        target.mark_inked();
    }
}
