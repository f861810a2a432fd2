//! Rendering: block layout, paint commands, and the software rasterizer.
//!
//! Export captures the preview through the [`Rasterizer`] trait so a host
//! with a real layout engine can substitute its own capture. The built-in
//! [`BlockRasterizer`] is deterministic: it stacks the preview tree into
//! boxes, paints text runs as tone rules, and blits signature bitmaps at
//! full fidelity — which is everything the flattening pipeline and its
//! tests exercise.

pub mod layout;
pub mod paint;
pub mod raster;

use crate::error::Result;
use crate::preview::PreviewDocument;
use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};

/// A captured pixel raster of the rendered preview.
#[derive(Debug, Clone)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: RgbaImage,
}

impl Raster {
    /// Content digest of the pixel buffer, for golden tests.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.pixels.as_raw());
        hex::encode(hasher.finalize())
    }
}

/// Capture options for rasterizing a rendered region.
#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Pixel-density multiplier applied to the laid-out size
    pub scale: f32,
    /// Opaque background substituted for any transparency
    pub background: Rgba<u8>,
    /// Bound on the capture, enforced by the exporter
    pub timeout_ms: u64,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: Rgba([255, 255, 255, 255]),
            timeout_ms: 10_000,
        }
    }
}

/// Given a rendered region, produce a pixel raster. Implementations must
/// honour the scale factor and background override; embedded signature
/// images are same-origin data URLs, so inclusion is always satisfiable.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, doc: &PreviewDocument, opts: &RasterOptions) -> Result<Raster>;
}

/// The built-in deterministic software rasterizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRasterizer;

impl Rasterizer for BlockRasterizer {
    fn rasterize(&self, doc: &PreviewDocument, opts: &RasterOptions) -> Result<Raster> {
        raster::rasterize(doc, opts)
    }
}
