/// Software painter: executes paint commands at the capture scale onto an
/// opaque background.
use crate::error::Result;
use crate::preview::PreviewDocument;
use crate::rendering::layout;
use crate::rendering::paint::{self, PaintCommand};
use crate::rendering::{Raster, RasterOptions};
use image::{Rgba, RgbaImage};

/// Capture the preview at `opts.scale` against its laid-out size, with the
/// opaque background substituted for any transparency.
pub fn rasterize(doc: &PreviewDocument, opts: &RasterOptions) -> Result<Raster> {
    let laid = layout::layout_document(doc);
    let commands = paint::build_commands(&laid.nodes)?;

    let scale = opts.scale.max(0.1);
    let width = ((laid.width as f32) * scale).round().max(1.0) as u32;
    let height = ((laid.height as f32) * scale).round().max(1.0) as u32;
    let mut canvas = RgbaImage::from_pixel(width, height, opts.background);

    for command in &commands {
        match command {
            PaintCommand::SolidRect {
                x,
                y,
                width: w,
                height: h,
                rgba,
            } => {
                let color = Rgba([rgba.0, rgba.1, rgba.2, rgba.3]);
                fill_rect(&mut canvas, scaled_rect(*x, *y, *w, *h, scale), color);
            }
            PaintCommand::Blit {
                x,
                y,
                width: w,
                height: h,
                pixels,
            } => {
                blit_scaled(&mut canvas, scaled_rect(*x, *y, *w, *h, scale), pixels);
            }
        }
    }

    Ok(Raster {
        width,
        height,
        pixels: canvas,
    })
}

fn scaled_rect(x: i32, y: i32, w: u32, h: u32, scale: f32) -> (i32, i32, u32, u32) {
    (
        ((x as f32) * scale).round() as i32,
        ((y as f32) * scale).round() as i32,
        ((w as f32) * scale).round().max(1.0) as u32,
        ((h as f32) * scale).round().max(1.0) as u32,
    )
}

fn fill_rect(canvas: &mut RgbaImage, rect: (i32, i32, u32, u32), color: Rgba<u8>) {
    let (x0, y0, w, h) = rect;
    for y in y0.max(0)..(y0 + h as i32).min(canvas.height() as i32) {
        for x in x0.max(0)..(x0 + w as i32).min(canvas.width() as i32) {
            blend(canvas.get_pixel_mut(x as u32, y as u32), color);
        }
    }
}

/// Nearest-sample scaled blit with alpha-over compositing.
fn blit_scaled(canvas: &mut RgbaImage, dest: (i32, i32, u32, u32), src: &RgbaImage) {
    let (x0, y0, dw, dh) = dest;
    let (sw, sh) = (src.width(), src.height());
    if sw == 0 || sh == 0 {
        return;
    }
    for dy in 0..dh {
        let ty = y0 + dy as i32;
        if ty < 0 || ty >= canvas.height() as i32 {
            continue;
        }
        let sy = ((dy as u64 * sh as u64) / dh as u64).min(sh as u64 - 1) as u32;
        for dx in 0..dw {
            let tx = x0 + dx as i32;
            if tx < 0 || tx >= canvas.width() as i32 {
                continue;
            }
            let sx = ((dx as u64 * sw as u64) / dw as u64).min(sw as u64 - 1) as u32;
            let px = *src.get_pixel(sx, sy);
            blend(canvas.get_pixel_mut(tx as u32, ty as u32), px);
        }
    }
}

/// Standard source-over blend; the canvas starts fully opaque, so the
/// output never carries transparency.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let a = src.0[3] as u32;
    if a == 0 {
        return;
    }
    if a == 255 {
        *dst = src;
        return;
    }
    let inv = 255 - a;
    for c in 0..3 {
        dst.0[c] = ((src.0[c] as u32 * a + dst.0[c] as u32 * inv) / 255) as u8;
    }
    dst.0[3] = 255;
}
