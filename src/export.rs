//! Asynchronous export of a rendered preview: lossless PNG or paginated
//! A4 PDF.
//!
//! Only one export may be in flight at a time; a request arriving while one
//! runs is dropped silently (`Ok(None)`), never queued. The in-flight guard
//! and the export-control affordances are released by a drop guard, so they
//! run on every exit path, success or failure.

use crate::error::{Error, Result};
use crate::host::{ExportControls, NoopControls, SaveSink};
use crate::preview::PreviewDocument;
use crate::rendering::{Raster, RasterOptions, Rasterizer};
use crate::DocumentKind;
use chrono::Local;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A4 portrait, in millimetres.
pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;

const MM_TO_PT: f64 = 72.0 / 25.4;

/// Page-splitting arithmetic for a raster scaled to the fixed page width.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width_mm: f64,
    /// Proportional height of the scaled raster
    pub height_mm: f64,
    pub page_height_mm: f64,
    pub pages: u32,
}

impl PageLayout {
    /// Vertical offset of the full image on page `i` (0-indexed); the page
    /// boundary clips the visible slice.
    pub fn offset_mm(&self, page_index: u32) -> f64 {
        -(page_index as f64) * self.page_height_mm
    }
}

/// Compute the page split for a raster of the given pixel size.
pub fn paginate(raster_width: u32, raster_height: u32) -> PageLayout {
    let height_mm = raster_height as f64 * PAGE_WIDTH_MM / raster_width.max(1) as f64;
    let pages = if height_mm > PAGE_HEIGHT_MM {
        (height_mm / PAGE_HEIGHT_MM).ceil() as u32
    } else {
        1
    };
    PageLayout {
        width_mm: PAGE_WIDTH_MM,
        height_mm,
        page_height_mm: PAGE_HEIGHT_MM,
        pages,
    }
}

/// A flattened still-image export.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A paginated document export.
#[derive(Debug, Clone)]
pub struct PdfArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub layout: PageLayout,
}

/// Releases the in-flight flag and restores the export affordances when
/// dropped, regardless of which branch executed.
struct FlightGuard {
    flag: Arc<AtomicBool>,
    controls: Arc<dyn ExportControls>,
}

impl FlightGuard {
    fn acquire(flag: &Arc<AtomicBool>, controls: &Arc<dyn ExportControls>) -> Option<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        controls.lock();
        Some(Self {
            flag: Arc::clone(flag),
            controls: Arc::clone(controls),
        })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.controls.restore();
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Flattens a finalized preview into image or PDF artifacts and hands them
/// to the save sink.
pub struct DocumentExporter {
    rasterizer: Arc<dyn Rasterizer>,
    sink: Arc<dyn SaveSink>,
    controls: Arc<dyn ExportControls>,
    options: RasterOptions,
    in_flight: Arc<AtomicBool>,
}

impl DocumentExporter {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, sink: Arc<dyn SaveSink>) -> Self {
        Self {
            rasterizer,
            sink,
            controls: Arc::new(NoopControls::new()),
            options: RasterOptions::default(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_controls(mut self, controls: Arc<dyn ExportControls>) -> Self {
        self.controls = controls;
        self
    }

    pub fn with_options(mut self, options: RasterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Flatten the preview to a lossless PNG and deliver it to the sink.
    /// Returns `Ok(None)` when another export is already in flight.
    pub async fn export_image(&self, doc: &PreviewDocument) -> Result<Option<ImageArtifact>> {
        let _guard = match FlightGuard::acquire(&self.in_flight, &self.controls) {
            Some(g) => g,
            None => {
                log::debug!("image export requested while another export is in flight; dropped");
                return Ok(None);
            }
        };

        let raster = self.capture(doc).await?;
        let (width, height) = (raster.width, raster.height);
        let bytes = tokio::task::spawn_blocking(move || encode_png(&raster.pixels))
            .await
            .map_err(|e| Error::EncodingFailure(e.to_string()))??;

        let filename = export_filename(doc.kind, "png");
        self.sink.save(&filename, &bytes)?;
        log::debug!("exported image {filename} ({} bytes)", bytes.len());
        Ok(Some(ImageArtifact {
            filename,
            bytes,
            width,
            height,
        }))
    }

    /// Flatten the preview to a paginated A4 PDF and deliver it to the
    /// sink. Returns `Ok(None)` when another export is already in flight.
    pub async fn export_pdf(&self, doc: &PreviewDocument) -> Result<Option<PdfArtifact>> {
        let _guard = match FlightGuard::acquire(&self.in_flight, &self.controls) {
            Some(g) => g,
            None => {
                log::debug!("pdf export requested while another export is in flight; dropped");
                return Ok(None);
            }
        };

        let raster = self.capture(doc).await?;
        let layout = paginate(raster.width, raster.height);
        let assembly_layout = layout.clone();
        let bytes = tokio::task::spawn_blocking(move || assemble_pdf(&raster, &assembly_layout))
            .await
            .map_err(|e| Error::AssemblyFailure(e.to_string()))??;

        let filename = export_filename(doc.kind, "pdf");
        self.sink.save(&filename, &bytes)?;
        log::debug!(
            "exported pdf {filename} ({} pages, {} bytes)",
            layout.pages,
            bytes.len()
        );
        Ok(Some(PdfArtifact {
            filename,
            bytes,
            layout,
        }))
    }

    /// Rasterize on a blocking worker, bounded by the configured timeout.
    async fn capture(&self, doc: &PreviewDocument) -> Result<Raster> {
        let rasterizer = Arc::clone(&self.rasterizer);
        let doc = doc.clone();
        let opts = self.options.clone();
        let bound = Duration::from_millis(opts.timeout_ms);

        let task = tokio::task::spawn_blocking(move || rasterizer.rasterize(&doc, &opts));
        match tokio::time::timeout(bound, task).await {
            Err(_) => Err(Error::Timeout(self.options.timeout_ms)),
            Ok(Err(join)) => Err(Error::RasterizationFailure(join.to_string())),
            Ok(Ok(res)) => res,
        }
    }
}

/// `{docLabel}_{YYYY-MM-DD}.{ext}`, local calendar date of the export
/// moment. The shape is load-bearing: downstream tooling matches on it.
pub fn export_filename(kind: DocumentKind, ext: &str) -> String {
    format!("{}_{}.{ext}", kind.label(), Local::now().format("%Y-%m-%d"))
}

fn encode_png(pixels: &image::RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(pixels.clone())
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .map_err(|e| Error::EncodingFailure(e.to_string()))?;
    Ok(bytes)
}

/// Assemble the paginated PDF: one shared FlateDecode RGB image XObject,
/// one page per slice. Every page places the entire un-cropped image,
/// offset upward by its page index; the page boundary does the clipping.
fn assemble_pdf(raster: &Raster, layout: &PageLayout) -> Result<Vec<u8>> {
    let mut rgb = Vec::with_capacity((raster.width * raster.height * 3) as usize);
    for px in raster.pixels.pixels() {
        rgb.extend_from_slice(&px.0[0..3]);
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&rgb)
        .map_err(|e| Error::AssemblyFailure(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::AssemblyFailure(e.to_string()))?;
    build_document(raster, layout, compressed)
}

fn build_document(raster: &Raster, layout: &PageLayout, compressed: Vec<u8>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => raster.width as i64,
            "Height" => raster.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
            "Filter" => "FlateDecode",
        },
        compressed,
    ));

    let page_w_pt = layout.width_mm * MM_TO_PT;
    let page_h_pt = layout.page_height_mm * MM_TO_PT;
    let img_h_pt = layout.height_mm * MM_TO_PT;

    let mut page_ids = Vec::with_capacity(layout.pages as usize);
    for i in 0..layout.pages {
        // PDF origin is bottom-left; shifting the image top above the page
        // top by i page-heights exposes slice i.
        let y = page_h_pt * (i as f64 + 1.0) - img_h_pt;
        let content = format!(
            "q\n{:.4} 0 0 {:.4} 0 {:.4} cm\n/Im0 Do\nQ",
            page_w_pt, img_h_pt, y
        );
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(page_w_pt),
                Object::Real(page_h_pt),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => Object::Reference(image_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => layout.pages as i64,
    });
    for id in &page_ids {
        doc.get_object_mut(*id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| Error::AssemblyFailure(e.to_string()))?
            .set("Parent", Object::Reference(pages_id));
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| Error::AssemblyFailure(e.to_string()))?;
    Ok(bytes)
}
