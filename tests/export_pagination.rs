//! Export-path integration: pagination arithmetic against real artifacts,
//! the single-in-flight guard, and failure-path affordance restoration.

use inkform::host::{ExportControls, MemorySink};
use inkform::preview::{SignatureAsset, SignatureSet};
use inkform::rendering::{Raster, RasterOptions, Rasterizer};
use inkform::stroke::{StrokeCapture, StrokeSession};
use inkform::{
    DocumentExporter, DocumentKind, Error, Point, PreviewDocument, RasterSurface, SignerRole,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn inked_surface() -> RasterSurface {
    let mut surface = RasterSurface::new(300, 120, 1.0);
    let capture = StrokeCapture::default();
    let mut stroke = StrokeSession::default();
    capture.begin(&mut stroke, Point { x: 10.0, y: 10.0 });
    capture.extend(&mut stroke, &mut surface, Point { x: 80.0, y: 60.0 });
    capture.end(&mut stroke);
    surface
}

fn sample_preview(kind: DocumentKind) -> PreviewDocument {
    let mut set = SignatureSet::default();
    set.insert(SignatureAsset::from_surface(SignerRole::Client, &inked_surface()).unwrap());
    set.insert(SignatureAsset::from_surface(SignerRole::Counselor, &inked_surface()).unwrap());
    inkform::preview::build(kind, &set, chrono::Local::now().date_naive()).unwrap()
}

/// Emits a fixed-size raster regardless of the document.
struct FixedRasterizer {
    width: u32,
    height: u32,
    delay: Duration,
}

impl Rasterizer for FixedRasterizer {
    fn rasterize(&self, _doc: &PreviewDocument, opts: &RasterOptions) -> inkform::Result<Raster> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(Raster {
            width: self.width,
            height: self.height,
            pixels: image::RgbaImage::from_pixel(self.width, self.height, opts.background),
        })
    }
}

/// Always fails, for the failure-path tests.
struct FailingRasterizer;

impl Rasterizer for FailingRasterizer {
    fn rasterize(&self, _doc: &PreviewDocument, _opts: &RasterOptions) -> inkform::Result<Raster> {
        Err(Error::RasterizationFailure("layout exploded".to_string()))
    }
}

#[derive(Default)]
struct CountingControls {
    locks: AtomicU32,
    restores: AtomicU32,
}

impl ExportControls for CountingControls {
    fn lock(&self) {
        self.locks.fetch_add(1, Ordering::SeqCst);
    }
    fn restore(&self) {
        self.restores.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn tall_raster_splits_into_offset_pages() {
    // 3000 px tall at 1000 px wide → 630 mm scaled height → 3 pages
    let rasterizer = Arc::new(FixedRasterizer {
        width: 1000,
        height: 3000,
        delay: Duration::ZERO,
    });
    let sink = Arc::new(MemorySink::new());
    let exporter = DocumentExporter::new(rasterizer, sink.clone());

    let artifact = exporter
        .export_pdf(&sample_preview(DocumentKind::Counseling))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(artifact.layout.pages, 3);
    assert!((artifact.layout.height_mm - 630.0).abs() < 1e-9);
    assert_eq!(artifact.layout.offset_mm(0), 0.0);
    assert_eq!(artifact.layout.offset_mm(1), -297.0);
    assert_eq!(artifact.layout.offset_mm(2), -594.0);

    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

#[tokio::test]
async fn short_raster_emits_a_single_page() {
    let rasterizer = Arc::new(FixedRasterizer {
        width: 1000,
        height: 1000,
        delay: Duration::ZERO,
    });
    let exporter = DocumentExporter::new(rasterizer, Arc::new(MemorySink::new()));

    let artifact = exporter
        .export_pdf(&sample_preview(DocumentKind::Counseling))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(artifact.layout.pages, 1);
    assert_eq!(artifact.layout.offset_mm(0), 0.0);

    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[tokio::test]
async fn second_export_is_dropped_while_one_is_in_flight() {
    let rasterizer = Arc::new(FixedRasterizer {
        width: 400,
        height: 400,
        delay: Duration::from_millis(300),
    });
    let sink = Arc::new(MemorySink::new());
    let controls = Arc::new(CountingControls::default());
    let exporter = Arc::new(
        DocumentExporter::new(rasterizer, sink.clone())
            .with_controls(controls.clone()),
    );

    let preview = sample_preview(DocumentKind::Counseling);
    let first = {
        let exporter = exporter.clone();
        let preview = preview.clone();
        tokio::spawn(async move { exporter.export_pdf(&preview).await })
    };

    // Let the first export take the guard, then race a second request
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(exporter.is_exporting());
    let dropped = exporter.export_image(&preview).await.unwrap();
    assert!(dropped.is_none(), "mid-flight request must be a no-op");

    let artifact = first.await.unwrap().unwrap();
    assert!(artifact.is_some());
    assert!(!exporter.is_exporting());

    // Only the winning export touched the controls or the sink
    assert_eq!(controls.locks.load(Ordering::SeqCst), 1);
    assert_eq!(controls.restores.load(Ordering::SeqCst), 1);
    assert_eq!(sink.saved().len(), 1);

    // And the guard is free again for the next request
    let again = exporter.export_image(&preview).await.unwrap();
    assert!(again.is_some());
}

#[tokio::test]
async fn failed_export_restores_guard_and_controls() {
    let controls = Arc::new(CountingControls::default());
    let sink = Arc::new(MemorySink::new());
    let exporter = DocumentExporter::new(Arc::new(FailingRasterizer), sink.clone())
        .with_controls(controls.clone());

    let err = exporter
        .export_image(&sample_preview(DocumentKind::Counseling))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RasterizationFailure(_)));
    assert!(err.to_string().contains("layout exploded"));

    // No partial artifact, affordances restored, guard released
    assert!(sink.saved().is_empty());
    assert_eq!(controls.locks.load(Ordering::SeqCst), 1);
    assert_eq!(controls.restores.load(Ordering::SeqCst), 1);
    assert!(!exporter.is_exporting());
}

#[tokio::test]
async fn slow_rasterization_times_out() {
    let rasterizer = Arc::new(FixedRasterizer {
        width: 100,
        height: 100,
        delay: Duration::from_millis(500),
    });
    let exporter = DocumentExporter::new(rasterizer, Arc::new(MemorySink::new())).with_options(
        RasterOptions {
            timeout_ms: 50,
            ..Default::default()
        },
    );

    let err = exporter
        .export_image(&sample_preview(DocumentKind::Counseling))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(50)));
    assert!(!exporter.is_exporting());
}
