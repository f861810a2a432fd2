//! inkform — signature capture and consent-document flattening
//!
//! A library implementing the core pipeline of a two-party informed-consent
//! form: freehand signature capture on RGBA raster surfaces, pixel-scan
//! signature-presence detection, structural template-to-preview merging, and
//! asynchronous export of the rendered preview as a PNG image or a paginated
//! A4 PDF.
//!
//! # Features
//!
//! - **Stateless core**: the drawing, checking, and merging operations take
//!   their state explicitly; a single [`SigningSession`] context object owns
//!   the per-signer surfaces and threads them through calls
//! - **Structural templates**: boilerplate stripping and signature
//!   substitution operate on a parsed node tree, never on serialized markup
//! - **Swappable rasterizer**: export captures the preview through the
//!   [`Rasterizer`] trait; a deterministic block rasterizer ships built in
//!
//! # Example
//!
//! ```no_run
//! use inkform::{DocumentKind, Point, SignerRole, SigningSession};
//!
//! # fn main() -> inkform::Result<()> {
//! let mut session = SigningSession::new(DocumentKind::Counseling);
//! session.mount(SignerRole::Client, 400, 150, 1.0);
//! session.mount(SignerRole::Counselor, 400, 150, 1.0);
//!
//! session.begin(SignerRole::Client, Point { x: 10.0, y: 10.0 });
//! session.extend(SignerRole::Client, Point { x: 50.0, y: 50.0 });
//! session.end(SignerRole::Client);
//!
//! assert!(session.signed(SignerRole::Client));
//! let preview = session.build_preview(chrono::Local::now().date_naive())?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

// Raster surfaces: pixel buffers, blank scan, scaled cross-surface transfer
pub mod surface;

// Freehand stroke capture (per-surface ephemeral session state)
pub mod stroke;

// Legal-document template trees and the built-in registry
pub mod template;

// Template-to-preview transformation (strip + substitute + signature block)
pub mod preview;

// Block layout, paint commands, and the software rasterizer
pub mod rendering;

// Asynchronous image/PDF export with the single-in-flight guard
pub mod export;

// External collaborator seams (file-save sink, export affordances)
pub mod host;

// The signing context object owned by the UI controller
pub mod session;

pub use export::{DocumentExporter, ImageArtifact, PageLayout, PdfArtifact};
pub use preview::{PreviewDocument, SignatureAsset, SignatureSet};
pub use rendering::{BlockRasterizer, Raster, RasterOptions, Rasterizer};
pub use session::SigningSession;
pub use surface::RasterSurface;

/// A surface-local point in logical (device-independent) units.
///
/// The surface host translates pointer/viewport coordinates before they
/// reach the crate; nothing here ever sees a raw event position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// The party a signature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignerRole {
    Client,
    Counselor,
}

impl SignerRole {
    /// Column heading used above the embedded signature image.
    pub fn signature_label(self) -> &'static str {
        match self {
            SignerRole::Client => "来访者签名",
            SignerRole::Counselor => "咨询师签名",
        }
    }

    /// Short party label used in wet-ink boilerplate lines.
    pub fn label(self) -> &'static str {
        match self {
            SignerRole::Client => "来访者",
            SignerRole::Counselor => "咨询师",
        }
    }
}

/// Document variant; selects the template and the interactive signer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// 心理咨询知情同意书 — both parties sign interactively
    Counseling,
    /// 录音录像知情同意书 — client signs; counselor column carries the seal
    Recording,
}

impl DocumentKind {
    /// Resolve a document-type key. Keys are a closed set; anything else is
    /// a programming-error-class fault surfaced as `UnknownTemplate`.
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "counseling" => Ok(DocumentKind::Counseling),
            "recording" => Ok(DocumentKind::Recording),
            other => Err(Error::UnknownTemplate(other.to_string())),
        }
    }

    /// Short label used in export filenames.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Counseling => "心理咨询",
            DocumentKind::Recording => "录音录像",
        }
    }

    /// Full document title.
    pub fn title(self) -> String {
        format!("{}知情同意书", self.label())
    }

    /// Roles whose surface must carry ink before a preview may be built.
    pub fn required_signers(self) -> &'static [SignerRole] {
        match self {
            DocumentKind::Counseling => &[SignerRole::Client, SignerRole::Counselor],
            DocumentKind::Recording => &[SignerRole::Client],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_key() {
        assert_eq!(
            DocumentKind::from_key("counseling").unwrap(),
            DocumentKind::Counseling
        );
        assert_eq!(
            DocumentKind::from_key("recording").unwrap(),
            DocumentKind::Recording
        );
        assert!(matches!(
            DocumentKind::from_key("divorce"),
            Err(Error::UnknownTemplate(k)) if k == "divorce"
        ));
    }

    #[test]
    fn test_required_signers() {
        assert_eq!(DocumentKind::Counseling.required_signers().len(), 2);
        assert_eq!(
            DocumentKind::Recording.required_signers(),
            &[SignerRole::Client]
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(DocumentKind::Counseling.label(), "心理咨询");
        assert_eq!(DocumentKind::Recording.title(), "录音录像知情同意书");
        assert_eq!(SignerRole::Client.signature_label(), "来访者签名");
    }
}
