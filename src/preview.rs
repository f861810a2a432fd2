//! Template-to-preview transformation.
//!
//! Takes the immutable legal-document template, the frozen signature
//! rasters, and the current date, and produces the placeholder-free
//! [`PreviewDocument`] shown to the user and handed to the exporter. The
//! preview is rebuilt wholesale on every request — the previous tree is
//! replaced, never patched.

use crate::error::{Error, Result};
use crate::surface::RasterSurface;
use crate::template::{self, EmbeddedImage, Inline, Node};
use crate::{DocumentKind, SignerRole};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::NaiveDate;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_circle_mut;
use std::sync::OnceLock;

/// Fixed width of the printable container, logical pixels.
pub const PRINTABLE_WIDTH: u32 = 900;

/// Fixed height of each signature image slot in the appended block. Both
/// columns render at this height with aspect-preserving containment so
/// they align regardless of native stroke bounds.
pub const SIGNATURE_SLOT_HEIGHT: u32 = 120;

/// A raster surface frozen into an encoded still image, tagged by signer
/// role. Produced at preview time, never at draw time, and never mutated;
/// regenerating the preview supersedes it.
#[derive(Debug, Clone)]
pub struct SignatureAsset {
    role: SignerRole,
    width: u32,
    height: u32,
    png: Vec<u8>,
}

impl SignatureAsset {
    /// Freeze a surface's current pixel content.
    pub fn from_surface(role: SignerRole, surface: &RasterSurface) -> Result<Self> {
        Ok(Self {
            role,
            width: surface.width(),
            height: surface.height(),
            png: surface.to_png()?,
        })
    }

    pub fn role(&self) -> SignerRole {
        self.role
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    /// Same-origin embeddable form of the asset.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", B64.encode(&self.png))
    }

    fn embedded(&self, fit_height: Option<u32>) -> EmbeddedImage {
        EmbeddedImage {
            data_url: self.data_url(),
            width: self.width,
            height: self.height,
            fit_height,
        }
    }
}

/// The signatures available when building a preview.
#[derive(Debug, Clone, Default)]
pub struct SignatureSet {
    pub client: Option<SignatureAsset>,
    pub counselor: Option<SignatureAsset>,
}

impl SignatureSet {
    pub fn get(&self, role: SignerRole) -> Option<&SignatureAsset> {
        match role {
            SignerRole::Client => self.client.as_ref(),
            SignerRole::Counselor => self.counselor.as_ref(),
        }
    }

    pub fn insert(&mut self, asset: SignatureAsset) {
        match asset.role() {
            SignerRole::Client => self.client = Some(asset),
            SignerRole::Counselor => self.counselor = Some(asset),
        }
    }
}

/// The finalized, renderable document: template minus stripped boilerplate,
/// plus embedded signatures and date stamps, wrapped in the fixed-width
/// printable container.
#[derive(Debug, Clone)]
pub struct PreviewDocument {
    pub kind: DocumentKind,
    /// Printable container width, logical pixels
    pub width: u32,
    pub nodes: Vec<Node>,
    pub generated_on: NaiveDate,
}

impl PreviewDocument {
    /// Unsubstituted placeholder slots remaining anywhere in the tree.
    pub fn slot_count(&self) -> usize {
        self.nodes.iter().map(Node::slot_count).sum()
    }

    /// Embedded images anywhere in the tree.
    pub fn image_count(&self) -> usize {
        self.nodes.iter().map(Node::image_count).sum()
    }

    /// The formatted date stamped into the signature block.
    pub fn date_stamp(&self) -> String {
        format!("日期：{}", self.generated_on.format("%Y-%m-%d"))
    }
}

/// Build the finalized preview for a document kind.
///
/// Order matters for correctness: lookup, defensive signer re-check,
/// inline slot substitution, boilerplate strip, signature-block append,
/// container wrap. No partial preview is ever produced — any failure
/// happens before the first transformation.
pub fn build(
    kind: DocumentKind,
    signatures: &SignatureSet,
    today: NaiveDate,
) -> Result<PreviewDocument> {
    let tpl = template::template(kind);

    // The session gates on blank surfaces already; this is the defensive
    // re-check for callers driving the processor directly.
    let missing: Vec<SignerRole> = kind
        .required_signers()
        .iter()
        .copied()
        .filter(|r| signatures.get(*r).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(Error::IncompleteSignatures { missing });
    }

    let mut nodes = tpl.body.clone();
    substitute_slots(&mut nodes, signatures)?;
    strip_boilerplate(&mut nodes);
    nodes.push(signature_block(kind, signatures, today));

    Ok(PreviewDocument {
        kind,
        width: PRINTABLE_WIDTH,
        nodes,
        generated_on: today,
    })
}

/// Replace every inline signature slot with the matching signer's embedded
/// image. A template with zero slots is untouched.
fn substitute_slots(nodes: &mut [Node], signatures: &SignatureSet) -> Result<()> {
    for node in nodes.iter_mut() {
        match node {
            Node::Paragraph(inlines) => {
                for inline in inlines.iter_mut() {
                    if let Inline::SignatureSlot(role) = *inline {
                        let asset =
                            signatures
                                .get(role)
                                .ok_or_else(|| Error::IncompleteSignatures {
                                    missing: vec![role],
                                })?;
                        *inline = Inline::Image(asset.embedded(Some(SIGNATURE_SLOT_HEIGHT)));
                    }
                }
            }
            Node::Columns { left, right } => {
                substitute_slots(left, signatures)?;
                substitute_slots(right, signatures)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Remove the four categories of authoring-time boilerplate. Each predicate
/// is anchored to the exact boilerplate shape — whole-text matches after
/// NBSP normalization — so legitimate prose that merely starts the same way
/// survives. Running the strip twice is a fixed point.
pub fn strip_boilerplate(nodes: &mut Vec<Node>) {
    nodes.retain(|n| {
        !is_wet_ink_label_pair(n) && !is_date_blank_pair(n) && !is_empty_paragraph(n)
    });
    // Trailing whitespace-only block before the closing wrapper
    while nodes
        .last()
        .map(is_empty_paragraph)
        .unwrap_or(false)
    {
        nodes.pop();
    }
}

fn normalized(node: &Node) -> Option<String> {
    node.plain_text().map(|t| t.replace('\u{a0}', " "))
}

/// Paired "来访者：… 咨询师：" wet-ink label line.
fn is_wet_ink_label_pair(node: &Node) -> bool {
    match normalized(node) {
        Some(t) => {
            let t = t.trim();
            match t
                .strip_prefix("来访者：")
                .and_then(|rest| rest.strip_suffix("咨询师："))
            {
                Some(middle) => middle.trim().is_empty(),
                None => false,
            }
        }
        None => false,
    }
}

/// Paired "年 月 日 … 年 月 日" date-blank line for both signers.
fn is_date_blank_pair(node: &Node) -> bool {
    match normalized(node) {
        Some(t) => {
            let tokens: Vec<&str> = t.split_whitespace().collect();
            tokens == ["年", "月", "日", "年", "月", "日"]
        }
        None => false,
    }
}

/// Explicitly empty paragraph block (NBSP-only or whitespace-only).
fn is_empty_paragraph(node: &Node) -> bool {
    match normalized(node) {
        Some(t) => t.trim().is_empty(),
        None => false,
    }
}

/// The appended two-column signature block: role label, image slot of fixed
/// height, formatted date. The counselor column falls back to the built-in
/// decorative seal when the variant captured no interactive counselor
/// signature.
fn signature_block(kind: DocumentKind, signatures: &SignatureSet, today: NaiveDate) -> Node {
    let date_line = format!("日期：{}", today.format("%Y-%m-%d"));

    let column = |label: &str, image: EmbeddedImage| -> Vec<Node> {
        vec![
            Node::text(label),
            Node::Image(image),
            Node::text(date_line.clone()),
        ]
    };

    // build() has already gated; a missing client here cannot happen, but
    // the seal keeps the block total even if it somehow did.
    let client_img = signatures
        .get(SignerRole::Client)
        .map(|a| a.embedded(Some(SIGNATURE_SLOT_HEIGHT)))
        .unwrap_or_else(|| decorative_seal().embedded(Some(SIGNATURE_SLOT_HEIGHT)));

    let counselor_img = match signatures.get(SignerRole::Counselor) {
        Some(a) => a.embedded(Some(SIGNATURE_SLOT_HEIGHT)),
        None => {
            debug_assert!(!kind
                .required_signers()
                .contains(&SignerRole::Counselor));
            decorative_seal().embedded(Some(SIGNATURE_SLOT_HEIGHT))
        }
    };

    Node::Columns {
        left: column(SignerRole::Client.signature_label(), client_img),
        right: column(SignerRole::Counselor.signature_label(), counselor_img),
    }
}

/// Fixed decorative counter-signature mark: a red double-ring stamp raster.
pub fn decorative_seal() -> SignatureAsset {
    static SEAL: OnceLock<SignatureAsset> = OnceLock::new();
    SEAL.get_or_init(|| {
        let size = 96u32;
        let mut img = RgbaImage::new(size, size);
        let center = (size as i32 / 2, size as i32 / 2);
        let red = Rgba([192, 42, 42, 255]);
        for r in [44, 43, 42, 30, 29] {
            draw_hollow_circle_mut(&mut img, center, r, red);
        }
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut png),
                image::ImageOutputFormat::Png,
            )
            .expect("in-memory PNG encode of the seal cannot fail");
        SignatureAsset {
            role: SignerRole::Counselor,
            width: size,
            height: size,
            png,
        }
    })
    .clone()
}
