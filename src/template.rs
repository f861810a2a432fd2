//! Legal-document templates as structured node trees.
//!
//! Templates are immutable and selected by [`DocumentKind`]. Authoring-time
//! artifacts — wet-ink label lines, date blanks, empty paragraphs — are kept
//! in the tree verbatim; the preview processor removes them by structural
//! predicate rather than by pattern-matching serialized markup.

use crate::{DocumentKind, SignerRole};
use std::sync::OnceLock;

/// Inline run inside a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    /// Authoring-time marker to be replaced by a rasterized signature,
    /// matched by signer role. None survive into a built preview.
    SignatureSlot(SignerRole),
    /// An embedded raster, substituted in for a slot at build time.
    Image(EmbeddedImage),
}

/// A same-origin embeddable raster (`data:image/png` URL plus its natural
/// pixel size). `fit_height` constrains rendering to a fixed slot height
/// with aspect-preserving containment.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    pub fit_height: Option<u32>,
}

/// One block of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Heading(String),
    Paragraph(Vec<Inline>),
    Image(EmbeddedImage),
    /// Fixed two-column region (the appended signature block).
    Columns {
        left: Vec<Node>,
        right: Vec<Node>,
    },
}

impl Node {
    /// Shorthand for a plain-text paragraph.
    pub fn text(s: impl Into<String>) -> Node {
        Node::Paragraph(vec![Inline::Text(s.into())])
    }

    /// The paragraph's full text when it contains only text runs.
    /// `None` for non-paragraphs and for paragraphs carrying slots or
    /// images — those are never boilerplate.
    pub fn plain_text(&self) -> Option<String> {
        match self {
            Node::Paragraph(inlines) => {
                let mut out = String::new();
                for inline in inlines {
                    match inline {
                        Inline::Text(t) => out.push_str(t),
                        _ => return None,
                    }
                }
                Some(out)
            }
            _ => None,
        }
    }

    /// Count of unsubstituted signature slots in this subtree.
    pub fn slot_count(&self) -> usize {
        match self {
            Node::Paragraph(inlines) => inlines
                .iter()
                .filter(|i| matches!(i, Inline::SignatureSlot(_)))
                .count(),
            Node::Columns { left, right } => left
                .iter()
                .chain(right.iter())
                .map(Node::slot_count)
                .sum(),
            _ => 0,
        }
    }

    /// Count of embedded images in this subtree.
    pub fn image_count(&self) -> usize {
        match self {
            Node::Image(_) => 1,
            Node::Paragraph(inlines) => inlines
                .iter()
                .filter(|i| matches!(i, Inline::Image(_)))
                .count(),
            Node::Columns { left, right } => left
                .iter()
                .chain(right.iter())
                .map(Node::image_count)
                .sum(),
            _ => 0,
        }
    }
}

/// A named structured-text tree: the legal prose plus its authoring-time
/// placeholder regions.
#[derive(Debug, Clone)]
pub struct DocumentTemplate {
    pub kind: DocumentKind,
    pub title: String,
    pub body: Vec<Node>,
}

/// Look up the registered template for a document kind. The registry is a
/// closed set, so this cannot fail; key-string resolution happens earlier
/// in [`DocumentKind::from_key`].
pub fn template(kind: DocumentKind) -> &'static DocumentTemplate {
    static COUNSELING: OnceLock<DocumentTemplate> = OnceLock::new();
    static RECORDING: OnceLock<DocumentTemplate> = OnceLock::new();
    match kind {
        DocumentKind::Counseling => COUNSELING.get_or_init(counseling_template),
        DocumentKind::Recording => RECORDING.get_or_init(recording_template),
    }
}

/// Wet-ink boilerplate shared by both variants: an explicitly empty
/// paragraph, the paired party-label line, the paired date-blank line, and
/// a trailing whitespace-only block before the closing wrapper.
fn wet_ink_boilerplate() -> Vec<Node> {
    vec![
        Node::text("\u{a0}"),
        Node::text("来访者：\u{a0}\u{a0}\u{a0}\u{a0}\u{a0}\u{a0}\u{a0}\u{a0}咨询师："),
        Node::text("年\u{a0}\u{a0}月\u{a0}\u{a0}日\u{a0}\u{a0}\u{a0}\u{a0}\u{a0}\u{a0}年\u{a0}\u{a0}月\u{a0}\u{a0}日"),
        Node::text("  "),
    ]
}

fn counseling_template() -> DocumentTemplate {
    let kind = DocumentKind::Counseling;
    let mut body = vec![
        Node::Heading(kind.title()),
        Node::text("欢迎您前来进行心理咨询。为保障您的权益，请在咨询开始前仔细阅读以下条款。"),
        Node::Heading("一、保密原则".to_string()),
        Node::text(
            "咨询师对咨询过程中获知的来访者个人信息及谈话内容严格保密，\
             不向任何第三方披露。保密例外情形包括：来访者存在伤害自身或他人的\
             严重危险；来访者患有危及生命的传染性疾病；相关法律法规要求披露的情形。",
        ),
        Node::Heading("二、咨询设置".to_string()),
        Node::text(
            "咨询每次50分钟，频率由双方协商确定。如需取消或改期，\
             请至少提前24小时告知；无故缺席的咨询将按正常收费。",
        ),
        Node::Heading("三、双方权利与义务".to_string()),
        Node::text(
            "来访者有权了解咨询师的受训背景与资质，有权提出中止或终止咨询；\
             咨询师有义务说明咨询的局限性，并在超出自身胜任范围时进行转介。",
        ),
        Node::text("本人已阅读并理解上述条款，自愿接受心理咨询，并同意遵守以上约定。"),
    ];
    body.extend(wet_ink_boilerplate());
    DocumentTemplate {
        kind,
        title: kind.title(),
        body,
    }
}

fn recording_template() -> DocumentTemplate {
    let kind = DocumentKind::Recording;
    let mut body = vec![
        Node::Heading(kind.title()),
        Node::text(
            "为用于教学督导与个案研究，咨询师提请对咨询过程进行录音或录像。\
             录制资料仅在专业督导与研究范围内使用，不作任何商业用途。",
        ),
        Node::Heading("一、资料的使用与保管".to_string()),
        Node::text(
            "录制资料由咨询机构加密保存，呈现时将隐去可识别来访者身份的信息。\
             来访者有权随时撤回本同意，撤回后已录制的资料将被删除。",
        ),
        Node::Heading("二、确认".to_string()),
        Node::text("本人已知悉录音录像的目的、范围与保管方式，并自愿签署本同意书。"),
        Node::Paragraph(vec![
            Inline::Text("来访者确认签名：".to_string()),
            Inline::SignatureSlot(SignerRole::Client),
        ]),
    ];
    body.extend(wet_ink_boilerplate());
    DocumentTemplate {
        kind,
        title: kind.title(),
        body,
    }
}
