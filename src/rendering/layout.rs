/// Block layout for the preview tree: vertical stacking with simple
/// margins, naive character-cell line estimation, and a two-column split
/// for the signature block. Sizes are logical pixels; the rasterizer
/// applies the capture scale.
use crate::preview::PreviewDocument;
use crate::template::{EmbeddedImage, Inline, Node};

/// Container padding (the printable wrapper's inset)
const PADDING: u32 = 50;
/// Estimated character cell width
const CHAR_CELL: u32 = 8;
/// Base line height for body text
const LINE_HEIGHT: u32 = 18;
/// Vertical margin between blocks
const BLOCK_GAP: u32 = 12;
/// Fraction of the row each signature column occupies (×1000)
const COLUMN_WIDTH_PERMILLE: u32 = 450;

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub enum LayoutContent {
    Text {
        lines: u32,
        /// 2 for headings, 1 for body text
        scale: u32,
    },
    Image {
        image: EmbeddedImage,
    },
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub rect: Rect,
    pub content: LayoutContent,
}

/// The laid-out document: boxes plus the overall content size the capture
/// must cover (laid-out, never viewport-clipped).
#[derive(Debug, Clone)]
pub struct LaidOut {
    pub nodes: Vec<LayoutNode>,
    pub width: u32,
    pub height: u32,
}

/// Lay the preview tree out against its fixed printable width.
pub fn layout_document(doc: &PreviewDocument) -> LaidOut {
    let content_width = doc.width.saturating_sub(PADDING * 2);
    let mut nodes = Vec::new();
    let y_end = layout_blocks(
        &doc.nodes,
        PADDING as i32,
        content_width,
        PADDING as i32,
        &mut nodes,
    );
    LaidOut {
        nodes,
        width: doc.width,
        height: (y_end as u32) + PADDING,
    }
}

fn layout_blocks(
    blocks: &[Node],
    x: i32,
    width: u32,
    mut y: i32,
    out: &mut Vec<LayoutNode>,
) -> i32 {
    for block in blocks {
        match block {
            Node::Heading(text) => {
                let lines = wrapped_line_count(text, width / (CHAR_CELL * 2));
                let height = lines * LINE_HEIGHT * 2;
                out.push(LayoutNode {
                    rect: Rect { x, y, width, height },
                    content: LayoutContent::Text { lines, scale: 2 },
                });
                y += (height + BLOCK_GAP) as i32;
            }
            Node::Paragraph(inlines) => {
                y = layout_paragraph(inlines, x, width, y, out);
            }
            Node::Image(image) => {
                y = layout_image(image, x, width, y, out);
            }
            Node::Columns { left, right } => {
                let col_w = width * COLUMN_WIDTH_PERMILLE / 1000;
                let right_x = x + (width - col_w) as i32;
                let left_end = layout_blocks(left, x, col_w, y, out);
                let right_end = layout_blocks(right, right_x, col_w, y, out);
                y = left_end.max(right_end);
            }
        }
    }
    y
}

/// Paragraphs stack their text runs as one wrapped block; an inline image
/// (a substituted signature) flushes the text and lays out as a block of
/// its own below it.
fn layout_paragraph(
    inlines: &[Inline],
    x: i32,
    width: u32,
    mut y: i32,
    out: &mut Vec<LayoutNode>,
) -> i32 {
    let mut pending = String::new();
    let flush = |text: &mut String, y: &mut i32, out: &mut Vec<LayoutNode>| {
        if text.trim().is_empty() {
            text.clear();
            return;
        }
        let lines = wrapped_line_count(text, width / CHAR_CELL);
        let height = lines * LINE_HEIGHT;
        out.push(LayoutNode {
            rect: Rect {
                x,
                y: *y,
                width,
                height,
            },
            content: LayoutContent::Text { lines, scale: 1 },
        });
        *y += (height + BLOCK_GAP) as i32;
        text.clear();
    };

    for inline in inlines {
        match inline {
            Inline::Text(t) => pending.push_str(t),
            Inline::Image(image) => {
                flush(&mut pending, &mut y, out);
                y = layout_image(image, x, width, y, out);
            }
            // Slots never reach layout: the processor substitutes them all
            Inline::SignatureSlot(_) => {}
        }
    }
    flush(&mut pending, &mut y, out);
    y
}

/// Aspect-preserving containment: scale to the fixed slot height, clamped
/// by the available width, and centre horizontally. The box consumes the
/// full slot height so paired columns align.
fn layout_image(image: &EmbeddedImage, x: i32, width: u32, y: i32, out: &mut Vec<LayoutNode>) -> i32 {
    let slot_h = image.fit_height.unwrap_or(image.height.max(1));
    let (nat_w, nat_h) = (image.width.max(1) as f32, image.height.max(1) as f32);
    let scale = (slot_h as f32 / nat_h).min(width as f32 / nat_w);
    let draw_w = (nat_w * scale).round().max(1.0) as u32;
    let draw_h = (nat_h * scale).round().max(1.0) as u32;
    let dx = x + ((width - draw_w.min(width)) / 2) as i32;
    let dy = y + ((slot_h.saturating_sub(draw_h)) / 2) as i32;
    out.push(LayoutNode {
        rect: Rect {
            x: dx,
            y: dy,
            width: draw_w,
            height: draw_h,
        },
        content: LayoutContent::Image {
            image: image.clone(),
        },
    });
    y + (slot_h + BLOCK_GAP) as i32
}

/// Estimate wrapped line count at `chars_per_line` character cells.
/// Whitespace-delimited words wrap greedily; an unbroken run (CJK prose)
/// chunks at the line width.
fn wrapped_line_count(text: &str, chars_per_line: u32) -> u32 {
    let per_line = chars_per_line.max(1) as usize;
    let mut lines = 0u32;
    let mut cur = 0usize;
    for word in text.split_whitespace() {
        let len = word.chars().count();
        if len > per_line {
            if cur > 0 {
                lines += 1;
                cur = 0;
            }
            lines += (len / per_line) as u32;
            cur = len % per_line;
            continue;
        }
        if cur > 0 && cur + 1 + len > per_line {
            lines += 1;
            cur = len;
        } else {
            cur += if cur > 0 { 1 + len } else { len };
        }
    }
    if cur > 0 {
        lines += 1;
    }
    lines.max(1)
}
