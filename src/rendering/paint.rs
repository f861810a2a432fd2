/// Paint command set for the software rasterizer. Text runs become tone
/// rules (one per estimated line); embedded images decode into pixel blits.
use crate::error::{Error, Result};
use crate::rendering::layout::{LayoutContent, LayoutNode};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use image::RgbaImage;

/// Ink tone used for text rules
const TEXT_TONE: (u8, u8, u8, u8) = (90, 90, 90, 255);

#[derive(Debug, Clone)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: (u8, u8, u8, u8),
    },
    Blit {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        pixels: RgbaImage,
    },
}

/// Lower layout boxes into paint commands. Fails only when an embedded
/// image cannot be decoded, which would mean a corrupt signature asset.
pub fn build_commands(nodes: &[LayoutNode]) -> Result<Vec<PaintCommand>> {
    let mut commands = Vec::new();
    for node in nodes {
        match &node.content {
            LayoutContent::Text { lines, scale } => {
                let line_h = node.rect.height / (*lines).max(1);
                let rule_h = (2 * scale).min(line_h.max(1));
                for i in 0..*lines {
                    // Rule sits at the line's baseline
                    let base = node.rect.y + (i * line_h + line_h.saturating_sub(rule_h + 2)) as i32;
                    commands.push(PaintCommand::SolidRect {
                        x: node.rect.x,
                        y: base,
                        width: node.rect.width,
                        height: rule_h,
                        rgba: TEXT_TONE,
                    });
                }
            }
            LayoutContent::Image { image } => {
                let pixels = decode_data_url(&image.data_url)?;
                commands.push(PaintCommand::Blit {
                    x: node.rect.x,
                    y: node.rect.y,
                    width: node.rect.width,
                    height: node.rect.height,
                    pixels,
                });
            }
        }
    }
    Ok(commands)
}

fn decode_data_url(url: &str) -> Result<RgbaImage> {
    let b64 = url
        .strip_prefix("data:image/png;base64,")
        .ok_or_else(|| Error::RasterizationFailure("unsupported image source".to_string()))?;
    let bytes = B64
        .decode(b64)
        .map_err(|e| Error::RasterizationFailure(format!("bad image data: {e}")))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| Error::RasterizationFailure(format!("undecodable image: {e}")))?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::Rect;
    use crate::template::EmbeddedImage;

    #[test]
    fn text_box_paints_one_rule_per_line() {
        let nodes = vec![LayoutNode {
            rect: Rect {
                x: 50,
                y: 50,
                width: 800,
                height: 54,
            },
            content: LayoutContent::Text { lines: 3, scale: 1 },
        }];
        let cmds = build_commands(&nodes).unwrap();
        assert_eq!(cmds.len(), 3);
        assert!(matches!(
            cmds[0],
            PaintCommand::SolidRect { width: 800, .. }
        ));
    }

    #[test]
    fn image_box_decodes_to_a_blit() {
        let surface = crate::surface::RasterSurface::new(20, 10, 1.0);
        let url = format!(
            "data:image/png;base64,{}",
            B64.encode(surface.to_png().unwrap())
        );
        let nodes = vec![LayoutNode {
            rect: Rect {
                x: 0,
                y: 0,
                width: 40,
                height: 20,
            },
            content: LayoutContent::Image {
                image: EmbeddedImage {
                    data_url: url,
                    width: 20,
                    height: 10,
                    fit_height: None,
                },
            },
        }];
        let cmds = build_commands(&nodes).unwrap();
        assert_eq!(cmds.len(), 1);
        match &cmds[0] {
            PaintCommand::Blit { pixels, .. } => {
                assert_eq!(pixels.width(), 20);
                assert_eq!(pixels.height(), 10);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn non_data_url_is_rejected() {
        let nodes = vec![LayoutNode {
            rect: Rect {
                x: 0,
                y: 0,
                width: 10,
                height: 10,
            },
            content: LayoutContent::Image {
                image: EmbeddedImage {
                    data_url: "https://example.com/sig.png".to_string(),
                    width: 10,
                    height: 10,
                    fit_height: None,
                },
            },
        }];
        assert!(matches!(
            build_commands(&nodes),
            Err(Error::RasterizationFailure(_))
        ));
    }
}
