use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::error::AppError;
use tracing::debug;

use super::ThumbnailRenderer;
use crate::utils::pdf::{first_page_size, text_extraction::extract_pages};

const MAX_LINES: usize = 14;
const MAX_LINE_CHARS: usize = 42;
const MIN_WIDTH: u32 = 32;

/// Renders page one as an SVG sketch: the page outline at its real aspect
/// ratio with the opening lines of its text layer.
///
/// Needs nothing beyond the PDF bytes, so it works on any host.
pub struct SvgThumbnailRenderer {
    width: u32,
}

impl SvgThumbnailRenderer {
    pub fn new(width: u32) -> Self {
        Self {
            width: width.max(MIN_WIDTH),
        }
    }

    fn svg(&self, aspect_ratio: f64, lines: &[String]) -> String {
        let width = f64::from(self.width);
        let height = (width * aspect_ratio).round().max(1.0);
        let margin = width * 0.08;
        let font_size = (width / 24.0).max(4.0);
        let line_height = font_size * 1.4;

        let mut svg = format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><rect x="0.5" y="0.5" width="{w}" height="{h}" fill="#ffffff" stroke="#d0d0d0"/>"##,
            w = width - 1.0,
            h = height - 1.0,
        );

        // Non-negative and small after floor().max(0.0).
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_lines = ((height - 2.0 * margin) / line_height).floor().max(0.0) as usize;
        let mut y = margin;
        for line in lines.iter().take(max_lines.min(MAX_LINES)) {
            y += line_height;
            svg.push_str(&format!(
                r##"<text x="{margin:.1}" y="{y:.1}" font-family="Helvetica,Arial,sans-serif" font-size="{font_size:.1}" fill="#333333">{}</text>"##,
                escape_xml(line)
            ));
        }

        svg.push_str("</svg>");
        svg
    }
}

impl ThumbnailRenderer for SvgThumbnailRenderer {
    fn name(&self) -> &'static str {
        "svg"
    }

    fn render(&self, content: &[u8]) -> Result<String, AppError> {
        let size = first_page_size(content)?;
        let lines = match extract_pages(content) {
            Ok(pages) => preview_lines(pages.first().map(String::as_str).unwrap_or_default()),
            Err(err) => {
                debug!(error = %err, "No text layer for thumbnail; rendering outline only");
                Vec::new()
            }
        };

        let svg = self.svg(size.aspect_ratio(), &lines);
        Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
    }
}

fn preview_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .take(MAX_LINES)
        .map(|line| {
            if line.chars().count() > MAX_LINE_CHARS {
                let mut cut: String = line.chars().take(MAX_LINE_CHARS - 1).collect();
                cut.push('…');
                cut
            } else {
                line
            }
        })
        .collect()
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }
    escaped
}
