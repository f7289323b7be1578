// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Text rendering: wrapping, alignment and per-line clipping inside a
//! target rectangle, using the builtin Type1 font families.

use lopdf::content::Operation;
use lopdf::ObjectId;

use satzwerk_core::content::TextContent;
use satzwerk_core::error::{Result, SatzwerkError};
use satzwerk_core::style::{FontStyle, HorizontalAlignment, VerticalAlignment};
use satzwerk_core::types::Rect;
use satzwerk_document::draw;
use satzwerk_document::PdfBuffer;

/// Baseline-to-baseline distance relative to the font size.
const LINE_SPACING: f64 = 1.2;

pub(crate) fn render_text(
    buffer: &mut PdfBuffer,
    page_id: ObjectId,
    rect: Rect,
    content: &TextContent,
) -> Result<Vec<Operation>> {
    if content.text.trim().is_empty() {
        return Err(SatzwerkError::MissingData("text content is empty".into()));
    }

    let font = content.style.font();
    let font_name = draw::ensure_font(buffer.document_mut(), page_id, &base_font_name(&font))?;
    let line_height = font.size * LINE_SPACING;

    // Overflow behavior: in a region with room for several lines the text
    // wraps to the rectangle's width and lines past the bottom edge are
    // dropped. A single-line region (the usual inline tag replacement)
    // keeps the whole text on that one line and lets it run past the
    // right edge, since a wrap would have no second line to land on.
    let fits = ((rect.height() / line_height).floor() as usize).max(1);
    let mut lines = if fits == 1 {
        vec![content.text.split_whitespace().collect::<Vec<_>>().join(" ")]
    } else {
        draw::wrap_text(&content.text, font.size, rect.width())
    };
    lines.truncate(fits);

    let block_height = lines.len() as f64 * line_height;
    let block_top = match content.style.vertical() {
        VerticalAlignment::Top => rect.top,
        VerticalAlignment::Middle => rect.top - (rect.height() - block_height) / 2.0,
        VerticalAlignment::Bottom => rect.bottom + block_height,
    };

    let mut positioned = Vec::with_capacity(lines.len());
    for (index, line) in lines.into_iter().enumerate() {
        let baseline = block_top - font.size - index as f64 * line_height;
        let x = match content.style.horizontal() {
            HorizontalAlignment::Left => rect.left,
            HorizontalAlignment::Center => {
                rect.left + (rect.width() - draw::approx_text_width(&line, font.size)) / 2.0
            }
            HorizontalAlignment::Right => {
                rect.right - draw::approx_text_width(&line, font.size)
            }
        };
        positioned.push((x, baseline, line));
    }

    let mut ops = draw::text_ops(&font_name, font.size, content.style.color(), &positioned);
    if let Some(border) = content.style.border {
        ops.extend(draw::stroke_rect_ops(rect, border.width, border.color));
    }
    Ok(ops)
}

/// Maps a font style onto one of the builtin Type1 base fonts.
pub(crate) fn base_font_name(font: &FontStyle) -> String {
    let lower = font.name.to_ascii_lowercase();
    let (family, bold, italic, bold_italic) = if lower.contains("times") {
        ("Times-Roman", "Times-Bold", "Times-Italic", "Times-BoldItalic")
    } else if lower.contains("courier") {
        (
            "Courier",
            "Courier-Bold",
            "Courier-Oblique",
            "Courier-BoldOblique",
        )
    } else {
        (
            "Helvetica",
            "Helvetica-Bold",
            "Helvetica-Oblique",
            "Helvetica-BoldOblique",
        )
    };
    match (font.bold, font.italic) {
        (true, true) => bold_italic.into(),
        (true, false) => bold.into(),
        (false, true) => italic.into(),
        (false, false) => family.into(),
    }
}

// --- Tests -------------------------------------------------------------
