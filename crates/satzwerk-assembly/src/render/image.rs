// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Image rendering: embeds the decoded pixels as an XObject and fits it
//! into the target rectangle per the image alignment.

use lopdf::content::Operation;
use lopdf::ObjectId;

use satzwerk_core::content::ImageContent;
use satzwerk_core::error::{Result, SatzwerkError};
use satzwerk_core::style::ImageAlignment;
use satzwerk_core::types::Rect;
use satzwerk_document::draw;
use satzwerk_document::PdfBuffer;

pub(crate) fn render_image(
    buffer: &mut PdfBuffer,
    page_id: ObjectId,
    rect: Rect,
    content: &ImageContent,
) -> Result<Vec<Operation>> {
    if content.data.is_empty() {
        return Err(SatzwerkError::MissingData("image content has no data".into()));
    }

    let (name, width, height) = draw::embed_image(buffer.document_mut(), page_id, &content.data)?;
    let target = fit_rect(rect, width as f64, height as f64, content.style.alignment);

    let mut ops = draw::image_ops(&name, target);
    if let Some(border) = content.style.border {
        ops.extend(draw::stroke_rect_ops(target, border.width, border.color));
    }
    Ok(ops)
}

/// Target rectangle for a `width` x `height` pixel image inside `rect`.
fn fit_rect(rect: Rect, width: f64, height: f64, alignment: ImageAlignment) -> Rect {
    match alignment {
        ImageAlignment::Stretch => rect,
        ImageAlignment::Center => {
            let scale = (rect.width() / width).min(rect.height() / height);
            let w = width * scale;
            let h = height * scale;
            let left = rect.left + (rect.width() - w) / 2.0;
            let bottom = rect.bottom + (rect.height() - h) / 2.0;
            Rect::new(left, bottom, left + w, bottom + h)
        }
        ImageAlignment::FitWidth => {
            let scale = rect.width() / width;
            let h = height * scale;
            Rect::new(rect.left, rect.top - h, rect.right, rect.top)
        }
        ImageAlignment::FitHeight => {
            let scale = rect.height() / height;
            let w = width * scale;
            Rect::new(rect.left, rect.bottom, rect.left + w, rect.top)
        }
    }
}

// --- Tests -------------------------------------------------------------
