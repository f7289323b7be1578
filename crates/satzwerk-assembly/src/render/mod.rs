// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Content rendering.
//!
//! Turns a [`ReplaceableContent`] and a target rectangle into content
//! stream operations, registering whatever fonts and image XObjects the
//! page needs along the way. The diagnostic outline is a decorator over
//! every content kind rather than a per-renderer concern.

pub mod image;
pub mod outline;
pub mod table;
pub mod text;

use lopdf::content::Operation;
use tracing::{debug, instrument};

use satzwerk_core::content::ReplaceableContent;
use satzwerk_core::error::{Result, SatzwerkError};
use satzwerk_core::types::Rect;
use satzwerk_document::PdfBuffer;

/// One rendering job: content drawn into a rectangle on a page.
#[derive(Debug)]
pub struct RenderRequest<'a> {
    /// 1-indexed page number.
    pub page: u32,
    pub rect: Rect,
    pub content: &'a ReplaceableContent,
}

/// Where content actually ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedRegion {
    pub page: u32,
    pub rect: Rect,
}

/// Operations ready to be spliced or appended, plus the drawn region.
#[derive(Debug)]
pub struct Rendered {
    pub ops: Vec<Operation>,
    pub region: RenderedRegion,
}

pub struct ContentRenderer;

impl ContentRenderer {
    /// Renders one request into content stream operations.
    ///
    /// The content's own offset is applied to the rectangle before
    /// rendering. When the content is in test mode the result carries a
    /// diagnostic outline around the target rectangle.
    #[instrument(skip(buffer, request), fields(page = request.page))]
    pub fn render(buffer: &mut PdfBuffer, request: &RenderRequest<'_>) -> Result<Rendered> {
        let page_id = buffer.page_id(request.page)?;
        let common = request.content.common();
        let rect = request.rect.translate(common.offset.x, common.offset.y);
        if rect.is_degenerate() {
            return Err(SatzwerkError::LayoutConflict(format!(
                "target rectangle {rect:?} has no area"
            )));
        }

        let ops = match request.content {
            ReplaceableContent::Text(content) => {
                text::render_text(buffer, page_id, rect, content)?
            }
            ReplaceableContent::Image(content) => {
                image::render_image(buffer, page_id, rect, content)?
            }
            ReplaceableContent::Table(content) => {
                table::render_table(buffer, page_id, rect, content)?
            }
        };
        debug!(ops = ops.len(), ?rect, "content rendered");
        Ok(Rendered {
            ops: outline::with_diagnostic_outline(ops, rect, common.test_mode),
            region: RenderedRegion {
                page: request.page,
                rect,
            },
        })
    }
}

// --- Tests -------------------------------------------------------------
