// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! The operation pipeline.
//!
//! A [`PdfInput`] owns one document's byte buffer and applies operations
//! to it sequentially. Every operation is a pure step from the current
//! bytes to new bytes: on success the payload carries the new buffer (and
//! the pipeline adopts it when auto-update is on), on failure the buffer
//! is left exactly as it was. Finalizing the pipeline makes it immutable.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, instrument, warn};

use satzwerk_core::config::AssemblyOptions;
use satzwerk_core::content::{ReplaceableContent, TextContent};
use satzwerk_core::error::Result;
use satzwerk_core::result::OpResult;
use satzwerk_core::style::{resolve_text_style, FontStyle, TextStyle};
use satzwerk_core::types::{PlacementStrategy, Rect, TagMatch};
use satzwerk_core::ErrorKind;
use satzwerk_document::splice::{self, SpliceJob};
use satzwerk_document::PdfBuffer;

use crate::placement::{element_rects, PlacementResolver};
use crate::render::{ContentRenderer, RenderRequest};
use crate::scanner::TagScanner;

/// One document moving through the assembly pipeline.
#[derive(Debug, Clone)]
pub struct PdfInput {
    bytes: Vec<u8>,
    options: AssemblyOptions,
    styles: HashMap<String, TextStyle>,
    finalized: bool,
}

impl PdfInput {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            options: AssemblyOptions::default(),
            styles: HashMap::new(),
            finalized: false,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn with_options(mut self, options: AssemblyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Registers a named style that content styles can name as `parent`.
    /// Inheritance is resolved in one flat pass right before rendering.
    pub fn register_style(&mut self, name: impl Into<String>, style: TextStyle) -> &mut Self {
        self.styles.insert(name.into(), style);
        self
    }

    /// Fluent helper: runs one operation and returns `self` for chaining.
    /// A failure is logged and does not stop the chain; each chained call
    /// still reports independently through its own buffer state.
    pub fn apply(&mut self, op: impl FnOnce(&mut Self) -> OpResult<Vec<u8>>) -> &mut Self {
        let result = op(self);
        if !result.is_success() {
            warn!(errors = ?result.errors(), "chained operation failed");
        }
        self
    }

    /// The pipeline's current byte buffer.
    pub fn current_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> OpResult<u32> {
        match PdfBuffer::from_bytes(&self.bytes) {
            Ok(buffer) => OpResult::success(buffer.page_count()),
            Err(err) => OpResult::from_error(err),
        }
    }

    /// Extracted text lines of one page, optionally filtered to lines
    /// containing `filter`. Verification tooling, not used by the
    /// pipeline itself.
    pub fn text_lines(
        &self,
        page: u32,
        filter: Option<&str>,
        skip_empty: bool,
    ) -> OpResult<Vec<String>> {
        let lines = || -> Result<Vec<String>> {
            let buffer = PdfBuffer::from_bytes(&self.bytes)?;
            let page_id = buffer.page_id(page)?;
            let text =
                satzwerk_document::text::TextInterpreter::interpret(buffer.document(), page_id)?;
            Ok(text.text_lines(filter, skip_empty))
        };
        lines().into()
    }

    /// Replaces every occurrence of `tag` with `content`, placed per
    /// `strategy`. An absent tag is a successful no-op.
    #[instrument(skip(self, content))]
    pub fn replace(
        &mut self,
        tag: &str,
        content: &ReplaceableContent,
        strategy: PlacementStrategy,
    ) -> OpResult<Vec<u8>> {
        let margin_width = self.options.margin_width;
        let tag = tag.to_string();
        let styles = self.styles.clone();
        self.mutate(move |buffer| {
            let replaced =
                apply_replacement_with(buffer, &tag, strategy, margin_width, &styles, |_| {
                    content.clone()
                })?;
            if replaced == 0 {
                warn!(tag = %tag, "tag not found, nothing replaced");
            } else {
                info!(tag = %tag, replaced, "tag replaced");
            }
            Ok(())
        })
    }

    /// Draws `content` on top of the page named by its page hint (page 1
    /// when absent). The target rectangle is the page's margin box; the
    /// content's offset shifts it.
    #[instrument(skip(self, content))]
    pub fn insert(&mut self, content: &ReplaceableContent) -> OpResult<Vec<u8>> {
        let margin_width = self.options.margin_width;
        let content = content.clone();
        let styles = self.styles.clone();
        self.mutate(move |buffer| {
            let content = resolve_content_styles(&content, &styles)?;
            let page = content.common().page_hint.unwrap_or(1);
            let page_id = buffer.page_id(page)?;
            let margins = buffer.page_margins(page_id, margin_width)?;
            let rendered = ContentRenderer::render(
                buffer,
                &RenderRequest {
                    page,
                    rect: Rect::new(margins.left, margins.bottom, margins.right, margins.top),
                    content: &content,
                },
            )?;
            splice::append_ops(buffer.document_mut(), page_id, rendered.ops)
        })
    }

    pub fn set_title(&mut self, value: &str) -> OpResult<Vec<u8>> {
        self.set_metadata("Title", value)
    }

    pub fn set_author(&mut self, value: &str) -> OpResult<Vec<u8>> {
        self.set_metadata("Author", value)
    }

    pub fn set_creator(&mut self, value: &str) -> OpResult<Vec<u8>> {
        self.set_metadata("Creator", value)
    }

    pub fn set_subject(&mut self, value: &str) -> OpResult<Vec<u8>> {
        self.set_metadata("Subject", value)
    }

    pub fn set_keywords(&mut self, value: &str) -> OpResult<Vec<u8>> {
        self.set_metadata("Keywords", value)
    }

    fn set_metadata(&mut self, key: &'static str, value: &str) -> OpResult<Vec<u8>> {
        let value = value.to_string();
        self.mutate(move |buffer| buffer.set_info_entry(key, &value))
    }

    /// Finalizes the pipeline and returns the output artifact. All later
    /// mutation attempts fail.
    #[instrument(skip(self))]
    pub fn create_result(&mut self) -> OpResult<Vec<u8>> {
        if self.finalized {
            return OpResult::fail(ErrorKind::MissingData, "pipeline is already finalized");
        }
        self.finalized = true;
        info!(bytes = self.bytes.len(), "pipeline finalized");
        OpResult::success(self.bytes.clone())
    }

    /// Runs one mutation step over a fresh parse of the current bytes.
    ///
    /// The buffer advances only when the whole step succeeded and
    /// auto-update is enabled; a failure leaves the bytes untouched.
    fn mutate(
        &mut self,
        step: impl FnOnce(&mut PdfBuffer) -> Result<()>,
    ) -> OpResult<Vec<u8>> {
        if self.finalized {
            return OpResult::fail(ErrorKind::MissingData, "pipeline is finalized");
        }
        let auto_update = self.options.auto_update_changes;
        let run = || -> Result<Vec<u8>> {
            let mut buffer = PdfBuffer::from_bytes(&self.bytes)?;
            step(&mut buffer)?;
            buffer.touch_mod_date()?;
            buffer.to_bytes()
        };
        match run() {
            Ok(new_bytes) => {
                if auto_update {
                    self.bytes = new_bytes.clone();
                }
                OpResult::success(new_bytes)
            }
            Err(err) => OpResult::from_error(err),
        }
    }
}

/// Replaces every occurrence of `tag` in `buffer`, the content supplied
/// per page number. Returns the number of occurrences replaced.
///
/// Shared between the pipeline's replace operation and the merge engine,
/// whose system tags need a different value on every page.
pub(crate) fn apply_replacement_with(
    buffer: &mut PdfBuffer,
    tag: &str,
    strategy: PlacementStrategy,
    margin_width: f64,
    styles: &HashMap<String, TextStyle>,
    mut content_for_page: impl FnMut(u32) -> ReplaceableContent,
) -> Result<usize> {
    let pages = TagScanner::locate_spans(buffer, tag)?;
    let mut replaced = 0usize;
    for page in &pages {
        let margins = buffer.page_margins(page.page_id, margin_width)?;
        let elements = element_rects(&page.text);
        let content = resolve_content_styles(&content_for_page(page.page_number), styles)?;
        let mut jobs = Vec::with_capacity(page.matches.len());
        for located in &page.matches {
            let tag_match = TagMatch {
                page: page.page_number,
                rect: located.rect,
                raw_text: located.raw_text.clone(),
            };
            let rect = PlacementResolver::resolve(&tag_match, strategy, &margins, &elements);
            let effective = inherit_match_font(&content, located.font_size);
            let rendered = ContentRenderer::render(
                buffer,
                &RenderRequest {
                    page: page.page_number,
                    rect,
                    content: effective.as_ref().unwrap_or(&content),
                },
            )?;
            jobs.push(SpliceJob {
                spans: located.spans.clone(),
                ops: rendered.ops,
            });
            replaced += 1;
        }
        splice::rewrite_page(buffer.document_mut(), page.page_id, &page.text, &jobs)?;
    }
    Ok(replaced)
}

/// One flat resolution pass over the named-style registry, applied to
/// every text style the content carries before rendering sees it.
pub(crate) fn resolve_content_styles(
    content: &ReplaceableContent,
    styles: &HashMap<String, TextStyle>,
) -> Result<ReplaceableContent> {
    let mut resolved = content.clone();
    match &mut resolved {
        ReplaceableContent::Text(text) => {
            text.style = resolve_text_style(&text.style, styles)?;
        }
        ReplaceableContent::Table(table) => {
            for row in &mut table.table.rows {
                for cell in row {
                    cell.style.text = resolve_text_style(&cell.style.text, styles)?;
                }
            }
        }
        ReplaceableContent::Image(_) => {}
    }
    Ok(resolved)
}

/// Replacement text without an explicit font takes the matched tag's font
/// size, so it sits naturally in the surrounding line.
fn inherit_match_font(
    content: &ReplaceableContent,
    font_size: f64,
) -> Option<ReplaceableContent> {
    if let ReplaceableContent::Text(text) = content
        && text.style.font.is_none()
    {
        let mut adjusted: TextContent = text.clone();
        adjusted.style.font = Some(FontStyle {
            size: font_size,
            ..FontStyle::default()
        });
        return Some(ReplaceableContent::Text(adjusted));
    }
    None
}

// --- Tests -------------------------------------------------------------
