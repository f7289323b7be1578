// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Tag location.
//!
//! A tag is a literal placeholder string typed into the template's text.
//! The scanner interprets every page's content stream, reassembles the
//! glyph sequence in stream order, and finds tag occurrences even when a
//! tag is split across several show operations. A tag that appears nowhere
//! is not an error, the result is simply empty.

use lopdf::ObjectId;
use tracing::{debug, instrument};

use satzwerk_core::error::{Result, SatzwerkError};
use satzwerk_core::types::{Rect, TagMatch};
use satzwerk_document::splice::ExcisedSpan;
use satzwerk_document::text::{PageText, PositionedChar, TextInterpreter};
use satzwerk_document::PdfBuffer;

// --- Scan results ------------------------------------------------------

/// One located occurrence, carrying everything the splice step needs.
#[derive(Debug, Clone)]
pub(crate) struct LocatedMatch {
    pub rect: Rect,
    pub raw_text: String,
    /// Content-stream pieces covering the tag's glyphs, in stream order.
    pub spans: Vec<ExcisedSpan>,
    /// Font size of the tag's first glyph, used as the default size for
    /// replacement text when the caller's style does not pin one.
    pub font_size: f64,
}

/// All matches on one page, together with the interpreted page text so
/// the caller can rewrite the stream without interpreting twice.
#[derive(Debug)]
pub(crate) struct PageMatches {
    pub page_number: u32,
    pub page_id: ObjectId,
    pub text: PageText,
    pub matches: Vec<LocatedMatch>,
}

// --- Scanner -----------------------------------------------------------

pub struct TagScanner;

impl TagScanner {
    /// Locates every occurrence of `tag` across the whole document.
    ///
    /// Matches are returned in reading order: ascending page, then top to
    /// bottom, then left to right. An unknown tag yields an empty vector.
    #[instrument(skip(buffer))]
    pub fn locate(buffer: &PdfBuffer, tag: &str) -> Result<Vec<TagMatch>> {
        let pages = Self::locate_spans(buffer, tag)?;
        let mut out = Vec::new();
        for page in &pages {
            for located in &page.matches {
                out.push(TagMatch {
                    page: page.page_number,
                    rect: located.rect,
                    raw_text: located.raw_text.clone(),
                });
            }
        }
        sort_matches(&mut out);
        debug!(tag, count = out.len(), "tag scan complete");
        Ok(out)
    }

    /// Like [`TagScanner::locate`] but keeps the stream-level spans and the
    /// interpreted page text, for the replace path.
    ///
    /// Only pages with at least one match are returned.
    pub(crate) fn locate_spans(buffer: &PdfBuffer, tag: &str) -> Result<Vec<PageMatches>> {
        if tag.is_empty() {
            return Err(SatzwerkError::MissingData(
                "tag must not be empty".into(),
            ));
        }
        let needle: Vec<char> = tag.chars().collect();
        let mut pages = Vec::new();
        for (index, page_id) in buffer.page_ids().into_iter().enumerate() {
            let text = TextInterpreter::interpret(buffer.document(), page_id)?;
            let matches = find_on_page(&text, &needle, tag);
            if !matches.is_empty() {
                pages.push(PageMatches {
                    page_number: index as u32 + 1,
                    page_id,
                    text,
                    matches,
                });
            }
        }
        Ok(pages)
    }
}

/// Reading order: page ascending, then top edge descending, then left
/// edge ascending.
pub(crate) fn sort_matches(matches: &mut [TagMatch]) {
    matches.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(b.rect.top.total_cmp(&a.rect.top))
            .then(a.rect.left.total_cmp(&b.rect.left))
    });
}

/// Finds non-overlapping occurrences of `needle` in the page's glyph
/// sequence. The sequence follows stream order, so a tag split across
/// show operations is still found as long as its glyphs are adjacent.
fn find_on_page(text: &PageText, needle: &[char], raw: &str) -> Vec<LocatedMatch> {
    let glyphs = &text.chars;
    let mut matches = Vec::new();
    let mut i = 0;
    while i + needle.len() <= glyphs.len() {
        if glyphs[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|(g, n)| g.ch == *n)
        {
            let run = &glyphs[i..i + needle.len()];
            matches.push(LocatedMatch {
                rect: union_rect(run),
                raw_text: raw.to_string(),
                spans: spans_for(run),
                font_size: run[0].font_size,
            });
            i += needle.len();
        } else {
            i += 1;
        }
    }
    matches
}

fn union_rect(run: &[PositionedChar]) -> Rect {
    let mut rect = run[0].rect;
    for glyph in &run[1..] {
        rect = rect.union(&glyph.rect);
    }
    rect
}

/// Groups a glyph run into contiguous content-stream pieces. Glyphs are
/// single bytes in the stream, so a piece extends while the operation,
/// array item and byte offset all continue where the last glyph left off.
pub(crate) fn spans_for(run: &[PositionedChar]) -> Vec<ExcisedSpan> {
    let mut spans: Vec<ExcisedSpan> = Vec::new();
    for glyph in run {
        if let Some(last) = spans.last_mut()
            && last.op_index == glyph.op_index
            && last.item_index == glyph.item_index
            && last.byte_range.end == glyph.byte_index
        {
            last.byte_range.end = glyph.byte_index + 1;
            continue;
        }
        spans.push(ExcisedSpan {
            op_index: glyph.op_index,
            item_index: glyph.item_index,
            byte_range: glyph.byte_index..glyph.byte_index + 1,
        });
    }
    spans
}

// --- Tests -------------------------------------------------------------
