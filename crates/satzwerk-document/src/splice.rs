// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream rewriting. A tag occurrence is a run of glyphs inside one
// or more show operations; replacing it means excising exactly those bytes
// from the stream and splicing the replacement drawing at the excision
// point, without disturbing the position of any surviving glyph.
//
// The rebuild anchors every surviving string segment with an absolute `Tm`
// taken from the interpreter, so excised advances never shift later text.
// Because `Tm` also overwrites the line matrix, relative positioning
// operators after a splice are rewritten to absolute equivalents until the
// stream reaches its next natural anchor (`Tm`, `BT` or `ET`).

use std::collections::HashMap;
use std::ops::Range;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use satzwerk_core::error::SatzwerkError;
use tracing::{debug, instrument};

use crate::text::{Matrix, OpState, PageText};

/// One contiguous run of excised bytes inside a single string operand.
#[derive(Debug, Clone)]
pub struct ExcisedSpan {
    pub op_index: usize,
    /// For `TJ`, the index of the string item within the array operand.
    pub item_index: Option<usize>,
    pub byte_range: Range<usize>,
}

/// One tag occurrence to remove, with the drawing that takes its place.
///
/// `spans` lists the excised pieces in stream order; the replacement is
/// spliced where the first piece was. Replacement operations are complete
/// page-space fragments (their own `BT`/`ET` or `q`/`Q` pairs).
#[derive(Debug, Clone)]
pub struct SpliceJob {
    pub spans: Vec<ExcisedSpan>,
    pub ops: Vec<Operation>,
}

/// Rewrite the content stream of `page_id`, applying every job at once.
///
/// `page` must be the interpretation of the page's current content; the
/// span addresses in the jobs refer to its operation list.
#[instrument(skip_all, fields(?page_id, jobs = jobs.len()))]
pub fn rewrite_page(
    doc: &mut Document,
    page_id: ObjectId,
    page: &PageText,
    jobs: &[SpliceJob],
) -> Result<(), SatzwerkError> {
    // Per-operation excision pieces, in stream order.
    let mut pieces: HashMap<usize, Vec<Piece>> = HashMap::new();
    for (job_index, job) in jobs.iter().enumerate() {
        for (span_index, span) in job.spans.iter().enumerate() {
            if span.op_index >= page.operations.len() {
                return Err(SatzwerkError::Content(format!(
                    "splice span references operation {} of {}",
                    span.op_index,
                    page.operations.len()
                )));
            }
            pieces.entry(span.op_index).or_default().push(Piece {
                item_index: span.item_index,
                byte_range: span.byte_range.clone(),
                insert_job: (span_index == 0).then_some(job_index),
            });
        }
    }
    for op_pieces in pieces.values_mut() {
        op_pieces.sort_by_key(|p| (p.item_index, p.byte_range.start));
    }

    let segment_anchors = build_segment_anchors(page);

    let mut out: Vec<Operation> = Vec::with_capacity(page.operations.len() + 16);
    let mut reanchor = false;

    for (op_index, op) in page.operations.iter().enumerate() {
        let state = &page.op_states[op_index];
        match pieces.get(&op_index) {
            Some(op_pieces) => {
                rebuild_show_op(
                    op,
                    op_index,
                    state,
                    op_pieces,
                    jobs,
                    &segment_anchors,
                    &mut out,
                )?;
                reanchor = true;
            }
            None if reanchor => reanchor = reanchor_op(op, state, &mut out),
            None => out.push(op.clone()),
        }
    }

    let encoded = Content { operations: out }
        .encode()
        .map_err(|err| SatzwerkError::Content(format!("cannot encode content stream: {err}")))?;
    doc.change_page_content(page_id, encoded)
        .map_err(|err| SatzwerkError::Pdf(format!("cannot replace page content: {err}")))?;

    debug!("Page content rewritten");
    Ok(())
}

/// Append standalone drawing operations after the page's existing content.
///
/// The existing content is wrapped in `q`/`Q` first so dangling graphics
/// state cannot leak into the appended drawing.
#[instrument(skip_all, fields(?page_id, ops = ops.len()))]
pub fn append_ops(
    doc: &mut Document,
    page_id: ObjectId,
    ops: Vec<Operation>,
) -> Result<(), SatzwerkError> {
    let existing = doc
        .get_page_content(page_id)
        .map_err(|err| SatzwerkError::Pdf(format!("cannot read page content: {err}")))?;

    let mut combined = Vec::with_capacity(existing.len() + 64);
    combined.extend_from_slice(b"q\n");
    combined.extend_from_slice(&existing);
    combined.extend_from_slice(b"\nQ\n");
    let appended = Content { operations: ops }
        .encode()
        .map_err(|err| SatzwerkError::Content(format!("cannot encode content stream: {err}")))?;
    combined.extend_from_slice(&appended);

    doc.change_page_content(page_id, combined)
        .map_err(|err| SatzwerkError::Pdf(format!("cannot replace page content: {err}")))?;
    Ok(())
}

// -- Rebuild ------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Piece {
    item_index: Option<usize>,
    byte_range: Range<usize>,
    insert_job: Option<usize>,
}

/// Text matrix at the first glyph of each (op, item, byte) address.
type SegmentAnchors = HashMap<(usize, Option<usize>, usize), Matrix>;

fn build_segment_anchors(page: &PageText) -> SegmentAnchors {
    page.chars
        .iter()
        .map(|ch| ((ch.op_index, ch.item_index, ch.byte_index), ch.tm))
        .collect()
}

/// Effective text parameters while a show operation runs. Starts from the
/// pre-operation snapshot; `"` overrides spacing from its own operands.
struct ShowParams {
    font_name: Option<String>,
    font_size: f64,
    leading: f64,
    char_spacing: f64,
    word_spacing: f64,
    horiz_scaling: f64,
}

impl ShowParams {
    fn from_state(op: &Operation, state: &OpState) -> Self {
        let mut params = Self {
            font_name: state.font_name.clone(),
            font_size: state.font_size,
            leading: state.leading,
            char_spacing: state.char_spacing,
            word_spacing: state.word_spacing,
            horiz_scaling: state.horiz_scaling,
        };
        if op.operator == "\"" && op.operands.len() >= 3 {
            if let Some(value) = crate::document::object_to_f64(&op.operands[0]) {
                params.word_spacing = value;
            }
            if let Some(value) = crate::document::object_to_f64(&op.operands[1]) {
                params.char_spacing = value;
            }
        }
        params
    }

    /// Operations that restore this state inside a freshly opened text
    /// object.
    fn restore_ops(&self) -> Vec<Operation> {
        let mut ops = Vec::with_capacity(5);
        if let Some(name) = &self.font_name {
            ops.push(Operation::new(
                "Tf",
                vec![
                    Object::Name(name.as_bytes().to_vec()),
                    Object::Real(self.font_size as f32),
                ],
            ));
        }
        ops.push(Operation::new("TL", vec![Object::Real(self.leading as f32)]));
        ops.push(Operation::new("Tc", vec![Object::Real(self.char_spacing as f32)]));
        ops.push(Operation::new("Tw", vec![Object::Real(self.word_spacing as f32)]));
        ops.push(Operation::new("Tz", vec![Object::Real(self.horiz_scaling as f32)]));
        ops
    }
}

/// String items of a show operation, addressed the way the interpreter
/// addresses them.
fn string_items(op: &Operation) -> Vec<(Option<usize>, Vec<u8>)> {
    match op.operator.as_str() {
        "Tj" | "'" => match op.operands.first() {
            Some(Object::String(bytes, _)) => vec![(None, bytes.clone())],
            _ => Vec::new(),
        },
        "\"" => match op.operands.get(2) {
            Some(Object::String(bytes, _)) => vec![(None, bytes.clone())],
            _ => Vec::new(),
        },
        "TJ" => match op.operands.first() {
            Some(Object::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| match item {
                    Object::String(bytes, _) => Some((Some(index), bytes.clone())),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Rebuild one show operation with its excisions applied: surviving
/// segments become `Tm`-anchored `Tj` operations, and each job's
/// replacement drawing is spliced at its first excised piece.
fn rebuild_show_op(
    op: &Operation,
    op_index: usize,
    state: &OpState,
    op_pieces: &[Piece],
    jobs: &[SpliceJob],
    anchors: &SegmentAnchors,
    out: &mut Vec<Operation>,
) -> Result<(), SatzwerkError> {
    let items = string_items(op);
    if items.is_empty() {
        return Err(SatzwerkError::Content(format!(
            "splice span targets non-text operation '{}'",
            op.operator
        )));
    }
    let params = ShowParams::from_state(op, state);

    for (item_index, bytes) in &items {
        // Events for this item, in byte order: kept segments and excisions.
        let ranges: Vec<&Piece> = op_pieces
            .iter()
            .filter(|p| p.item_index == *item_index)
            .collect();
        let mut cursor = 0usize;
        for piece in &ranges {
            if piece.byte_range.start > bytes.len()
                || piece.byte_range.end > bytes.len()
                || piece.byte_range.start < cursor
            {
                return Err(SatzwerkError::Content(format!(
                    "splice span byte range {:?} out of order for a {}-byte string",
                    piece.byte_range,
                    bytes.len()
                )));
            }
            if piece.byte_range.start > cursor {
                emit_segment(
                    op_index,
                    *item_index,
                    cursor,
                    &bytes[cursor..piece.byte_range.start],
                    anchors,
                    out,
                )?;
            }
            if let Some(job_index) = piece.insert_job {
                emit_splice_block(&jobs[job_index].ops, state, &params, out);
            }
            cursor = piece.byte_range.end;
        }
        if cursor < bytes.len() {
            emit_segment(op_index, *item_index, cursor, &bytes[cursor..], anchors, out)?;
        }
    }
    Ok(())
}

fn emit_segment(
    op_index: usize,
    item_index: Option<usize>,
    byte_index: usize,
    bytes: &[u8],
    anchors: &SegmentAnchors,
    out: &mut Vec<Operation>,
) -> Result<(), SatzwerkError> {
    let tm = anchors
        .get(&(op_index, item_index, byte_index))
        .copied()
        .ok_or_else(|| {
            SatzwerkError::Content(format!(
                "no glyph anchor for operation {op_index} byte {byte_index}"
            ))
        })?;
    out.push(Operation::new("Tm", tm.to_operands()));
    out.push(Operation::new("Tj", vec![Object::string_literal(bytes.to_vec())]));
    Ok(())
}

/// Close the text object, draw the replacement, reopen and restore text
/// state. The replacement runs inside `q`/`Q`: its graphics state (fill
/// colour, any CTM undo) must not leak into the surviving stream. When
/// the state carries a non-identity CTM it is undone first so page-space
/// replacement coordinates stay valid.
fn emit_splice_block(
    replacement: &[Operation],
    state: &OpState,
    params: &ShowParams,
    out: &mut Vec<Operation>,
) {
    out.push(Operation::new("ET", vec![]));
    out.push(Operation::new("q", vec![]));
    if let Some(inverse) = (!state.ctm.is_identity()).then(|| state.ctm.invert()).flatten() {
        out.push(Operation::new("cm", inverse.to_operands()));
    }
    out.extend_from_slice(replacement);
    out.push(Operation::new("Q", vec![]));
    out.push(Operation::new("BT", vec![]));
    out.extend(params.restore_ops());
}

/// Handle one operation while the stream's line matrix is out of sync with
/// the original. Returns whether re-anchoring is still needed afterwards.
fn reanchor_op(op: &Operation, state: &OpState, out: &mut Vec<Operation>) -> bool {
    match op.operator.as_str() {
        "Td" => {
            if let (Some(tx), Some(ty)) = operand_pair(&op.operands) {
                let lm = state.lm.multiply(Matrix::translate(tx, ty));
                out.push(Operation::new("Tm", lm.to_operands()));
                return false;
            }
            out.push(op.clone());
            true
        }
        "TD" => {
            if let (Some(tx), Some(ty)) = operand_pair(&op.operands) {
                let lm = state.lm.multiply(Matrix::translate(tx, ty));
                out.push(Operation::new("TL", vec![Object::Real(-ty as f32)]));
                out.push(Operation::new("Tm", lm.to_operands()));
                return false;
            }
            out.push(op.clone());
            true
        }
        "T*" => {
            let lm = state.lm.multiply(Matrix::translate(0.0, -state.leading));
            out.push(Operation::new("Tm", lm.to_operands()));
            false
        }
        "'" => {
            let lm = state.lm.multiply(Matrix::translate(0.0, -state.leading));
            out.push(Operation::new("Tm", lm.to_operands()));
            if let Some(string) = op.operands.first() {
                out.push(Operation::new("Tj", vec![string.clone()]));
            }
            false
        }
        "\"" => {
            if op.operands.len() >= 3 {
                out.push(Operation::new("Tw", vec![op.operands[0].clone()]));
                out.push(Operation::new("Tc", vec![op.operands[1].clone()]));
                let lm = state.lm.multiply(Matrix::translate(0.0, -state.leading));
                out.push(Operation::new("Tm", lm.to_operands()));
                out.push(Operation::new("Tj", vec![op.operands[2].clone()]));
                return false;
            }
            out.push(op.clone());
            true
        }
        // A bare show op still flows from the (possibly shifted) text
        // matrix, so it gets its own absolute anchor; the line matrix
        // remains out of sync.
        "Tj" | "TJ" => {
            out.push(Operation::new("Tm", state.tm.to_operands()));
            out.push(op.clone());
            true
        }
        // Natural absolute anchors end the rewrite.
        "Tm" | "BT" | "ET" => {
            out.push(op.clone());
            false
        }
        _ => {
            out.push(op.clone());
            true
        }
    }
}

fn operand_pair(operands: &[Object]) -> (Option<f64>, Option<f64>) {
    (
        operands.first().and_then(crate::document::object_to_f64),
        operands.get(1).and_then(crate::document::object_to_f64),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::single_page_pdf;
    use crate::document::PdfBuffer;
    use crate::text::TextInterpreter;

    fn normalised(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Locate a literal substring among a page's glyphs and build the
    /// excision spans covering it, the way the scanner does.
    fn spans_for(page: &PageText, needle: &str) -> Vec<ExcisedSpan> {
        let glyphs: String = page.chars.iter().map(|c| c.ch).collect();
        let start = glyphs.find(needle).expect("needle present");
        let matched = &page.chars[start..start + needle.len()];

        let mut spans: Vec<ExcisedSpan> = Vec::new();
        for ch in matched {
            match spans.last_mut() {
                Some(span)
                    if span.op_index == ch.op_index
                        && span.item_index == ch.item_index
                        && span.byte_range.end == ch.byte_index =>
                {
                    span.byte_range.end += 1;
                }
                _ => spans.push(ExcisedSpan {
                    op_index: ch.op_index,
                    item_index: ch.item_index,
                    byte_range: ch.byte_index..ch.byte_index + 1,
                }),
            }
        }
        spans
    }

    fn replacement_text_ops(text: &str, x: f64, y: f64) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Real(12.0)],
            ),
            Operation::new("Tm", Matrix::translate(x, y).to_operands()),
            Operation::new("Tj", vec![Object::string_literal(text.as_bytes().to_vec())]),
            Operation::new("ET", vec![]),
        ]
    }

    #[test]
    fn tag_in_own_op_is_replaced_in_stream_order() {
        let bytes = single_page_pdf(
            "BT /F1 12 Tf 72 700 Td (Hello) Tj 0 -14 Td (#TITLE#) Tj 0 -14 Td (World) Tj ET",
        );
        let mut buffer = PdfBuffer::from_bytes(&bytes).expect("load fixture");
        let page_id = buffer.page_id(1).expect("page 1");
        let page = TextInterpreter::interpret(buffer.document(), page_id).expect("interpret");

        let spans = spans_for(&page, "#TITLE#");
        let tag_rect = page.chars[page
            .chars
            .iter()
            .position(|c| c.ch == '#')
            .expect("tag glyph")]
        .rect;
        let jobs = vec![SpliceJob {
            spans,
            ops: replacement_text_ops("Lorem ipsum", tag_rect.left, tag_rect.bottom),
        }];
        rewrite_page(buffer.document_mut(), page_id, &page, &jobs).expect("rewrite");

        let rewritten =
            TextInterpreter::interpret(buffer.document(), page_id).expect("reinterpret");
        let text = normalised(&rewritten.extracted_text());
        assert_eq!(text, "Hello Lorem ipsum World");
        assert!(!text.contains("#TITLE#"));
    }

    #[test]
    fn following_lines_keep_their_position() {
        let bytes = single_page_pdf(
            "BT /F1 12 Tf 72 700 Td (#TAG#) Tj 0 -14 Td (Below) Tj ET",
        );
        let mut buffer = PdfBuffer::from_bytes(&bytes).expect("load fixture");
        let page_id = buffer.page_id(1).expect("page 1");
        let page = TextInterpreter::interpret(buffer.document(), page_id).expect("interpret");

        let below_before = page
            .chars
            .iter()
            .find(|c| c.ch == 'B')
            .expect("Below glyph")
            .rect;

        let jobs = vec![SpliceJob {
            spans: spans_for(&page, "#TAG#"),
            ops: replacement_text_ops("X", 72.0, 700.0),
        }];
        rewrite_page(buffer.document_mut(), page_id, &page, &jobs).expect("rewrite");

        let rewritten =
            TextInterpreter::interpret(buffer.document(), page_id).expect("reinterpret");
        let below_after = rewritten
            .chars
            .iter()
            .find(|c| c.ch == 'B')
            .expect("Below glyph survives")
            .rect;
        assert!(below_before.approx_eq(&below_after, 0.01));
    }

    #[test]
    fn tag_inside_a_longer_string_keeps_prefix_and_suffix() {
        let bytes = single_page_pdf("BT /F1 12 Tf 72 700 Td (Dear #NAME#, welcome) Tj ET");
        let mut buffer = PdfBuffer::from_bytes(&bytes).expect("load fixture");
        let page_id = buffer.page_id(1).expect("page 1");
        let page = TextInterpreter::interpret(buffer.document(), page_id).expect("interpret");

        // The suffix glyph right after the tag, before rewriting.
        let comma_before = page
            .chars
            .iter()
            .find(|c| c.ch == ',')
            .expect("comma glyph")
            .rect;

        let jobs = vec![SpliceJob {
            spans: spans_for(&page, "#NAME#"),
            ops: replacement_text_ops("Ada", 100.0, 700.0),
        }];
        rewrite_page(buffer.document_mut(), page_id, &page, &jobs).expect("rewrite");

        let rewritten =
            TextInterpreter::interpret(buffer.document(), page_id).expect("reinterpret");
        let text = normalised(&rewritten.extracted_text());
        assert_eq!(text, "Dear Ada , welcome");

        // The suffix did not shift left into the excised space.
        let comma_after = rewritten
            .chars
            .iter()
            .find(|c| c.ch == ',')
            .expect("comma survives")
            .rect;
        assert!(comma_before.approx_eq(&comma_after, 0.01));
    }

    #[test]
    fn replacement_colour_stays_inside_the_spliced_block() {
        use crate::draw::text_ops;
        use satzwerk_core::style::Color;

        let bytes = single_page_pdf("BT /F1 12 Tf 72 700 Td (Dear #NAME#, welcome) Tj ET");
        let mut buffer = PdfBuffer::from_bytes(&bytes).expect("load fixture");
        let page_id = buffer.page_id(1).expect("page 1");
        let page = TextInterpreter::interpret(buffer.document(), page_id).expect("interpret");

        let red = Color { r: 1.0, g: 0.0, b: 0.0 };
        let jobs = vec![SpliceJob {
            spans: spans_for(&page, "#NAME#"),
            ops: text_ops("F1", 12.0, red, &[(100.0, 700.0, "Ada".to_string())]),
        }];
        rewrite_page(buffer.document_mut(), page_id, &page, &jobs).expect("rewrite");

        let rewritten =
            TextInterpreter::interpret(buffer.document(), page_id).expect("reinterpret");
        assert!(normalised(&rewritten.extracted_text()).contains("welcome"));

        // The colour change runs at positive q/Q depth, so the suffix
        // glyphs after the splice keep the surrounding fill colour.
        let mut depth = 0i32;
        for op in &rewritten.operations {
            match op.operator.as_str() {
                "q" => depth += 1,
                "Q" => depth -= 1,
                "rg" => assert!(depth > 0, "fill colour set outside q/Q"),
                _ => {}
            }
        }
    }

    #[test]
    fn tag_split_across_tj_items_is_fully_excised() {
        let bytes =
            single_page_pdf("BT /F1 12 Tf 72 700 Td [(Total #SU) -20 (M# due)] TJ ET");
        let mut buffer = PdfBuffer::from_bytes(&bytes).expect("load fixture");
        let page_id = buffer.page_id(1).expect("page 1");
        let page = TextInterpreter::interpret(buffer.document(), page_id).expect("interpret");

        let jobs = vec![SpliceJob {
            spans: spans_for(&page, "#SUM#"),
            ops: replacement_text_ops("42", 120.0, 700.0),
        }];
        rewrite_page(buffer.document_mut(), page_id, &page, &jobs).expect("rewrite");

        let rewritten =
            TextInterpreter::interpret(buffer.document(), page_id).expect("reinterpret");
        let text = normalised(&rewritten.extracted_text());
        assert!(!text.contains("#SUM#"));
        assert!(!text.contains("#SU"));
        assert_eq!(text, "Total 42 due");
    }

    #[test]
    fn append_ops_preserves_existing_content() {
        let bytes = single_page_pdf("BT /F1 12 Tf 72 700 Td (Original) Tj ET");
        let mut buffer = PdfBuffer::from_bytes(&bytes).expect("load fixture");
        let page_id = buffer.page_id(1).expect("page 1");

        append_ops(
            buffer.document_mut(),
            page_id,
            replacement_text_ops("Overlay", 72.0, 600.0),
        )
        .expect("append");

        let page = TextInterpreter::interpret(buffer.document(), page_id).expect("interpret");
        let text = normalised(&page.extracted_text());
        assert_eq!(text, "Original Overlay");
    }
}
