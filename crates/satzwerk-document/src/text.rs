// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream text interpreter — replays the text and graphics-state
// operators of a page and recovers every shown glyph with its page-space
// rectangle and its exact location inside the operation list. The location
// data (operation index, TJ item index, byte offset) is what allows the
// splice module to excise glyphs from the stream later.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use satzwerk_core::error::SatzwerkError;
use satzwerk_core::types::Rect;
use tracing::{debug, instrument, warn};

use crate::document::object_to_f64;

// -- Matrix -------------------------------------------------------------------

/// A PDF affine transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    /// `self * other` in PDF row-vector convention: the result applies
    /// `other` first, then `self`.
    pub fn multiply(self, other: Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply_to_point(self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// The matrix after a horizontal text advance of `distance` along its
    /// own x axis.
    pub fn advanced(mut self, distance: f64) -> Matrix {
        self.e += self.a * distance;
        self.f += self.b * distance;
        self
    }

    /// Inverse of the affine map, if it exists.
    pub fn invert(self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-12 {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Matrix {
            a,
            b,
            c,
            d,
            e: -(a * self.e + c * self.f),
            f: -(b * self.e + d * self.f),
        })
    }

    pub fn is_identity(&self) -> bool {
        const EPS: f64 = 1e-9;
        (self.a - 1.0).abs() < EPS
            && self.b.abs() < EPS
            && self.c.abs() < EPS
            && (self.d - 1.0).abs() < EPS
            && self.e.abs() < EPS
            && self.f.abs() < EPS
    }

    /// The six operands of a `Tm` or `cm` operation.
    pub fn to_operands(self) -> Vec<Object> {
        vec![
            Object::Real(self.a as f32),
            Object::Real(self.b as f32),
            Object::Real(self.c as f32),
            Object::Real(self.d as f32),
            Object::Real(self.e as f32),
            Object::Real(self.f as f32),
        ]
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() != 6 {
            return None;
        }
        Some(Matrix {
            a: object_to_f64(&operands[0])?,
            b: object_to_f64(&operands[1])?,
            c: object_to_f64(&operands[2])?,
            d: object_to_f64(&operands[3])?,
            e: object_to_f64(&operands[4])?,
            f: object_to_f64(&operands[5])?,
        })
    }
}

// -- Fonts --------------------------------------------------------------------

/// Per-font advance-width and vertical-extent data, in 1000-unit glyph space.
#[derive(Debug, Clone)]
struct FontInfo {
    first_char: i64,
    widths: Vec<f64>,
    ascent: f64,
    descent: f64,
}

/// Half an em, the conventional estimate when a font declares no widths.
const FALLBACK_GLYPH_WIDTH: f64 = 500.0;

impl FontInfo {
    fn fallback() -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            ascent: 718.0,
            descent: -207.0,
        }
    }

    fn width(&self, code: u8) -> f64 {
        let index = code as i64 - self.first_char;
        if index >= 0 && (index as usize) < self.widths.len() {
            let width = self.widths[index as usize];
            if width > 0.0 {
                return width;
            }
        }
        FALLBACK_GLYPH_WIDTH
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(&Object::Null),
        other => other,
    }
}

/// Walk the page's /Parent chain for an entry that pages may inherit.
pub(crate) fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..32 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// Build the resource-name → metrics map from the page's /Font dictionary.
fn build_font_map(doc: &Document, page_id: ObjectId) -> HashMap<String, FontInfo> {
    let mut fonts = HashMap::new();
    let Some(resources) = resolve_inherited(doc, page_id, b"Resources") else {
        return fonts;
    };
    let Ok(resources) = resolve(doc, resources).as_dict() else {
        return fonts;
    };
    let Ok(font_dict) = resources.get(b"Font") else {
        return fonts;
    };
    let Ok(font_dict) = resolve(doc, font_dict).as_dict() else {
        return fonts;
    };

    for (name, font_obj) in font_dict.iter() {
        let name = String::from_utf8_lossy(name).into_owned();
        let Ok(font) = resolve(doc, font_obj).as_dict() else {
            fonts.insert(name, FontInfo::fallback());
            continue;
        };
        fonts.insert(name, font_info_from_dict(doc, font));
    }
    fonts
}

fn font_info_from_dict(doc: &Document, font: &Dictionary) -> FontInfo {
    let mut info = FontInfo::fallback();

    if let Ok(first_char) = font.get(b"FirstChar")
        && let Ok(value) = resolve(doc, first_char).as_i64()
    {
        info.first_char = value;
    }
    if let Ok(widths) = font.get(b"Widths")
        && let Ok(widths) = resolve(doc, widths).as_array()
    {
        info.widths = widths
            .iter()
            .map(|w| object_to_f64(resolve(doc, w)).unwrap_or(0.0))
            .collect();
    }
    if let Ok(descriptor) = font.get(b"FontDescriptor")
        && let Ok(descriptor) = resolve(doc, descriptor).as_dict()
    {
        if let Ok(ascent) = descriptor.get(b"Ascent")
            && let Some(value) = object_to_f64(resolve(doc, ascent))
        {
            info.ascent = value;
        }
        if let Ok(descent) = descriptor.get(b"Descent")
            && let Some(value) = object_to_f64(resolve(doc, descent))
        {
            info.descent = value;
        }
    }
    info
}

// -- Interpreter output -------------------------------------------------------

/// One shown glyph, with its page-space rectangle and its exact address
/// inside the decoded operation list.
#[derive(Debug, Clone)]
pub struct PositionedChar {
    pub ch: char,
    /// Glyph bounding rectangle in page space (ascent to descent).
    pub rect: Rect,
    /// Index of the show operation in [`PageText::operations`].
    pub op_index: usize,
    /// For `TJ`, the index of the string item within the array operand.
    pub item_index: Option<usize>,
    /// Byte offset of this glyph's code within the string operand.
    pub byte_index: usize,
    /// Text matrix at the glyph origin, in text space.
    pub tm: Matrix,
    /// Horizontal advance this glyph contributed, in text space.
    pub advance: f64,
    pub font_name: String,
    pub font_size: f64,
}

/// Graphics and text state captured immediately before an operation runs.
#[derive(Debug, Clone)]
pub struct OpState {
    pub ctm: Matrix,
    pub tm: Matrix,
    pub lm: Matrix,
    pub leading: f64,
    pub font_name: Option<String>,
    pub font_size: f64,
    pub char_spacing: f64,
    pub word_spacing: f64,
    pub horiz_scaling: f64,
    pub in_text: bool,
}

/// The fully interpreted content of one page.
#[derive(Debug)]
pub struct PageText {
    pub operations: Vec<Operation>,
    pub chars: Vec<PositionedChar>,
    /// `op_states[i]` is the state before `operations[i]` executed.
    pub op_states: Vec<OpState>,
}

impl PageText {
    /// All glyphs joined in stream order, with a space between show
    /// operations. Useful for order-sensitive assertions; callers that
    /// compare text should normalise whitespace first.
    pub fn extracted_text(&self) -> String {
        let mut out = String::new();
        let mut last_op = usize::MAX;
        for ch in &self.chars {
            if ch.op_index != last_op && !out.is_empty() {
                out.push(' ');
            }
            out.push(ch.ch);
            last_op = ch.op_index;
        }
        out
    }

    /// Text grouped into visual lines, top to bottom, glyphs left to right.
    ///
    /// Glyphs join a line when their vertical bands overlap; a space is
    /// inserted at horizontal gaps wider than a quarter of the font size.
    /// `filter` keeps only lines containing the given substring;
    /// `skip_empty` drops lines that are blank after trimming.
    pub fn text_lines(&self, filter: Option<&str>, skip_empty: bool) -> Vec<String> {
        let mut lines: Vec<(Rect, Vec<&PositionedChar>)> = Vec::new();
        for ch in &self.chars {
            match lines
                .iter_mut()
                .find(|(band, _)| band.overlaps_vertically(&ch.rect))
            {
                Some((band, glyphs)) => {
                    *band = band.union(&ch.rect);
                    glyphs.push(ch);
                }
                None => lines.push((ch.rect, vec![ch])),
            }
        }
        lines.sort_by(|(a, _), (b, _)| b.top.total_cmp(&a.top));

        let mut out = Vec::with_capacity(lines.len());
        for (_, mut glyphs) in lines {
            glyphs.sort_by(|a, b| a.rect.left.total_cmp(&b.rect.left));
            let mut text = String::new();
            let mut prev_right: Option<f64> = None;
            for glyph in glyphs {
                if let Some(right) = prev_right
                    && glyph.rect.left - right > glyph.font_size * 0.25
                    && !text.ends_with(' ')
                {
                    text.push(' ');
                }
                text.push(glyph.ch);
                prev_right = Some(glyph.rect.right);
            }
            if skip_empty && text.trim().is_empty() {
                continue;
            }
            if let Some(needle) = filter
                && !text.contains(needle)
            {
                continue;
            }
            out.push(text);
        }
        out
    }
}

// -- Interpreter --------------------------------------------------------------

#[derive(Clone)]
struct InterpState {
    ctm: Matrix,
    tm: Matrix,
    lm: Matrix,
    leading: f64,
    font_name: Option<String>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horiz_scaling: f64,
    rise: f64,
    in_text: bool,
}

impl InterpState {
    fn new() -> Self {
        Self {
            ctm: Matrix::identity(),
            tm: Matrix::identity(),
            lm: Matrix::identity(),
            leading: 0.0,
            font_name: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scaling: 100.0,
            rise: 0.0,
            in_text: false,
        }
    }

    fn snapshot(&self) -> OpState {
        OpState {
            ctm: self.ctm,
            tm: self.tm,
            lm: self.lm,
            leading: self.leading,
            font_name: self.font_name.clone(),
            font_size: self.font_size,
            char_spacing: self.char_spacing,
            word_spacing: self.word_spacing,
            horiz_scaling: self.horiz_scaling,
            in_text: self.in_text,
        }
    }

    /// Move to the next line: `lm = lm * translate(0, -leading)`.
    fn next_line(&mut self) {
        self.lm = self.lm.multiply(Matrix::translate(0.0, -self.leading));
        self.tm = self.lm;
    }
}

/// Replays a page's content stream and yields positioned glyphs.
pub struct TextInterpreter;

impl TextInterpreter {
    /// Interpret the content stream of `page_id`.
    #[instrument(skip(doc), fields(?page_id))]
    pub fn interpret(doc: &Document, page_id: ObjectId) -> Result<PageText, SatzwerkError> {
        let content_bytes = doc
            .get_page_content(page_id)
            .map_err(|err| SatzwerkError::Pdf(format!("cannot read page content: {err}")))?;
        let content = Content::decode(&content_bytes)
            .map_err(|err| SatzwerkError::Content(format!("cannot decode content stream: {err}")))?;
        let fonts = build_font_map(doc, page_id);

        let mut state = InterpState::new();
        let mut gs_stack: Vec<InterpState> = Vec::new();
        let mut chars = Vec::new();
        let mut op_states = Vec::with_capacity(content.operations.len());

        for (op_index, op) in content.operations.iter().enumerate() {
            op_states.push(state.snapshot());
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => gs_stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = gs_stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.ctm = state.ctm.multiply(m);
                    }
                }
                "BT" => {
                    state.in_text = true;
                    state.tm = Matrix::identity();
                    state.lm = Matrix::identity();
                }
                "ET" => state.in_text = false,
                "Tf" => {
                    if operands.len() >= 2 {
                        if let Ok(name) = operands[0].as_name() {
                            state.font_name = Some(String::from_utf8_lossy(name).into_owned());
                        }
                        state.font_size = object_to_f64(&operands[1]).unwrap_or(0.0);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.tm = m;
                        state.lm = m;
                    }
                }
                "Td" => {
                    if let (Some(tx), Some(ty)) = operand_pair(operands) {
                        state.lm = state.lm.multiply(Matrix::translate(tx, ty));
                        state.tm = state.lm;
                    }
                }
                "TD" => {
                    if let (Some(tx), Some(ty)) = operand_pair(operands) {
                        state.leading = -ty;
                        state.lm = state.lm.multiply(Matrix::translate(tx, ty));
                        state.tm = state.lm;
                    }
                }
                "T*" => state.next_line(),
                "TL" => {
                    if let Some(value) = operands.first().and_then(object_to_f64) {
                        state.leading = value;
                    }
                }
                "Tc" => {
                    if let Some(value) = operands.first().and_then(object_to_f64) {
                        state.char_spacing = value;
                    }
                }
                "Tw" => {
                    if let Some(value) = operands.first().and_then(object_to_f64) {
                        state.word_spacing = value;
                    }
                }
                "Tz" => {
                    if let Some(value) = operands.first().and_then(object_to_f64) {
                        state.horiz_scaling = value;
                    }
                }
                "Ts" => {
                    if let Some(value) = operands.first().and_then(object_to_f64) {
                        state.rise = value;
                    }
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        show_string(&mut state, &fonts, bytes, op_index, None, &mut chars);
                    }
                }
                "'" => {
                    state.next_line();
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        show_string(&mut state, &fonts, bytes, op_index, None, &mut chars);
                    }
                }
                "\"" => {
                    if operands.len() >= 3 {
                        if let Some(value) = object_to_f64(&operands[0]) {
                            state.word_spacing = value;
                        }
                        if let Some(value) = object_to_f64(&operands[1]) {
                            state.char_spacing = value;
                        }
                        state.next_line();
                        if let Object::String(bytes, _) = &operands[2] {
                            show_string(&mut state, &fonts, bytes, op_index, None, &mut chars);
                        }
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        for (item_index, item) in items.iter().enumerate() {
                            match item {
                                Object::String(bytes, _) => show_string(
                                    &mut state,
                                    &fonts,
                                    bytes,
                                    op_index,
                                    Some(item_index),
                                    &mut chars,
                                ),
                                Object::Integer(_) | Object::Real(_) => {
                                    let kern = object_to_f64(item).unwrap_or(0.0);
                                    let adjust = (kern / 1000.0)
                                        * state.font_size
                                        * (state.horiz_scaling / 100.0);
                                    state.tm = state.tm.advanced(-adjust);
                                }
                                _ => {}
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        debug!(
            operations = op_states.len(),
            glyphs = chars.len(),
            "Page content interpreted"
        );
        Ok(PageText {
            operations: content.operations,
            chars,
            op_states,
        })
    }
}

fn operand_pair(operands: &[Object]) -> (Option<f64>, Option<f64>) {
    (
        operands.first().and_then(object_to_f64),
        operands.get(1).and_then(object_to_f64),
    )
}

/// Emit one positioned glyph per byte of a shown string, advancing the text
/// matrix as the renderer would. String bytes are treated as Latin-1, which
/// holds for the simple-font placeholder text this engine targets.
fn show_string(
    state: &mut InterpState,
    fonts: &HashMap<String, FontInfo>,
    bytes: &[u8],
    op_index: usize,
    item_index: Option<usize>,
    chars: &mut Vec<PositionedChar>,
) {
    let Some(font_name) = state.font_name.clone() else {
        warn!(op_index, "Show operation before any Tf; glyphs skipped");
        return;
    };
    let fallback = FontInfo::fallback();
    let font = fonts.get(&font_name).unwrap_or(&fallback);
    let font_size = state.font_size;
    let scale = state.horiz_scaling / 100.0;

    for (byte_index, &code) in bytes.iter().enumerate() {
        let ch = code as char;
        let glyph_width = font.width(code) / 1000.0;
        let mut advance = glyph_width * font_size + state.char_spacing;
        if code == b' ' {
            advance += state.word_spacing;
        }
        advance *= scale;

        // Text rendering matrix: font scale, then text matrix, then CTM.
        let trm = state.ctm.multiply(state.tm.multiply(Matrix {
            a: font_size * scale,
            b: 0.0,
            c: 0.0,
            d: font_size,
            e: 0.0,
            f: state.rise,
        }));
        let ascent = font.ascent / 1000.0;
        let descent = font.descent / 1000.0;
        let corners = [
            trm.apply_to_point(0.0, descent),
            trm.apply_to_point(glyph_width, descent),
            trm.apply_to_point(0.0, ascent),
            trm.apply_to_point(glyph_width, ascent),
        ];
        let min_x = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        chars.push(PositionedChar {
            ch,
            rect: Rect::new(min_x, min_y, max_x, max_y),
            op_index,
            item_index,
            byte_index,
            tm: state.tm,
            advance,
            font_name: font_name.clone(),
            font_size,
        });
        state.tm = state.tm.advanced(advance);
    }
}
