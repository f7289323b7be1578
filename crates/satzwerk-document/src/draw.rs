// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drawing-operation builders — the page-space fragments the renderers
// splice or overlay onto a page, plus the resource registration (fonts,
// image XObjects) those fragments reference.

use image::GenericImageView;
use lopdf::content::Operation;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use satzwerk_core::error::SatzwerkError;
use satzwerk_core::style::Color;
use satzwerk_core::types::Rect;
use tracing::{debug, instrument};

use crate::text::Matrix;

// -- Resource registration ----------------------------------------------------

/// Make sure the page owns an indirect /Resources dictionary and return its
/// object ID. Inline dictionaries are hoisted into an object; inherited
/// dictionaries are copied down so the page can be extended independently.
fn resources_object(doc: &mut Document, page_id: ObjectId) -> Result<ObjectId, SatzwerkError> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|err| SatzwerkError::Pdf(format!("cannot read page {page_id:?}: {err}")))?;

    match page_dict.get(b"Resources") {
        Ok(Object::Reference(id)) => return Ok(*id),
        Ok(Object::Dictionary(inline)) => {
            let hoisted = inline.clone();
            let resources_id = doc.add_object(Object::Dictionary(hoisted));
            set_page_resources(doc, page_id, resources_id)?;
            return Ok(resources_id);
        }
        _ => {}
    }

    // Inherited or absent: copy what an ancestor provides, or start empty.
    let inherited = inherited_resources(doc, page_id).unwrap_or_default();
    let resources_id = doc.add_object(Object::Dictionary(inherited));
    set_page_resources(doc, page_id, resources_id)?;
    Ok(resources_id)
}

fn set_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    resources_id: ObjectId,
) -> Result<(), SatzwerkError> {
    match doc.get_object_mut(page_id) {
        Ok(Object::Dictionary(page_dict)) => {
            page_dict.set("Resources", Object::Reference(resources_id));
            Ok(())
        }
        _ => Err(SatzwerkError::Pdf(format!(
            "page {page_id:?} is not a dictionary"
        ))),
    }
}

fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut current = page_id;
    for _ in 0..32 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(resources) = dict.get(b"Resources") {
            let resolved = match resources {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            return resolved.as_dict().ok().cloned();
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// Register `entry_id` under the named resource category (`Font`,
/// `XObject`), returning the resource name to reference it by. An existing
/// name is returned unchanged when `reuse` matches an entry.
fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    prefix: &str,
    entry: Object,
) -> Result<String, SatzwerkError> {
    let resources_id = resources_object(doc, page_id)?;
    let Ok(Object::Dictionary(resources)) = doc.get_object_mut(resources_id) else {
        return Err(SatzwerkError::Pdf("/Resources is not a dictionary".into()));
    };

    let category_dict = match resources.get_mut(category.as_bytes()) {
        Ok(Object::Dictionary(existing)) => existing,
        _ => {
            resources.set(category, Object::Dictionary(Dictionary::new()));
            match resources.get_mut(category.as_bytes()) {
                Ok(Object::Dictionary(created)) => created,
                _ => {
                    return Err(SatzwerkError::Pdf(format!(
                        "cannot create /{category} in resources"
                    )));
                }
            }
        }
    };

    let mut index = category_dict.len();
    loop {
        let name = format!("{prefix}{index}");
        if category_dict.get(name.as_bytes()).is_err() {
            category_dict.set(name.as_bytes().to_vec(), entry);
            return Ok(name);
        }
        index += 1;
    }
}

/// Register a standard Type1 font on the page, reusing an existing entry
/// with the same /BaseFont when one is present.
#[instrument(skip(doc), fields(?page_id, base_font))]
pub fn ensure_font(
    doc: &mut Document,
    page_id: ObjectId,
    base_font: &str,
) -> Result<String, SatzwerkError> {
    let resources_id = resources_object(doc, page_id)?;

    // Look for an existing simple font with the same base name.
    let existing = {
        let Ok(Object::Dictionary(resources)) = doc.get_object(resources_id) else {
            return Err(SatzwerkError::Pdf("/Resources is not a dictionary".into()));
        };
        resources
            .get(b"Font")
            .ok()
            .and_then(|fonts| match fonts {
                Object::Dictionary(fonts) => Some(fonts),
                _ => None,
            })
            .and_then(|fonts| {
                fonts.iter().find_map(|(name, font)| {
                    let font = match font {
                        Object::Reference(id) => doc.get_object(*id).ok()?,
                        other => other,
                    };
                    let font = font.as_dict().ok()?;
                    let base = font.get(b"BaseFont").ok()?.as_name().ok()?;
                    (base == base_font.as_bytes())
                        .then(|| String::from_utf8_lossy(name).into_owned())
                })
            })
    };
    if let Some(name) = existing {
        return Ok(name);
    }

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
    });
    let name = register_resource(doc, page_id, "Font", "SwF", Object::Reference(font_id))?;
    debug!(name, "Font registered");
    Ok(name)
}

/// Decode an encoded image and embed it as an RGB image XObject on the
/// page. Returns the resource name and the pixel dimensions.
#[instrument(skip_all, fields(?page_id, bytes_len = data.len()))]
pub fn embed_image(
    doc: &mut Document,
    page_id: ObjectId,
    data: &[u8],
) -> Result<(String, u32, u32), SatzwerkError> {
    let decoded = image::load_from_memory(data)
        .map_err(|err| SatzwerkError::Image(format!("cannot decode image: {err}")))?;
    let (width, height) = decoded.dimensions();
    let rgb = decoded.to_rgb8();

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    );
    let image_id = doc.add_object(Object::Stream(stream));
    let name = register_resource(doc, page_id, "XObject", "SwIm", Object::Reference(image_id))?;
    debug!(name, width, height, "Image XObject embedded");
    Ok((name, width, height))
}

// -- Operation builders -------------------------------------------------------

/// Text lines drawn at absolute page positions, as one self-contained text
/// object. Each line is `(x, y, text)` with `y` at the baseline.
pub fn text_ops(
    font_name: &str,
    font_size: f64,
    color: Color,
    lines: &[(f64, f64, String)],
) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(lines.len() * 2 + 4);
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "rg",
        vec![
            Object::Real(color.r as f32),
            Object::Real(color.g as f32),
            Object::Real(color.b as f32),
        ],
    ));
    ops.push(Operation::new(
        "Tf",
        vec![
            Object::Name(font_name.as_bytes().to_vec()),
            Object::Real(font_size as f32),
        ],
    ));
    for (x, y, text) in lines {
        ops.push(Operation::new("Tm", Matrix::translate(*x, *y).to_operands()));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(text.as_bytes().to_vec())],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

/// An outlined rectangle, stroked at `line_width`.
pub fn stroke_rect_ops(rect: Rect, line_width: f64, color: Color) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "RG",
            vec![
                Object::Real(color.r as f32),
                Object::Real(color.g as f32),
                Object::Real(color.b as f32),
            ],
        ),
        Operation::new("w", vec![Object::Real(line_width as f32)]),
        Operation::new(
            "re",
            vec![
                Object::Real(rect.left as f32),
                Object::Real(rect.bottom as f32),
                Object::Real(rect.width() as f32),
                Object::Real(rect.height() as f32),
            ],
        ),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// A filled rectangle.
pub fn fill_rect_ops(rect: Rect, color: Color) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "rg",
            vec![
                Object::Real(color.r as f32),
                Object::Real(color.g as f32),
                Object::Real(color.b as f32),
            ],
        ),
        Operation::new(
            "re",
            vec![
                Object::Real(rect.left as f32),
                Object::Real(rect.bottom as f32),
                Object::Real(rect.width() as f32),
                Object::Real(rect.height() as f32),
            ],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// A single straight stroked line segment.
pub fn line_ops(from: (f64, f64), to: (f64, f64), line_width: f64, color: Color) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "RG",
            vec![
                Object::Real(color.r as f32),
                Object::Real(color.g as f32),
                Object::Real(color.b as f32),
            ],
        ),
        Operation::new("w", vec![Object::Real(line_width as f32)]),
        Operation::new(
            "m",
            vec![Object::Real(from.0 as f32), Object::Real(from.1 as f32)],
        ),
        Operation::new("l", vec![Object::Real(to.0 as f32), Object::Real(to.1 as f32)]),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// Paint a previously embedded image XObject into `rect`.
pub fn image_ops(resource_name: &str, rect: Rect) -> Vec<Operation> {
    let placement = Matrix {
        a: rect.width(),
        b: 0.0,
        c: 0.0,
        d: rect.height(),
        e: rect.left,
        f: rect.bottom,
    };
    vec![
        Operation::new("q", vec![]),
        Operation::new("cm", placement.to_operands()),
        Operation::new("Do", vec![Object::Name(resource_name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

// -- Measurement --------------------------------------------------------------

/// Approximate width of a single-line string in points.
///
/// Average Helvetica glyph width is roughly 0.50 * font_size, which is the
/// same estimate the layout code uses for wrapping.
pub fn approx_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * 0.50
}

/// Wrap a multi-line string so no line exceeds `max_width` points at the
/// given font size.
///
/// Splits on existing newlines first, then performs simple word-wrap within
/// each paragraph. Words longer than a line are force-broken.
pub fn wrap_text(text: &str, font_size: f64, max_width: f64) -> Vec<String> {
    let avg_char_width = font_size * 0.50;
    let max_chars = ((max_width / avg_char_width) as usize).max(1);
    let mut result = Vec::new();

    for paragraph in text.split('\n') {
        if paragraph.is_empty() {
            result.push(String::new());
            continue;
        }

        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current_line = String::with_capacity(max_chars);

        for word in words {
            if word.len() > max_chars {
                if !current_line.is_empty() {
                    result.push(current_line.clone());
                    current_line.clear();
                }
                // Force-break the oversized word.
                let mut remaining = word;
                while remaining.len() > max_chars {
                    let (chunk, rest) = remaining.split_at(max_chars);
                    result.push(chunk.to_string());
                    remaining = rest;
                }
                if !remaining.is_empty() {
                    current_line.push_str(remaining);
                }
            } else if current_line.is_empty() {
                current_line.push_str(word);
            } else if current_line.len() + 1 + word.len() <= max_chars {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                result.push(current_line.clone());
                current_line.clear();
                current_line.push_str(word);
            }
        }

        if !current_line.is_empty() {
            result.push(current_line);
        }
    }

    result
}
