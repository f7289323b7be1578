// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Declarative style model consumed by the content renderers.
//
// Styles arrive from the host as flat, fully-resolved values. A style may
// name a parent in a registry of named styles; `resolve_styles` performs one
// explicit resolution pass (child fields win, missing fields fall back to the
// parent chain, then to defaults) so renderers never chase references.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SatzwerkError};

/// An RGB color, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    /// Fixed diagnostic color used by test-mode outlines.
    pub const DIAGNOSTIC: Color = Color {
        r: 1.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Parse a color from a named value (`"black"`, `"red"`, …), a hex string
    /// (`"#rrggbb"`), or a space-separated triplet (`"0.2 0.4 1"`).
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "black" => return Ok(Self::BLACK),
            "white" => return Ok(Self::WHITE),
            "red" => return Ok(Self::rgb(1.0, 0.0, 0.0)),
            "green" => return Ok(Self::rgb(0.0, 1.0, 0.0)),
            "blue" => return Ok(Self::rgb(0.0, 0.0, 1.0)),
            "gray" | "grey" => return Ok(Self::rgb(0.5, 0.5, 0.5)),
            _ => {}
        }

        if let Some(hex) = value.strip_prefix('#') {
            if hex.len() == 6 {
                let parse_channel = |s: &str| {
                    u8::from_str_radix(s, 16)
                        .map(|v| f64::from(v) / 255.0)
                        .map_err(|_| SatzwerkError::Content(format!("bad hex color: {value}")))
                };
                return Ok(Self::rgb(
                    parse_channel(&hex[0..2])?,
                    parse_channel(&hex[2..4])?,
                    parse_channel(&hex[4..6])?,
                ));
            }
            return Err(SatzwerkError::Content(format!("bad hex color: {value}")));
        }

        let parts: Vec<&str> = value.split_whitespace().collect();
        if parts.len() == 3 {
            let mut channels = [0.0f64; 3];
            for (slot, part) in channels.iter_mut().zip(&parts) {
                *slot = part
                    .parse::<f64>()
                    .map_err(|_| SatzwerkError::Content(format!("bad color triplet: {value}")))?;
            }
            return Ok(Self::rgb(channels[0], channels[1], channels[2]));
        }

        Err(SatzwerkError::Content(format!("unknown color: {value}")))
    }
}

/// Font selection for text content. The engine maps this onto the closest
/// builtin PDF font family (Helvetica variants).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontStyle {
    pub name: String,
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            name: "Helvetica".into(),
            size: 11.0,
            bold: false,
            italic: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// How an image is fitted inside its target rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageAlignment {
    /// Scale to fit (aspect ratio preserved), centered.
    #[default]
    Center,
    /// Fill the rectangle exactly, aspect ratio not preserved.
    Stretch,
    /// Scale so the width fills the rectangle, anchored at the top.
    FitWidth,
    /// Scale so the height fills the rectangle, anchored at the left.
    FitHeight,
}

/// A stroked border drawn around a rendered region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    pub width: f64,
    pub color: Color,
}

/// Fully-resolved style for text content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    /// Optional named parent in the style registry.
    pub parent: Option<String>,
    pub font: Option<FontStyle>,
    pub color: Option<Color>,
    pub horizontal: Option<HorizontalAlignment>,
    pub vertical: Option<VerticalAlignment>,
    pub border: Option<BorderStyle>,
}

impl TextStyle {
    pub fn font(&self) -> FontStyle {
        self.font.clone().unwrap_or_default()
    }

    pub fn color(&self) -> Color {
        self.color.unwrap_or(Color::BLACK)
    }

    pub fn horizontal(&self) -> HorizontalAlignment {
        self.horizontal.unwrap_or_default()
    }

    pub fn vertical(&self) -> VerticalAlignment {
        self.vertical.unwrap_or_default()
    }
}

/// Fully-resolved style for image content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageStyle {
    pub alignment: ImageAlignment,
    pub border: Option<BorderStyle>,
}

/// Style of one table cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellStyle {
    pub text: TextStyle,
    pub background: Option<Color>,
}

/// Fully-resolved style for table content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStyle {
    /// Grid line styling; `None` draws no grid.
    pub grid: Option<BorderStyle>,
    /// Inner padding of every cell, in points.
    pub cell_padding: f64,
    /// Row height used by the `Auto` height strategy, in points.
    pub row_height: f64,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            grid: Some(BorderStyle {
                width: 0.5,
                color: Color::BLACK,
            }),
            cell_padding: 2.0,
            row_height: 16.0,
        }
    }
}

/// Resolve a text style against a registry of named parent styles.
///
/// Walks the parent chain (child fields win), erroring on a missing parent
/// name or a cycle. The result carries no `parent` reference.
pub fn resolve_text_style(
    style: &TextStyle,
    registry: &HashMap<String, TextStyle>,
) -> Result<TextStyle> {
    let mut resolved = style.clone();
    let mut seen: Vec<String> = Vec::new();
    let mut parent_name = resolved.parent.take();

    while let Some(name) = parent_name {
        if seen.contains(&name) {
            return Err(SatzwerkError::Content(format!(
                "style inheritance cycle through '{name}'"
            )));
        }
        let parent = registry.get(&name).ok_or_else(|| {
            SatzwerkError::MissingData(format!("named parent style '{name}' not registered"))
        })?;
        seen.push(name);

        if resolved.font.is_none() {
            resolved.font = parent.font.clone();
        }
        if resolved.color.is_none() {
            resolved.color = parent.color;
        }
        if resolved.horizontal.is_none() {
            resolved.horizontal = parent.horizontal;
        }
        if resolved.vertical.is_none() {
            resolved.vertical = parent.vertical;
        }
        if resolved.border.is_none() {
            resolved.border = parent.border;
        }
        parent_name = parent.parent.clone();
    }

    Ok(resolved)
}
