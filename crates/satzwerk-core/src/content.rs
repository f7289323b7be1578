// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Replaceable content model: the closed set of things that can be drawn in
// place of a tag or inserted free-floating.

use serde::{Deserialize, Serialize};

use crate::style::{CellStyle, ImageStyle, TableStyle, TextStyle};
use crate::types::Offset;

/// Fields shared by every content kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentCommon {
    /// Local translation applied after placement resolution.
    pub offset: Offset,
    /// 1-indexed page hint for untargeted inserts.
    pub page_hint: Option<u32>,
    /// Draw a diagnostic outline of the target rectangle alongside the
    /// content, for visual QA of computed geometry.
    pub test_mode: bool,
}

/// Styled text drawn into the target rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
    pub style: TextStyle,
    #[serde(default)]
    pub common: ContentCommon,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
            common: ContentCommon::default(),
        }
    }
}

/// An encoded image (PNG/JPEG/…) drawn into the target rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Raw encoded image bytes; decoded by the renderer.
    pub data: Vec<u8>,
    pub style: ImageStyle,
    #[serde(default)]
    pub common: ContentCommon,
}

/// Whether a table is free to grow below the target rectangle or must
/// compress into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableHeightStrategy {
    /// Rows take their styled height; the table may extend past the
    /// rectangle's bottom edge.
    #[default]
    Auto,
    /// Rows are compressed so the whole table fits the rectangle's height.
    Exact,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableCell {
    pub text: String,
    #[serde(default)]
    pub style: CellStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Row-major cell grid; rows may be ragged, the widest row defines the
    /// column count.
    pub rows: Vec<Vec<TableCell>>,
    pub height_strategy: TableHeightStrategy,
}

/// A pre-built table drawn starting at the target rectangle's top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableContent {
    pub table: TableData,
    pub style: TableStyle,
    #[serde(default)]
    pub common: ContentCommon,
}

/// The closed set of content kinds a tag can be replaced with.
///
/// The three variants never need open extension, so this is a sum type
/// rather than a trait object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplaceableContent {
    Text(TextContent),
    Image(ImageContent),
    Table(TableContent),
}

impl ReplaceableContent {
    pub fn common(&self) -> &ContentCommon {
        match self {
            Self::Text(c) => &c.common,
            Self::Image(c) => &c.common,
            Self::Table(c) => &c.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ContentCommon {
        match self {
            Self::Text(c) => &mut c.common,
            Self::Image(c) => &mut c.common,
            Self::Table(c) => &mut c.common,
        }
    }
}

/// What a system tag expands to at merge time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemTagKind {
    /// The occurrence's page number in the merged document.
    PageNumber,
    /// The merged document's total page count.
    PageCount,
    /// `"N of M"`.
    PageOfTotal,
}

/// A tag whose replacement value is computed per occurrence from merge-wide
/// state. Must be resolved only after final page numbering is known, i.e.
/// after concatenation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemTag {
    /// The literal placeholder text to locate, e.g. `"#PAGE#"`.
    pub tag: String,
    pub kind: SystemTagKind,
    #[serde(default)]
    pub style: TextStyle,
}

impl SystemTagKind {
    /// Render the value for an occurrence on `page` of `total` pages.
    pub fn value(&self, page: u32, total: u32) -> String {
        match self {
            Self::PageNumber => page.to_string(),
            Self::PageCount => total.to_string(),
            Self::PageOfTotal => format!("{page} of {total}"),
        }
    }
}
