// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core geometry and placement types for the Satzwerk templating engine.
//
// All coordinates are PDF user space: origin at the bottom-left of the page,
// y increasing upward, units in points (1pt = 1/72 inch).

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in page user space.
///
/// Invariant: `left <= right` and `bottom <= top`; [`Rect::new`] normalizes
/// its arguments so the invariant holds for any input. A zero-area rectangle
/// is valid and represents an anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Rect {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left: left.min(right),
            right: left.max(right),
            bottom: bottom.min(top),
            top: bottom.max(top),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            left: self.left + dx,
            right: self.right + dx,
            bottom: self.bottom + dy,
            top: self.top + dy,
        }
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Self {
        Self {
            left: self.left.min(other.left),
            right: self.right.max(other.right),
            bottom: self.bottom.min(other.bottom),
            top: self.top.max(other.top),
        }
    }

    /// Whether the vertical bands `[bottom, top]` of two rectangles overlap.
    /// Used to decide that two pieces of content sit on the same line.
    pub fn overlaps_vertically(&self, other: &Rect) -> bool {
        self.bottom < other.top && other.bottom < self.top
    }

    /// Approximate equality within `tolerance` points on every edge.
    pub fn approx_eq(&self, other: &Rect, tolerance: f64) -> bool {
        (self.left - other.left).abs() <= tolerance
            && (self.right - other.right).abs() <= tolerance
            && (self.bottom - other.bottom).abs() <= tolerance
            && (self.top - other.top).abs() <= tolerance
    }
}

/// Page margins as absolute user-space coordinates: `left`/`right` are x
/// positions, `top`/`bottom` are y positions, all inside the page box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl PageMargins {
    /// Derive margins from a page box and a uniform margin width.
    pub fn from_page_box(page: Rect, margin_width: f64) -> Self {
        Self {
            left: page.left + margin_width,
            right: page.right - margin_width,
            top: page.top - margin_width,
            bottom: page.bottom + margin_width,
        }
    }
}

/// How a located tag rectangle is converted into the rectangle actually
/// drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementStrategy {
    /// Use the match rectangle as-is.
    Exact,
    /// Stretch horizontally to the page margins, keep the vertical band.
    AccordingToMargins,
    /// Left edge at the match, right edge at the right page margin.
    FromPositionToRightMargin,
    /// Right edge extends to the next content boundary on the same line,
    /// falling back to the right margin.
    FromPositionToNextElement,
    /// Left edge at the left margin, right edge at the next content boundary
    /// on the same line (right margin fallback).
    FromLeftMarginToNextElement,
}

/// A local translation applied to content after placement resolution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One located occurrence of a tag: 1-indexed page plus the bounding
/// rectangle of the tag's glyphs.
#[derive(Debug, Clone, PartialEq)]
pub struct TagMatch {
    pub page: u32,
    pub rect: Rect,
    pub raw_text: String,
}
