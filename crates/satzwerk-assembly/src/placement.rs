// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Placement resolution.
//!
//! Converts a located tag rectangle into the rectangle that is actually
//! drawn into, according to a [`PlacementStrategy`]. Resolution is a pure
//! computation over the match, the page margins and the rectangles of the
//! other text elements on the page.

use satzwerk_core::types::{PageMargins, PlacementStrategy, Rect, TagMatch};
use satzwerk_document::text::PageText;
use tracing::trace;

pub struct PlacementResolver;

impl PlacementResolver {
    /// Resolves the drawing rectangle for one match.
    ///
    /// `neighbors` are the rectangles of the page's other text elements,
    /// typically from [`element_rects`], and only those vertically
    /// overlapping the match are considered to share its line. When a
    /// strategy would produce an inverted rectangle it falls back to the
    /// match rectangle itself.
    pub fn resolve(
        tag_match: &TagMatch,
        strategy: PlacementStrategy,
        margins: &PageMargins,
        neighbors: &[Rect],
    ) -> Rect {
        let matched = tag_match.rect;
        let (left, right) = match strategy {
            PlacementStrategy::Exact => return matched,
            PlacementStrategy::AccordingToMargins => (margins.left, margins.right),
            PlacementStrategy::FromPositionToRightMargin => (matched.left, margins.right),
            PlacementStrategy::FromPositionToNextElement => (
                matched.left,
                next_element_edge(&matched, neighbors).unwrap_or(margins.right),
            ),
            PlacementStrategy::FromLeftMarginToNextElement => (
                margins.left,
                next_element_edge(&matched, neighbors).unwrap_or(margins.right),
            ),
        };
        // A match outside the margins can invert the computed edges; keep
        // the match rectangle in that case rather than guessing.
        if right <= left {
            trace!(?strategy, left, right, "inverted placement, keeping match rect");
            return matched;
        }
        Rect::new(left, matched.bottom, right, matched.top)
    }
}

/// Left edge of the nearest element to the right of the match on the same
/// line, if any. "Same line" means vertical overlap with the match.
fn next_element_edge(matched: &Rect, neighbors: &[Rect]) -> Option<f64> {
    neighbors
        .iter()
        .filter(|n| n.overlaps_vertically(matched) && n.left > matched.right)
        .map(|n| n.left)
        .min_by(f64::total_cmp)
}

/// Groups a page's glyphs into element rectangles: runs of glyphs on the
/// same line, split where the horizontal gap exceeds half the font size.
pub(crate) fn element_rects(text: &PageText) -> Vec<Rect> {
    let mut elements: Vec<Rect> = Vec::new();
    for glyph in &text.chars {
        if glyph.ch == ' ' {
            continue;
        }
        let gap = glyph.font_size * 0.5;
        if let Some(last) = elements.last_mut()
            && last.overlaps_vertically(&glyph.rect)
            && glyph.rect.left >= last.right - 0.1
            && glyph.rect.left - last.right <= gap
        {
            *last = last.union(&glyph.rect);
            continue;
        }
        elements.push(glyph.rect);
    }
    elements
}

// --- Tests -------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn margins() -> PageMargins {
        PageMargins {
            left: 50.0,
            right: 545.0,
            top: 792.0,
            bottom: 50.0,
        }
    }

    fn tag_at(left: f64, bottom: f64, right: f64, top: f64) -> TagMatch {
        TagMatch {
            page: 1,
            rect: Rect::new(left, bottom, right, top),
            raw_text: "#TAG#".into(),
        }
    }

    #[test]
    fn exact_returns_the_match_rect() {
        let m = tag_at(100.0, 690.0, 160.0, 702.0);
        let rect = PlacementResolver::resolve(&m, PlacementStrategy::Exact, &margins(), &[]);
        assert!(rect.approx_eq(&m.rect, 1e-9));
    }

    #[test]
    fn according_to_margins_spans_the_full_line() {
        let m = tag_at(100.0, 690.0, 160.0, 702.0);
        let rect =
            PlacementResolver::resolve(&m, PlacementStrategy::AccordingToMargins, &margins(), &[]);
        assert_eq!(rect.left, 50.0);
        assert_eq!(rect.right, 545.0);
        assert_eq!(rect.bottom, 690.0);
        assert_eq!(rect.top, 702.0);
    }

    #[test]
    fn from_position_extends_to_the_right_margin() {
        let m = tag_at(100.0, 690.0, 160.0, 702.0);
        let rect = PlacementResolver::resolve(
            &m,
            PlacementStrategy::FromPositionToRightMargin,
            &margins(),
            &[],
        );
        assert_eq!(rect.left, 100.0);
        assert_eq!(rect.right, 545.0);
    }

    #[test]
    fn next_element_on_the_same_line_bounds_the_rect() {
        let m = tag_at(100.0, 690.0, 160.0, 702.0);
        let neighbors = vec![
            // Same line, to the right.
            Rect::new(300.0, 690.0, 360.0, 702.0),
            // Same line but closer.
            Rect::new(220.0, 691.0, 280.0, 701.0),
            // Different line, even closer, must be ignored.
            Rect::new(180.0, 600.0, 240.0, 612.0),
        ];
        let rect = PlacementResolver::resolve(
            &m,
            PlacementStrategy::FromPositionToNextElement,
            &margins(),
            &neighbors,
        );
        assert_eq!(rect.left, 100.0);
        assert_eq!(rect.right, 220.0);
    }

    #[test]
    fn no_next_element_falls_back_to_the_right_margin() {
        let m = tag_at(100.0, 690.0, 160.0, 702.0);
        let rect = PlacementResolver::resolve(
            &m,
            PlacementStrategy::FromLeftMarginToNextElement,
            &margins(),
            &[],
        );
        assert_eq!(rect.left, 50.0);
        assert_eq!(rect.right, 545.0);
    }

    #[test]
    fn every_strategy_yields_a_well_formed_rect() {
        let strategies = [
            PlacementStrategy::Exact,
            PlacementStrategy::AccordingToMargins,
            PlacementStrategy::FromPositionToRightMargin,
            PlacementStrategy::FromPositionToNextElement,
            PlacementStrategy::FromLeftMarginToNextElement,
        ];
        let matches = [
            tag_at(100.0, 690.0, 160.0, 702.0),
            // Right of the right margin.
            tag_at(560.0, 690.0, 600.0, 702.0),
            // Left of the left margin.
            tag_at(5.0, 50.0, 30.0, 62.0),
        ];
        let neighbors = vec![Rect::new(200.0, 688.0, 260.0, 704.0)];
        for strategy in strategies {
            for m in &matches {
                let rect = PlacementResolver::resolve(m, strategy, &margins(), &neighbors);
                assert!(rect.left <= rect.right, "{strategy:?} {rect:?}");
                assert!(rect.bottom <= rect.top, "{strategy:?} {rect:?}");
            }
        }
    }

    #[test]
    fn inverted_result_falls_back_to_the_match_rect() {
        // Match sits right of the right margin, so margin-based placement
        // would invert.
        let m = tag_at(560.0, 690.0, 600.0, 702.0);
        let neighbors = vec![Rect::new(300.0, 690.0, 360.0, 702.0)];
        let tight = PageMargins {
            left: 50.0,
            right: 545.0,
            top: 792.0,
            bottom: 50.0,
        };
        let rect = PlacementResolver::resolve(
            &m,
            PlacementStrategy::FromPositionToRightMargin,
            &tight,
            &neighbors,
        );
        assert!(rect.approx_eq(&m.rect, 1e-9));
    }
}
