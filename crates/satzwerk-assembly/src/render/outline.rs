// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Diagnostic outline decorator.

use lopdf::content::Operation;

use satzwerk_core::style::Color;
use satzwerk_core::types::Rect;
use satzwerk_document::draw;

const OUTLINE_WIDTH: f64 = 0.75;

/// Appends a stroked outline of the target rectangle when `test_mode` is
/// set, so computed geometry can be inspected visually. A no-op otherwise.
pub fn with_diagnostic_outline(
    mut ops: Vec<Operation>,
    rect: Rect,
    test_mode: bool,
) -> Vec<Operation> {
    if test_mode {
        ops.extend(draw::stroke_rect_ops(rect, OUTLINE_WIDTH, Color::DIAGNOSTIC));
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_mode_leaves_operations_untouched() {
        let ops = vec![Operation::new("BT", vec![]), Operation::new("ET", vec![])];
        let out = with_diagnostic_outline(ops.clone(), Rect::new(0.0, 0.0, 10.0, 10.0), false);
        assert_eq!(out.len(), ops.len());
    }

    #[test]
    fn enabled_mode_appends_a_stroke() {
        let out = with_diagnostic_outline(Vec::new(), Rect::new(0.0, 0.0, 10.0, 10.0), true);
        assert!(out.iter().any(|op| op.operator == "re"));
        assert!(out.iter().any(|op| op.operator == "S"));
    }
}
