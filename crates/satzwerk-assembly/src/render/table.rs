// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Table rendering: a uniform column grid laid out from the rectangle's
//! top-left corner, with per-cell backgrounds, text and an optional grid.

use lopdf::content::Operation;
use lopdf::ObjectId;

use satzwerk_core::content::{TableContent, TableHeightStrategy};
use satzwerk_core::error::{Result, SatzwerkError};
use satzwerk_core::types::Rect;
use satzwerk_document::draw;
use satzwerk_document::PdfBuffer;

use super::text::base_font_name;

pub(crate) fn render_table(
    buffer: &mut PdfBuffer,
    page_id: ObjectId,
    rect: Rect,
    content: &TableContent,
) -> Result<Vec<Operation>> {
    let rows = &content.table.rows;
    if rows.is_empty() || rows.iter().all(|row| row.is_empty()) {
        return Err(SatzwerkError::MissingData("table has no cells".into()));
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let column_width = rect.width() / columns as f64;
    let row_height = match content.table.height_strategy {
        // Rows keep their styled height, the table may run past the
        // rectangle's bottom edge.
        TableHeightStrategy::Auto => content.style.row_height,
        // The rectangle's height is divided evenly among the rows.
        TableHeightStrategy::Exact => rect.height() / rows.len() as f64,
    };
    let table_bottom = rect.top - rows.len() as f64 * row_height;
    let padding = content.style.cell_padding;

    let mut ops = Vec::new();

    // Backgrounds go underneath everything else.
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if let Some(background) = cell.style.background {
                ops.extend(draw::fill_rect_ops(cell_rect(rect, column_width, row_height, r, c), background));
            }
        }
    }

    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if cell.text.is_empty() {
                continue;
            }
            let font = cell.style.text.font();
            let font_name =
                draw::ensure_font(buffer.document_mut(), page_id, &base_font_name(&font))?;
            let inner = cell_rect(rect, column_width, row_height, r, c);
            let lines = draw::wrap_text(&cell.text, font.size, inner.width() - 2.0 * padding);
            let line_height = font.size * 1.2;
            let fits = ((inner.height() / line_height).floor() as usize).max(1);
            let positioned: Vec<(f64, f64, String)> = lines
                .into_iter()
                .take(fits)
                .enumerate()
                .map(|(i, line)| {
                    (
                        inner.left + padding,
                        inner.top - padding - font.size - i as f64 * line_height,
                        line,
                    )
                })
                .collect();
            ops.extend(draw::text_ops(
                &font_name,
                font.size,
                cell.style.text.color(),
                &positioned,
            ));
        }
    }

    if let Some(grid) = content.style.grid {
        for r in 0..=rows.len() {
            let y = rect.top - r as f64 * row_height;
            ops.extend(draw::line_ops(
                (rect.left, y),
                (rect.right, y),
                grid.width,
                grid.color,
            ));
        }
        for c in 0..=columns {
            let x = rect.left + c as f64 * column_width;
            ops.extend(draw::line_ops(
                (x, rect.top),
                (x, table_bottom),
                grid.width,
                grid.color,
            ));
        }
    }

    Ok(ops)
}

fn cell_rect(rect: Rect, column_width: f64, row_height: f64, row: usize, column: usize) -> Rect {
    let left = rect.left + column as f64 * column_width;
    let top = rect.top - row as f64 * row_height;
    Rect::new(left, top - row_height, left + column_width, top)
}

// --- Tests -------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Object;
    use satzwerk_core::content::{ContentCommon, TableCell, TableData};
    use satzwerk_core::style::{CellStyle, Color, TableStyle};
    use satzwerk_document::document::single_page_pdf;

    fn buffer() -> PdfBuffer {
        PdfBuffer::from_bytes(&single_page_pdf("BT /F1 12 Tf 72 700 Td (base) Tj ET"))
            .expect("fixture loads")
    }

    fn cell(text: &str) -> TableCell {
        TableCell {
            text: text.into(),
            style: CellStyle::default(),
        }
    }

    fn table(rows: Vec<Vec<TableCell>>, height_strategy: TableHeightStrategy) -> TableContent {
        TableContent {
            table: TableData {
                rows,
                height_strategy,
            },
            style: TableStyle::default(),
            common: ContentCommon::default(),
        }
    }

    fn line_ys(ops: &[Operation]) -> Vec<f64> {
        ops.iter()
            .filter(|op| op.operator == "m")
            .filter_map(|op| match op.operands.get(1) {
                Some(Object::Real(y)) => Some(*y as f64),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_table_is_missing_data() {
        let mut buffer = buffer();
        let page = buffer.page_id(1).expect("page 1 exists");
        let error = render_table(
            &mut buffer,
            page,
            Rect::new(72.0, 500.0, 400.0, 700.0),
            &table(vec![], TableHeightStrategy::Auto),
        )
        .expect_err("empty table fails");
        assert!(matches!(error, SatzwerkError::MissingData(_)));
    }

    #[test]
    fn auto_height_uses_the_styled_row_height() {
        let mut buffer = buffer();
        let page = buffer.page_id(1).expect("page 1 exists");
        let rows = vec![vec![cell("a"), cell("b")], vec![cell("c"), cell("d")]];
        let rect = Rect::new(72.0, 500.0, 400.0, 700.0);
        let ops = render_table(&mut buffer, page, rect, &table(rows, TableHeightStrategy::Auto))
            .expect("renders");
        // Three horizontal rules, 16pt apart from the top edge.
        let ys: Vec<f64> = line_ys(&ops).into_iter().filter(|y| (*y - 700.0).abs() < 0.01 || *y < 700.0).collect();
        assert!(ys.iter().any(|y| (y - 700.0).abs() < 0.01));
        assert!(ys.iter().any(|y| (y - 684.0).abs() < 0.01));
        assert!(ys.iter().any(|y| (y - 668.0).abs() < 0.01));
    }

    #[test]
    fn exact_height_divides_the_rect_evenly() {
        let mut buffer = buffer();
        let page = buffer.page_id(1).expect("page 1 exists");
        let rows = vec![vec![cell("a")], vec![cell("b")], vec![cell("c")], vec![cell("d")]];
        let rect = Rect::new(72.0, 500.0, 400.0, 700.0);
        let ops = render_table(&mut buffer, page, rect, &table(rows, TableHeightStrategy::Exact))
            .expect("renders");
        // 200pt / 4 rows: a rule every 50pt, ending at the rect bottom.
        let ys = line_ys(&ops);
        assert!(ys.iter().any(|y| (y - 650.0).abs() < 0.01));
        assert!(ys.iter().any(|y| (y - 500.0).abs() < 0.01));
    }

    #[test]
    fn cell_background_fills_before_text() {
        let mut buffer = buffer();
        let page = buffer.page_id(1).expect("page 1 exists");
        let mut shaded = cell("x");
        shaded.style.background = Some(Color::rgb(0.9, 0.9, 0.9));
        let ops = render_table(
            &mut buffer,
            page,
            Rect::new(72.0, 500.0, 400.0, 700.0),
            &table(vec![vec![shaded]], TableHeightStrategy::Auto),
        )
        .expect("renders");
        let fill = ops.iter().position(|op| op.operator == "f").expect("fill present");
        let text = ops.iter().position(|op| op.operator == "BT").expect("text present");
        assert!(fill < text);
    }

    #[test]
    fn gridless_style_draws_no_lines() {
        let mut buffer = buffer();
        let page = buffer.page_id(1).expect("page 1 exists");
        let mut content = table(vec![vec![cell("a")]], TableHeightStrategy::Auto);
        content.style.grid = None;
        let ops = render_table(&mut buffer, page, Rect::new(72.0, 500.0, 400.0, 700.0), &content)
            .expect("renders");
        assert!(ops.iter().all(|op| op.operator != "m"));
    }

    #[test]
    fn ragged_rows_use_the_widest_row_for_columns() {
        let mut buffer = buffer();
        let page = buffer.page_id(1).expect("page 1 exists");
        let rows = vec![vec![cell("a")], vec![cell("b"), cell("c"), cell("d")]];
        let rect = Rect::new(0.0, 500.0, 300.0, 700.0);
        let ops = render_table(&mut buffer, page, rect, &table(rows, TableHeightStrategy::Auto))
            .expect("renders");
        // Vertical rules at 0, 100, 200, 300.
        let xs: Vec<f64> = ops
            .iter()
            .filter(|op| op.operator == "m")
            .filter_map(|op| match op.operands.first() {
                Some(Object::Real(x)) => Some(*x as f64),
                _ => None,
            })
            .collect();
        assert!(xs.iter().any(|x| (x - 100.0).abs() < 0.01));
        assert!(xs.iter().any(|x| (x - 200.0).abs() < 0.01));
    }
}
