// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the assembly pipeline. Exercises the full
// scan-place-render-splice path on a small in-memory template.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use satzwerk_assembly::{MergeEngine, MergeSpec, PdfInput, TagScanner};
use satzwerk_core::content::{ReplaceableContent, TextContent};
use satzwerk_core::types::PlacementStrategy;
use satzwerk_document::document::single_page_pdf;
use satzwerk_document::PdfBuffer;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn template() -> Vec<u8> {
    single_page_pdf(
        "BT /F1 12 Tf 72 700 Td (Invoice for #CLIENT#) Tj \
         0 -20 Td (Reference #REF# issued today) Tj \
         0 -20 Td (Amount due: #AMOUNT#) Tj ET",
    )
}

/// Benchmark the tag scan alone: interpret the page and locate one tag.
fn bench_scan(c: &mut Criterion) {
    let bytes = template();
    let buffer = PdfBuffer::from_bytes(&bytes).expect("template loads");
    c.bench_function("scan one tag (single page)", |b| {
        b.iter(|| {
            let matches = TagScanner::locate(black_box(&buffer), "#REF#").expect("scan");
            black_box(matches);
        });
    });
}

/// Benchmark a full replace operation: parse, scan, place, render, splice
/// and re-serialize.
fn bench_replace(c: &mut Criterion) {
    let bytes = template();
    let content = ReplaceableContent::Text(TextContent::new("ACME Industries"));
    c.bench_function("replace one tag (single page)", |b| {
        b.iter(|| {
            let mut input = PdfInput::from_bytes(black_box(bytes.clone()));
            let result = input.replace("#CLIENT#", &content, PlacementStrategy::Exact);
            assert!(result.is_success());
            black_box(input);
        });
    });
}

/// Benchmark merging three single-page documents without replacements.
fn bench_merge(c: &mut Criterion) {
    let bytes = template();
    c.bench_function("merge three documents", |b| {
        b.iter(|| {
            let inputs = vec![
                (1, PdfInput::from_bytes(bytes.clone())),
                (2, PdfInput::from_bytes(bytes.clone())),
                (3, PdfInput::from_bytes(bytes.clone())),
            ];
            let merged = MergeEngine::merge(black_box(inputs), &MergeSpec::default());
            assert!(merged.is_success());
            black_box(merged);
        });
    });
}

criterion_group!(benches, bench_scan, bench_replace, bench_merge);
criterion_main!(benches);
