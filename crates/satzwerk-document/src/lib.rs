// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// satzwerk-document — PDF document layer for the Satzwerk assembly engine.
//
// Provides the in-memory PDF buffer, the content-stream text interpreter that
// recovers positioned glyphs, the stream rewriter that excises placeholder
// text and splices replacement drawing, drawing-operation builders, and
// multi-document concatenation.

pub mod document;
pub mod draw;
pub mod merge;
pub mod splice;
pub mod text;

// Re-export the primary structs so callers can use `satzwerk_document::PdfBuffer` etc.
pub use document::PdfBuffer;
pub use splice::{ExcisedSpan, SpliceJob};
pub use text::{PositionedChar, TextInterpreter};
