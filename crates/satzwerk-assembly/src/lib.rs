// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// satzwerk-assembly — the assembly engine: locating placeholder tags in a
// PDF, resolving target rectangles, rendering replacement content, the
// operation pipeline over an in-memory buffer, and multi-document merging.

pub mod async_ops;
pub mod merge;
pub mod pipeline;
pub mod placement;
pub mod render;
pub mod scanner;

// Re-export the primary entry points so callers can use
// `satzwerk_assembly::PdfInput` etc.
pub use async_ops::CancelFlag;
pub use merge::{GlobalReplacement, MergeEngine, MergeSpec, MergedDocument};
pub use pipeline::PdfInput;
pub use placement::PlacementResolver;
pub use render::{ContentRenderer, RenderRequest, RenderedRegion};
pub use scanner::TagScanner;
