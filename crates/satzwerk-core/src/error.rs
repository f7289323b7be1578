// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Satzwerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Satzwerk operations.
///
/// Internal helpers return `Result<T, SatzwerkError>`; public pipeline
/// operations convert these into [`crate::result::OpResult`] failures at the
/// operation boundary, so nothing is thrown across the public API.
#[derive(Debug, Error)]
pub enum SatzwerkError {
    // -- Engine / document errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("page {page} out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    // -- Content errors --
    #[error("invalid content: {0}")]
    Content(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("missing required data: {0}")]
    MissingData(String),

    #[error("layout conflict: {0}")]
    LayoutConflict(String),

    // -- Control flow --
    #[error("operation cancelled")]
    Cancelled,

    // -- I/O / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Machine-checkable classification of an error, used by [`crate::result::ErrorDetail`].
///
/// Note that "tag not found" is deliberately not part of this taxonomy: an
/// absent tag is a normal scan outcome (empty match list), never a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Null/absent required input.
    MissingData,
    /// Page index outside `[1, page_count]`.
    PageOutOfRange,
    /// Unreadable image or table payload.
    InvalidContent,
    /// The resolver cannot produce a valid rectangle and no fallback applies.
    LayoutConflict,
    /// The underlying PDF engine rejected the operation.
    EngineFailure,
    /// A cancellation request was observed before the operation began.
    Cancelled,
    /// Wrapped unexpected fault.
    Unexpected,
}

impl SatzwerkError {
    /// Map an error onto its [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Pdf(_) => ErrorKind::EngineFailure,
            Self::PageOutOfRange { .. } => ErrorKind::PageOutOfRange,
            Self::Content(_) | Self::Image(_) => ErrorKind::InvalidContent,
            Self::MissingData(_) => ErrorKind::MissingData,
            Self::LayoutConflict(_) => ErrorKind::LayoutConflict,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::EngineFailure,
            Self::Serialization(_) => ErrorKind::Unexpected,
        }
    }
}

/// Alias used throughout the codebase for internal fallible helpers.
pub type Result<T> = std::result::Result<T, SatzwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_as_documented() {
        assert_eq!(
            SatzwerkError::Pdf("bad xref".into()).kind(),
            ErrorKind::EngineFailure
        );
        assert_eq!(
            SatzwerkError::PageOutOfRange { page: 9, total: 2 }.kind(),
            ErrorKind::PageOutOfRange
        );
        assert_eq!(
            SatzwerkError::Image("truncated".into()).kind(),
            ErrorKind::InvalidContent
        );
        assert_eq!(SatzwerkError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn page_out_of_range_message_names_both_numbers() {
        let err = SatzwerkError::PageOutOfRange { page: 5, total: 3 };
        let msg = err.to_string();
        assert!(msg.contains('5') && msg.contains('3'));
    }
}
