// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Uniform operation result model.
//
// Every public pipeline operation returns an `OpResult<T>` instead of raising
// for expected failure modes. The wrapper is a plain value: a failed operation
// does not abort a fluent chain, it simply does not advance the pipeline
// buffer. Orchestrating operations (merge, chained replaces) translate
// sub-failures into their own error list, keeping a single error vocabulary
// across the whole pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, SatzwerkError};

/// One human-readable, machine-classifiable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&SatzwerkError> for ErrorDetail {
    fn from(err: &SatzwerkError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

/// Result of a single pipeline operation.
///
/// Invariant: success ⇔ the value is present ⇔ the error list is empty.
/// Constructed only through [`OpResult::success`], [`OpResult::failure`], and
/// [`OpResult::from_error`], which uphold the invariant; the fields are
/// private so it cannot be violated afterwards.
#[derive(Debug, Clone)]
pub struct OpResult<T> {
    value: Option<T>,
    errors: Vec<ErrorDetail>,
}

impl<T> OpResult<T> {
    /// A successful result carrying `value`.
    pub fn success(value: T) -> Self {
        Self {
            value: Some(value),
            errors: Vec::new(),
        }
    }

    /// A failed result carrying one or more error details.
    ///
    /// An empty `errors` list would break the invariant; it is replaced by a
    /// single `Unexpected` detail so a failure always explains itself.
    pub fn failure(errors: Vec<ErrorDetail>) -> Self {
        let errors = if errors.is_empty() {
            vec![ErrorDetail::new(
                ErrorKind::Unexpected,
                "operation failed without detail",
            )]
        } else {
            errors
        };
        Self {
            value: None,
            errors,
        }
    }

    /// A failed result from a single internal error.
    pub fn from_error(err: SatzwerkError) -> Self {
        Self::failure(vec![ErrorDetail::from(&err)])
    }

    /// Shorthand for a single-detail failure.
    pub fn fail(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::failure(vec![ErrorDetail::new(kind, message)])
    }

    pub fn is_success(&self) -> bool {
        self.value.is_some()
    }

    /// Borrow the payload, if the operation succeeded.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consume the result, yielding the payload if present.
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// The ordered error details (empty on success).
    pub fn errors(&self) -> &[ErrorDetail] {
        &self.errors
    }

    /// Map the payload, preserving failure details unchanged.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OpResult<U> {
        match self.value {
            Some(v) => OpResult::success(f(v)),
            None => OpResult {
                value: None,
                errors: self.errors,
            },
        }
    }
}

impl<T> From<crate::error::Result<T>> for OpResult<T> {
    fn from(res: crate::error::Result<T>) -> Self {
        match res {
            Ok(v) => Self::success(v),
            Err(e) => Self::from_error(e),
        }
    }
}
