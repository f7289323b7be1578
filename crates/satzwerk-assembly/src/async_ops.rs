// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Asynchronous operation variants.
//!
//! Every async operation has the exact semantics of its synchronous
//! counterpart: same ordering, same error taxonomy, and the same
//! advance-only-on-success buffer contract. The blocking PDF work runs on
//! the tokio blocking pool; the pipeline's own buffer is swapped in one
//! move after the work finished, so cancellation or failure can never
//! leave it half-written.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use satzwerk_core::content::ReplaceableContent;
use satzwerk_core::result::OpResult;
use satzwerk_core::types::PlacementStrategy;
use satzwerk_core::ErrorKind;

use crate::merge::{MergeEngine, MergedDocument, MergeSpec};
use crate::pipeline::PdfInput;

/// A shared cancellation signal.
///
/// Cancellation observed before an operation starts fails it immediately
/// with kind `Cancelled`; an operation already running completes and its
/// result still applies.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn cancelled<T>() -> OpResult<T> {
    debug!("operation cancelled before it began");
    OpResult::fail(ErrorKind::Cancelled, "operation cancelled")
}

impl PdfInput {
    /// Async variant of [`PdfInput::replace`].
    pub async fn replace_async(
        &mut self,
        tag: &str,
        content: &ReplaceableContent,
        strategy: PlacementStrategy,
        cancel: &CancelFlag,
    ) -> OpResult<Vec<u8>> {
        let tag = tag.to_string();
        let content = content.clone();
        self.run_blocking(cancel, move |input| input.replace(&tag, &content, strategy))
            .await
    }

    /// Async variant of [`PdfInput::insert`].
    pub async fn insert_async(
        &mut self,
        content: &ReplaceableContent,
        cancel: &CancelFlag,
    ) -> OpResult<Vec<u8>> {
        let content = content.clone();
        self.run_blocking(cancel, move |input| input.insert(&content)).await
    }

    pub async fn set_title_async(&mut self, value: &str, cancel: &CancelFlag) -> OpResult<Vec<u8>> {
        let value = value.to_string();
        self.run_blocking(cancel, move |input| input.set_title(&value)).await
    }

    pub async fn set_author_async(
        &mut self,
        value: &str,
        cancel: &CancelFlag,
    ) -> OpResult<Vec<u8>> {
        let value = value.to_string();
        self.run_blocking(cancel, move |input| input.set_author(&value)).await
    }

    pub async fn set_creator_async(
        &mut self,
        value: &str,
        cancel: &CancelFlag,
    ) -> OpResult<Vec<u8>> {
        let value = value.to_string();
        self.run_blocking(cancel, move |input| input.set_creator(&value)).await
    }

    pub async fn set_subject_async(
        &mut self,
        value: &str,
        cancel: &CancelFlag,
    ) -> OpResult<Vec<u8>> {
        let value = value.to_string();
        self.run_blocking(cancel, move |input| input.set_subject(&value)).await
    }

    pub async fn set_keywords_async(
        &mut self,
        value: &str,
        cancel: &CancelFlag,
    ) -> OpResult<Vec<u8>> {
        let value = value.to_string();
        self.run_blocking(cancel, move |input| input.set_keywords(&value)).await
    }

    /// Runs a synchronous pipeline operation on the blocking pool against
    /// a clone, adopting the clone's state only when the operation
    /// succeeded.
    async fn run_blocking(
        &mut self,
        cancel: &CancelFlag,
        op: impl FnOnce(&mut PdfInput) -> OpResult<Vec<u8>> + Send + 'static,
    ) -> OpResult<Vec<u8>> {
        if cancel.is_cancelled() {
            return cancelled();
        }
        let mut scratch = self.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let result = op(&mut scratch);
            (scratch, result)
        })
        .await;
        match joined {
            Ok((scratch, result)) => {
                if result.is_success() {
                    *self = scratch;
                }
                result
            }
            Err(err) => OpResult::fail(
                ErrorKind::Unexpected,
                format!("background task failed: {err}"),
            ),
        }
    }
}

impl MergeEngine {
    /// Async variant of [`MergeEngine::merge`].
    pub async fn merge_async(
        inputs: Vec<(u32, PdfInput)>,
        spec: MergeSpec,
        cancel: &CancelFlag,
    ) -> OpResult<MergedDocument> {
        if cancel.is_cancelled() {
            return cancelled();
        }
        match tokio::task::spawn_blocking(move || MergeEngine::merge(inputs, &spec)).await {
            Ok(result) => result,
            Err(err) => OpResult::fail(
                ErrorKind::Unexpected,
                format!("background task failed: {err}"),
            ),
        }
    }
}

// --- Tests -------------------------------------------------------------
