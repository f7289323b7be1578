// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine-wide options, tunable per pipeline.

use serde::{Deserialize, Serialize};

/// Options governing an assembly run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    /// Adopt a successful operation's output bytes as the pipeline's
    /// current buffer. When off, every operation still runs against the
    /// unchanged buffer and only returns the new bytes in its payload.
    pub auto_update_changes: bool,
    /// Width in points of the synthetic page margins derived from the
    /// media box. Defaults to 2 cm.
    pub margin_width: f64,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            auto_update_changes: true,
            margin_width: 56.7,
        }
    }
}
