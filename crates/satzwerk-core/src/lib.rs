// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Satzwerk — Core types, result model, and error definitions shared across all crates.

pub mod config;
pub mod content;
pub mod error;
pub mod result;
pub mod style;
pub mod types;

pub use config::AssemblyOptions;
pub use error::{ErrorKind, SatzwerkError};
pub use result::{ErrorDetail, OpResult};
pub use types::*;
