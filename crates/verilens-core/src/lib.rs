// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verilens — Core types, error definitions, and configuration shared across
// all crates.

pub mod config;
pub mod error;
pub mod error_codes;
pub mod types;

pub use config::VerifierConfig;
pub use error::{Result, VerilensError};
pub use error_codes::{NormalizedError, normalize_error};
pub use types::*;
