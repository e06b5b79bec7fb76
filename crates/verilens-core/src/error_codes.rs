// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalized, machine-readable error codes.
//
// Every `VerilensError` maps to a stable code so that stage results and CLI
// output can be consumed by callers without matching on display strings.

use serde::{Deserialize, Serialize};

use crate::error::VerilensError;

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";
pub const STAGE_EXECUTION_ERROR: &str = "STAGE_EXECUTION_ERROR";
pub const STAGE_TIMEOUT: &str = "STAGE_TIMEOUT";
pub const INTEGRITY_ERROR: &str = "INTEGRITY_ERROR";
pub const EXTRACTION_ERROR: &str = "EXTRACTION_ERROR";
pub const ENCRYPTION_ERROR: &str = "ENCRYPTION_ERROR";
pub const SIGNING_ERROR: &str = "SIGNING_ERROR";
pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
pub const IO_ERROR: &str = "IO_ERROR";
pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";

/// Which side of the system an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
    /// The caller supplied something malformed.
    Input,
    /// The verifier itself is misconfigured.
    Setup,
    /// A stage's own logic failed or ran out of time.
    Stage,
    /// Cryptographic evidence did not verify.
    Integrity,
    /// Storage, I/O or another collaborator failed.
    Infrastructure,
}

/// A normalized error attached to stage results and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedError {
    /// Stable machine code (e.g. `STAGE_TIMEOUT`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    pub origin: ErrorOrigin,
    /// Whether re-running the whole verification could plausibly succeed.
    pub retriable: bool,
}

impl NormalizedError {
    pub fn new(code: &str, message: impl Into<String>, origin: ErrorOrigin) -> Self {
        Self {
            code: code.to_owned(),
            message: message.into(),
            origin,
            retriable: false,
        }
    }

    fn retriable(mut self) -> Self {
        self.retriable = true;
        self
    }
}

/// Convert a `VerilensError` into its normalized form.
pub fn normalize_error(err: &VerilensError) -> NormalizedError {
    let message = err.to_string();
    match err {
        VerilensError::Validation(_) => {
            NormalizedError::new(VALIDATION_ERROR, message, ErrorOrigin::Input)
        }
        VerilensError::Configuration(_) => {
            NormalizedError::new(CONFIGURATION_ERROR, message, ErrorOrigin::Setup)
        }
        VerilensError::StageExecution { .. } => {
            NormalizedError::new(STAGE_EXECUTION_ERROR, message, ErrorOrigin::Stage)
        }
        VerilensError::StageTimeout { .. } => {
            NormalizedError::new(STAGE_TIMEOUT, message, ErrorOrigin::Stage).retriable()
        }
        VerilensError::IntegrityMismatch { .. } | VerilensError::Integrity(_) => {
            NormalizedError::new(INTEGRITY_ERROR, message, ErrorOrigin::Integrity)
        }
        VerilensError::Extraction(_) => {
            NormalizedError::new(EXTRACTION_ERROR, message, ErrorOrigin::Input)
        }
        VerilensError::Encryption(_) => {
            NormalizedError::new(ENCRYPTION_ERROR, message, ErrorOrigin::Infrastructure)
        }
        VerilensError::Signing(_) => {
            NormalizedError::new(SIGNING_ERROR, message, ErrorOrigin::Infrastructure)
        }
        VerilensError::Database(_) => {
            NormalizedError::new(DATABASE_ERROR, message, ErrorOrigin::Infrastructure)
                .retriable()
        }
        VerilensError::Io(io_err) => {
            let normalized = NormalizedError::new(IO_ERROR, message, ErrorOrigin::Infrastructure);
            match io_err.kind() {
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted => {
                    normalized.retriable()
                }
                _ => normalized,
            }
        }
        VerilensError::Serialization(_) => {
            NormalizedError::new(SERIALIZATION_ERROR, message, ErrorOrigin::Input)
        }
    }
}

impl From<&VerilensError> for NormalizedError {
    fn from(err: &VerilensError) -> Self {
        normalize_error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_retriable_stage_error() {
        let err = VerilensError::StageTimeout {
            stage: "depth".into(),
            after_ms: 250,
        };
        let n = normalize_error(&err);
        assert_eq!(n.code, STAGE_TIMEOUT);
        assert_eq!(n.origin, ErrorOrigin::Stage);
        assert!(n.retriable);
        assert!(n.message.contains("250 ms"));
    }

    #[test]
    fn integrity_errors_share_one_code() {
        let mismatch = VerilensError::IntegrityMismatch {
            expected: "aa".into(),
            actual: "bb".into(),
        };
        let tag = VerilensError::Integrity("authentication tag mismatch".into());
        assert_eq!(normalize_error(&mismatch).code, INTEGRITY_ERROR);
        assert_eq!(normalize_error(&tag).code, INTEGRITY_ERROR);
        assert!(!normalize_error(&tag).retriable);
    }

    #[test]
    fn validation_is_input_origin() {
        let n = normalize_error(&VerilensError::Validation("empty image buffer".into()));
        assert_eq!(n.code, VALIDATION_ERROR);
        assert_eq!(n.origin, ErrorOrigin::Input);
    }

    #[test]
    fn io_not_found_is_not_retriable() {
        let err = VerilensError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        let n = normalize_error(&err);
        assert_eq!(n.code, IO_ERROR);
        assert!(!n.retriable);
    }
}
