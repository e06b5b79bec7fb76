// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Verilens.

use thiserror::Error;

/// Top-level error type for all Verilens operations.
#[derive(Debug, Error)]
pub enum VerilensError {
    // -- Caller / setup errors (reported before any stage runs) --
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    // -- Stage errors (captured into the stage result) --
    #[error("stage '{stage}' failed: {message}")]
    StageExecution { stage: String, message: String },

    #[error("stage '{stage}' timed out after {after_ms} ms")]
    StageTimeout { stage: String, after_ms: u64 },

    // -- Integrity errors (absolute veto) --
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("integrity check failed: {0}")]
    Integrity(String),

    // -- Collaborator errors --
    #[error("metadata extraction failed: {0}")]
    Extraction(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VerilensError {
    /// Shorthand for a stage-scoped execution failure.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageExecution {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a cryptographic integrity failure.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::IntegrityMismatch { .. } | Self::Integrity(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VerilensError>;
