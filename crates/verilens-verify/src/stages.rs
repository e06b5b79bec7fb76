// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Domain stages run by the authenticity pipeline.
//
// Each stage publishes its typed output under a fixed key in the stage
// result's `details`, which the pipeline reads back after the run.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use verilens_capture::{MetadataExtractor, merge_metadata};
use verilens_core::config::IntegrityConfig;
use verilens_core::error::VerilensError;
use verilens_core::error_codes::normalize_error;
use verilens_core::types::{
    CryptoBinding, IntegrityCheck, MetadataSummary, VerificationInput, VerificationStageResult,
};
use verilens_security::{hash_payload, verify_hash, verify_signature};

use crate::engine::VerificationStage;
use crate::scoring::{DepthScorer, MetadataScore, MetadataScorer};

pub const INTEGRITY_STAGE: &str = "integrity";
pub const METADATA_STAGE: &str = "metadata";
pub const DEPTH_STAGE: &str = "depth";

pub const INTEGRITY_KEY: &str = "integrity";
pub const METADATA_SCORE_KEY: &str = "metadataScore";
pub const DEPTH_SCORE_KEY: &str = "depthScore";

// -- Integrity ---------------------------------------------------------------

/// Checks the image bytes against the supplied digest and, when present, the
/// signature over that digest.
#[derive(Debug, Clone)]
pub struct IntegrityStage {
    config: IntegrityConfig,
}

impl IntegrityStage {
    pub fn new(config: IntegrityConfig) -> Self {
        Self { config }
    }

    fn check(&self, image: &[u8], binding: &CryptoBinding) -> Result<(), VerilensError> {
        let algorithm = binding.algorithm_or(self.config.default_algorithm);
        verify_hash(image, &binding.expected_digest, algorithm)?;

        let Some(signed) = &binding.signed_payload else {
            if self.config.require_signature {
                return Err(VerilensError::Integrity(
                    "binding carries no signature but one is required".into(),
                ));
            }
            return Ok(());
        };

        let actual = hash_payload(image, algorithm);
        if !signed.payload_hash.eq_ignore_ascii_case(&actual) {
            return Err(VerilensError::IntegrityMismatch {
                expected: signed.payload_hash.clone(),
                actual,
            });
        }
        let public_key = binding.public_key.as_deref().ok_or_else(|| {
            VerilensError::Integrity("signed payload supplied without a public key".into())
        })?;
        let public_key = hex::decode(public_key.trim())
            .map_err(|e| VerilensError::Integrity(format!("public key is not valid hex: {e}")))?;
        verify_signature(signed, &public_key)
    }
}

#[async_trait]
impl VerificationStage<VerificationInput> for IntegrityStage {
    fn id(&self) -> &str {
        INTEGRITY_STAGE
    }

    fn description(&self) -> &str {
        "image digest and signature match the supplied binding"
    }

    async fn execute(
        &self,
        input: &VerificationInput,
    ) -> Result<VerificationStageResult, VerilensError> {
        let Some(binding) = input.binding() else {
            return Ok(VerificationStageResult::passed(INTEGRITY_STAGE, "no binding supplied")
                .with_details(json!({ INTEGRITY_KEY: IntegrityCheck::NotChecked })));
        };

        match self.check(input.image(), binding) {
            Ok(()) => {
                debug!(
                    algorithm = %binding.algorithm_or(self.config.default_algorithm),
                    "binding verified"
                );
                Ok(
                    VerificationStageResult::passed(INTEGRITY_STAGE, "binding verified")
                        .with_details(json!({ INTEGRITY_KEY: IntegrityCheck::Verified })),
                )
            }
            Err(e) if e.is_integrity() => {
                warn!(error = %e, "binding rejected");
                let check = IntegrityCheck::Failed {
                    reason: e.to_string(),
                };
                Ok(VerificationStageResult::failed(INTEGRITY_STAGE, e.to_string())
                    .with_error(normalize_error(&e))
                    .with_details(json!({ INTEGRITY_KEY: check })))
            }
            Err(e) => Err(e),
        }
    }
}

// -- Metadata ----------------------------------------------------------------

/// Extracts capture metadata, merges caller hints over it, and scores it.
///
/// An extraction failure does not fail the run: the hints alone are scored
/// and the error is attached to the result.
pub struct MetadataStage {
    scorer: MetadataScorer,
    extractor: Arc<dyn MetadataExtractor>,
}

impl MetadataStage {
    pub fn new(scorer: MetadataScorer, extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { scorer, extractor }
    }
}

#[async_trait]
impl VerificationStage<VerificationInput> for MetadataStage {
    fn id(&self) -> &str {
        METADATA_STAGE
    }

    fn description(&self) -> &str {
        "camera metadata is plausible for the expected device"
    }

    async fn execute(
        &self,
        input: &VerificationInput,
    ) -> Result<VerificationStageResult, VerilensError> {
        let hints = input.metadata_hints().cloned().unwrap_or_default();

        let extracted = match self.extractor.extract(input.image()) {
            Ok(extracted) => extracted,
            Err(e) => {
                let hints_only = merge_metadata(&MetadataSummary::default(), &hints);
                let score = self.scorer.score(&hints_only, input.expected_device());
                warn!(error = %e, score = score.score, "metadata extraction failed, scoring hints only");
                return Ok(VerificationStageResult::passed(
                    METADATA_STAGE,
                    format!("metadata unavailable; hint plausibility {:.2}", score.score),
                )
                .with_details(json!({
                    METADATA_SCORE_KEY: score,
                    "extractionError": normalize_error(&e),
                })));
            }
        };

        let merged: MetadataSummary = merge_metadata(&extracted.summary, &hints);
        let score = self.scorer.score(&merged, input.expected_device());

        Ok(VerificationStageResult::passed(
            METADATA_STAGE,
            format!("metadata plausibility {:.2}", score.score),
        )
        .with_details(json!({
            METADATA_SCORE_KEY: score,
            "image": extracted.image,
        })))
    }
}

// -- Depth -------------------------------------------------------------------

/// Scores the caller-supplied depth frame.
#[derive(Debug, Clone)]
pub struct DepthStage {
    scorer: DepthScorer,
}

impl DepthStage {
    pub fn new(scorer: DepthScorer) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl VerificationStage<VerificationInput> for DepthStage {
    fn id(&self) -> &str {
        DEPTH_STAGE
    }

    fn description(&self) -> &str {
        "depth frame variance indicates a real three-dimensional scene"
    }

    async fn execute(
        &self,
        input: &VerificationInput,
    ) -> Result<VerificationStageResult, VerilensError> {
        let Some(frame) = input.depth_frame() else {
            return Ok(VerificationStageResult::passed(DEPTH_STAGE, "no depth frame supplied"));
        };
        let score = self.scorer.score(frame)?;
        Ok(VerificationStageResult::passed(
            DEPTH_STAGE,
            format!(
                "depth variance {:.2}, confidence {:.2}",
                score.variance, score.confidence
            ),
        )
        .with_details(json!({ DEPTH_SCORE_KEY: score })))
    }
}
