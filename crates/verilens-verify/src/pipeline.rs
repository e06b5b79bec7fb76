// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Authenticity pipeline — wires the domain stages onto the engine and turns
// their outputs into a verdict.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use verilens_capture::{ContainerExtractor, MetadataExtractor};
use verilens_core::config::{self, VerifierConfig};
use verilens_core::error::VerilensError;
use verilens_core::types::{
    DepthScore, IntegrityCheck, Verdict, VerificationInput, VerificationResult,
};

use crate::engine::VerificationEngine;
use crate::policy::VerdictPolicy;
use crate::scoring::{DepthScorer, MetadataScore, MetadataScorer};
use crate::stages::{
    DEPTH_SCORE_KEY, DEPTH_STAGE, DepthStage, INTEGRITY_KEY, INTEGRITY_STAGE, IntegrityStage,
    METADATA_SCORE_KEY, METADATA_STAGE, MetadataStage,
};

/// Everything a caller needs to act on one verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub verdict: Verdict,
    pub integrity: IntegrityCheck,
    pub metadata_score: Option<MetadataScore>,
    pub depth_score: Option<DepthScore>,
    pub result: VerificationResult,
}

/// Shareable verifier: holds configuration and collaborators, never per-run
/// state.
pub struct AuthenticityPipeline {
    config: VerifierConfig,
    policy: VerdictPolicy,
    extractor: Arc<dyn MetadataExtractor>,
}

impl AuthenticityPipeline {
    /// Build a pipeline from an explicit configuration, validating it first.
    pub fn new(config: VerifierConfig) -> Result<Self, VerilensError> {
        config.validate()?;
        Ok(Self {
            policy: VerdictPolicy::new(config.verdict),
            config,
            extractor: Arc::new(ContainerExtractor),
        })
    }

    /// Build a pipeline from the process-wide configuration.
    ///
    /// A configuration that fails to load is returned, never replaced by
    /// defaults.
    pub fn from_global() -> Result<Self, VerilensError> {
        Self::new(config::global()?.clone())
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Stages for `input`: integrity only with a binding, depth only with a
    /// frame.
    fn engine_for(
        &self,
        input: &VerificationInput,
    ) -> Result<VerificationEngine<VerificationInput>, VerilensError> {
        let mut engine = VerificationEngine::with_config(&self.config.engine);
        if input.binding().is_some() {
            engine.register_stage(IntegrityStage::new(self.config.integrity))?;
        }
        engine.register_stage(MetadataStage::new(
            MetadataScorer::new(self.config.metadata.clone()),
            Arc::clone(&self.extractor),
        ))?;
        if input.depth_frame().is_some() {
            engine.register_stage(DepthStage::new(DepthScorer::new(self.config.depth)))?;
        }
        Ok(engine)
    }

    /// Verify one capture.
    ///
    /// Returns `Err` only for malformed input or setup problems; every
    /// evidence failure is reported through the verdict.
    #[instrument(skip_all, fields(image_len = input.image().len()))]
    pub async fn verify(
        &self,
        input: &VerificationInput,
    ) -> Result<VerificationReport, VerilensError> {
        input.validate()?;
        let engine = self.engine_for(input)?;
        let result = engine.run_verification(input).await;

        let integrity = integrity_outcome(&result)?;
        let metadata_score: Option<MetadataScore> =
            stage_detail(&result, METADATA_STAGE, METADATA_SCORE_KEY)?;
        let depth_score: Option<DepthScore> = stage_detail(&result, DEPTH_STAGE, DEPTH_SCORE_KEY)?;

        let verdict = if result.success() {
            self.policy.decide(
                metadata_score.map_or(0.0, |m| m.score),
                depth_score.map(|d| d.confidence),
                &integrity,
            )
        } else {
            Verdict::Fail
        };

        let result = result.with_artifacts(json!({
            "verdict": verdict,
            "metadataScore": metadata_score.map(|m| m.score),
            "depthConfidence": depth_score.map(|d| d.confidence),
        }));
        info!(run_id = %result.run_id(), %verdict, success = result.success(), "capture verified");

        Ok(VerificationReport {
            verdict,
            integrity,
            metadata_score,
            depth_score,
            result,
        })
    }
}

fn stage_detail<T: DeserializeOwned>(
    result: &VerificationResult,
    stage: &str,
    key: &str,
) -> Result<Option<T>, VerilensError> {
    result
        .stage(stage)
        .and_then(|s| s.details.as_ref())
        .and_then(|d| d.get(key))
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()
        .map_err(VerilensError::from)
}

fn integrity_outcome(result: &VerificationResult) -> Result<IntegrityCheck, VerilensError> {
    let Some(stage) = result.stage(INTEGRITY_STAGE) else {
        return Ok(IntegrityCheck::NotChecked);
    };
    if let Some(check) = stage_detail(result, INTEGRITY_STAGE, INTEGRITY_KEY)? {
        return Ok(check);
    }
    Ok(if stage.success {
        IntegrityCheck::Verified
    } else {
        IntegrityCheck::Failed {
            reason: stage.summary.clone(),
        }
    })
}
