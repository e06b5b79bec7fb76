// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Verilens capture verification.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, VerilensError};
use crate::error_codes::NormalizedError;

/// Unique identifier for a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Evidence inputs
// ---------------------------------------------------------------------------

/// Camera metadata describing a capture.
///
/// Every field is optional: a missing field degrades the plausibility score
/// for its own check and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataSummary {
    pub device_make: Option<String>,
    pub device_model: Option<String>,
    /// Sensor sensitivity (ISO speed).
    pub iso: Option<f64>,
    /// Exposure time in seconds.
    pub exposure_time: Option<f64>,
    pub f_number: Option<f64>,
    /// Capture instant, RFC 3339 or EXIF `YYYY:MM:DD HH:MM:SS` (UTC).
    pub timestamp: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl MetadataSummary {
    /// Parse `timestamp` into an instant, if present and well-formed.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        chrono::NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Latitude/longitude pair when both are present and within range.
    pub fn valid_location(&self) -> Option<(f64, f64)> {
        let lat = self.latitude?;
        let lon = self.longitude?;
        ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
    }
}

/// A grid of depth samples from a depth sensor, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f64>,
}

impl DepthFrame {
    /// Build a frame, rejecting inconsistent dimensions or samples.
    pub fn new(width: u32, height: u32, values: Vec<f64>) -> Result<Self> {
        let frame = Self {
            width,
            height,
            values,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Check the structural invariants of the frame.
    ///
    /// Frames arrive from callers (often deserialized), so this is run again
    /// before any statistic is computed.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VerilensError::Validation(format!(
                "depth frame dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or_else(|| VerilensError::Validation("depth frame dimensions overflow".into()))?;
        if self.values.len() != expected {
            return Err(VerilensError::Validation(format!(
                "depth frame has {} samples, expected {}x{} = {}",
                self.values.len(),
                self.width,
                self.height,
                expected
            )));
        }
        if let Some(idx) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(VerilensError::Validation(format!(
                "depth sample {idx} is not a finite number"
            )));
        }
        Ok(())
    }
}

/// Statistical summary of a depth frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthScore {
    pub mean: f64,
    /// Population variance (always >= 0).
    pub variance: f64,
    /// Confidence that the frame shows a real 3D scene, in [0, 1].
    pub confidence: f64,
}

/// Digest algorithms accepted for cryptographic binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the raw digest in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = VerilensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(VerilensError::Configuration(format!(
                "unsupported hash algorithm: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload hash signed by a capture device or signing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    pub signer_id: String,
    pub chain_id: String,
    /// Hex-encoded signature over `payload_hash`.
    pub signature: String,
    /// Signature scheme identifier, e.g. `ECDSA_P256_SHA256`.
    pub algorithm: String,
    /// Hex digest of the signed image bytes.
    pub payload_hash: String,
    pub issued_at: DateTime<Utc>,
}

/// Ledger submission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Receipt returned when a signed payload is submitted to a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub tx_hash: String,
    pub chain_id: String,
    pub status: ReceiptStatus,
    pub block_number: Option<u64>,
}

/// Cryptographic binding the caller expects the image bytes to satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoBinding {
    /// Expected hex digest of the image bytes.
    pub expected_digest: String,
    /// Digest algorithm; the configured default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<HashAlgorithm>,
    /// Optional signature over the digest.
    #[serde(default)]
    pub signed_payload: Option<SignedPayload>,
    /// Hex-encoded public key of the signer (uncompressed SEC1).
    #[serde(default)]
    pub public_key: Option<String>,
}

impl CryptoBinding {
    /// The binding's own algorithm, or `default` when it names none.
    pub fn algorithm_or(&self, default: HashAlgorithm) -> HashAlgorithm {
        self.algorithm.unwrap_or(default)
    }
}

/// Outcome of the cryptographic-binding check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IntegrityCheck {
    /// No binding was supplied.
    #[default]
    NotChecked,
    Verified,
    Failed { reason: String },
}

impl IntegrityCheck {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Everything submitted for one verification request.
///
/// Immutable once built; one instance per request.
#[derive(Debug, Clone)]
pub struct VerificationInput {
    image: Vec<u8>,
    depth_frame: Option<DepthFrame>,
    expected_device: Option<String>,
    metadata_hints: Option<MetadataSummary>,
    binding: Option<CryptoBinding>,
}

impl VerificationInput {
    pub fn new(image: impl Into<Vec<u8>>) -> Self {
        Self {
            image: image.into(),
            depth_frame: None,
            expected_device: None,
            metadata_hints: None,
            binding: None,
        }
    }

    pub fn with_depth_frame(mut self, frame: DepthFrame) -> Self {
        self.depth_frame = Some(frame);
        self
    }

    pub fn with_expected_device(mut self, device: impl Into<String>) -> Self {
        self.expected_device = Some(device.into());
        self
    }

    pub fn with_metadata_hints(mut self, hints: MetadataSummary) -> Self {
        self.metadata_hints = Some(hints);
        self
    }

    pub fn with_binding(mut self, binding: CryptoBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn depth_frame(&self) -> Option<&DepthFrame> {
        self.depth_frame.as_ref()
    }

    pub fn expected_device(&self) -> Option<&str> {
        self.expected_device.as_deref()
    }

    pub fn metadata_hints(&self) -> Option<&MetadataSummary> {
        self.metadata_hints.as_ref()
    }

    pub fn binding(&self) -> Option<&CryptoBinding> {
        self.binding.as_ref()
    }

    /// Reject malformed requests before any stage runs.
    pub fn validate(&self) -> Result<()> {
        if self.image.is_empty() {
            return Err(VerilensError::Validation("image buffer is empty".into()));
        }
        if self
            .expected_device
            .as_deref()
            .is_some_and(|d| d.trim().is_empty())
        {
            return Err(VerilensError::Validation(
                "expected device identifier is empty".into(),
            ));
        }
        if let Some(frame) = &self.depth_frame {
            frame.validate()?;
        }
        if self
            .binding
            .as_ref()
            .is_some_and(|b| b.expected_digest.trim().is_empty())
        {
            return Err(VerilensError::Validation(
                "cryptographic binding has an empty digest".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Final tri-state outcome of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Suspect,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Suspect => "suspect",
            Self::Fail => "fail",
        }
    }
}

impl FromStr for Verdict {
    type Err = VerilensError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pass" => Ok(Self::Pass),
            "suspect" => Ok(Self::Suspect),
            "fail" => Ok(Self::Fail),
            other => Err(VerilensError::Validation(format!("unknown verdict: {other}"))),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single executed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStageResult {
    pub stage_id: String,
    pub success: bool,
    pub summary: String,
    /// What the stage checks, as declared by the stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<NormalizedError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl VerificationStageResult {
    pub fn passed(stage_id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            stage_id: stage_id.into(),
            success: true,
            summary: summary.into(),
            description: None,
            details: None,
            error: None,
            duration_ms: None,
        }
    }

    pub fn failed(stage_id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::passed(stage_id, summary)
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_error(mut self, error: NormalizedError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Aggregated outcome of one engine run.
///
/// Built once by the engine; the stage trace is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    run_id: RunId,
    success: bool,
    stages: Vec<VerificationStageResult>,
    generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifacts: Option<serde_json::Value>,
}

impl VerificationResult {
    /// Assemble a result from the executed stages.
    ///
    /// `success` requires that all `registered` stages ran and succeeded.
    pub fn new(run_id: RunId, stages: Vec<VerificationStageResult>, registered: usize) -> Self {
        let success = stages.len() == registered && stages.iter().all(|s| s.success);
        Self {
            run_id,
            success,
            stages,
            generated_at: Utc::now(),
            artifacts: None,
        }
    }

    /// Attach derived artifacts (scores, verdict).
    pub fn with_artifacts(mut self, artifacts: serde_json::Value) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Stage results in execution order (only stages that actually ran).
    pub fn stage_results(&self) -> &[VerificationStageResult] {
        &self.stages
    }

    pub fn stage(&self, stage_id: &str) -> Option<&VerificationStageResult> {
        self.stages.iter().find(|s| s.stage_id == stage_id)
    }

    /// The stage that stopped the run, if any.
    pub fn failed_stage(&self) -> Option<&VerificationStageResult> {
        self.stages.iter().find(|s| !s.success)
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn artifacts(&self) -> Option<&serde_json::Value> {
        self.artifacts.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_frame_rejects_size_mismatch() {
        let err = DepthFrame::new(2, 2, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, VerilensError::Validation(_)));
        assert!(err.to_string().contains("expected 2x2 = 4"));
    }

    #[test]
    fn depth_frame_rejects_zero_dimension_and_nan() {
        assert!(DepthFrame::new(0, 3, vec![]).is_err());
        assert!(DepthFrame::new(1, 2, vec![1.0, f64::NAN]).is_err());
        assert!(DepthFrame::new(1, 2, vec![1.0, 2.0]).is_ok());
    }

    #[test]
    fn timestamp_accepts_rfc3339_and_exif() {
        let rfc = MetadataSummary {
            timestamp: Some("2026-03-01T12:00:00Z".into()),
            ..Default::default()
        };
        let exif = MetadataSummary {
            timestamp: Some("2026:03:01 12:00:00".into()),
            ..Default::default()
        };
        assert_eq!(rfc.parsed_timestamp(), exif.parsed_timestamp());
        assert!(rfc.parsed_timestamp().is_some());

        let bad = MetadataSummary {
            timestamp: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(bad.parsed_timestamp().is_none());
    }

    #[test]
    fn location_requires_both_in_range() {
        let mut m = MetadataSummary {
            latitude: Some(35.0),
            longitude: Some(-120.0),
            ..Default::default()
        };
        assert_eq!(m.valid_location(), Some((35.0, -120.0)));
        m.latitude = Some(91.0);
        assert!(m.valid_location().is_none());
        m.latitude = None;
        assert!(m.valid_location().is_none());
    }

    #[test]
    fn metadata_deserializes_camel_case() {
        let m: MetadataSummary = serde_json::from_str(
            r#"{"deviceMake":"Veri","deviceModel":"Lens One","iso":100,"fNumber":1.8}"#,
        )
        .unwrap();
        assert_eq!(m.device_make.as_deref(), Some("Veri"));
        assert_eq!(m.f_number, Some(1.8));
        assert!(m.exposure_time.is_none());
    }

    #[test]
    fn input_validation() {
        assert!(VerificationInput::new(Vec::<u8>::new()).validate().is_err());
        assert!(VerificationInput::new(b"img".to_vec())
            .with_expected_device("  ")
            .validate()
            .is_err());
        assert!(VerificationInput::new(b"img".to_vec())
            .with_expected_device("Veri Lens One")
            .validate()
            .is_ok());
    }

    #[test]
    fn result_success_requires_all_registered_stages() {
        let stages = vec![VerificationStageResult::passed("a", "ok")];
        assert!(VerificationResult::new(RunId::new(), stages.clone(), 1).success());
        assert!(!VerificationResult::new(RunId::new(), stages, 2).success());
    }

    #[test]
    fn hash_algorithm_parsing() {
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn binding_without_algorithm_uses_default() {
        let binding: CryptoBinding =
            serde_json::from_str(r#"{ "expectedDigest": "ab" }"#).unwrap();
        assert_eq!(binding.algorithm, None);
        assert_eq!(binding.algorithm_or(HashAlgorithm::Sha384), HashAlgorithm::Sha384);

        let binding: CryptoBinding =
            serde_json::from_str(r#"{ "expectedDigest": "ab", "algorithm": "sha512" }"#).unwrap();
        assert_eq!(binding.algorithm_or(HashAlgorithm::Sha384), HashAlgorithm::Sha512);
    }

    #[test]
    fn verdict_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Verdict::Suspect).unwrap(), "\"suspect\"");
        assert_eq!("fail".parse::<Verdict>().unwrap(), Verdict::Fail);
        assert!("maybe".parse::<Verdict>().is_err());
    }
}
