// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verifier configuration.
//
// Built-in defaults are overlaid with `<dir>/default.json` and then
// `<dir>/<environment>.json`. Nested objects merge key by key; scalars and
// arrays replace whatever the lower layer held. The merged result is
// validated once and is read-only afterwards.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, VerilensError};
use crate::types::HashAlgorithm;

/// Selects the environment overlay (`<dir>/<env>.json`).
pub const ENV_VAR: &str = "VERILENS_ENV";
/// Directory holding `default.json` and the environment overlays.
pub const CONFIG_DIR_VAR: &str = "VERILENS_CONFIG_DIR";
pub const DEFAULT_ENVIRONMENT: &str = "development";

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Complete verifier settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    pub metadata: MetadataConfig,
    pub depth: DepthConfig,
    pub verdict: VerdictThresholds,
    pub integrity: IntegrityConfig,
    pub engine: EngineConfig,
}

/// Inclusive plausible range for a numeric camera setting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibleRange {
    pub min: f64,
    pub max: f64,
}

impl PlausibleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Relative weight of each metadata check. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataWeights {
    pub device: f64,
    /// Split evenly across iso, exposure time and f-number.
    pub exposure: f64,
    pub timestamp: f64,
    pub geolocation: f64,
}

impl Default for MetadataWeights {
    fn default() -> Self {
        Self {
            device: 0.30,
            exposure: 0.45,
            timestamp: 0.15,
            geolocation: 0.10,
        }
    }
}

impl MetadataWeights {
    pub fn total(&self) -> f64 {
        self.device + self.exposure + self.timestamp + self.geolocation
    }
}

/// A device make/model pair accepted when the request names no device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedDevice {
    pub make: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    pub weights: MetadataWeights,
    /// Fraction of the device weight awarded for a partial match.
    pub partial_device_factor: f64,
    pub iso_range: PlausibleRange,
    /// Seconds.
    pub exposure_time_range: PlausibleRange,
    pub f_number_range: PlausibleRange,
    /// Timestamps within this many seconds of now earn the full weight.
    pub timestamp_skew_secs: u64,
    pub trusted_devices: Vec<TrustedDevice>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            weights: MetadataWeights::default(),
            partial_device_factor: 0.5,
            iso_range: PlausibleRange::new(25.0, 12_800.0),
            exposure_time_range: PlausibleRange::new(1.0 / 32_000.0, 30.0),
            f_number_range: PlausibleRange::new(0.95, 32.0),
            timestamp_skew_secs: 600,
            trusted_devices: vec![TrustedDevice {
                make: "Veri".into(),
                model: "Lens One".into(),
            }],
        }
    }
}

/// Variance band a real scene is expected to fall in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DepthConfig {
    /// Below this the frame looks flat (printed or screen-replayed).
    pub min_variance: f64,
    /// Above this the frame looks like sensor noise or injected noise.
    pub max_variance: f64,
    /// Confidence at either edge of the band.
    pub edge_confidence: f64,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            min_variance: 1.0,
            max_variance: 10_000.0,
            edge_confidence: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerdictThresholds {
    pub pass_metadata: f64,
    pub pass_depth: f64,
    pub suspect_metadata: f64,
    pub suspect_depth: f64,
    /// Stricter thresholds used when no depth frame was supplied.
    pub metadata_only_pass: f64,
    pub metadata_only_suspect: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            pass_metadata: 0.8,
            pass_depth: 0.8,
            suspect_metadata: 0.5,
            suspect_depth: 0.5,
            metadata_only_pass: 0.9,
            metadata_only_suspect: 0.65,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrityConfig {
    pub default_algorithm: HashAlgorithm,
    /// AES-GCM nonce length in bytes.
    pub iv_length: usize,
    /// AES key length in bytes.
    pub key_length: usize,
    /// Reject bindings that carry no signature.
    pub require_signature: bool,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            default_algorithm: HashAlgorithm::Sha256,
            iv_length: 12,
            key_length: 32,
            require_signature: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Default per-stage deadline; stages may declare their own.
    pub stage_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_ms: Some(5_000),
        }
    }
}

impl VerifierConfig {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let weights = &self.metadata.weights;
        for (name, w) in [
            ("device", weights.device),
            ("exposure", weights.exposure),
            ("timestamp", weights.timestamp),
            ("geolocation", weights.geolocation),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(config_err(format!("metadata weight '{name}' must be in [0, 1], got {w}")));
            }
        }
        if (weights.total() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(config_err(format!(
                "metadata weights must sum to 1.0, got {}",
                weights.total()
            )));
        }
        unit("metadata.partial_device_factor", self.metadata.partial_device_factor)?;

        for (name, range) in [
            ("iso_range", self.metadata.iso_range),
            ("exposure_time_range", self.metadata.exposure_time_range),
            ("f_number_range", self.metadata.f_number_range),
        ] {
            if !(range.min > 0.0 && range.min < range.max) {
                return Err(config_err(format!(
                    "metadata.{name} must satisfy 0 < min < max, got [{}, {}]",
                    range.min, range.max
                )));
            }
        }

        let depth = &self.depth;
        if !(depth.min_variance > 0.0 && depth.min_variance < depth.max_variance) {
            return Err(config_err(format!(
                "depth variance band must satisfy 0 < min < max, got [{}, {}]",
                depth.min_variance, depth.max_variance
            )));
        }
        unit("depth.edge_confidence", depth.edge_confidence)?;

        let v = &self.verdict;
        for (name, t) in [
            ("pass_metadata", v.pass_metadata),
            ("pass_depth", v.pass_depth),
            ("suspect_metadata", v.suspect_metadata),
            ("suspect_depth", v.suspect_depth),
            ("metadata_only_pass", v.metadata_only_pass),
            ("metadata_only_suspect", v.metadata_only_suspect),
        ] {
            unit(&format!("verdict.{name}"), t)?;
        }
        if v.suspect_metadata > v.pass_metadata
            || v.suspect_depth > v.pass_depth
            || v.metadata_only_suspect > v.metadata_only_pass
        {
            return Err(config_err("suspect thresholds must not exceed pass thresholds"));
        }

        if self.integrity.iv_length != 12 {
            return Err(config_err(format!(
                "AES-GCM requires a 12-byte IV, got {}",
                self.integrity.iv_length
            )));
        }
        if self.integrity.key_length != 32 {
            return Err(config_err(format!(
                "AES-256 requires a 32-byte key, got {}",
                self.integrity.key_length
            )));
        }
        if self.engine.stage_timeout_ms == Some(0) {
            return Err(config_err("engine.stage_timeout_ms must be positive"));
        }
        Ok(())
    }
}

fn config_err(message: impl Into<String>) -> VerilensError {
    VerilensError::Configuration(message.into())
}

fn unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(config_err(format!("{name} must be in [0, 1], got {value}")))
    }
}

// ---------------------------------------------------------------------------
// Layered loading
// ---------------------------------------------------------------------------

/// Recursively merge `overrides` into `base`.
///
/// Objects merge key by key; every other value (including arrays) replaces
/// the base value outright.
pub fn merge_values(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(over_map)) => {
            for (key, over_value) in over_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => merge_values(base_value, over_value),
                    None => {
                        base_map.insert(key, over_value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

/// Loads a `VerifierConfig` from built-in defaults plus optional JSON layers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    dir: Option<PathBuf>,
    environment: String,
}

impl ConfigLoader {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            dir: None,
            environment: environment.into(),
        }
    }

    /// Read layers from `dir` (`default.json`, then `<environment>.json`).
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Build a loader from `VERILENS_ENV` and `VERILENS_CONFIG_DIR`.
    pub fn from_env() -> Self {
        let environment =
            std::env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_owned());
        let loader = Self::new(environment);
        match std::env::var(CONFIG_DIR_VAR) {
            Ok(dir) => loader.with_dir(dir),
            Err(_) => loader,
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Merge all layers, deserialize, and validate.
    pub fn load(&self) -> Result<VerifierConfig> {
        self.load_with(Value::Object(Default::default()))
    }

    /// Like [`load`](Self::load), with a final in-memory override layer on top.
    pub fn load_with(&self, overrides: Value) -> Result<VerifierConfig> {
        if self.environment.is_empty()
            || !self
                .environment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(config_err(format!(
                "invalid environment name: {:?}",
                self.environment
            )));
        }

        let mut merged = serde_json::to_value(VerifierConfig::default())?;
        if let Some(dir) = &self.dir {
            for name in ["default".to_owned(), self.environment.clone()] {
                let path = dir.join(format!("{name}.json"));
                if let Some(layer) = read_layer(&path)? {
                    debug!(path = %path.display(), "merging config layer");
                    merge_values(&mut merged, layer);
                }
            }
        }
        merge_values(&mut merged, overrides);

        let config: VerifierConfig = serde_json::from_value(merged)
            .map_err(|e| config_err(format!("invalid configuration: {e}")))?;
        config.validate()?;
        info!(environment = %self.environment, "configuration loaded");
        Ok(config)
    }
}

fn read_layer(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&data)
        .map_err(|e| config_err(format!("{}: {e}", path.display())))?;
    if !value.is_object() {
        return Err(config_err(format!(
            "{}: top-level value must be an object",
            path.display()
        )));
    }
    Ok(Some(value))
}

// ---------------------------------------------------------------------------
// Process-wide configuration
// ---------------------------------------------------------------------------

static GLOBAL: OnceLock<VerifierConfig> = OnceLock::new();

/// Install `config` as the process-wide configuration.
///
/// Fails if the configuration is invalid or one is already installed.
pub fn init_global(config: VerifierConfig) -> Result<&'static VerifierConfig> {
    config.validate()?;
    GLOBAL
        .set(config)
        .map_err(|_| config_err("global configuration already initialised"))?;
    GLOBAL
        .get()
        .ok_or_else(|| config_err("global configuration missing after install"))
}

/// The process-wide configuration, loaded from the environment on first use.
///
/// A configuration that fails to load is returned as an error and nothing
/// is installed, so a later call retries the load.
pub fn global() -> Result<&'static VerifierConfig> {
    load_into(&GLOBAL, ConfigLoader::from_env())
}

fn load_into(cell: &OnceLock<VerifierConfig>, loader: ConfigLoader) -> Result<&VerifierConfig> {
    if let Some(config) = cell.get() {
        return Ok(config);
    }
    let config = loader.load().inspect_err(|e| {
        warn!(error = %e, "configuration failed to load");
    })?;
    // A concurrent caller may have won the race; either value is valid.
    let _ = cell.set(config);
    cell.get()
        .ok_or_else(|| config_err("global configuration missing after load"))
}
