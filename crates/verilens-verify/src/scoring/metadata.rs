// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata plausibility scoring.
//
// A weighted sum of independent checks: device identity, exposure settings
// (iso, exposure time, f-number), capture time freshness, and geolocation.
// A missing field costs its own weight and nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use verilens_core::config::{MetadataConfig, PlausibleRange};
use verilens_core::types::MetadataSummary;

use super::clamp_unit;

/// How the reported device relates to the device we expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMatch {
    /// Make and model equal the expected identity.
    Exact,
    /// One identity contains the other.
    Partial,
    /// Make and model present but no reference to check them against.
    Unverified,
    Mismatch,
    /// Neither make nor model reported.
    Missing,
}

/// Points earned by each check, already weighted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataChecks {
    pub device_match: DeviceMatch,
    pub device: f64,
    pub iso: f64,
    pub exposure_time: f64,
    pub f_number: f64,
    pub timestamp: f64,
    pub geolocation: f64,
}

impl MetadataChecks {
    fn total(&self) -> f64 {
        self.device + self.iso + self.exposure_time + self.f_number + self.timestamp + self.geolocation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataScore {
    /// Plausibility in [0, 1].
    pub score: f64,
    pub checks: MetadataChecks,
}

impl MetadataScore {
    /// Score assigned when no metadata could be obtained at all.
    pub fn zero() -> Self {
        Self {
            score: 0.0,
            checks: MetadataChecks {
                device_match: DeviceMatch::Missing,
                device: 0.0,
                iso: 0.0,
                exposure_time: 0.0,
                f_number: 0.0,
                timestamp: 0.0,
                geolocation: 0.0,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataScorer {
    config: MetadataConfig,
}

impl MetadataScorer {
    pub fn new(config: MetadataConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    /// Score `summary` against the current time.
    pub fn score(&self, summary: &MetadataSummary, expected_device: Option<&str>) -> MetadataScore {
        self.score_at(summary, expected_device, Utc::now())
    }

    /// Score `summary` as if evaluated at `now`.
    pub fn score_at(
        &self,
        summary: &MetadataSummary,
        expected_device: Option<&str>,
        now: DateTime<Utc>,
    ) -> MetadataScore {
        let weights = &self.config.weights;
        let per_setting = weights.exposure / 3.0;

        let device_match = self.match_device(summary, expected_device);
        let device_factor = match device_match {
            DeviceMatch::Exact => 1.0,
            DeviceMatch::Partial | DeviceMatch::Unverified => self.config.partial_device_factor,
            DeviceMatch::Mismatch | DeviceMatch::Missing => 0.0,
        };

        let checks = MetadataChecks {
            device_match,
            device: weights.device * device_factor,
            iso: per_setting * in_range(summary.iso, &self.config.iso_range),
            exposure_time: per_setting
                * in_range(summary.exposure_time, &self.config.exposure_time_range),
            f_number: per_setting * in_range(summary.f_number, &self.config.f_number_range),
            timestamp: weights.timestamp * self.freshness(summary, now),
            geolocation: if summary.valid_location().is_some() {
                weights.geolocation
            } else {
                0.0
            },
        };

        let score = clamp_unit(checks.total());
        debug!(score, device = ?device_match, "metadata scored");
        MetadataScore { score, checks }
    }

    fn match_device(&self, summary: &MetadataSummary, expected: Option<&str>) -> DeviceMatch {
        let make = summary.device_make.as_deref().map(normalize).unwrap_or_default();
        let model = summary.device_model.as_deref().map(normalize).unwrap_or_default();
        if make.is_empty() && model.is_empty() {
            return DeviceMatch::Missing;
        }
        let reported = normalize(&format!("{make} {model}"));

        if let Some(expected) = expected {
            let expected = normalize(expected);
            return compare_identity(&reported, &expected);
        }

        let mut best = DeviceMatch::Mismatch;
        for trusted in &self.config.trusted_devices {
            let identity = normalize(&format!("{} {}", trusted.make, trusted.model));
            match compare_identity(&reported, &identity) {
                DeviceMatch::Exact => return DeviceMatch::Exact,
                DeviceMatch::Partial => best = DeviceMatch::Partial,
                _ => {}
            }
        }
        if best == DeviceMatch::Mismatch && !make.is_empty() && !model.is_empty() {
            DeviceMatch::Unverified
        } else {
            best
        }
    }

    /// 1.0 within the skew window, decaying linearly to 0.0 at twice it.
    fn freshness(&self, summary: &MetadataSummary, now: DateTime<Utc>) -> f64 {
        let Some(taken) = summary.parsed_timestamp() else {
            return 0.0;
        };
        let delta = (now - taken).num_milliseconds().unsigned_abs() as f64 / 1000.0;
        let window = self.config.timestamp_skew_secs as f64;
        if delta <= window {
            1.0
        } else if delta >= 2.0 * window {
            0.0
        } else {
            (2.0 * window - delta) / window
        }
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn compare_identity(reported: &str, reference: &str) -> DeviceMatch {
    if reference.is_empty() {
        DeviceMatch::Mismatch
    } else if reported == reference {
        DeviceMatch::Exact
    } else if reported.contains(reference) || reference.contains(reported) {
        DeviceMatch::Partial
    } else {
        DeviceMatch::Mismatch
    }
}

fn in_range(value: Option<f64>, range: &PlausibleRange) -> f64 {
    match value {
        Some(v) if v > 0.0 && range.contains(v) => 1.0,
        _ => 0.0,
    }
}
