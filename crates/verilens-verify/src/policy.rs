// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verdict policy — fuse evidence scores into pass / suspect / fail.

use verilens_core::config::VerdictThresholds;
use verilens_core::types::{IntegrityCheck, Verdict};

use crate::scoring::clamp_unit;

#[derive(Debug, Clone, Copy, Default)]
pub struct VerdictPolicy {
    thresholds: VerdictThresholds,
}

impl VerdictPolicy {
    pub fn new(thresholds: VerdictThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &VerdictThresholds {
        &self.thresholds
    }

    /// Decide the verdict for one capture.
    ///
    /// A failed integrity check always fails. Without a depth score the
    /// stricter metadata-only thresholds apply.
    pub fn decide(
        &self,
        metadata_score: f64,
        depth_confidence: Option<f64>,
        integrity: &IntegrityCheck,
    ) -> Verdict {
        if integrity.is_failed() {
            return Verdict::Fail;
        }
        let t = &self.thresholds;
        let metadata = clamp_unit(metadata_score);

        match depth_confidence.map(clamp_unit) {
            Some(depth) => {
                if metadata >= t.pass_metadata && depth >= t.pass_depth {
                    Verdict::Pass
                } else if metadata >= t.suspect_metadata && depth >= t.suspect_depth {
                    Verdict::Suspect
                } else {
                    Verdict::Fail
                }
            }
            None => {
                if metadata >= t.metadata_only_pass {
                    Verdict::Pass
                } else if metadata >= t.metadata_only_suspect {
                    Verdict::Suspect
                } else {
                    Verdict::Fail
                }
            }
        }
    }
}
