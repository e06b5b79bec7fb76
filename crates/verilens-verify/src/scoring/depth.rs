// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Depth-frame scoring.
//
// A real scene has depth variance inside a configured band. Flat
// reproductions (prints, screens) fall below it; noise or injected frames
// rise above it. Confidence peaks at the band's log-scale centre.

use tracing::debug;
use verilens_core::config::DepthConfig;
use verilens_core::error::VerilensError;
use verilens_core::types::{DepthFrame, DepthScore};

use super::clamp_unit;

#[derive(Debug, Clone)]
pub struct DepthScorer {
    config: DepthConfig,
}

impl DepthScorer {
    pub fn new(config: DepthConfig) -> Self {
        Self { config }
    }

    /// Summarize `frame` and rate how much it looks like a real scene.
    ///
    /// The frame is validated first; no statistic is computed for a
    /// malformed frame.
    pub fn score(&self, frame: &DepthFrame) -> Result<DepthScore, VerilensError> {
        frame.validate()?;
        let (mean, variance) = mean_and_variance(&frame.values);
        let confidence = self.confidence_for(variance);
        debug!(
            width = frame.width,
            height = frame.height,
            mean,
            variance,
            confidence,
            "depth frame scored"
        );
        Ok(DepthScore {
            mean,
            variance,
            confidence,
        })
    }

    /// Map a variance onto a confidence in [0, 1].
    pub fn confidence_for(&self, variance: f64) -> f64 {
        let DepthConfig {
            min_variance,
            max_variance,
            edge_confidence,
        } = self.config;

        let raw = if variance.is_nan() {
            0.0
        } else if variance < min_variance {
            edge_confidence * variance.max(0.0) / min_variance
        } else if variance > max_variance {
            edge_confidence * max_variance / variance
        } else {
            let (lo, hi) = (min_variance.ln(), max_variance.ln());
            let centre = (lo + hi) / 2.0;
            let half_width = (hi - lo) / 2.0;
            if half_width <= 0.0 {
                1.0
            } else {
                let offset = (variance.ln() - centre).abs() / half_width;
                1.0 - (1.0 - edge_confidence) * offset
            }
        };
        clamp_unit(raw)
    }
}

/// Population mean and variance, single pass (Welford).
///
/// Large samples are divided by the largest magnitude first so finite input
/// never overflows; the variance saturates at `f64::MAX`.
fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let scale = values.iter().fold(1.0_f64, |m, x| m.max(x.abs()));
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, &x) in values.iter().enumerate() {
        let x = x / scale;
        let delta = x - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (x - mean);
    }
    let n = values.len().max(1) as f64;
    let variance = (m2 / n).max(0.0) * scale * scale;
    (mean * scale, variance.min(f64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> DepthScorer {
        DepthScorer::new(DepthConfig::default())
    }

    fn approx(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn reference_frame_statistics() {
        let frame = DepthFrame::new(2, 2, vec![10.0, 20.0, 30.0, 40.0]).unwrap();
        let s = scorer().score(&frame).unwrap();
        assert!(approx(s.mean, 25.0, 1e-9));
        assert!(approx(s.variance, 125.0, 1e-9));
        assert!(s.confidence >= 0.9, "got {}", s.confidence);
        assert!(approx(s.confidence, 0.9903, 1e-3));
    }

    #[test]
    fn flat_frame_scores_zero() {
        let frame = DepthFrame::new(3, 3, vec![1.5; 9]).unwrap();
        let s = scorer().score(&frame).unwrap();
        assert_eq!(s.variance, 0.0);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn confidence_shape_across_band() {
        let sc = scorer();
        assert!(approx(sc.confidence_for(100.0), 1.0, 1e-12));
        assert!(approx(sc.confidence_for(1.0), 0.8, 1e-12));
        assert!(approx(sc.confidence_for(10_000.0), 0.8, 1e-12));
        assert!(approx(sc.confidence_for(0.5), 0.4, 1e-12));
        assert!(approx(sc.confidence_for(20_000.0), 0.4, 1e-12));
        assert!(sc.confidence_for(10.0) > sc.confidence_for(2.0));
    }

    #[test]
    fn extreme_variances_stay_in_unit_range() {
        let sc = scorer();
        for v in [f64::NAN, f64::INFINITY, -3.0, 0.0, f64::MAX, f64::MIN_POSITIVE] {
            let c = sc.confidence_for(v);
            assert!((0.0..=1.0).contains(&c), "variance {v} gave {c}");
        }
    }

    #[test]
    fn huge_samples_saturate_instead_of_overflowing() {
        let frame = DepthFrame::new(1, 2, vec![f64::MAX, -f64::MAX]).unwrap();
        let s = scorer().score(&frame).unwrap();
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.variance, f64::MAX);
        assert!((0.0..=1.0).contains(&s.confidence));
        assert!(s.confidence < 0.01);

        let frame = DepthFrame::new(1, 2, vec![1e200, -1e200]).unwrap();
        let s = scorer().score(&frame).unwrap();
        assert!(s.mean.is_finite() && s.variance.is_finite());
        assert!(s.variance > 0.0);
    }

    #[test]
    fn malformed_frames_are_rejected() {
        let sc = scorer();
        let short = DepthFrame {
            width: 2,
            height: 2,
            values: vec![1.0, 2.0],
        };
        assert!(matches!(sc.score(&short), Err(VerilensError::Validation(_))));

        let zero = DepthFrame {
            width: 0,
            height: 4,
            values: vec![],
        };
        assert!(sc.score(&zero).is_err());

        let nan = DepthFrame {
            width: 1,
            height: 1,
            values: vec![f64::NAN],
        };
        assert!(sc.score(&nan).is_err());
    }

    #[test]
    fn scoring_is_idempotent() {
        let frame = DepthFrame::new(2, 3, vec![0.4, 1.2, 3.3, 2.1, 0.9, 5.5]).unwrap();
        let sc = scorer();
        assert_eq!(sc.score(&frame).unwrap(), sc.score(&frame).unwrap());
    }
}
