// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for evidence scoring and the full pipeline in the
// verilens-verify crate.

use std::io::Cursor;

use chrono::Utc;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, ImageFormat, RgbImage};

use verilens_core::VerifierConfig;
use verilens_core::config::{DepthConfig, MetadataConfig};
use verilens_core::types::{DepthFrame, MetadataSummary, VerificationInput};
use verilens_verify::{AuthenticityPipeline, DepthScorer, MetadataScorer};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn summary() -> MetadataSummary {
    MetadataSummary {
        device_make: Some("Veri".into()),
        device_model: Some("Lens One".into()),
        iso: Some(100.0),
        exposure_time: Some(0.01),
        f_number: Some(1.8),
        timestamp: Some(Utc::now().to_rfc3339()),
        latitude: Some(35.0),
        longitude: Some(-120.0),
    }
}

/// A VGA-sized depth frame with a gentle gradient.
fn vga_frame() -> DepthFrame {
    let (w, h) = (640u32, 480u32);
    let values = (0..w * h)
        .map(|i| f64::from(i % w) * 0.05 + f64::from(i / w) * 0.02)
        .collect();
    DepthFrame::new(w, h, values).expect("valid frame")
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_metadata_score(c: &mut Criterion) {
    let scorer = MetadataScorer::new(MetadataConfig::default());
    let m = summary();
    c.bench_function("metadata_score", |b| {
        b.iter(|| black_box(scorer.score(black_box(&m), Some("Veri Lens One"))));
    });
}

fn bench_depth_score(c: &mut Criterion) {
    let scorer = DepthScorer::new(DepthConfig::default());
    let frame = vga_frame();
    c.bench_function("depth_score (640x480)", |b| {
        b.iter(|| black_box(scorer.score(black_box(&frame)).expect("score")));
    });
}

/// Full pipeline on a small PNG with hints and a VGA depth frame.
fn bench_pipeline_verify(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let pipeline = AuthenticityPipeline::new(VerifierConfig::default()).expect("pipeline");

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(64, 64))
        .write_to(&mut png, ImageFormat::Png)
        .expect("encode png");
    let input = VerificationInput::new(png.into_inner())
        .with_metadata_hints(summary())
        .with_depth_frame(vga_frame());

    c.bench_function("pipeline_verify (64x64 png, 640x480 depth)", |b| {
        b.iter(|| {
            let report = runtime
                .block_on(pipeline.verify(black_box(&input)))
                .expect("verify");
            black_box(report);
        });
    });
}

criterion_group!(
    benches,
    bench_metadata_score,
    bench_depth_score,
    bench_pipeline_verify,
);
criterion_main!(benches);
