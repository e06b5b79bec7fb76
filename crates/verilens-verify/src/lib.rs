// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// verilens-verify — Capture authenticity verification.
//
// A generic fail-fast stage engine, the metadata and depth scorers, the
// verdict policy, and the pipeline that wires integrity, metadata and depth
// stages together.

pub mod engine;
pub mod pipeline;
pub mod policy;
pub mod scoring;
pub mod stages;

pub use engine::{RunState, VerificationEngine, VerificationStage};
pub use pipeline::{AuthenticityPipeline, VerificationReport};
pub use policy::VerdictPolicy;
pub use scoring::{DepthScorer, MetadataScore, MetadataScorer};
pub use stages::{DepthStage, IntegrityStage, MetadataStage};
