// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staged verification engine.
//
// Runs registered stages strictly in order and stops at the first failure.
// Each run owns its own stage trace; the engine itself is immutable during a
// run, so one engine can serve concurrent requests behind an `Arc`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use verilens_core::config::EngineConfig;
use verilens_core::error::VerilensError;
use verilens_core::error_codes::normalize_error;
use verilens_core::types::{RunId, VerificationResult, VerificationStageResult};

/// A named unit of verification logic.
///
/// Returning `Err` is equivalent to returning a failing result: the engine
/// wraps the error into a stage result carrying its normalized code.
#[async_trait]
pub trait VerificationStage<I: Sync>: Send + Sync {
    /// Unique identifier within one engine.
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Per-stage deadline. `None` defers to the engine default.
    fn deadline(&self) -> Option<Duration> {
        None
    }

    async fn execute(&self, input: &I) -> Result<VerificationStageResult, VerilensError>;
}

/// Lifecycle of a single run, as reported in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    /// Executing the stage at this index.
    Running(usize),
    Completed { success: bool },
}

/// Ordered, fail-fast executor over a set of stages.
pub struct VerificationEngine<I: Sync> {
    stages: Vec<Box<dyn VerificationStage<I>>>,
    default_deadline: Option<Duration>,
}

impl<I: Sync> Default for VerificationEngine<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Sync> VerificationEngine<I> {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            default_deadline: None,
        }
    }

    /// Engine with the default stage deadline taken from configuration.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self::new().with_default_deadline(config.stage_timeout_ms.map(Duration::from_millis))
    }

    pub fn with_default_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.default_deadline = deadline;
        self
    }

    /// Append a stage. Fails with a configuration error on a duplicate id.
    pub fn register_stage(
        &mut self,
        stage: impl VerificationStage<I> + 'static,
    ) -> Result<(), VerilensError> {
        self.register_boxed(Box::new(stage))
    }

    pub fn register_boxed(
        &mut self,
        stage: Box<dyn VerificationStage<I>>,
    ) -> Result<(), VerilensError> {
        if self.stages.iter().any(|s| s.id() == stage.id()) {
            return Err(VerilensError::Configuration(format!(
                "stage '{}' is already registered",
                stage.id()
            )));
        }
        debug!(stage = stage.id(), position = self.stages.len(), "stage registered");
        self.stages.push(stage);
        Ok(())
    }

    /// Stage ids in execution order.
    pub fn stage_ids(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order against `input`, stopping at the first
    /// failure.
    ///
    /// Never returns `Err`: stage errors and timeouts are recorded in the
    /// failing stage's result.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty, stages = self.stages.len()))]
    pub async fn run_verification(&self, input: &I) -> VerificationResult {
        let run_id = RunId::new();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        debug!(state = ?RunState::Idle, "run created");

        let mut results = Vec::with_capacity(self.stages.len());
        for (index, stage) in self.stages.iter().enumerate() {
            debug!(
                state = ?RunState::Running(index),
                stage = stage.id(),
                description = stage.description(),
                "stage starting"
            );
            let result = self.run_stage(stage.as_ref(), input).await;
            let failed = !result.success;
            results.push(result);
            if failed {
                warn!(stage = stage.id(), "stage failed, stopping run");
                break;
            }
        }

        let result = VerificationResult::new(run_id, results, self.stages.len());
        info!(
            state = ?RunState::Completed { success: result.success() },
            executed = result.stage_results().len(),
            "verification run finished"
        );
        result
    }

    async fn run_stage(&self, stage: &dyn VerificationStage<I>, input: &I) -> VerificationStageResult {
        let started = Instant::now();
        let outcome = match stage.deadline().or(self.default_deadline) {
            Some(limit) => match tokio::time::timeout(limit, stage.execute(input)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(VerilensError::StageTimeout {
                    stage: stage.id().to_owned(),
                    after_ms: millis(limit),
                }),
            },
            None => stage.execute(input).await,
        };

        let mut result = match outcome {
            Ok(mut result) => {
                if result.stage_id != stage.id() {
                    warn!(
                        registered = stage.id(),
                        reported = %result.stage_id,
                        "stage reported a different id; using the registered one"
                    );
                    result.stage_id = stage.id().to_owned();
                }
                result
            }
            Err(e) => {
                debug!(stage = stage.id(), error = %e, "stage returned an error");
                VerificationStageResult::failed(stage.id(), e.to_string()).with_error(normalize_error(&e))
            }
        };
        if result.description.is_none() && !stage.description().is_empty() {
            result.description = Some(stage.description().to_owned());
        }
        if result.duration_ms.is_none() {
            result.duration_ms = Some(millis(started.elapsed()));
        }
        result
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use verilens_core::error_codes;

    /// Stage that records how often it ran and returns a fixed outcome.
    struct Scripted {
        id: &'static str,
        succeed: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(id: &'static str, succeed: bool) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    id,
                    succeed,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl VerificationStage<u32> for Scripted {
        fn id(&self) -> &str {
            self.id
        }

        async fn execute(&self, input: &u32) -> Result<VerificationStageResult, VerilensError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(if self.succeed {
                VerificationStageResult::passed(self.id, format!("saw {input}"))
            } else {
                VerificationStageResult::failed(self.id, "scripted failure")
            })
        }
    }

    struct Erroring;

    #[async_trait]
    impl VerificationStage<u32> for Erroring {
        fn id(&self) -> &str {
            "erroring"
        }

        fn description(&self) -> &str {
            "always errors"
        }

        async fn execute(&self, _input: &u32) -> Result<VerificationStageResult, VerilensError> {
            Err(VerilensError::stage("erroring", "collaborator unavailable"))
        }
    }

    struct Sleepy {
        deadline: Option<Duration>,
    }

    #[async_trait]
    impl VerificationStage<u32> for Sleepy {
        fn id(&self) -> &str {
            "sleepy"
        }

        fn deadline(&self) -> Option<Duration> {
            self.deadline
        }

        async fn execute(&self, _input: &u32) -> Result<VerificationStageResult, VerilensError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(VerificationStageResult::passed("sleepy", "woke up"))
        }
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let (a, a_calls) = Scripted::new("a", true);
        let (b, b_calls) = Scripted::new("b", false);
        let (c, c_calls) = Scripted::new("c", true);

        let mut engine = VerificationEngine::new();
        engine.register_stage(a).unwrap();
        engine.register_stage(b).unwrap();
        engine.register_stage(c).unwrap();

        let result = engine.run_verification(&7).await;
        assert!(!result.success());
        assert_eq!(result.stage_results().len(), 2);
        assert_eq!(result.failed_stage().unwrap().stage_id, "b");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_stages_passing_is_success() {
        let mut engine = VerificationEngine::new();
        engine.register_stage(Scripted::new("a", true).0).unwrap();
        engine.register_stage(Scripted::new("b", true).0).unwrap();

        let result = engine.run_verification(&1).await;
        assert!(result.success());
        assert_eq!(result.stage_results()[0].summary, "saw 1");
        assert!(result.stage_results().iter().all(|s| s.duration_ms.is_some()));
        assert!(result.stage_results().iter().all(|s| s.description.is_none()));
    }

    #[tokio::test]
    async fn empty_engine_succeeds_vacuously() {
        let engine: VerificationEngine<u32> = VerificationEngine::new();
        let result = engine.run_verification(&0).await;
        assert!(result.success());
        assert!(result.stage_results().is_empty());
    }

    #[test]
    fn duplicate_stage_id_is_rejected() {
        let mut engine = VerificationEngine::new();
        engine.register_stage(Scripted::new("dup", true).0).unwrap();
        let err = engine.register_stage(Scripted::new("dup", false).0).unwrap_err();
        assert!(matches!(err, VerilensError::Configuration(_)));
        assert_eq!(engine.stage_ids(), vec!["dup"]);
    }

    #[tokio::test]
    async fn stage_error_becomes_failed_result() {
        let mut engine = VerificationEngine::new();
        engine.register_stage(Erroring).unwrap();
        engine.register_stage(Scripted::new("after", true).0).unwrap();

        let result = engine.run_verification(&0).await;
        assert!(!result.success());
        assert_eq!(result.stage_results().len(), 1);
        let failed = &result.stage_results()[0];
        assert_eq!(failed.stage_id, "erroring");
        assert_eq!(failed.description.as_deref(), Some("always errors"));
        let error = failed.error.as_ref().unwrap();
        assert_eq!(error.code, error_codes::STAGE_EXECUTION_ERROR);
        assert!(error.message.contains("collaborator unavailable"));
    }

    #[tokio::test]
    async fn stage_deadline_produces_timeout() {
        let mut engine = VerificationEngine::new();
        engine
            .register_stage(Sleepy {
                deadline: Some(Duration::from_millis(20)),
            })
            .unwrap();

        let result = engine.run_verification(&0).await;
        assert!(!result.success());
        let error = result.stage_results()[0].error.as_ref().unwrap();
        assert_eq!(error.code, error_codes::STAGE_TIMEOUT);
        assert!(error.retriable);
    }

    #[tokio::test]
    async fn engine_default_deadline_applies() {
        let mut engine = VerificationEngine::with_config(&EngineConfig {
            stage_timeout_ms: Some(20),
        });
        engine.register_stage(Sleepy { deadline: None }).unwrap();

        let result = engine.run_verification(&0).await;
        assert_eq!(
            result.stage_results()[0].error.as_ref().unwrap().code,
            error_codes::STAGE_TIMEOUT
        );
    }

    #[tokio::test]
    async fn runs_are_independent() {
        let mut engine = VerificationEngine::new();
        engine.register_stage(Scripted::new("a", true).0).unwrap();
        let engine = Arc::new(engine);

        let first = engine.run_verification(&1).await;
        let second = engine.run_verification(&2).await;
        assert_ne!(first.run_id(), second.run_id());
        assert_eq!(first.stage_results()[0].summary, "saw 1");
        assert_eq!(second.stage_results()[0].summary, "saw 2");
    }
}
