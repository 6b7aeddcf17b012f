//! Fixed four-step exam processing.
//!
//! [`ExamPipeline::run`] always executes prepare, conduct, grade and finalize
//! in that order. The steps run against a working copy of the test; the
//! caller's test is only updated once every step has succeeded, so a failed
//! run leaves nothing half-applied.
//!
//! Grading recomputes stored scores with the current rule. Re-running with
//! the same rule and answers reproduces the same scores, but switching rules
//! rewrites historical scores. Every rewritten score is listed in
//! [`PipelineReport::rescored`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AssessmentError, Result, ValidationError};
use crate::model::Test;
use crate::rules::{format_score, score_answers, GradingRule};
use crate::traits::{test_resource, Store};

/// Scores closer than this are treated as unchanged.
const SCORE_EPSILON: f64 = 1e-9;

/// Non-fatal findings from a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// The test has no submissions yet.
    NoSubmissions { test_id: String },
}

/// A stored score that grading changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub student_id: String,
    pub previous: f64,
    pub current: f64,
}

impl ScoreChange {
    pub fn delta(&self) -> f64 {
        self.current - self.previous
    }
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub test_id: String,
    pub title: String,
    pub question_count: usize,
    pub submission_count: usize,
    /// Mean of all stored scores after grading, `0.0` with no submissions.
    pub mean_score: f64,
    pub warnings: Vec<PipelineWarning>,
    pub rescored: Vec<ScoreChange>,
}

/// The four steps of exam processing.
pub trait ExamSteps {
    /// Reject tests that cannot be processed.
    fn prepare(&self, test: &Test, report: &mut PipelineReport) -> Result<()>;

    /// Inspect submissions. Findings go into the report as warnings.
    fn conduct(&self, test: &Test, report: &mut PipelineReport) -> Result<()>;

    /// Recompute every stored score.
    fn grade(&self, test: &mut Test, report: &mut PipelineReport) -> Result<()>;

    /// Compute the mean and hand the test to persistence.
    fn finalize(&self, test: &Test, report: &mut PipelineReport) -> Result<()>;
}

/// Runs [`ExamSteps`] in their fixed order.
pub struct ExamPipeline<S: ExamSteps = StandardSteps> {
    steps: S,
}

impl ExamPipeline<StandardSteps> {
    /// Standard steps grading with `rule`, without persistence.
    pub fn standard(rule: Box<dyn GradingRule>) -> Self {
        Self::new(StandardSteps::new(rule))
    }
}

impl<S: ExamSteps> ExamPipeline<S> {
    pub fn new(steps: S) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &S {
        &self.steps
    }

    /// Process `test`. The first failing step aborts the run and `test` is
    /// left untouched.
    pub fn run(&self, test: &mut Test) -> Result<PipelineReport> {
        let mut working = test.clone();
        let mut report = PipelineReport {
            test_id: working.id().to_string(),
            title: working.title().to_string(),
            ..Default::default()
        };

        self.steps.prepare(&working, &mut report)?;
        self.steps.conduct(&working, &mut report)?;
        self.steps.grade(&mut working, &mut report)?;
        self.steps.finalize(&working, &mut report)?;

        *test = working;
        Ok(report)
    }
}

/// The stock steps: reject empty tests, warn on no submissions, regrade with
/// a [`GradingRule`], and save through an optional [`Store`].
pub struct StandardSteps {
    rule: Box<dyn GradingRule>,
    store: Option<Arc<dyn Store>>,
}

impl StandardSteps {
    pub fn new(rule: Box<dyn GradingRule>) -> Self {
        Self { rule, store: None }
    }

    /// Save finalized tests to `store` as `test_<id>`.
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Swap the active rule. Later runs rescore with it.
    pub fn set_rule(&mut self, rule: Box<dyn GradingRule>) {
        self.rule = rule;
    }
}

impl ExamSteps for StandardSteps {
    fn prepare(&self, test: &Test, report: &mut PipelineReport) -> Result<()> {
        if !test.is_gradable() {
            return Err(ValidationError::EmptyTest {
                test_id: test.id().to_string(),
            }
            .into());
        }
        report.question_count = test.questions().len();
        tracing::info!(
            "exam '{}' prepared with {} questions",
            test.title(),
            report.question_count
        );
        Ok(())
    }

    fn conduct(&self, test: &Test, report: &mut PipelineReport) -> Result<()> {
        report.submission_count = test.results().len();
        if report.submission_count == 0 {
            tracing::warn!("exam '{}' has no submissions yet", test.title());
            report.warnings.push(PipelineWarning::NoSubmissions {
                test_id: test.id().to_string(),
            });
        } else {
            tracing::info!(
                "exam '{}' conducted with {} submissions",
                test.title(),
                report.submission_count
            );
        }
        Ok(())
    }

    fn grade(&self, test: &mut Test, report: &mut PipelineReport) -> Result<()> {
        let questions = test.questions().to_vec();
        for result in test.results_mut() {
            let previous = result.score;
            let current = score_answers(self.rule.as_ref(), &questions, &result.answers);
            result.score = current;
            if (current - previous).abs() > SCORE_EPSILON {
                report.rescored.push(ScoreChange {
                    student_id: result.student_id.clone(),
                    previous,
                    current,
                });
            }
            tracing::info!(
                "graded submission for student {}: {}%",
                result.student_id,
                format_score(current)
            );
        }
        Ok(())
    }

    fn finalize(&self, test: &Test, report: &mut PipelineReport) -> Result<()> {
        let results = test.results();
        report.mean_score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64
        };
        tracing::info!(
            "finalized exam '{}', overall average score {}%",
            test.title(),
            format_score(report.mean_score)
        );

        if let Some(store) = &self.store {
            store
                .save_tests(&test_resource(test.id()), std::slice::from_ref(test))
                .map_err(AssessmentError::Store)?;
        }
        Ok(())
    }
}
