//! Grade aggregation across tests.
//!
//! Visitors walk tests and accumulate; grouping strategies bucket a flat list
//! of results. Nothing here mutates its input.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Test, TestResult};

/// Visitor over tests.
pub trait TestVisitor {
    fn visit(&mut self, test: &Test);
}

impl Test {
    pub fn accept(&self, visitor: &mut dyn TestVisitor) {
        visitor.visit(self);
    }
}

/// Accumulates one student's scores across every visited test.
#[derive(Debug, Clone)]
pub struct StudentGradeVisitor {
    student_id: String,
    total: f64,
    count: usize,
}

impl StudentGradeVisitor {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            total: 0.0,
            count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean score, `0.0` when nothing matched.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

impl TestVisitor for StudentGradeVisitor {
    fn visit(&mut self, test: &Test) {
        for result in test.results() {
            if result.student_id == self.student_id {
                self.total += result.score;
                self.count += 1;
            }
        }
    }
}

/// Average score of `student_id` over all `tests`.
pub fn average_for_student(tests: &[Test], student_id: &str) -> f64 {
    let mut visitor = StudentGradeVisitor::new(student_id);
    for test in tests {
        test.accept(&mut visitor);
    }
    visitor.average()
}

/// Strategy deciding which group a result belongs to.
pub trait GradeGrouping {
    /// Group key for `result`, or `None` to leave it out.
    fn key_for(&self, result: &TestResult) -> Option<String>;
}

/// Groups by student id.
pub struct ByStudent;

impl GradeGrouping for ByStudent {
    fn key_for(&self, result: &TestResult) -> Option<String> {
        Some(result.student_id.clone())
    }
}

/// Groups by the chapter of the test each result belongs to.
///
/// Results whose test is not among the known tests are left out.
pub struct BySubject<'a> {
    chapters: HashMap<&'a str, &'a str>,
}

impl<'a> BySubject<'a> {
    pub fn new(tests: &'a [Test]) -> Self {
        Self {
            chapters: tests.iter().map(|t| (t.id(), t.chapter_id())).collect(),
        }
    }
}

impl GradeGrouping for BySubject<'_> {
    fn key_for(&self, result: &TestResult) -> Option<String> {
        let chapter = self.chapters.get(result.test_id.as_str());
        if chapter.is_none() {
            tracing::warn!(
                "result for unknown test '{}' left out of subject grouping",
                result.test_id
            );
        }
        chapter.map(|c| c.to_string())
    }
}

/// Bucket `results` with `strategy`, keeping input order within a group.
pub fn group_results(
    results: &[TestResult],
    strategy: &dyn GradeGrouping,
) -> BTreeMap<String, Vec<TestResult>> {
    let mut groups: BTreeMap<String, Vec<TestResult>> = BTreeMap::new();
    for result in results {
        if let Some(key) = strategy.key_for(result) {
            groups.entry(key).or_default().push(result.clone());
        }
    }
    groups
}

/// Built-in grouping modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingMode {
    Student,
    Subject,
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingMode::Student => write!(f, "student"),
            GroupingMode::Subject => write!(f, "subject"),
        }
    }
}

impl FromStr for GroupingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(GroupingMode::Student),
            "subject" | "chapter" => Ok(GroupingMode::Subject),
            other => Err(format!("unknown grouping mode: {other}")),
        }
    }
}

/// Group `results` by `mode`. `tests` resolves chapters for subject mode.
pub fn group_by(
    results: &[TestResult],
    mode: GroupingMode,
    tests: &[Test],
) -> BTreeMap<String, Vec<TestResult>> {
    match mode {
        GroupingMode::Student => group_results(results, &ByStudent),
        GroupingMode::Subject => group_results(results, &BySubject::new(tests)),
    }
}

/// Summary statistics for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl GradeSummary {
    /// `None` for an empty slice.
    pub fn from_results(results: &[TestResult]) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let scores = results.iter().map(|r| r.score);
        let min = scores.clone().fold(f64::INFINITY, f64::min);
        let max = scores.clone().fold(f64::NEG_INFINITY, f64::max);
        let mean = scores.sum::<f64>() / results.len() as f64;
        Some(Self {
            count: results.len(),
            mean,
            min,
            max,
        })
    }
}

/// Summarize every group.
pub fn summarize(groups: &BTreeMap<String, Vec<TestResult>>) -> BTreeMap<String, GradeSummary> {
    groups
        .iter()
        .filter_map(|(key, results)| GradeSummary::from_results(results).map(|s| (key.clone(), s)))
        .collect()
}
