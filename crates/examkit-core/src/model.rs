//! Core data model types for examkit.
//!
//! Questions are immutable once built. A Test's editable metadata changes
//! only through [`crate::history::EditHistory`], and its results only through
//! the registry and the exam pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AssessmentError, EntityKind, Result, ValidationError};

/// Every question offers exactly this many options.
pub const OPTION_COUNT: usize = 4;

/// Maps question id to the selected option index.
pub type Answers = BTreeMap<String, usize>;

/// A single multiple-choice item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord")]
pub struct Question {
    id: String,
    test_id: String,
    text: String,
    options: [String; OPTION_COUNT],
    correct_option: usize,
}

impl Question {
    /// Build a question, checking the option count and the correct index.
    pub fn new(
        id: impl Into<String>,
        test_id: impl Into<String>,
        text: impl Into<String>,
        options: Vec<String>,
        correct_option: usize,
    ) -> Result<Self> {
        let found = options.len();
        let options: [String; OPTION_COUNT] =
            options
                .try_into()
                .map_err(|_| ValidationError::OptionCount {
                    expected: OPTION_COUNT,
                    found,
                })?;
        if correct_option >= OPTION_COUNT {
            return Err(ValidationError::CorrectOptionOutOfRange(correct_option).into());
        }
        Ok(Self {
            id: id.into(),
            test_id: test_id.into(),
            text: text.into(),
            options,
            correct_option,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    pub fn correct_option(&self) -> usize {
        self.correct_option
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Unchecked wire shape of a [`Question`].
#[derive(Deserialize)]
struct QuestionRecord {
    id: String,
    test_id: String,
    text: String,
    options: Vec<String>,
    correct_option: usize,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = crate::error::AssessmentError;

    fn try_from(r: QuestionRecord) -> Result<Self> {
        Question::new(r.id, r.test_id, r.text, r.options, r.correct_option)
    }
}

/// The editable scalar fields of a [`Test`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMetadata {
    pub title: String,
    /// Opaque start time as entered by the author.
    pub start_time: String,
    pub duration_minutes: i64,
}

impl TestMetadata {
    pub fn new(
        title: impl Into<String>,
        start_time: impl Into<String>,
        duration_minutes: i64,
    ) -> Result<Self> {
        if duration_minutes <= 0 {
            return Err(ValidationError::NonPositiveDuration(duration_minutes).into());
        }
        Ok(Self {
            title: title.into(),
            start_time: start_time.into(),
            duration_minutes,
        })
    }
}

/// A timed assessment belonging to a chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TestRecord")]
pub struct Test {
    id: String,
    /// External chapter reference; also the subject key for grade grouping.
    chapter_id: String,
    title: String,
    start_time: String,
    duration_minutes: i64,
    questions: Vec<Question>,
    results: Vec<TestResult>,
}

impl Test {
    /// Create a test with a freshly generated id.
    pub fn new(
        chapter_id: impl Into<String>,
        title: impl Into<String>,
        start_time: impl Into<String>,
        duration_minutes: i64,
    ) -> Result<Self> {
        Self::with_id(
            Uuid::new_v4().to_string(),
            chapter_id,
            title,
            start_time,
            duration_minutes,
        )
    }

    /// Create a test with a caller-chosen id.
    pub fn with_id(
        id: impl Into<String>,
        chapter_id: impl Into<String>,
        title: impl Into<String>,
        start_time: impl Into<String>,
        duration_minutes: i64,
    ) -> Result<Self> {
        let meta = TestMetadata::new(title, start_time, duration_minutes)?;
        Ok(Self {
            id: id.into(),
            chapter_id: chapter_id.into(),
            title: meta.title,
            start_time: meta.start_time,
            duration_minutes: meta.duration_minutes,
            questions: Vec::new(),
            results: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chapter_id(&self) -> &str {
        &self.chapter_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start_time(&self) -> &str {
        &self.start_time
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration_minutes
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Append a question. It must be owned by this test and carry a new id.
    pub fn add_question(&mut self, question: Question) -> Result<()> {
        if question.test_id() != self.id {
            return Err(ValidationError::ForeignQuestion {
                question_id: question.id().to_string(),
                owner: question.test_id().to_string(),
                test_id: self.id.clone(),
            }
            .into());
        }
        if self.question(question.id()).is_some() {
            return Err(ValidationError::DuplicateQuestion(question.id().to_string()).into());
        }
        self.questions.push(question);
        Ok(())
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// A test is gradable once it has at least one question.
    pub fn is_gradable(&self) -> bool {
        !self.questions.is_empty()
    }

    pub fn has_result_for(&self, student_id: &str) -> bool {
        self.results.iter().any(|r| r.student_id == student_id)
    }

    pub fn metadata(&self) -> TestMetadata {
        TestMetadata {
            title: self.title.clone(),
            start_time: self.start_time.clone(),
            duration_minutes: self.duration_minutes,
        }
    }

    pub(crate) fn apply_metadata(&mut self, meta: &TestMetadata) {
        self.title.clone_from(&meta.title);
        self.start_time.clone_from(&meta.start_time);
        self.duration_minutes = meta.duration_minutes;
    }

    pub(crate) fn results_mut(&mut self) -> &mut Vec<TestResult> {
        &mut self.results
    }

    /// Check that `result` belongs here: matching test id, answers keyed by
    /// this test's questions with options in range, and a percentage score.
    pub fn check_result(&self, result: &TestResult) -> Result<()> {
        if result.test_id != self.id {
            return Err(ValidationError::ForeignResult {
                test_id: self.id.clone(),
                found: result.test_id.clone(),
            }
            .into());
        }
        for (question_id, &option) in &result.answers {
            if self.question(question_id).is_none() {
                return Err(AssessmentError::not_found(EntityKind::Question, question_id.as_str()));
            }
            if option >= OPTION_COUNT {
                return Err(ValidationError::SelectedOptionOutOfRange(option).into());
            }
        }
        if !(0.0..=100.0).contains(&result.score) {
            return Err(ValidationError::ScoreOutOfRange(result.score).into());
        }
        Ok(())
    }
}

/// Unvalidated wire form of a [`Test`].
#[derive(Deserialize)]
struct TestRecord {
    id: String,
    chapter_id: String,
    title: String,
    start_time: String,
    duration_minutes: i64,
    #[serde(default)]
    questions: Vec<Question>,
    #[serde(default)]
    results: Vec<TestResult>,
}

impl TryFrom<TestRecord> for Test {
    type Error = AssessmentError;

    fn try_from(r: TestRecord) -> Result<Self> {
        let mut test = Test::with_id(r.id, r.chapter_id, r.title, r.start_time, r.duration_minutes)?;
        for question in r.questions {
            test.add_question(question)?;
        }
        for result in &r.results {
            test.check_result(result)?;
        }
        test.results = r.results;
        Ok(test)
    }
}

/// The graded record of one student's attempt at one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: String,
    pub student_id: String,
    /// Keys are a subset of the owning test's question ids.
    pub answers: Answers,
    /// Percentage in `0.0..=100.0`, stored unrounded.
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

/// A registered person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn student(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: Role::Student {
                group_ids: Vec::new(),
            },
        }
    }

    pub fn teacher(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: Role::Teacher {
                subject_ids: Vec::new(),
            },
        }
    }

    pub fn is_student(&self) -> bool {
        matches!(self.role, Role::Student { .. })
    }
}

/// Closed set of roles with their role-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Role {
    Student {
        #[serde(default)]
        group_ids: Vec<String>,
    },
    Teacher {
        #[serde(default)]
        subject_ids: Vec<String>,
    },
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student { .. } => write!(f, "student"),
            Role::Teacher { .. } => write!(f, "teacher"),
        }
    }
}
