//! Assessment error types.
//!
//! Every failure in the core is a reported value. Callers classify errors with
//! the `is_*` helpers (or by matching) instead of inspecting message strings.

use std::fmt;

use thiserror::Error;

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, AssessmentError>;

/// Errors produced by assessment operations.
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// Input or entity data violates an invariant.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The operation is not allowed in the current session state.
    #[error("invalid state: {0}")]
    State(#[from] StateError),

    /// An operation referenced an unknown entity.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// The Store collaborator failed.
    #[error("store error: {0:#}")]
    Store(anyhow::Error),
}

impl AssessmentError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        AssessmentError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns `true` for validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, AssessmentError::Validation(_))
    }

    /// Returns `true` for state-machine violations.
    pub fn is_state(&self) -> bool {
        matches!(self, AssessmentError::State(_))
    }

    /// Returns `true` when an id could not be resolved.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssessmentError::NotFound { .. })
    }
}

/// Invariant violations on entities and pipeline input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("test '{test_id}' has no questions")]
    EmptyTest { test_id: String },

    #[error("duration must be positive, got {0} minutes")]
    NonPositiveDuration(i64),

    #[error("a question needs exactly {expected} options, got {found}")]
    OptionCount { expected: usize, found: usize },

    #[error("correct option index {0} is outside 0..=3")]
    CorrectOptionOutOfRange(usize),

    #[error("selected option index {0} is outside 0..=3")]
    SelectedOptionOutOfRange(usize),

    #[error("question '{question_id}' belongs to test '{owner}', not '{test_id}'")]
    ForeignQuestion {
        question_id: String,
        owner: String,
        test_id: String,
    },

    #[error("duplicate question id '{0}'")]
    DuplicateQuestion(String),

    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("result for test '{found}' filed under test '{test_id}'")]
    ForeignResult { test_id: String, found: String },

    #[error("score {0} is outside 0..=100")]
    ScoreOutOfRange(f64),
}

/// Session transitions that are not allowed from the current state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("session is already completed")]
    Completed,

    #[error("already at the last question")]
    NoNextQuestion,

    #[error("already at the first question")]
    NoPreviousQuestion,

    #[error("submit requires the last question (at {index} of {last})")]
    NotAtLastQuestion { index: usize, last: usize },

    #[error("{count} question(s) unanswered; confirm to submit anyway")]
    UnansweredQuestions { count: usize },
}

/// The kind of entity an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Test,
    Question,
    Student,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Test => write!(f, "test"),
            EntityKind::Question => write!(f, "question"),
            EntityKind::Student => write!(f, "student"),
            EntityKind::User => write!(f, "user"),
        }
    }
}
