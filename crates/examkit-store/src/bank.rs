//! TOML test-bank parser.
//!
//! Authors write tests and their questions in a TOML file. Parsing builds
//! validated core entities, so a bank that loads is already well-formed at
//! the entity level; [`validate_bank`] reports softer issues.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use examkit_core::model::{Question, Test};

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    #[serde(default)]
    tests: Vec<TomlTest>,
}

#[derive(Debug, Deserialize)]
struct TomlTest {
    id: String,
    chapter_id: String,
    title: String,
    #[serde(default)]
    start_time: String,
    #[serde(default = "default_duration")]
    duration_minutes: i64,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

fn default_duration() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    text: String,
    options: Vec<String>,
    correct: usize,
}

/// Parse a single TOML bank file.
pub fn parse_bank(path: &Path) -> Result<Vec<Test>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read test bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into tests (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<Vec<Test>> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    parsed
        .tests
        .into_iter()
        .map(|t| {
            let mut test = Test::with_id(
                &t.id,
                t.chapter_id,
                t.title,
                t.start_time,
                t.duration_minutes,
            )
            .with_context(|| format!("invalid test '{}'", t.id))?;

            for q in t.questions {
                let question = Question::new(&q.id, &t.id, q.text, q.options, q.correct)
                    .with_context(|| format!("invalid question '{}' in test '{}'", q.id, t.id))?;
                test.add_question(question)
                    .with_context(|| format!("cannot add question '{}' to '{}'", q.id, t.id))?;
            }
            Ok(test)
        })
        .collect()
}

/// Recursively load all `.toml` bank files from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<Test>> {
    let mut tests = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            tests.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(parsed) => tests.extend(parsed),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(tests)
}

/// Load a bank file, or every bank file under a directory.
pub fn load_bank(path: &Path) -> Result<Vec<Test>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        parse_bank(path)
    }
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct BankWarning {
    /// The test ID (if applicable).
    pub test_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate parsed tests for issues that do not block loading.
pub fn validate_bank(tests: &[Test]) -> Vec<BankWarning> {
    let mut warnings = Vec::new();

    let mut seen_tests = HashSet::new();
    for test in tests {
        if !seen_tests.insert(test.id()) {
            warnings.push(BankWarning {
                test_id: Some(test.id().to_string()),
                message: format!("duplicate test ID: {}", test.id()),
            });
        }
    }

    // Question ids must be unique across the bank, not just per test
    let mut seen_questions = HashSet::new();
    for test in tests {
        for q in test.questions() {
            if !seen_questions.insert(q.id()) {
                warnings.push(BankWarning {
                    test_id: Some(test.id().to_string()),
                    message: format!("question ID '{}' is used more than once", q.id()),
                });
            }
        }
    }

    for test in tests {
        if !test.is_gradable() {
            warnings.push(BankWarning {
                test_id: Some(test.id().to_string()),
                message: "test has no questions and cannot be graded".into(),
            });
        }
    }

    for test in tests {
        for q in test.questions() {
            let distinct: HashSet<&str> = q.options().iter().map(|o| o.trim()).collect();
            if distinct.len() < q.options().len() {
                warnings.push(BankWarning {
                    test_id: Some(test.id().to_string()),
                    message: format!("question '{}' repeats an option", q.id()),
                });
            }
        }
    }

    warnings
}
