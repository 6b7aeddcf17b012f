//! Pluggable question scoring.
//!
//! A [`GradingRule`] maps a question and a selected option to a contribution
//! in `0.0..=1.0`. The stock rule is a [`RuleChain`]: an ordered list of
//! [`ScoringStage`]s where each stage sees the contribution produced so far.
//!
//! The adjacency stage treats option order as meaningful. It is applied to
//! every question regardless of whether its options form an ordinal scale.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Answers, Question};

/// Credit awarded by [`ScoringStage::OrderedAdjacency`].
pub const ADJACENT_CREDIT: f64 = 0.5;

/// Trait for question-level scoring rules.
pub trait GradingRule: Send + Sync {
    /// Contribution in `0.0..=1.0` for `selected` on `question`.
    fn evaluate(&self, question: &Question, selected: usize) -> f64;
}

/// One step of a [`RuleChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStage {
    /// Full credit for the correct option, nothing otherwise. Overrides
    /// whatever earlier stages produced.
    Exact,
    /// When the prior contribution is zero and the selection sits right next
    /// to the correct option, award [`ADJACENT_CREDIT`]. Otherwise pass the
    /// prior contribution through.
    OrderedAdjacency,
}

impl ScoringStage {
    fn apply(self, prior: f64, question: &Question, selected: usize) -> f64 {
        match self {
            ScoringStage::Exact => {
                if selected == question.correct_option() {
                    1.0
                } else {
                    0.0
                }
            }
            ScoringStage::OrderedAdjacency => {
                if prior == 0.0 && selected.abs_diff(question.correct_option()) == 1 {
                    ADJACENT_CREDIT
                } else {
                    prior
                }
            }
        }
    }
}

impl fmt::Display for ScoringStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringStage::Exact => write!(f, "exact"),
            ScoringStage::OrderedAdjacency => write!(f, "ordered_adjacency"),
        }
    }
}

impl FromStr for ScoringStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "exact" | "basic" => Ok(ScoringStage::Exact),
            "ordered_adjacency" | "adjacency" => Ok(ScoringStage::OrderedAdjacency),
            other => Err(format!("unknown scoring stage: {other}")),
        }
    }
}

/// Ordered list of scoring stages, folded left to right from `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleChain {
    stages: Vec<ScoringStage>,
}

impl RuleChain {
    pub fn new(stages: Vec<ScoringStage>) -> Self {
        Self { stages }
    }

    /// Exact-match scoring only.
    pub fn basic() -> Self {
        Self::new(vec![ScoringStage::Exact])
    }

    /// Append a stage, returning the extended chain.
    pub fn then(mut self, stage: ScoringStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[ScoringStage] {
        &self.stages
    }
}

/// Exact match followed by adjacency partial credit.
impl Default for RuleChain {
    fn default() -> Self {
        Self::basic().then(ScoringStage::OrderedAdjacency)
    }
}

impl GradingRule for RuleChain {
    fn evaluate(&self, question: &Question, selected: usize) -> f64 {
        self.stages
            .iter()
            .fold(0.0, |prior, stage| stage.apply(prior, question, selected))
    }
}

/// Percentage score of `answers` over `questions`.
///
/// Unanswered questions contribute nothing. Returns `0.0` when there are no
/// questions. The result is not rounded.
pub fn score_answers(rule: &dyn GradingRule, questions: &[Question], answers: &Answers) -> f64 {
    if questions.is_empty() {
        return 0.0;
    }
    let total: f64 = questions
        .iter()
        .filter_map(|q| answers.get(q.id()).map(|&opt| rule.evaluate(q, opt)))
        .sum();
    total / questions.len() as f64 * 100.0
}

/// Render a score with two decimals for display.
pub fn format_score(score: f64) -> String {
    format!("{score:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, correct: usize) -> Question {
        Question::new(
            id,
            "t1",
            "Pick one",
            vec!["1".into(), "2".into(), "3".into(), "4".into()],
            correct,
        )
        .unwrap()
    }

    #[test]
    fn exact_stage_full_or_nothing() {
        let rule = RuleChain::basic();
        for correct in 0..4 {
            let q = question("q", correct);
            for opt in 0..4 {
                let expected = if opt == correct { 1.0 } else { 0.0 };
                assert_eq!(rule.evaluate(&q, opt), expected, "correct={correct} opt={opt}");
            }
        }
    }

    #[test]
    fn adjacency_gives_half_credit_next_to_correct() {
        let rule = RuleChain::default();
        let q = question("q", 2);
        assert_eq!(rule.evaluate(&q, 2), 1.0);
        assert_eq!(rule.evaluate(&q, 1), 0.5);
        assert_eq!(rule.evaluate(&q, 3), 0.5);
        assert_eq!(rule.evaluate(&q, 0), 0.0);
    }

    #[test]
    fn adjacency_matches_wrapped_rule_when_not_adjacent() {
        let wrapped = RuleChain::basic();
        let chain = RuleChain::default();
        for correct in 0..4 {
            let q = question("q", correct);
            for opt in 0..4 {
                if opt == correct || opt.abs_diff(correct) != 1 {
                    assert_eq!(chain.evaluate(&q, opt), wrapped.evaluate(&q, opt));
                } else {
                    assert_eq!(chain.evaluate(&q, opt), 0.5);
                }
            }
        }
    }

    #[test]
    fn adjacency_alone_only_awards_partial_credit() {
        let chain = RuleChain::new(vec![ScoringStage::OrderedAdjacency]);
        let q = question("q", 0);
        assert_eq!(chain.evaluate(&q, 0), 0.0);
        assert_eq!(chain.evaluate(&q, 1), 0.5);
    }

    #[test]
    fn empty_chain_scores_zero() {
        let chain = RuleChain::new(vec![]);
        assert_eq!(chain.evaluate(&question("q", 0), 0), 0.0);
    }

    #[test]
    fn three_of_four_correct_is_75() {
        let questions: Vec<Question> = (0..4).map(|i| question(&format!("q{i}"), 0)).collect();
        let mut answers = Answers::new();
        answers.insert("q0".into(), 0);
        answers.insert("q1".into(), 3);
        answers.insert("q2".into(), 0);
        answers.insert("q3".into(), 0);
        let score = score_answers(&RuleChain::default(), &questions, &answers);
        assert_eq!(score, 75.0);
    }

    #[test]
    fn unanswered_questions_count_as_zero() {
        let questions: Vec<Question> = (0..3).map(|i| question(&format!("q{i}"), 1)).collect();
        let mut answers = Answers::new();
        answers.insert("q0".into(), 1);
        answers.insert("q1".into(), 2);
        let score = score_answers(&RuleChain::default(), &questions, &answers);
        assert!((score - 50.0).abs() < 1e-9, "got {score}");
        assert_eq!(format_score(100.0 / 3.0), "33.33");
    }

    #[test]
    fn no_questions_scores_zero() {
        assert_eq!(score_answers(&RuleChain::default(), &[], &Answers::new()), 0.0);
    }

    #[test]
    fn stage_parse_and_serde() {
        assert_eq!("basic".parse::<ScoringStage>().unwrap(), ScoringStage::Exact);
        assert_eq!(
            "ordered-adjacency".parse::<ScoringStage>().unwrap(),
            ScoringStage::OrderedAdjacency
        );
        assert!("curve".parse::<ScoringStage>().is_err());

        let chain: RuleChain = serde_json::from_str(r#"["exact","ordered_adjacency"]"#).unwrap();
        assert_eq!(chain, RuleChain::default());
    }
}
