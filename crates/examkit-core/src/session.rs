//! Test-taking state machine.
//!
//! A session walks a student through a test's questions one at a time and
//! ends in a single [`TestResult`]. States are `Presenting(index)` and the
//! terminal `Completed`. Dropping a session before submitting abandons it
//! without side effects.
//!
//! Progress is published on one broadcast channel. Callers either hold a
//! receiver from [`TestSession::subscribe`] and poll it with [`drain_events`],
//! or ignore events entirely. The first subscriber also sees `Started`.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::error::{AssessmentError, EntityKind, Result, StateError, ValidationError};
use crate::model::{Answers, Question, Test, TestResult, OPTION_COUNT};
use crate::rules::{score_answers, GradingRule};

/// Smallest event buffer per session.
const MIN_EVENT_CAPACITY: usize = 64;

/// Buffered events per question: an answer and a move, with room for a
/// change of mind.
const EVENTS_PER_QUESTION: usize = 4;

/// Where a session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Presenting(usize),
    Completed,
}

/// Something that happened in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        test_id: String,
        question_count: usize,
    },
    Answered {
        question_id: String,
        option: usize,
    },
    Moved {
        index: usize,
    },
    TimeExpired {
        test_id: String,
    },
    Submitted {
        student_id: String,
        score: f64,
    },
}

/// Submission overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitOptions {
    /// The student confirmed submitting with unanswered questions. While
    /// some question lacks an answer this also allows submitting before the
    /// last question; a fully answered session must still reach it.
    pub allow_unanswered: bool,
}

/// Take every event currently buffered on `rx`, oldest first.
///
/// Events a slow receiver lost to buffer overflow are skipped with a warning
/// instead of ending the drain.
pub fn drain_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!("session event receiver lagged, {skipped} events lost");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    events
}

/// The question currently on screen, with any stored selection.
#[derive(Debug, Clone, Copy)]
pub struct QuestionView<'a> {
    pub index: usize,
    pub question: &'a Question,
    pub selected: Option<usize>,
}

/// An in-progress attempt at one test.
pub struct TestSession {
    test: Test,
    rule: Box<dyn GradingRule>,
    state: SessionState,
    answers: Answers,
    started_at: DateTime<Utc>,
    expired: bool,
    events: broadcast::Sender<SessionEvent>,
    /// Receiver created with the channel, holding `Started` until the first
    /// subscriber claims it.
    first_receiver: Option<broadcast::Receiver<SessionEvent>>,
}

impl TestSession {
    /// Open a session at the first question with no answers.
    pub fn start(test: Test, rule: Box<dyn GradingRule>) -> Result<Self> {
        Self::start_at(test, rule, Utc::now())
    }

    /// Like [`TestSession::start`] with an explicit start instant.
    pub fn start_at(test: Test, rule: Box<dyn GradingRule>, now: DateTime<Utc>) -> Result<Self> {
        if !test.is_gradable() {
            return Err(ValidationError::EmptyTest {
                test_id: test.id().to_string(),
            }
            .into());
        }
        let capacity = test
            .questions()
            .len()
            .saturating_mul(EVENTS_PER_QUESTION)
            .saturating_add(3)
            .max(MIN_EVENT_CAPACITY);
        let (events, first_receiver) = broadcast::channel(capacity);
        let session = Self {
            test,
            rule,
            state: SessionState::Presenting(0),
            answers: Answers::new(),
            started_at: now,
            expired: false,
            events,
            first_receiver: Some(first_receiver),
        };
        tracing::debug!("session started for test '{}'", session.test.id());
        session.emit(SessionEvent::Started {
            test_id: session.test.id().to_string(),
            question_count: session.test.questions().len(),
        });
        Ok(session)
    }

    /// Receive events. The first call returns a receiver that starts with
    /// `Started`; later calls see events emitted from then on.
    pub fn subscribe(&mut self) -> broadcast::Receiver<SessionEvent> {
        self.first_receiver
            .take()
            .unwrap_or_else(|| self.events.subscribe())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Instant after which the test's time allowance is used up. `None`
    /// when the allowance runs past the representable calendar.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_minutes(self.test.duration_minutes())
            .and_then(|allowance| self.started_at.checked_add_signed(allowance))
    }

    /// Emit `TimeExpired` once when `now` is past the deadline.
    ///
    /// Returns whether the deadline has passed. Expiry never submits on its
    /// own; the caller decides what to do.
    pub fn check_deadline(&mut self, now: DateTime<Utc>) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {}
            _ => return false,
        }
        if !self.expired && !self.is_completed() {
            self.expired = true;
            self.emit(SessionEvent::TimeExpired {
                test_id: self.test.id().to_string(),
            });
        }
        true
    }

    /// The question being presented.
    pub fn current(&self) -> Result<QuestionView<'_>> {
        let index = self.presenting()?;
        Ok(self.view(index))
    }

    /// Store or overwrite the answer for `question_id`. Does not move.
    pub fn answer(&mut self, question_id: &str, option: usize) -> Result<()> {
        self.presenting()?;
        if self.test.question(question_id).is_none() {
            return Err(AssessmentError::not_found(EntityKind::Question, question_id));
        }
        if option >= OPTION_COUNT {
            return Err(ValidationError::SelectedOptionOutOfRange(option).into());
        }
        self.answers.insert(question_id.to_string(), option);
        self.emit(SessionEvent::Answered {
            question_id: question_id.to_string(),
            option,
        });
        Ok(())
    }

    /// Answer the question being presented.
    pub fn select(&mut self, option: usize) -> Result<()> {
        let index = self.presenting()?;
        let id = self.test.questions()[index].id().to_string();
        self.answer(&id, option)
    }

    /// Move to the following question.
    pub fn next(&mut self) -> Result<QuestionView<'_>> {
        let index = self.presenting()?;
        if index >= self.last_index() {
            return Err(StateError::NoNextQuestion.into());
        }
        self.move_to(index + 1)
    }

    /// Move back to the preceding question.
    pub fn previous(&mut self) -> Result<QuestionView<'_>> {
        let index = self.presenting()?;
        if index == 0 {
            return Err(StateError::NoPreviousQuestion.into());
        }
        self.move_to(index - 1)
    }

    /// Ids of questions without a stored answer, in test order.
    pub fn unanswered(&self) -> Vec<&str> {
        self.test
            .questions()
            .iter()
            .filter(|q| !self.answers.contains_key(q.id()))
            .map(|q| q.id())
            .collect()
    }

    /// Grade the attempt and complete the session.
    ///
    /// Requires the last question to be presented and every question to be
    /// answered. `options.allow_unanswered` waives both only while some
    /// question is unanswered. A completed session never produces a second
    /// result.
    pub fn submit(&mut self, student_id: &str, options: SubmitOptions) -> Result<TestResult> {
        let index = self.presenting()?;
        let last = self.last_index();
        let count = self.unanswered().len();
        let confirmed = options.allow_unanswered && count > 0;
        if index != last && !confirmed {
            return Err(StateError::NotAtLastQuestion { index, last }.into());
        }
        if count > 0 && !options.allow_unanswered {
            return Err(StateError::UnansweredQuestions { count }.into());
        }

        let score = score_answers(self.rule.as_ref(), self.test.questions(), &self.answers);
        let result = TestResult {
            test_id: self.test.id().to_string(),
            student_id: student_id.to_string(),
            answers: std::mem::take(&mut self.answers),
            score,
            submitted_at: Utc::now(),
        };
        self.state = SessionState::Completed;
        tracing::debug!(
            "student '{}' submitted test '{}' with score {:.2}",
            student_id,
            self.test.id(),
            score
        );
        self.emit(SessionEvent::Submitted {
            student_id: student_id.to_string(),
            score,
        });
        Ok(result)
    }

    fn presenting(&self) -> Result<usize> {
        match self.state {
            SessionState::Presenting(index) => Ok(index),
            SessionState::Completed => Err(StateError::Completed.into()),
        }
    }

    fn last_index(&self) -> usize {
        self.test.questions().len() - 1
    }

    fn move_to(&mut self, index: usize) -> Result<QuestionView<'_>> {
        self.state = SessionState::Presenting(index);
        self.emit(SessionEvent::Moved { index });
        Ok(self.view(index))
    }

    fn view(&self, index: usize) -> QuestionView<'_> {
        let question = &self.test.questions()[index];
        QuestionView {
            index,
            question,
            selected: self.answers.get(question.id()).copied(),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleChain;

    fn make_test(n: usize) -> Test {
        let mut test = Test::with_id("t1", "ch1", "Quiz", "09:00", 30).unwrap();
        for i in 0..n {
            test.add_question(
                Question::new(
                    format!("q{i}"),
                    "t1",
                    format!("Question {i}"),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    0,
                )
                .unwrap(),
            )
            .unwrap();
        }
        test
    }

    fn start(n: usize) -> TestSession {
        TestSession::start(make_test(n), Box::new(RuleChain::default())).unwrap()
    }

    #[test]
    fn starts_presenting_first_question() {
        let session = start(3);
        assert_eq!(session.state(), SessionState::Presenting(0));
        assert!(session.answers().is_empty());
        assert_eq!(session.current().unwrap().question.id(), "q0");
    }

    #[test]
    fn empty_test_cannot_start() {
        let err = TestSession::start(make_test(0), Box::new(RuleChain::default()))
            .err()
            .unwrap();
        assert!(err.is_validation());
    }

    #[test]
    fn answer_overwrites_and_does_not_advance() {
        let mut session = start(2);
        session.answer("q1", 2).unwrap();
        session.answer("q1", 3).unwrap();
        assert_eq!(session.state(), SessionState::Presenting(0));
        assert_eq!(session.answers().get("q1"), Some(&3));
    }

    #[test]
    fn answer_rejects_unknown_question_and_bad_option() {
        let mut session = start(2);
        assert!(session.answer("nope", 0).unwrap_err().is_not_found());
        assert!(session.answer("q0", 4).unwrap_err().is_validation());
    }

    #[test]
    fn navigation_restores_stored_answers() {
        let mut session = start(3);
        session.select(2).unwrap();
        assert_eq!(session.next().unwrap().selected, None);
        let back = session.previous().unwrap();
        assert_eq!(back.index, 0);
        assert_eq!(back.selected, Some(2));
    }

    #[test]
    fn next_stops_at_last_question() {
        let mut session = start(2);
        session.next().unwrap();
        let err = session.next().unwrap_err();
        assert!(matches!(
            err,
            AssessmentError::State(StateError::NoNextQuestion)
        ));
        assert_eq!(session.state(), SessionState::Presenting(1));
    }

    #[test]
    fn submit_requires_last_question() {
        let mut session = start(2);
        session.select(0).unwrap();
        let err = session.submit("s1", SubmitOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            AssessmentError::State(StateError::NotAtLastQuestion { index: 0, last: 1 })
        ));
    }

    #[test]
    fn submit_with_unanswered_needs_confirmation() {
        let mut session = start(2);
        session.next().unwrap();
        session.select(0).unwrap();
        let err = session.submit("s1", SubmitOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            AssessmentError::State(StateError::UnansweredQuestions { count: 1 })
        ));

        let result = session
            .submit(
                "s1",
                SubmitOptions {
                    allow_unanswered: true,
                },
            )
            .unwrap();
        assert_eq!(result.score, 50.0);
    }

    #[test]
    fn submit_twice_is_a_state_error() {
        let mut session = start(1);
        session.select(0).unwrap();
        let result = session.submit("s1", SubmitOptions::default()).unwrap();
        assert_eq!(result.score, 100.0);
        assert_eq!(result.test_id, "t1");
        assert!(session.is_completed());

        let err = session.submit("s1", SubmitOptions::default()).unwrap_err();
        assert!(matches!(err, AssessmentError::State(StateError::Completed)));
        assert!(session.answer("q0", 1).unwrap_err().is_state());
        assert!(session.next().unwrap_err().is_state());
    }

    #[test]
    fn events_are_published_in_order() {
        let mut session = start(2);
        let mut rx = session.subscribe();
        session.select(1).unwrap();
        session.next().unwrap();
        session.select(0).unwrap();
        session.submit("s1", SubmitOptions::default()).unwrap();

        let events = drain_events(&mut rx);
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            SessionEvent::Started {
                test_id: "t1".into(),
                question_count: 2,
            }
        );
        assert!(matches!(events[1], SessionEvent::Answered { option: 1, .. }));
        assert_eq!(events[2], SessionEvent::Moved { index: 1 });
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Submitted { score, .. }) if *score == 75.0
        ));
    }

    #[test]
    fn later_subscribers_miss_started() {
        let mut session = start(1);
        let _first = session.subscribe();
        let mut second = session.subscribe();
        session.select(2).unwrap();
        assert_eq!(
            drain_events(&mut second),
            vec![SessionEvent::Answered {
                question_id: "q0".into(),
                option: 2,
            }]
        );
    }

    #[test]
    fn drain_survives_overflowing_the_buffer() {
        let mut session = start(1);
        let mut rx = session.subscribe();
        for _ in 0..70 {
            session.select(0).unwrap();
        }
        session.submit("s1", SubmitOptions::default()).unwrap();

        let events = drain_events(&mut rx);
        assert!(!events.is_empty());
        assert!(events.len() <= MIN_EVENT_CAPACITY);
        assert!(matches!(events.last(), Some(SessionEvent::Submitted { .. })));
        assert!(drain_events(&mut rx).is_empty());
    }

    #[test]
    fn buffer_grows_with_question_count() {
        let mut session = start(40);
        let mut rx = session.subscribe();
        for i in 0..40 {
            if i > 0 {
                session.next().unwrap();
            }
            session.select(0).unwrap();
        }
        session.submit("s1", SubmitOptions::default()).unwrap();

        // Started, 40 answers, 39 moves, Submitted
        assert_eq!(drain_events(&mut rx).len(), 81);
    }

    #[test]
    fn deadline_expires_once() {
        let t0 = Utc::now();
        let mut session =
            TestSession::start_at(make_test(1), Box::new(RuleChain::default()), t0).unwrap();
        let mut rx = session.subscribe();
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Started { .. })));

        assert!(!session.check_deadline(t0 + TimeDelta::minutes(29)));
        assert!(session.check_deadline(t0 + TimeDelta::minutes(30)));
        assert!(session.check_deadline(t0 + TimeDelta::minutes(45)));

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::TimeExpired { .. })));
        assert!(rx.try_recv().is_err());
        assert!(!session.is_completed());
    }

    #[test]
    fn huge_duration_never_expires() {
        let mut test = Test::with_id("t1", "ch1", "Open", "09:00", i64::MAX).unwrap();
        test.add_question(
            Question::new("q0", "t1", "?", vec!["a".into(), "b".into(), "c".into(), "d".into()], 0)
                .unwrap(),
        )
        .unwrap();
        let mut session = TestSession::start(test, Box::new(RuleChain::default())).unwrap();

        assert_eq!(session.deadline(), None);
        assert!(!session.check_deadline(Utc::now()));
        assert!(!session.check_deadline(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn override_does_not_skip_ahead_when_all_answered() {
        let mut session = start(2);
        session.answer("q0", 0).unwrap();
        session.answer("q1", 0).unwrap();
        let allow = SubmitOptions {
            allow_unanswered: true,
        };
        let err = session.submit("s1", allow).unwrap_err();
        assert!(matches!(
            err,
            AssessmentError::State(StateError::NotAtLastQuestion { index: 0, last: 1 })
        ));

        let mut partial = start(2);
        partial.select(0).unwrap();
        let result = partial.submit("s1", allow).unwrap();
        assert_eq!(result.score, 50.0);
    }
}
