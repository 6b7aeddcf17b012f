//! The explicit repository of tests and users.
//!
//! A [`Registry`] is constructed once by the caller and passed to whatever
//! needs lookups. It owns the authoritative test list, wires sessions and the
//! pipeline to the active grading rule, and applies the "one attempt per
//! student per test" policy when listing available tests.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::{AssessmentError, EntityKind, Result, ValidationError};
use crate::history::EditHistory;
use crate::model::{Question, Test, TestResult, User};
use crate::pipeline::{ExamPipeline, ExamSteps, PipelineReport};
use crate::rules::RuleChain;
use crate::session::{SubmitOptions, TestSession};
use crate::traits::{Store, TESTS_RESOURCE, USERS_RESOURCE};

/// Tests, users and the active grading rule.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tests: Vec<Test>,
    users: BTreeMap<String, User>,
    rules: RuleChain,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(mut self, rules: RuleChain) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &RuleChain {
        &self.rules
    }

    /// Change the rule used by new sessions and pipeline runs.
    pub fn set_rules(&mut self, rules: RuleChain) {
        self.rules = rules;
    }

    /// Load users and tests from `store`.
    ///
    /// Tests are validated as they deserialize; every stored result must
    /// also name a registered student.
    pub fn load_from(store: &dyn Store) -> Result<Self> {
        let mut registry = Self::new();
        for user in store.load_users(USERS_RESOURCE).map_err(AssessmentError::Store)? {
            registry.register_user(user)?;
        }
        for test in store.load_tests(TESTS_RESOURCE).map_err(AssessmentError::Store)? {
            for result in test.results() {
                registry.student(&result.student_id)?;
            }
            registry.insert_test(test)?;
        }
        tracing::debug!(
            "loaded {} tests and {} users",
            registry.tests.len(),
            registry.users.len()
        );
        Ok(registry)
    }

    /// Save tests and users to `store`.
    pub fn save_to(&self, store: &dyn Store) -> Result<()> {
        store
            .save_tests(TESTS_RESOURCE, &self.tests)
            .map_err(AssessmentError::Store)?;
        let users: Vec<User> = self.users.values().cloned().collect();
        store
            .save_users(USERS_RESOURCE, &users)
            .map_err(AssessmentError::Store)
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    pub fn test(&self, test_id: &str) -> Result<&Test> {
        self.tests
            .iter()
            .find(|t| t.id() == test_id)
            .ok_or_else(|| AssessmentError::not_found(EntityKind::Test, test_id))
    }

    fn test_mut(&mut self, test_id: &str) -> Result<&mut Test> {
        self.tests
            .iter_mut()
            .find(|t| t.id() == test_id)
            .ok_or_else(|| AssessmentError::not_found(EntityKind::Test, test_id))
    }

    /// Create and register an empty test.
    pub fn create_test(
        &mut self,
        chapter_id: &str,
        title: &str,
        start_time: &str,
        duration_minutes: i64,
    ) -> Result<&Test> {
        let test = Test::new(chapter_id, title, start_time, duration_minutes)?;
        self.insert_test(test)
    }

    /// Register an already-built test. Its id must be new.
    pub fn insert_test(&mut self, test: Test) -> Result<&Test> {
        if self.test(test.id()).is_ok() {
            return Err(ValidationError::DuplicateId {
                kind: EntityKind::Test,
                id: test.id().to_string(),
            }
            .into());
        }
        tracing::debug!("registered test '{}' ({})", test.title(), test.id());
        self.tests.push(test);
        Ok(&self.tests[self.tests.len() - 1])
    }

    /// Append a new question to a test.
    pub fn add_question(
        &mut self,
        test_id: &str,
        text: &str,
        options: Vec<String>,
        correct_option: usize,
    ) -> Result<&Question> {
        let test = self.test_mut(test_id)?;
        let question = Question::new(
            Uuid::new_v4().to_string(),
            test_id,
            text,
            options,
            correct_option,
        )?;
        test.add_question(question)?;
        let added = test.questions().len() - 1;
        Ok(&test.questions()[added])
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn register_user(&mut self, user: User) -> Result<&User> {
        if self.users.contains_key(&user.id) {
            return Err(ValidationError::DuplicateId {
                kind: EntityKind::User,
                id: user.id,
            }
            .into());
        }
        let id = user.id.clone();
        Ok(self.users.entry(id).or_insert(user))
    }

    pub fn user(&self, user_id: &str) -> Result<&User> {
        self.users
            .get(user_id)
            .ok_or_else(|| AssessmentError::not_found(EntityKind::User, user_id))
    }

    /// A registered user holding the student role.
    pub fn student(&self, student_id: &str) -> Result<&User> {
        self.users
            .get(student_id)
            .filter(|u| u.is_student())
            .ok_or_else(|| AssessmentError::not_found(EntityKind::Student, student_id))
    }

    /// Open a session over a snapshot of the test, graded by the active rule.
    pub fn start_session(&self, test_id: &str) -> Result<TestSession> {
        let test = self.test(test_id)?;
        TestSession::start(test.clone(), Box::new(self.rules.clone()))
    }

    /// Submit a session and record the result on its test.
    pub fn submit(
        &mut self,
        session: &mut TestSession,
        student_id: &str,
        options: SubmitOptions,
    ) -> Result<TestResult> {
        self.student(student_id)?;
        self.test(session.test().id())?;
        let result = session.submit(student_id, options)?;
        self.record_result(result.clone())?;
        Ok(result)
    }

    /// Attach a result to its test after checking every reference.
    pub fn record_result(&mut self, result: TestResult) -> Result<()> {
        self.student(&result.student_id)?;
        let test = self.test_mut(&result.test_id)?;
        test.check_result(&result)?;
        test.results_mut().push(result);
        Ok(())
    }

    /// Gradable tests the student has not taken yet.
    pub fn available_tests(&self, student_id: &str) -> Result<Vec<&Test>> {
        self.student(student_id)?;
        Ok(self
            .tests
            .iter()
            .filter(|t| t.is_gradable() && !t.has_result_for(student_id))
            .collect())
    }

    /// Every result of every test, in test order.
    pub fn all_results(&self) -> Vec<TestResult> {
        self.tests
            .iter()
            .flat_map(|t| t.results().iter().cloned())
            .collect()
    }

    /// Run `pipeline` over one registered test.
    pub fn run_pipeline<S: ExamSteps>(
        &mut self,
        test_id: &str,
        pipeline: &ExamPipeline<S>,
    ) -> Result<PipelineReport> {
        let test = self.test_mut(test_id)?;
        pipeline.run(test)
    }

    /// Start an edit history over a registered test.
    pub fn edit(&self, test_id: &str) -> Result<EditHistory> {
        Ok(EditHistory::load(self.test(test_id)?))
    }

    /// Persist the active state of `history` into the test list.
    pub fn save_edits(&mut self, history: &EditHistory) -> Result<()> {
        history.save_into(&mut self.tests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StandardSteps;
    use crate::traits::MemoryStore;

    fn opts() -> Vec<String> {
        vec!["1".into(), "2".into(), "3".into(), "4".into()]
    }

    fn registry_with_test() -> (Registry, String) {
        let mut registry = Registry::new();
        registry.register_user(User::student("s1", "Ada")).unwrap();
        registry.register_user(User::teacher("t1", "Grace")).unwrap();
        let id = registry
            .create_test("ch1", "Quiz", "09:00", 20)
            .unwrap()
            .id()
            .to_string();
        registry.add_question(&id, "one", opts(), 0).unwrap();
        registry.add_question(&id, "two", opts(), 2).unwrap();
        (registry, id)
    }

    #[test]
    fn create_test_validates_duration() {
        let mut registry = Registry::new();
        assert!(registry
            .create_test("ch", "Quiz", "09:00", 0)
            .unwrap_err()
            .is_validation());
        assert!(registry.tests().is_empty());
    }

    #[test]
    fn add_question_to_unknown_test() {
        let mut registry = Registry::new();
        assert!(registry
            .add_question("missing", "?", opts(), 0)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn full_attempt_records_result() {
        let (mut registry, id) = registry_with_test();
        let mut session = registry.start_session(&id).unwrap();
        session.select(0).unwrap();
        session.next().unwrap();
        session.select(1).unwrap();

        let result = registry
            .submit(&mut session, "s1", SubmitOptions::default())
            .unwrap();
        assert_eq!(result.score, 75.0);
        assert_eq!(registry.test(&id).unwrap().results().len(), 1);
        assert!(registry.available_tests("s1").unwrap().is_empty());
    }

    #[test]
    fn submit_for_unknown_or_non_student_fails_before_completing() {
        let (mut registry, id) = registry_with_test();
        let mut session = registry.start_session(&id).unwrap();
        session.next().unwrap();

        let options = SubmitOptions {
            allow_unanswered: true,
        };
        assert!(registry
            .submit(&mut session, "ghost", options)
            .unwrap_err()
            .is_not_found());
        assert!(registry
            .submit(&mut session, "t1", options)
            .unwrap_err()
            .is_not_found());
        assert!(!session.is_completed());
    }

    #[test]
    fn record_result_rejects_foreign_answers() {
        let (mut registry, id) = registry_with_test();
        let mut answers = crate::model::Answers::new();
        answers.insert("not-a-question".into(), 0);
        let err = registry
            .record_result(TestResult {
                test_id: id,
                student_id: "s1".into(),
                answers,
                score: 0.0,
                submitted_at: chrono::Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            AssessmentError::NotFound {
                kind: EntityKind::Question,
                ..
            }
        ));
    }

    #[test]
    fn available_tests_skip_empty_tests() {
        let (mut registry, _) = registry_with_test();
        registry.create_test("ch2", "Empty", "10:00", 20).unwrap();
        let available = registry.available_tests("s1").unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].title(), "Quiz");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let (mut registry, id) = registry_with_test();
        let copy = registry.test(&id).unwrap().clone();
        assert!(registry.insert_test(copy).unwrap_err().is_validation());
        assert!(registry
            .register_user(User::student("s1", "Again"))
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn pipeline_over_registered_test() {
        let (mut registry, id) = registry_with_test();
        let pipeline = ExamPipeline::new(StandardSteps::new(Box::new(registry.rules().clone())));
        let report = registry.run_pipeline(&id, &pipeline).unwrap();
        assert_eq!(report.question_count, 2);
        assert!(registry
            .run_pipeline("missing", &pipeline)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn edits_are_saved_explicitly() {
        let (mut registry, id) = registry_with_test();
        let mut history = registry.edit(&id).unwrap();
        history.commit("Final", "12:00", 60).unwrap();
        assert_eq!(registry.test(&id).unwrap().title(), "Quiz");

        registry.save_edits(&history).unwrap();
        assert_eq!(registry.test(&id).unwrap().title(), "Final");
        assert_eq!(registry.test(&id).unwrap().questions().len(), 2);
    }

    #[test]
    fn load_rejects_results_from_unknown_students() {
        let (mut registry, id) = registry_with_test();
        let mut session = registry.start_session(&id).unwrap();
        session.select(0).unwrap();
        session.next().unwrap();
        session.select(2).unwrap();
        registry
            .submit(&mut session, "s1", SubmitOptions::default())
            .unwrap();

        let store = MemoryStore::new();
        store
            .save_tests(TESTS_RESOURCE, registry.tests())
            .unwrap();
        let err = Registry::load_from(&store).unwrap_err();
        assert!(matches!(
            err,
            AssessmentError::NotFound {
                kind: EntityKind::Student,
                ..
            }
        ));

        registry.save_to(&store).unwrap();
        let loaded = Registry::load_from(&store).unwrap();
        assert_eq!(loaded.test(&id).unwrap().results().len(), 1);
    }

    #[test]
    fn record_result_checks_score_range() {
        let (mut registry, id) = registry_with_test();
        let err = registry
            .record_result(TestResult {
                test_id: id,
                student_id: "s1".into(),
                answers: crate::model::Answers::new(),
                score: 999.0,
                submitted_at: chrono::Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            AssessmentError::Validation(ValidationError::ScoreOutOfRange(_))
        ));
    }

    #[test]
    fn store_round_trip() {
        let (registry, id) = registry_with_test();
        let store = MemoryStore::new();
        registry.save_to(&store).unwrap();

        let loaded = Registry::load_from(&store).unwrap();
        assert_eq!(loaded.tests().len(), 1);
        assert_eq!(loaded.test(&id).unwrap().questions().len(), 2);
        assert!(loaded.student("s1").is_ok());
    }
}
