use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use examkit_core::model::{Question, Test, TestResult};
use examkit_core::pipeline::ExamPipeline;
use examkit_core::rules::{score_answers, GradingRule, RuleChain};

fn make_test(questions: usize) -> Test {
    let mut test = Test::with_id("bench", "ch", "Bench", "09:00", 60).unwrap();
    for i in 0..questions {
        test.add_question(
            Question::new(
                format!("q{i}"),
                "bench",
                "?",
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                i % 4,
            )
            .unwrap(),
        )
        .unwrap();
    }
    test
}

fn answers(questions: usize) -> BTreeMap<String, usize> {
    (0..questions).map(|i| (format!("q{i}"), (i * 7) % 4)).collect()
}

fn bench_rule_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_chain");
    let test = make_test(1);
    let question = &test.questions()[0];

    group.bench_function("basic", |b| {
        let rule = RuleChain::basic();
        b.iter(|| rule.evaluate(black_box(question), black_box(1)))
    });

    group.bench_function("default", |b| {
        let rule = RuleChain::default();
        b.iter(|| rule.evaluate(black_box(question), black_box(1)))
    });

    group.finish();
}

fn bench_score_answers(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_answers");
    let rule = RuleChain::default();

    for n in [10usize, 100, 1000] {
        let test = make_test(n);
        let picks = answers(n);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| score_answers(&rule, black_box(test.questions()), black_box(&picks)))
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let pipeline = ExamPipeline::standard(Box::new(RuleChain::default()));

    let mut base = make_test(50);
    let picks = answers(50);
    let results: Vec<TestResult> = (0..200)
        .map(|s| TestResult {
            test_id: "bench".into(),
            student_id: format!("s{s}"),
            answers: picks.clone(),
            score: 0.0,
            submitted_at: chrono::Utc::now(),
        })
        .collect();
    let mut serialized = serde_json::to_value(&base).unwrap();
    serialized["results"] = serde_json::to_value(&results).unwrap();
    base = serde_json::from_value(serialized).unwrap();

    group.bench_function("regrade 200 submissions", |b| {
        b.iter(|| {
            let mut test = base.clone();
            pipeline.run(black_box(&mut test)).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_rule_chain, bench_score_answers, bench_pipeline);
criterion_main!(benches);
