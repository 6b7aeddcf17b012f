//! The `examkit take` command.
//!
//! Drives a test session from a comma-separated answer list instead of an
//! interactive prompt.

use anyhow::Result;

use examkit_core::rules::format_score;
use examkit_core::session::SubmitOptions;

use super::Context;

/// Parse one answer: `a`-`d` or `0`-`3`, `-` or empty to skip.
fn parse_answer(raw: &str) -> Result<Option<usize>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        return Ok(None);
    }
    let lower = raw.to_ascii_lowercase();
    let index = match lower.as_str() {
        "a" => 0,
        "b" => 1,
        "c" => 2,
        "d" => 3,
        digits => digits
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("invalid answer: '{raw}'"))?,
    };
    Ok(Some(index))
}

pub fn execute(
    ctx: &Context,
    test_id: String,
    student_id: String,
    answers: String,
    allow_unanswered: bool,
) -> Result<()> {
    let mut registry = ctx.registry()?;
    registry.student(&student_id)?;
    if registry.test(&test_id)?.has_result_for(&student_id) {
        anyhow::bail!("student '{student_id}' has already taken test '{test_id}'");
    }

    let picks = answers
        .split(',')
        .map(parse_answer)
        .collect::<Result<Vec<_>>>()?;

    let mut session = registry.start_session(&test_id)?;
    let question_count = session.test().questions().len();
    anyhow::ensure!(
        picks.len() <= question_count,
        "{} answers given for {} questions",
        picks.len(),
        question_count
    );

    for index in 0..question_count {
        if index > 0 {
            session.next()?;
        }
        if let Some(Some(option)) = picks.get(index) {
            session.select(*option)?;
        }
    }

    let options = SubmitOptions {
        allow_unanswered: allow_unanswered || ctx.config.session.allow_unanswered,
    };
    let result = registry.submit(&mut session, &student_id, options)?;
    ctx.save(&registry)?;

    println!(
        "Submitted {} for {}: score {}%",
        test_id,
        student_id,
        format_score(result.score)
    );
    Ok(())
}
