//! The `examkit edit` command.

use anyhow::Result;

use super::Context;

pub fn execute(
    ctx: &Context,
    test_id: String,
    title: Option<String>,
    start: Option<String>,
    duration: Option<i64>,
) -> Result<()> {
    let mut registry = ctx.registry()?;
    let mut history = registry.edit(&test_id)?;

    let current = history.current().metadata();
    history.commit(
        title.unwrap_or(current.title),
        start.unwrap_or(current.start_time),
        duration.unwrap_or(current.duration_minutes),
    )?;

    registry.save_edits(&history)?;
    ctx.save(&registry)?;

    let test = history.current();
    println!(
        "Updated {}: '{}' at {} ({} min)",
        test.id(),
        test.title(),
        test.start_time(),
        test.duration_minutes()
    );
    Ok(())
}
