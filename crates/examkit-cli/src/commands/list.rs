//! The `examkit list` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::model::Test;

use super::Context;

pub fn execute(ctx: &Context, student: Option<String>) -> Result<()> {
    let registry = ctx.registry()?;

    let tests: Vec<&Test> = match &student {
        Some(id) => registry.available_tests(id)?,
        None => registry.tests().iter().collect(),
    };

    if tests.is_empty() {
        match student {
            Some(id) => println!("No tests available for {id}."),
            None => println!("No tests."),
        }
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Id",
        "Chapter",
        "Title",
        "Start",
        "Minutes",
        "Questions",
        "Submissions",
    ]);
    for test in tests {
        table.add_row(vec![
            Cell::new(test.id()),
            Cell::new(test.chapter_id()),
            Cell::new(test.title()),
            Cell::new(test.start_time()),
            Cell::new(test.duration_minutes()),
            Cell::new(test.questions().len()),
            Cell::new(test.results().len()),
        ]);
    }
    println!("{table}");
    Ok(())
}
