//! The `examkit grades` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::aggregate::{average_for_student, group_by, summarize, GroupingMode};
use examkit_core::rules::format_score;

use super::Context;

pub fn execute(ctx: &Context, student: Option<String>, grouping: Option<String>) -> Result<()> {
    anyhow::ensure!(
        student.is_some() || grouping.is_some(),
        "pass --student or --group-by"
    );
    let registry = ctx.registry()?;

    if let Some(id) = &student {
        registry.student(id)?;
        let average = average_for_student(registry.tests(), id);
        println!("Average for {id}: {}%", format_score(average));
    }

    if let Some(mode) = &grouping {
        let mode: GroupingMode = mode.parse().map_err(|e: String| anyhow::anyhow!("{e}"))?;
        let results = registry.all_results();
        let summaries = summarize(&group_by(&results, mode, registry.tests()));

        if summaries.is_empty() {
            println!("No results.");
            return Ok(());
        }

        let mut table = Table::new();
        table.set_header(vec![mode.to_string().as_str(), "Count", "Mean", "Min", "Max"]);
        for (key, s) in &summaries {
            table.add_row(vec![
                Cell::new(key),
                Cell::new(s.count),
                Cell::new(format_score(s.mean)),
                Cell::new(format_score(s.min)),
                Cell::new(format_score(s.max)),
            ]);
        }
        println!("{table}");
    }

    Ok(())
}
