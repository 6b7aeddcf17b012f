//! The `examkit process` command.

use anyhow::Result;

use examkit_core::pipeline::{ExamPipeline, PipelineWarning, StandardSteps};
use examkit_core::rules::format_score;

use super::Context;

pub fn execute(ctx: &Context, test_id: String, format: String) -> Result<()> {
    let mut registry = ctx.registry()?;
    let steps =
        StandardSteps::new(Box::new(registry.rules().clone())).with_store(ctx.store.clone());
    let pipeline = ExamPipeline::new(steps);

    let report = registry.run_pipeline(&test_id, &pipeline)?;
    ctx.save(&registry)?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!(
                "Processed '{}' ({} questions, {} submissions)",
                report.title, report.question_count, report.submission_count
            );
            for warning in &report.warnings {
                match warning {
                    PipelineWarning::NoSubmissions { .. } => {
                        println!("  WARNING: no submissions yet");
                    }
                }
            }
            if !report.rescored.is_empty() {
                println!("\nRescored:");
                for change in &report.rescored {
                    println!(
                        "  {} {}% -> {}% ({:+.2})",
                        change.student_id,
                        format_score(change.previous),
                        format_score(change.current),
                        change.delta()
                    );
                }
            }
            println!("Mean score: {}%", format_score(report.mean_score));
        }
    }

    Ok(())
}
