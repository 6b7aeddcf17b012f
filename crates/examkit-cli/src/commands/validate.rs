//! The `examkit validate` command.

use std::path::PathBuf;

use anyhow::Result;

use examkit_store::bank;

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let tests = bank::load_bank(&bank_path)?;

    for test in &tests {
        println!(
            "Test: {} [{}] ({} questions)",
            test.title(),
            test.id(),
            test.questions().len()
        );
    }

    let warnings = bank::validate_bank(&tests);
    for w in &warnings {
        let prefix = w
            .test_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("All tests valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
