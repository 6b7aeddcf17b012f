//! The `examkit import` command.

use std::path::PathBuf;

use anyhow::Result;

use examkit_store::bank;

use super::Context;

pub fn execute(ctx: &Context, bank_path: PathBuf) -> Result<()> {
    let tests = bank::load_bank(&bank_path)?;
    for w in bank::validate_bank(&tests) {
        eprintln!("Warning: {}", w.message);
    }

    let mut registry = ctx.registry()?;
    let mut imported = 0usize;
    for test in tests {
        if registry.test(test.id()).is_ok() {
            eprintln!("Skipping '{}': already imported", test.id());
            continue;
        }
        registry.insert_test(test)?;
        imported += 1;
    }
    ctx.save(&registry)?;

    println!("Imported {imported} test(s)");
    Ok(())
}
