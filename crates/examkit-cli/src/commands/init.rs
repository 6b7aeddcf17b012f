//! The `examkit init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("examkit.toml").exists() {
        println!("examkit.toml already exists, skipping.");
    } else {
        std::fs::write("examkit.toml", SAMPLE_CONFIG)?;
        println!("Created examkit.toml");
    }

    std::fs::create_dir_all("banks")?;
    let example_path = Path::new("banks/example.toml");
    if example_path.exists() {
        println!("banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: examkit validate --bank banks/example.toml");
    println!("  2. Run: examkit import --bank banks/example.toml");
    println!("  3. Run: examkit add-user --id s1 --name \"First Student\"");
    println!("  4. Run: examkit take --test fractions --student s1 --answers c,b,a");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examkit configuration

data_dir = "./examkit-data"

[grading]
# Applied in order. Drop "ordered_adjacency" for strict right/wrong marking.
stages = ["exact", "ordered_adjacency"]

[session]
allow_unanswered = false
"#;

const EXAMPLE_BANK: &str = r#"[[tests]]
id = "fractions"
chapter_id = "algebra"
title = "Fractions"
start_time = "2026-10-20 09:00"
duration_minutes = 20

[[tests.questions]]
id = "fractions-1"
text = "1/2 + 1/4 = ?"
options = ["1/4", "2/4", "3/4", "1"]
correct = 2

[[tests.questions]]
id = "fractions-2"
text = "Which fraction is largest?"
options = ["1/3", "3/4", "2/3", "1/2"]
correct = 1

[[tests.questions]]
id = "fractions-3"
text = "Simplify 4/8"
options = ["1/2", "2/3", "1/4", "4/8 is already simplest"]
correct = 0
"#;
