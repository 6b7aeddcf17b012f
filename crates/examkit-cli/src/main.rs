//! examkit CLI: thin command-line wrapper over the assessment core.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "examkit", version, about = "School assessment authoring and grading")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example test bank
    Init,

    /// Validate test bank TOML files
    Validate {
        /// Path to bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Import tests from a bank into the store
    Import {
        /// Path to bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Register a student or teacher
    AddUser {
        /// User id
        #[arg(long)]
        id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Role: student or teacher
        #[arg(long, default_value = "student")]
        role: String,
    },

    /// List tests
    List {
        /// Only tests this student can still take
        #[arg(long)]
        student: Option<String>,
    },

    /// Take a test non-interactively
    Take {
        /// Test id
        #[arg(long)]
        test: String,

        /// Student id
        #[arg(long)]
        student: String,

        /// Answers in question order, e.g. "a,c,-,1" ("-" skips)
        #[arg(long)]
        answers: String,

        /// Submit even with unanswered questions
        #[arg(long)]
        allow_unanswered: bool,
    },

    /// Run the exam pipeline over a test
    Process {
        /// Test id
        #[arg(long)]
        test: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Edit a test's title, start time or duration
    Edit {
        /// Test id
        #[arg(long)]
        test: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        duration: Option<i64>,
    },

    /// Show grades
    Grades {
        /// Average for one student
        #[arg(long)]
        student: Option<String>,

        /// Group results: student or subject
        #[arg(long)]
        group_by: Option<String>,
    },
}

fn main() {
    let directive: tracing_subscriber::filter::Directive = match "examkit=info".parse() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let Cli {
        config,
        data_dir,
        command,
    } = Cli::parse();
    let ctx = || Context::load(config.as_deref(), data_dir.as_deref());

    let result = match command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Import { bank } => ctx().and_then(|c| commands::import::execute(&c, bank)),
        Commands::AddUser { id, name, role } => {
            ctx().and_then(|c| commands::users::execute(&c, id, name, role))
        }
        Commands::List { student } => ctx().and_then(|c| commands::list::execute(&c, student)),
        Commands::Take {
            test,
            student,
            answers,
            allow_unanswered,
        } => ctx().and_then(|c| {
            commands::take::execute(&c, test, student, answers, allow_unanswered)
        }),
        Commands::Process { test, format } => {
            ctx().and_then(|c| commands::process::execute(&c, test, format))
        }
        Commands::Edit {
            test,
            title,
            start,
            duration,
        } => ctx().and_then(|c| commands::edit::execute(&c, test, title, start, duration)),
        Commands::Grades { student, group_by } => {
            ctx().and_then(|c| commands::grades::execute(&c, student, group_by))
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
