mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gavel")]
#[command(about = "Gavel - judge untrusted code against problem test cases", long_about = None)]
struct Cli {
    /// Optional languages.json overriding the built-in toolchain profiles
    #[arg(long, global = true)]
    languages: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a source file once with optional stdin, no comparison
    Run {
        /// Language name (cpp, java, python)
        #[arg(short, long)]
        language: String,

        /// Path to the source file
        source: PathBuf,

        /// File whose contents are fed to the program's stdin
        #[arg(long)]
        stdin: Option<PathBuf>,
    },

    /// Judge a source file against a JSON test-case file
    Judge {
        /// Language name (cpp, java, python)
        #[arg(short, long)]
        language: String,

        /// Path to the source file
        source: PathBuf,

        /// JSON file holding the ordered test cases:
        /// [{"input": "...", "expected_output": "..."}, ...]
        #[arg(short, long)]
        tests: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let service = commands::build_service(cli.languages.as_deref())?;

    match cli.command {
        Commands::Run {
            language,
            source,
            stdin,
        } => {
            commands::run(&service, &language, &source, stdin.as_deref()).await?;
        }
        Commands::Judge {
            language,
            source,
            tests,
        } => {
            commands::judge(&service, &language, &source, &tests).await?;
        }
    }

    Ok(())
}
