use clap::{Parser, Subcommand};
use job_matcher::commands::{run_match, validate_dataset};
use job_matcher::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "job-matcher")]
#[command(about = "Match a list of skills against a dataset of job listings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding backend and matching settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Check that a CSV or XLSX dataset can be matched against
    Validate {
        /// Path to the job listing dataset
        file: PathBuf,
    },
    /// Rank the jobs in a dataset against a comma-separated list of skills
    Match {
        /// Path to the job listing dataset
        file: PathBuf,
        /// Comma-separated skills, e.g. "Python, SQL, Machine Learning"
        skills: String,
        /// Number of matches to show; defaults to the configured value
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Validate { file } => {
            validate_dataset(&file)?;
        }
        Commands::Match {
            file,
            skills,
            top_k,
        } => {
            run_match(file, skills, top_k).await?;
        }
    }

    Ok(())
}
