//! Havarti CLI - hvrt command

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod cmd;

const EXIT_GENERIC: u8 = 1;
const EXIT_ARGUMENT: u8 = 2;
const EXIT_UNEXPECTED: u8 = 123;

/// Havarti - a hybrid distributed/centralized version control system
#[derive(Parser)]
#[command(name = "hvrt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new repository/worktree
    Init {
        /// Only create the repository database, no work tree state
        #[arg(short, long)]
        bare: bool,

        /// Branch to create when initializing the repository
        #[arg(short, long, default_value = "trunk")]
        default_branch: String,

        /// Directory to initialize (default: current directory)
        path: Option<PathBuf>,
    },
    /// Add files to the next commit
    Add {
        /// Stage explicitly named paths even when ignore rules match
        #[arg(short, long)]
        force: bool,

        /// Files or directories to stage
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Remove a change from the stage
    Unstage {
        /// Files to take back out of the staging area
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Remove a file from being tracked in the repo
    Rm {
        /// Only remove the file from the staging area
        #[arg(short, long)]
        staged: bool,

        /// Only remove the file from the repo, not from disk
        #[arg(short, long)]
        keep: bool,

        /// Files to remove
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Commit staged changes to the repo
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Commit author
        #[arg(long)]
        author: String,

        /// Individual creating the commit; defaults to the author
        #[arg(long)]
        committer: Option<String>,

        /// Commit only changes already placed in the staging area
        #[arg(short, long)]
        staged_only: bool,
    },
    /// Show working tree status
    Status,
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init {
            bare,
            default_branch,
            path,
        } => cmd::init::run(bare, &default_branch, path.as_deref()),
        Commands::Add { force, paths } => cmd::add::run(force, &paths),
        Commands::Unstage { paths } => cmd::unstage::run(&paths),
        Commands::Rm {
            staged,
            keep,
            paths,
        } => cmd::rm::run(staged, keep, &paths),
        Commands::Commit {
            message,
            author,
            committer,
            staged_only,
        } => cmd::commit::run(&message, &author, committer.as_deref(), staged_only),
        Commands::Status => cmd::status::run(),
    }
}

/// Map an error chain onto the documented exit codes
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<hvrt_core::Error>() {
        Some(hvrt_core::Error::Argument(_)) => EXIT_ARGUMENT,
        _ => EXIT_GENERIC,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| run(cli)));
    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
        // the panic hook already printed the payload and backtrace
        Err(_) => ExitCode::from(EXIT_UNEXPECTED),
    }
}
