use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use wit::{checkout, commit, diff, graph, history, refs, staging, Repository};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty wit repository or reinitialize an existing one
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Add file or directory contents to the staging area
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Record the staging area as a new image
    Commit {
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Summarize staged, unstaged and untracked changes
    Status,
    /// Remove files or directories from the staging area
    Rm {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Restore the working tree from a branch or commit id
    Checkout { target: String },
    /// Print the commit graph in dot format
    Graph {
        /// Seed an edge for every branch tip, not just master
        #[arg(long)]
        all: bool,
    },
    /// Create a branch pointing at the current HEAD
    Branch { name: String },
    /// Merge a branch into the current HEAD
    Merge { branch: String },
}

fn main() -> anyhow::Result<()> {
    install_tracing()?;
    let cli = Cli::parse();
    let cwd = Path::new(".");

    match cli.command {
        Command::Init { path } => {
            Repository::init(&path)?;
        }
        Command::Add { paths } => staging::add(&paths)?,
        Command::Commit { message } => {
            let repo = Repository::locate(cwd)?;
            let id = commit::create(&repo, &message.join(" "), None)?;
            println!("{id}");
        }
        Command::Status => {
            let repo = Repository::locate(cwd)?;
            print!("{}", diff::status(&repo)?);
        }
        Command::Rm { paths } => staging::remove(&paths)?,
        Command::Checkout { target } => {
            let repo = Repository::locate(cwd)?;
            checkout::checkout(&repo, &target)?;
        }
        Command::Graph { all } => {
            let repo = Repository::locate(cwd)?;
            print!("{}", graph::render(&repo, all)?);
        }
        Command::Branch { name } => {
            let repo = Repository::locate(cwd)?;
            refs::create_branch(&repo, &name)?;
        }
        Command::Merge { branch } => {
            let repo = Repository::locate(cwd)?;
            let id = history::merge(&repo, &branch)?;
            println!("{id}");
        }
    }
    Ok(())
}

fn install_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}
