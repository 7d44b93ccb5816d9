use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use inquire::Confirm;
use wit::test_support::{branches_repo, simple_repo};
use wit::Repository;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Default, Debug)]
enum RepoStyle {
    /// Repo with linear history
    #[default]
    Simple,
    /// Repo with a merged feature branch
    Branches,
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Style of repo to generate
    #[arg(value_enum, default_value_t = RepoStyle::Simple)]
    repo: RepoStyle,

    /// Sets parent directory of the test repo
    #[clap(short, long, value_name = "DIR", default_value = "./test_repos")]
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    println!(
        "Creating test repo ({:?}) in {}",
        cli.repo,
        cli.path.display()
    );

    let target = match cli.repo {
        RepoStyle::Simple => cli.path.join("simple"),
        RepoStyle::Branches => cli.path.join("branches"),
    };
    let repo = prepare_dir(&target)?;
    if repo.references_path().exists() {
        println!("Repo already has commits, leaving it as is");
        return Ok(());
    }

    match cli.repo {
        RepoStyle::Simple => {
            simple_repo(&repo);
        }
        RepoStyle::Branches => {
            branches_repo(&repo);
        }
    }
    Ok(())
}

fn prepare_dir(path: &Path) -> anyhow::Result<Repository> {
    if path.exists() {
        let ans = Confirm::new("Do you want to wipe out the contents of this directory?")
            .with_default(false)
            .with_help_message("This action will allow us to set up a new repo.")
            .prompt()?;

        if ans {
            println!("Creating a brand new repo");
            fs::remove_dir_all(path)?;
            fs::create_dir_all(path)?;
        } else {
            println!("Nothing happened");
        }
    } else {
        fs::create_dir_all(path)?;
    }

    Ok(Repository::init(path)?)
}
