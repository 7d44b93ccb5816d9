//! Repo-building helpers shared by the unit tests, the integration
//! tests, and the `mkrepo` demo binary.

use std::fs;
use std::path::Path;

use names::{Generator, Name};

use crate::commit::{self, CommitId};
use crate::{checkout, history, refs, staging, Repository};

/// Writes `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn init_repo<P: AsRef<Path>>(dir: &P) -> Repository {
    Repository::init(dir.as_ref()).unwrap()
}

/// Writes, stages and commits a single file in one step.
pub fn commit_file(repo: &Repository, rel: &str, content: &str, message: &str) -> CommitId {
    write_file(repo.work_root(), rel, content);
    staging::add(&[repo.work_root().join(rel)]).unwrap();
    commit::create(repo, message, None).unwrap()
}

/// Linear history of three commits; returns the tip.
pub fn simple_repo(repo: &Repository) -> CommitId {
    commit_file(repo, "README.md", "hello", "initial commit");
    commit_file(repo, "src/main.txt", "v1", "add main");
    commit_file(repo, "src/main.txt", "v2", "fix main")
}

/// History with a feature branch merged back into master; returns the
/// merge commit. The branch gets a generated throwaway name.
pub fn branches_repo(repo: &Repository) -> CommitId {
    commit_file(repo, "README.md", "hello", "initial commit");

    let mut generator = Generator::with_naming(Name::Numbered);
    let branch_name = generator.next().unwrap();
    refs::create_branch(repo, &branch_name).unwrap();
    checkout::checkout(repo, &branch_name).unwrap();
    commit_file(repo, "feature.txt", "feature work", "add feature");

    checkout::checkout(repo, "master").unwrap();
    commit_file(repo, "main.txt", "mainline work", "update mainline");

    history::merge(repo, &branch_name).unwrap()
}
