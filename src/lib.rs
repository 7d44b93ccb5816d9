pub mod checkout;
pub mod commit;
pub mod diff;
pub mod error;
pub mod graph;
pub mod history;
pub mod refs;
pub mod staging;
pub mod tree;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::commit::CommitId;
pub use crate::error::{Result, WitError};

pub const WIT_DIR: &str = ".wit";
pub const IMAGES_DIR: &str = "images";
pub const STAGING_DIR: &str = "staging_area";
pub const REFERENCES_FILE: &str = "references.txt";
pub const ACTIVATED_FILE: &str = "activated.txt";

/// Handle to a located repository. Constructed once per command and
/// passed to every operation; all `.wit` subpaths derive from it.
#[derive(Debug, Clone)]
pub struct Repository {
    work_root: PathBuf,
}

impl Repository {
    /// Walks from `start` upward and returns the first ancestor holding
    /// a `.wit` directory. Every command except `init` enters through
    /// here.
    pub fn locate(start: &Path) -> Result<Self> {
        let start = tree::absolutize(start)?;
        for candidate in start.ancestors() {
            if candidate.join(WIT_DIR).is_dir() {
                debug!(root = %candidate.display(), "located repository");
                return Ok(Self {
                    work_root: candidate.to_path_buf(),
                });
            }
        }
        Err(WitError::NotARepository)
    }

    /// Creates the `.wit` layout under `path`. Re-running on an existing
    /// repository leaves it untouched.
    pub fn init(path: &Path) -> Result<Self> {
        let work_root = tree::absolutize(path)?;
        let repo = Self { work_root };
        for dir in [repo.images_dir(), repo.staging_dir()] {
            fs::create_dir_all(&dir).map_err(|source| WitError::Io { path: dir, source })?;
        }
        let activated = repo.activated_path();
        if !activated.exists() {
            fs::write(&activated, refs::DEFAULT_BRANCH).map_err(|source| WitError::Io {
                path: activated,
                source,
            })?;
        }
        debug!(root = %repo.work_root.display(), "initialized repository");
        Ok(repo)
    }

    /// The directory the repository tracks, i.e. the parent of `.wit`.
    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    pub fn wit_dir(&self) -> PathBuf {
        self.work_root.join(WIT_DIR)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.wit_dir().join(IMAGES_DIR)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.wit_dir().join(STAGING_DIR)
    }

    pub fn references_path(&self) -> PathBuf {
        self.wit_dir().join(REFERENCES_FILE)
    }

    pub fn activated_path(&self) -> PathBuf {
        self.wit_dir().join(ACTIVATED_FILE)
    }

    /// Snapshot directory of a commit.
    pub fn image_dir(&self, id: &CommitId) -> PathBuf {
        self.images_dir().join(id.as_str())
    }

    /// Metadata file of a commit.
    pub fn image_meta_path(&self, id: &CommitId) -> PathBuf {
        self.images_dir().join(format!("{id}.txt"))
    }

    /// Path of `target` relative to the work root. `target` must sit
    /// inside the repository, which `locate` guarantees for user paths.
    pub fn relative_to_root(&self, target: &Path) -> Result<PathBuf> {
        let absolute = tree::absolutize(target)?;
        absolute
            .strip_prefix(&self.work_root)
            .map(Path::to_path_buf)
            .map_err(|_| WitError::PathNotFound(target.to_path_buf()))
    }
}
