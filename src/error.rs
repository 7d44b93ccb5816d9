use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything a core operation can fail with. The CLI boundary is the
/// only place these are turned into process exits.
#[derive(Debug, Error)]
pub enum WitError {
    #[error("not a wit repository (or any of the parent directories): .wit")]
    NotARepository,

    #[error("path {} did not match any files", .0.display())]
    PathNotFound(PathBuf),

    #[error("{} is not in the staging area", .0.display())]
    StagingEntryMissing(PathBuf),

    #[error("nothing to commit, staging area matches HEAD")]
    NoChanges,

    #[error("commit {0} does not exist")]
    CommitNotFound(String),

    #[error("your uncommitted changes would be overwritten by checkout")]
    UncommittedWork,

    #[error("a branch named {0:?} already exists")]
    BranchExists(String),

    #[error("no branch named {0:?}")]
    BranchNotFound(String),

    #[error("branch {0:?} is already at HEAD, nothing to merge")]
    NothingToMerge(String),

    #[error("references.txt is missing, create a commit first")]
    ReferencesMissing,

    #[error("commit id {0} already exists")]
    CommitIdCollision(String),

    #[error("malformed references.txt: {0}")]
    CorruptReferences(String),

    #[error("malformed metadata for commit {id}: {reason}")]
    CorruptMetadata { id: String, reason: String },

    #[error("cannot access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Copy(#[from] fs_extra::error::Error),
}

pub type Result<T, E = WitError> = std::result::Result<T, E>;

/// Attaches the offending path to a bare io::Error.
pub trait IoResultExt<T> {
    fn path_context(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn path_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| WitError::Io {
            path: path.into(),
            source,
        })
    }
}
