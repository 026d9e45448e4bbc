use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for artifact storage operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileSystemError {
    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error when a non-directory occupies an output directory path
    #[error("Output path is occupied by a non-directory: {}", .0.display())]
    OutputPathConflict(PathBuf),
}

/// Result type for file system operations
pub type FileSystemResult<T> = Result<T, FileSystemError>;

/// Outcome of clearing stale artifacts from one directory
#[derive(Debug, Default)]
pub struct StaleCleanup {
    /// Files that were deleted, sorted
    pub removed: Vec<PathBuf>,
    /// Files that matched but could not be deleted
    pub failed: Vec<(PathBuf, std::io::Error)>,
}

/// ArtifactStore defines the port (interface) the orchestrator writes through
pub trait ArtifactStore {
    /// Make sure `dir` exists as a directory, creating it recursively if absent
    ///
    /// # Errors
    /// [`FileSystemError::OutputPathConflict`] when something else occupies the path
    fn prepare_dir(&self, dir: &Path) -> FileSystemResult<()>;

    /// Delete every regular file in `dir` whose extension is `suffix`
    ///
    /// Other files and subdirectories are kept. Listing failures are errors,
    /// failures to delete individual files are reported in [`StaleCleanup::failed`].
    fn clear_stale(&self, dir: &Path, suffix: &str) -> FileSystemResult<StaleCleanup>;

    /// Write `content` to `path`, replacing any existing file
    fn write_artifact(&self, path: &Path, content: &str) -> FileSystemResult<()>;
}
