use std::{fs, io::ErrorKind, path::Path};

use crate::ports::file_system::{ArtifactStore, FileSystemError, FileSystemResult, StaleCleanup};

/// Artifact store backed by the local disk through blocking `std::fs` calls
#[derive(Debug, Default, Clone)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactStore for LocalFileSystem {
    fn prepare_dir(&self, dir: &Path) -> FileSystemResult<()> {
        match fs::metadata(dir) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(FileSystemError::OutputPathConflict(dir.to_path_buf())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %dir.display(), "Creating output directory");
                fs::create_dir_all(dir)?;
                Ok(())
            }
            Err(e) => Err(FileSystemError::IoError(e)),
        }
    }

    fn clear_stale(&self, dir: &Path, suffix: &str) -> FileSystemResult<StaleCleanup> {
        let mut cleanup = StaleCleanup::default();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // DirEntry::file_type does not follow symlinks
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(suffix) {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => cleanup.removed.push(path),
                Err(e) => cleanup.failed.push((path, e)),
            }
        }

        cleanup.removed.sort();
        Ok(cleanup)
    }

    fn write_artifact(&self, path: &Path, content: &str) -> FileSystemResult<()> {
        fs::write(path, content)?;
        Ok(())
    }
}
