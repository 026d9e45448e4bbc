use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::{
    config::Config,
    core::generators::{Category, GenerateError, Generation},
    ports::file_system::{ArtifactStore, FileSystemError},
};

/// Suffix of every generated artifact unless configured otherwise
pub const DEFAULT_SUFFIX: &str = "conf";

/// Where artifacts go: `<root>/<category dir>/<name>.<suffix>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub suffix: String,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    pub fn artifact_path(&self, category: Category, name: &str) -> PathBuf {
        self.category_dir(category)
            .join(format!("{name}.{}", self.suffix))
    }
}

/// Errors that abort a whole generation run
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Output directory {} is occupied by a non-directory", path.display())]
    OutputPathConflict { path: PathBuf },

    #[error("Cannot prepare output directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: FileSystemError,
    },

    #[error("Generator defect while rendering {entity}: {source}")]
    Template {
        entity: String,
        #[source]
        source: GenerateError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    PartialFailure,
}

/// What happened to one category directory during a run
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub directory: PathBuf,
    pub written: Vec<PathBuf>,
    pub skipped: usize,
    pub failed: usize,
    /// Artifacts of the previous run that were not regenerated
    pub removed_stale: Vec<PathBuf>,
}

impl CategoryReport {
    fn new(category: Category, directory: PathBuf) -> Self {
        Self {
            category,
            directory,
            written: Vec::new(),
            skipped: 0,
            failed: 0,
            removed_stale: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub categories: Vec<CategoryReport>,
}

impl GenerationReport {
    pub fn outcome(&self) -> Outcome {
        if self.failed() == 0 {
            Outcome::Success
        } else {
            Outcome::PartialFailure
        }
    }

    pub fn written(&self) -> usize {
        self.categories.iter().map(|c| c.written.len()).sum()
    }

    pub fn skipped(&self) -> usize {
        self.categories.iter().map(|c| c.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.categories.iter().map(|c| c.failed).sum()
    }

    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Drives one generation pass over every category.
///
/// Runs are not synchronized: two concurrent runs against the same output root
/// race on the stale-file cleanup.
pub struct Orchestrator<S> {
    store: S,
    layout: OutputLayout,
}

impl<S: ArtifactStore> Orchestrator<S> {
    pub fn new(store: S, layout: OutputLayout) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Generate and write every artifact described by `config`
    ///
    /// Per-entity failures are logged and counted in the report; only output
    /// directory problems and generator defects abort the run.
    pub fn run(&self, config: &Config) -> Result<GenerationReport, OrchestratorError> {
        tracing::info!(root = %self.layout.root.display(), "Generating nginx configuration");

        let mut report = GenerationReport::default();
        for category in Category::ALL {
            report.categories.push(self.run_category(category, config)?);
        }

        tracing::info!(
            written = report.written(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Generation finished"
        );
        Ok(report)
    }

    fn run_category(
        &self,
        category: Category,
        config: &Config,
    ) -> Result<CategoryReport, OrchestratorError> {
        let _span = tracing::info_span!("category", category = %category).entered();
        let dir = self.layout.category_dir(category);

        self.prepare(&dir)?;
        let cleanup = self
            .store
            .clear_stale(&dir, &self.layout.suffix)
            .map_err(|source| OrchestratorError::Io {
                path: dir.clone(),
                source,
            })?;
        for (path, e) in &cleanup.failed {
            tracing::warn!(path = %path.display(), "Failed to remove stale artifact: {}", e);
        }

        let mut report = CategoryReport::new(category, dir);

        for outcome in category.generate(config) {
            let artifact = match outcome.result {
                Ok(Generation::Rendered(artifact)) => artifact,
                Ok(Generation::Skipped) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) if e.is_defect() => {
                    return Err(OrchestratorError::Template {
                        entity: outcome.entity,
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::error!(entity = %outcome.entity, "Generation failed: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            for failure in &artifact.partial_failures {
                tracing::error!(entity = %outcome.entity, "Partial generation failure: {}", failure);
            }
            report.failed += artifact.partial_failures.len();

            let path = self.layout.artifact_path(category, &artifact.name);
            match self.store.write_artifact(&path, &artifact.content) {
                Ok(()) => {
                    tracing::info!(entity = %outcome.entity, path = %path.display(), "Generated");
                    report.written.push(path);
                }
                Err(e) => {
                    tracing::error!(
                        entity = %outcome.entity,
                        path = %path.display(),
                        "Failed to write artifact: {}",
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        report.removed_stale = cleanup
            .removed
            .into_iter()
            .filter(|path| !report.written.contains(path))
            .collect();
        for path in &report.removed_stale {
            tracing::info!(path = %path.display(), "Removed stale artifact");
        }

        Ok(report)
    }

    fn prepare(&self, dir: &Path) -> Result<(), OrchestratorError> {
        self.store.prepare_dir(dir).map_err(|e| match e {
            FileSystemError::OutputPathConflict(path) => {
                OrchestratorError::OutputPathConflict { path }
            }
            source => OrchestratorError::Io {
                path: dir.to_path_buf(),
                source,
            },
        })
    }
}
