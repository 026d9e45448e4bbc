//! Deploy stage handling for output paths and the reload cadence.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Base directory dev runs are redirected into
const DEV_OUTPUT_PREFIX: &str = "/tmp/nginx-forge";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStage {
    Local,
    Dev,
    Test,
    Uat,
    #[default]
    Production,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown deploy stage '{0}', expected one of: local, dev, test, uat, production")]
pub struct UnknownStage(String);

impl FromStr for DeployStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(DeployStage::Local),
            "dev" => Ok(DeployStage::Dev),
            "test" => Ok(DeployStage::Test),
            "uat" => Ok(DeployStage::Uat),
            "production" | "prod" => Ok(DeployStage::Production),
            _ => Err(UnknownStage(s.to_string())),
        }
    }
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeployStage::Local => "local",
            DeployStage::Dev => "dev",
            DeployStage::Test => "test",
            DeployStage::Uat => "uat",
            DeployStage::Production => "production",
        })
    }
}

impl DeployStage {
    /// Interval between two reloads when none is given explicitly
    pub fn default_reload_interval(self) -> Duration {
        match self {
            DeployStage::Production => Duration::from_secs(7 * 24 * 60 * 60),
            _ => Duration::from_secs(10),
        }
    }
}

/// Map the configured output root to the directory actually written for `stage`.
///
/// `dev` flattens the path below `/tmp` (`/data/nginx` becomes
/// `/tmp/nginx-forge_data_nginx`), every other stage uses it unchanged.
pub fn resolve_output_root(path: &Path, stage: DeployStage) -> PathBuf {
    match stage {
        DeployStage::Dev => {
            let flattened = path
                .to_string_lossy()
                .trim_start_matches('/')
                .replace('/', "_");
            PathBuf::from(format!("{DEV_OUTPUT_PREFIX}_{flattened}"))
        }
        _ => path.to_path_buf(),
    }
}
