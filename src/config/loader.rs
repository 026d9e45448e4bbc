use std::path::{Path, PathBuf};

use config::{Config as Settings, File, FileFormat};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::{
    models::{Config, Defaults},
    validation::{ConfigValidator, ValidationError, ValidationErrors},
};

/// What to do when a document sets both the current key and its legacy alias
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AliasPolicy {
    /// The current key wins, the legacy one is ignored with a warning
    #[default]
    PreferNewest,
    /// Setting both keys is a validation error
    Reject,
}

/// Options influencing how a document is decoded
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub alias_policy: AliasPolicy,
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Cannot read config file {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot decode config file {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    #[error("Invalid config file {}: {errors}", path.display())]
    Validation {
        path: PathBuf,
        errors: ValidationErrors,
    },
}

/// A top-level key together with the older name it replaced
struct KeyAlias {
    current: &'static str,
    legacy: Option<&'static str>,
}

const DEFAULTS_KEY: KeyAlias = KeyAlias {
    current: "defaults",
    legacy: Some("default"),
};
const HTTP_UPSTREAM_KEY: KeyAlias = KeyAlias {
    current: "http_upstream",
    legacy: None,
};
const HTTP_SERVER_KEY: KeyAlias = KeyAlias {
    current: "http_server",
    legacy: Some("http_d"),
};
const STREAM_UPSTREAM_KEY: KeyAlias = KeyAlias {
    current: "stream_upstream",
    legacy: None,
};
const STREAM_SERVER_KEY: KeyAlias = KeyAlias {
    current: "stream_server",
    legacy: Some("stream_d"),
};
const MAIL_SERVER_KEY: KeyAlias = KeyAlias {
    current: "mail_server",
    legacy: None,
};

/// Load and validate configuration from a file with default options
pub fn load_config(config_path: impl AsRef<Path>) -> Result<Config, LoadError> {
    load_config_with(config_path, &LoadOptions::default())
}

/// Load and validate configuration from a file
///
/// The format follows the extension (`.yaml`/`.yml`, `.json`), anything else is TOML.
pub fn load_config_with(
    config_path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<Config, LoadError> {
    let config_path = config_path.as_ref();

    let content = std::fs::read_to_string(config_path).map_err(|source| LoadError::FileAccess {
        path: config_path.to_path_buf(),
        source,
    })?;

    decode(config_path, &content, detect_format(config_path), options)
}

/// Decode an in-memory TOML document, mainly for embedding and tests
pub fn load_config_str(content: &str, options: &LoadOptions) -> Result<Config, LoadError> {
    decode(Path::new("<inline>"), content, FileFormat::Toml, options)
}

fn detect_format(config_path: &Path) -> FileFormat {
    match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    }
}

fn decode(
    source: &Path,
    content: &str,
    format: FileFormat,
    options: &LoadOptions,
) -> Result<Config, LoadError> {
    let document = Settings::builder()
        .add_source(File::from_str(content, format))
        .build()
        .and_then(|settings| settings.try_deserialize::<Map<String, Value>>())
        .map_err(|e| LoadError::Decode {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;

    let config = DocumentDecoder::new(options)
        .decode(document)
        .map_err(|errors| LoadError::Validation {
            path: source.to_path_buf(),
            errors,
        })?;

    tracing::debug!(
        http_upstreams = config.http_upstream.len(),
        http_servers = config.http_server.len(),
        stream_upstreams = config.stream_upstream.len(),
        stream_servers = config.stream_server.len(),
        mail_servers = config.mail_server.len(),
        "Loaded configuration from {}",
        source.display()
    );

    Ok(config)
}

/// Maps a generic document onto [`Config`], collecting every problem instead of
/// stopping at the first one
struct DocumentDecoder<'a> {
    options: &'a LoadOptions,
    errors: Vec<ValidationError>,
}

impl<'a> DocumentDecoder<'a> {
    fn new(options: &'a LoadOptions) -> Self {
        Self {
            options,
            errors: Vec::new(),
        }
    }

    fn decode(mut self, mut document: Map<String, Value>) -> Result<Config, ValidationErrors> {
        let defaults = match self.take(&mut document, &DEFAULTS_KEY) {
            Some((key, value)) => self
                .decode_entity::<Defaults>(key.to_string(), value)
                .unwrap_or_default(),
            None => Defaults::default(),
        };

        let config = Config {
            defaults,
            http_upstream: self.take_list(&mut document, &HTTP_UPSTREAM_KEY),
            http_server: self.take_list(&mut document, &HTTP_SERVER_KEY),
            stream_upstream: self.take_list(&mut document, &STREAM_UPSTREAM_KEY),
            stream_server: self.take_list(&mut document, &STREAM_SERVER_KEY),
            mail_server: self.take_list(&mut document, &MAIL_SERVER_KEY),
        };

        for key in document.keys() {
            self.errors.push(ValidationError::UnknownField { field: key.clone() });
        }

        self.errors.extend(ConfigValidator::collect(&config));

        if self.errors.is_empty() {
            Ok(config)
        } else {
            Err(ValidationErrors::new(self.errors))
        }
    }

    /// Remove a key (or its legacy alias) from the document, applying the alias policy
    fn take(
        &mut self,
        document: &mut Map<String, Value>,
        alias: &KeyAlias,
    ) -> Option<(&'static str, Value)> {
        let current = document.remove(alias.current);
        let legacy = alias
            .legacy
            .and_then(|key| document.remove(key).map(|value| (key, value)));

        match (current, legacy) {
            (Some(value), None) => Some((alias.current, value)),
            (None, Some((key, value))) => {
                tracing::debug!("Using legacy key '{}' for '{}'", key, alias.current);
                Some((key, value))
            }
            (Some(value), Some((key, _))) => match self.options.alias_policy {
                AliasPolicy::PreferNewest => {
                    tracing::warn!(
                        "Both '{}' and legacy '{}' are set, ignoring '{}'",
                        alias.current,
                        key,
                        key
                    );
                    Some((alias.current, value))
                }
                AliasPolicy::Reject => {
                    self.errors.push(ValidationError::ConflictingAlias {
                        newest: alias.current.to_string(),
                        legacy: key.to_string(),
                    });
                    None
                }
            },
            (None, None) => None,
        }
    }

    fn take_list<T: DeserializeOwned>(
        &mut self,
        document: &mut Map<String, Value>,
        alias: &KeyAlias,
    ) -> Vec<T> {
        let Some((key, value)) = self.take(document, alias) else {
            return Vec::new();
        };

        let Value::Array(items) = value else {
            self.errors.push(ValidationError::InvalidField {
                field: key.to_string(),
                message: format!("expected an array of tables, e.g. [[{key}]]"),
            });
            return Vec::new();
        };

        let mut entities = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            if let Some(entity) = self.decode_entity(format!("{key}[{i}]"), item) {
                entities.push(entity);
            }
        }
        entities
    }

    fn decode_entity<T: DeserializeOwned>(&mut self, field: String, value: Value) -> Option<T> {
        match serde_json::from_value::<T>(value) {
            Ok(entity) => Some(entity),
            Err(e) => {
                self.errors.push(ValidationError::InvalidField {
                    field,
                    message: e.to_string(),
                });
                None
            }
        }
    }
}
