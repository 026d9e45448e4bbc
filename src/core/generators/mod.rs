//! One generation function per artifact category.
//!
//! Every generator is a pure function of one entity plus the shared
//! [`Defaults`](crate::config::Defaults); the [`Category`] tag selects which one
//! runs. Nothing here touches the filesystem.

pub mod common;
pub mod http_default;
pub mod http_server;
pub mod mail_server;
pub mod stream_server;
pub mod upstream;

use serde::Serialize;
use thiserror::Error;

use crate::{
    config::{Config, ServerEntity},
    core::template::TemplateError,
};

/// Error raised while generating a single artifact
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("{entity}: neither listen nor listen_ssl is set")]
    MissingListen { entity: String },

    #[error("{entity}: listen_ssl is set but no ssl_cert_domain is configured")]
    MissingSslDomain { entity: String },

    #[error("{entity}: no '/' location and neither root_path nor proxy_pass is set")]
    MissingLocationSource { entity: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl GenerateError {
    /// True when the error points at a bug in the generators rather than the input
    pub fn is_defect(&self) -> bool {
        matches!(self, GenerateError::Template(_))
    }
}

/// Rendered text for one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File stem, the orchestrator appends the suffix
    pub name: String,
    pub content: String,
    /// Parts of the entity that could not be rendered while the rest could
    pub partial_failures: Vec<GenerateError>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            partial_failures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Rendered(Artifact),
    /// The entity is disabled
    Skipped,
}

impl Generation {
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Generation::Rendered(artifact) => Some(artifact),
            Generation::Skipped => None,
        }
    }
}

pub type GenerateResult = Result<Generation, GenerateError>;

/// The result of generating one entity, tagged with its log label
#[derive(Debug)]
pub struct EntityOutcome {
    pub entity: String,
    pub result: GenerateResult,
}

/// The closed set of artifact kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    HttpUpstream,
    HttpServer,
    StreamUpstream,
    StreamServer,
    HttpDefault,
    MailServer,
}

impl Category {
    /// Processing order of a generation run
    pub const ALL: [Category; 6] = [
        Category::HttpUpstream,
        Category::HttpServer,
        Category::StreamUpstream,
        Category::StreamServer,
        Category::HttpDefault,
        Category::MailServer,
    ];

    /// Directory name below the output root
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::HttpUpstream => "http_upstream.d",
            Category::HttpServer => "http_server.d",
            Category::StreamUpstream => "stream_upstream.d",
            Category::StreamServer => "stream_server.d",
            Category::HttpDefault => "http_default.d",
            Category::MailServer => "mail_server.d",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::HttpUpstream => "HttpUpstream",
            Category::HttpServer => "HttpServer",
            Category::StreamUpstream => "StreamUpstream",
            Category::StreamServer => "StreamServer",
            Category::HttpDefault => "HttpDefault",
            Category::MailServer => "MailServer",
        }
    }

    /// Run this category's generator over every entity it owns
    pub fn generate(self, config: &Config) -> Vec<EntityOutcome> {
        let defaults = &config.defaults;
        match self {
            Category::HttpUpstream => config
                .http_upstream
                .iter()
                .map(|u| EntityOutcome {
                    entity: format!("HttpUpstream: [{}]", u.name),
                    result: upstream::generate(u),
                })
                .collect(),
            Category::StreamUpstream => config
                .stream_upstream
                .iter()
                .map(|u| EntityOutcome {
                    entity: format!("StreamUpstream: [{}]", u.name),
                    result: upstream::generate(u),
                })
                .collect(),
            Category::HttpServer => config
                .http_server
                .iter()
                .map(|s| EntityOutcome {
                    entity: s.label(),
                    result: http_server::generate(s, defaults),
                })
                .collect(),
            Category::StreamServer => config
                .stream_server
                .iter()
                .map(|s| EntityOutcome {
                    entity: s.label(),
                    result: stream_server::generate(s, defaults),
                })
                .collect(),
            Category::MailServer => config
                .mail_server
                .iter()
                .map(|s| EntityOutcome {
                    entity: s.label(),
                    result: mail_server::generate(s, defaults),
                })
                .collect(),
            Category::HttpDefault => {
                let ports = http_default::DefaultPorts::collect(&config.http_server);
                vec![EntityOutcome {
                    entity: "HttpDefault".to_string(),
                    result: http_default::generate(&ports),
                }]
            }
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpServer, Upstream};

    #[test]
    fn categories_have_distinct_directories() {
        let mut dirs: Vec<_> = Category::ALL.iter().map(|c| c.dir_name()).collect();
        dirs.sort_unstable();
        dirs.dedup();
        assert_eq!(dirs.len(), Category::ALL.len());
    }

    #[test]
    fn default_category_always_yields_one_artifact() {
        let outcomes = Category::HttpDefault.generate(&Config::default());
        assert_eq!(outcomes.len(), 1);
        let Ok(Generation::Rendered(artifact)) = &outcomes[0].result else {
            panic!("default artifact missing: {:?}", outcomes[0].result);
        };
        assert_eq!(artifact.name, "default");
    }

    #[test]
    fn each_entity_gets_its_own_outcome() {
        let mut broken = HttpServer::new("broken.example");
        broken.proxy_pass = Some("http://x".to_string());

        let mut ok = HttpServer::new("ok.example");
        ok.listen = Some(80);
        ok.proxy_pass = Some("http://x".to_string());

        let config = Config {
            http_upstream: vec![Upstream::new("pool", "server 10.0.0.1:80;")],
            http_server: vec![broken, ok],
            ..Config::default()
        };

        let outcomes = Category::HttpServer.generate(&config);
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0].result,
            Err(GenerateError::MissingListen { .. })
        ));
        assert!(matches!(outcomes[1].result, Ok(Generation::Rendered(_))));

        assert_eq!(Category::HttpUpstream.generate(&config).len(), 1);
        assert!(Category::MailServer.generate(&config).is_empty());
    }

    #[test]
    fn template_errors_are_defects() {
        let err = GenerateError::from(TemplateError::UnboundPlaceholder {
            name: "x".to_string(),
        });
        assert!(err.is_defect());
        assert!(
            !GenerateError::MissingListen {
                entity: "e".to_string()
            }
            .is_defect()
        );
    }
}
