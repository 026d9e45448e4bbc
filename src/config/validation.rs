#![allow(clippy::collapsible_if)]

use std::{collections::HashMap, fmt};

use crate::config::models::{Config, HttpServer, MailServer, ServerEntity, StreamServer, Upstream};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Unknown top-level key '{field}'")]
    UnknownField { field: String },

    #[error("Both '{newest}' and its legacy alias '{legacy}' are set; keep only '{newest}'")]
    ConflictingAlias { newest: String, legacy: String },

    #[error("Duplicate {category} name '{name}' ({first} and {second})")]
    DuplicateName {
        category: String,
        name: String,
        first: String,
        second: String,
    },
}

/// Every problem found in one document, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "No errors"),
            [single] => write!(f, "{single}"),
            errors => {
                writeln!(f, "Found {} validation errors:", errors.len())?;
                for (i, error) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}

/// Semantic checks over an already decoded [`Config`]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire configuration, reporting every problem at once
    pub fn validate(config: &Config) -> Result<(), ValidationErrors> {
        let errors = Self::collect(config);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::new(errors))
        }
    }

    /// Run every check and return the problems found
    pub fn collect(config: &Config) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_cert_domain(
            "defaults.ssl_cert_domain",
            config.defaults.ssl_cert_domain.as_deref(),
        ) {
            errors.push(e);
        }

        for (i, upstream) in config.http_upstream.iter().enumerate() {
            Self::validate_upstream(&format!("http_upstream[{i}]"), upstream, &mut errors);
        }
        for (i, upstream) in config.stream_upstream.iter().enumerate() {
            Self::validate_upstream(&format!("stream_upstream[{i}]"), upstream, &mut errors);
        }
        for (i, server) in config.http_server.iter().enumerate() {
            Self::validate_http_server(&format!("http_server[{i}]"), server, &mut errors);
        }
        for (i, server) in config.stream_server.iter().enumerate() {
            Self::validate_stream_server(&format!("stream_server[{i}]"), server, &mut errors);
        }
        for (i, server) in config.mail_server.iter().enumerate() {
            Self::validate_mail_server(&format!("mail_server[{i}]"), server, &mut errors);
        }

        Self::check_duplicates(
            "http_upstream",
            config
                .http_upstream
                .iter()
                .enumerate()
                .filter(|(_, u)| u.enable)
                .map(|(i, u)| (i, u.name.clone())),
            &mut errors,
        );
        Self::check_duplicates(
            "stream_upstream",
            config
                .stream_upstream
                .iter()
                .enumerate()
                .filter(|(_, u)| u.enable)
                .map(|(i, u)| (i, u.name.clone())),
            &mut errors,
        );
        Self::check_duplicates(
            "http_server",
            Self::enabled_names(&config.http_server),
            &mut errors,
        );
        // `?` names cannot be rendered anyway; generation reports them per entity
        Self::check_duplicates(
            "stream_server",
            Self::enabled_names(&config.stream_server).filter(|(_, name)| name != "?"),
            &mut errors,
        );
        Self::check_duplicates(
            "mail_server",
            Self::enabled_names(&config.mail_server),
            &mut errors,
        );

        errors
    }

    /// Output names of enabled entities, paired with their position in the document
    fn enabled_names<E: ServerEntity>(
        entities: &[E],
    ) -> impl Iterator<Item = (usize, String)> + '_ {
        entities
            .iter()
            .enumerate()
            .filter(|(_, entity)| entity.enabled())
            .map(|(i, entity)| (i, entity.output_name()))
    }

    fn validate_upstream(field: &str, upstream: &Upstream, errors: &mut Vec<ValidationError>) {
        if let Err(e) = Self::validate_file_stem(&format!("{field}.name"), &upstream.name) {
            errors.push(e);
        }
        if upstream.content.trim().is_empty() {
            errors.push(ValidationError::InvalidField {
                field: format!("{field}.content"),
                message: "Upstream content cannot be empty".to_string(),
            });
        }
    }

    fn validate_http_server(field: &str, server: &HttpServer, errors: &mut Vec<ValidationError>) {
        if let Err(e) =
            Self::validate_file_stem(&format!("{field}.server_name"), &server.server_name)
        {
            errors.push(e);
        }

        Self::validate_ports(field, server.listen, server.listen_ssl, errors);
        Self::validate_inline_upstream(
            field,
            &server.upstream_name,
            &server.upstream_server,
            errors,
        );
        if let Err(e) = Self::validate_cert_domain(
            &format!("{field}.ssl_cert_domain"),
            server.ssl_cert_domain.as_deref(),
        ) {
            errors.push(e);
        }

        if server.root_path.is_some() && server.proxy_pass.is_some() {
            errors.push(ValidationError::InvalidField {
                field: format!("{field}.root_path"),
                message: "'root_path' and 'proxy_pass' are mutually exclusive".to_string(),
            });
        }

        if let Some(target) = &server.proxy_pass {
            if target.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: format!("{field}.proxy_pass"),
                    message: "Proxy target cannot be empty".to_string(),
                });
            }
        }

        if let Some(root) = &server.root_path {
            if root.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: format!("{field}.root_path"),
                    message: "Root path cannot be empty".to_string(),
                });
            }
        }

        if let Some(size) = &server.client_max_body_size {
            if size.trim().is_empty() || size.contains(char::is_whitespace) {
                errors.push(ValidationError::InvalidField {
                    field: format!("{field}.client_max_body_size"),
                    message: format!("'{size}' is not a valid nginx size (e.g. '10m')"),
                });
            }
        }

        for (path, _) in server.location.iter() {
            if path.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: format!("{field}.location"),
                    message: "Location path cannot be empty".to_string(),
                });
            }
        }
    }

    fn validate_stream_server(
        field: &str,
        server: &StreamServer,
        errors: &mut Vec<ValidationError>,
    ) {
        if let Some(name) = &server.name {
            if let Err(e) = Self::validate_file_stem(&format!("{field}.name"), name) {
                errors.push(e);
            }
        }

        Self::validate_ports(field, server.listen, server.listen_ssl, errors);
        Self::validate_inline_upstream(
            field,
            &server.upstream_name,
            &server.upstream_server,
            errors,
        );
        if let Err(e) = Self::validate_cert_domain(
            &format!("{field}.ssl_cert_domain"),
            server.ssl_cert_domain.as_deref(),
        ) {
            errors.push(e);
        }

        if server.proxy_pass.trim().is_empty() {
            errors.push(ValidationError::InvalidField {
                field: format!("{field}.proxy_pass"),
                message: "Proxy target cannot be empty".to_string(),
            });
        }
    }

    fn validate_mail_server(field: &str, server: &MailServer, errors: &mut Vec<ValidationError>) {
        if let Some(name) = &server.name {
            if let Err(e) = Self::validate_file_stem(&format!("{field}.name"), name) {
                errors.push(e);
            }
        }

        Self::validate_ports(field, Some(server.listen), None, errors);
        if let Err(e) = Self::validate_cert_domain(
            &format!("{field}.ssl_cert_domain"),
            server.ssl_cert_domain.as_deref(),
        ) {
            errors.push(e);
        }

        if server.auth_http.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: format!("{field}.auth_http"),
            });
        }
    }

    fn validate_ports(
        field: &str,
        listen: Option<u16>,
        listen_ssl: Option<u16>,
        errors: &mut Vec<ValidationError>,
    ) {
        for (name, port) in [("listen", listen), ("listen_ssl", listen_ssl)] {
            if port == Some(0) {
                errors.push(ValidationError::InvalidField {
                    field: format!("{field}.{name}"),
                    message: "Port must be between 1 and 65535".to_string(),
                });
            }
        }

        if let (Some(plain), Some(tls)) = (listen, listen_ssl) {
            if plain == tls {
                errors.push(ValidationError::InvalidField {
                    field: format!("{field}.listen_ssl"),
                    message: format!("Port {tls} is already used by 'listen'"),
                });
            }
        }
    }

    fn validate_inline_upstream(
        field: &str,
        name: &Option<String>,
        server: &Option<String>,
        errors: &mut Vec<ValidationError>,
    ) {
        match (name, server) {
            (Some(_), None) => errors.push(ValidationError::MissingField {
                field: format!("{field}.upstream_server"),
            }),
            (None, Some(_)) => errors.push(ValidationError::MissingField {
                field: format!("{field}.upstream_name"),
            }),
            _ => {}
        }
    }

    /// Names become file names; reject anything that would escape the category directory
    fn validate_file_stem(field: &str, name: &str) -> ValidationResult<()> {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: field.to_string(),
            });
        }

        if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("'{name}' cannot be used as a file name"),
            });
        }

        Ok(())
    }

    /// A certificate domain names a directory below the certificate root
    fn validate_cert_domain(field: &str, domain: Option<&str>) -> ValidationResult<()> {
        let Some(domain) = domain else {
            return Ok(());
        };

        if domain.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: "Certificate domain cannot be empty; omit the key to use the default"
                    .to_string(),
            });
        }

        if domain == "." || domain == ".." || domain.contains(['/', '\\', '\0']) {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("'{domain}' cannot be used as a certificate directory"),
            });
        }

        Ok(())
    }

    fn check_duplicates(
        category: &str,
        names: impl Iterator<Item = (usize, String)>,
        errors: &mut Vec<ValidationError>,
    ) {
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (i, name) in names {
            if let Some(first) = seen.get(&name) {
                errors.push(ValidationError::DuplicateName {
                    category: category.to_string(),
                    name: name.clone(),
                    first: format!("{category}[{first}]"),
                    second: format!("{category}[{i}]"),
                });
            } else {
                seen.insert(name, i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::{MailTlsMode, StreamServer};

    fn minimal_valid_config() -> Config {
        let mut server = HttpServer::new("a.example");
        server.listen = Some(10080);
        server.proxy_pass = Some("http://x".to_string());

        Config {
            http_server: vec![server],
            ..Config::default()
        }
    }

    #[test]
    fn validate_accepts_minimal_config() {
        assert!(ConfigValidator::validate(&minimal_valid_config()).is_ok());
    }

    #[test]
    fn validate_reports_every_problem_at_once() {
        let mut config = minimal_valid_config();
        config.http_server[0].root_path = Some("/srv/www".to_string());
        config.http_server[0].listen_ssl = Some(0);
        config.http_server[0].upstream_name = Some("backend".to_string());
        config.stream_server.push(StreamServer::new(" "));

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.to_string().starts_with("Found 4 validation errors:"));
    }

    #[test]
    fn validate_rejects_duplicate_server_names_among_enabled_entities() {
        let mut config = minimal_valid_config();
        let mut twin = config.http_server[0].clone();
        config.http_server.push(twin.clone());

        let errors = ConfigValidator::collect(&config);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::DuplicateName { name, .. }] if name == "a.example"
        ));

        // a disabled twin produces no file and therefore no collision
        config.http_server.pop();
        twin.enable = false;
        config.http_server.push(twin);
        assert!(ConfigValidator::collect(&config).is_empty());
    }

    #[test]
    fn validate_rejects_colliding_stream_names() {
        let mut first = StreamServer::new("10.0.0.1:22");
        first.listen = Some(2222);
        let mut second = StreamServer::new("10.0.0.2:22");
        second.listen = Some(2222);

        let config = Config {
            stream_server: vec![first, second.clone()],
            ..Config::default()
        };
        assert_eq!(ConfigValidator::collect(&config).len(), 1);

        second.name = Some("ssh-b".to_string());
        let config = Config {
            stream_server: vec![config.stream_server[0].clone(), second],
            ..Config::default()
        };
        assert!(ConfigValidator::collect(&config).is_empty());
    }

    #[test]
    fn validate_rejects_names_that_escape_the_output_directory() {
        let mut config = minimal_valid_config();
        config.http_server[0].server_name = "../etc/passwd".to_string();

        assert!(matches!(
            ConfigValidator::collect(&config).as_slice(),
            [ValidationError::InvalidField { field, .. }] if field == "http_server[0].server_name"
        ));
    }

    #[test]
    fn validate_reports_duplicates_by_document_position() {
        let mut config = minimal_valid_config();
        let mut disabled = HttpServer::new("other.example");
        disabled.enable = false;
        let twin = config.http_server[0].clone();
        config.http_server.insert(0, disabled);
        config.http_server.push(twin);

        let errors = ConfigValidator::collect(&config);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateName {
                category: "http_server".to_string(),
                name: "a.example".to_string(),
                first: "http_server[1]".to_string(),
                second: "http_server[2]".to_string(),
            }]
        );
    }

    #[test]
    fn validate_rejects_empty_entity_certificate_domain() {
        let mut config = minimal_valid_config();
        config.defaults.ssl_cert_domain = Some("d.example".to_string());
        config.http_server[0].listen_ssl = Some(443);
        config.http_server[0].ssl_cert_domain = Some(String::new());

        assert!(matches!(
            ConfigValidator::collect(&config).as_slice(),
            [ValidationError::InvalidField { field, .. }]
                if field == "http_server[0].ssl_cert_domain"
        ));
    }

    #[test]
    fn validate_rejects_certificate_domains_that_escape_the_certificate_root() {
        let mut stream = StreamServer::new("10.0.0.1:22");
        stream.listen_ssl = Some(2222);
        stream.ssl_cert_domain = Some("../secrets".to_string());

        let mut config = Config {
            stream_server: vec![stream],
            mail_server: vec![MailServer {
                enable: true,
                name: None,
                listen: 465,
                mode: MailTlsMode::Ssl,
                auth_http: "http://auth/".to_string(),
                ssl_cert_domain: Some("..".to_string()),
            }],
            ..Config::default()
        };
        config.defaults.ssl_cert_domain = Some(" ".to_string());

        let fields: Vec<String> = ConfigValidator::collect(&config)
            .into_iter()
            .map(|e| match e {
                ValidationError::InvalidField { field, .. } => field,
                other => panic!("unexpected error {other:?}"),
            })
            .collect();
        assert_eq!(
            fields,
            vec![
                "defaults.ssl_cert_domain",
                "stream_server[0].ssl_cert_domain",
                "mail_server[0].ssl_cert_domain",
            ]
        );
    }

    #[test]
    fn validate_requires_mail_auth_endpoint() {
        let config = Config {
            mail_server: vec![MailServer {
                enable: true,
                name: None,
                listen: 587,
                mode: MailTlsMode::Starttls,
                auth_http: String::new(),
                ssl_cert_domain: None,
            }],
            ..Config::default()
        };

        assert_eq!(
            ConfigValidator::collect(&config),
            vec![ValidationError::MissingField {
                field: "mail_server[0].auth_http".to_string()
            }]
        );
    }
}
