//! Configuration data structures for nginx-forge.
//!
//! These types map directly to the TOML (also JSON / YAML) input document. They are
//! serde‑friendly and carry defaults so that minimal documents remain concise. Entities
//! are decoded one at a time by the loader, which is why each of them rejects unknown
//! fields on its own.
use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
};

/// Default base directory of the certificate folders written by the certificate agent
pub const DEFAULT_SSL_CERT_DIR: &str = "/data/dnsrobocert/live";
/// Default directory of the shared nginx snippets
pub const DEFAULT_SNIPPETS_DIR: &str = "/app/nginx/snippets";
/// Default `Strict-Transport-Security` max-age (one year)
pub const DEFAULT_HSTS_MAX_AGE: u64 = 31_536_000;

fn default_true() -> bool {
    true
}

fn default_comment() -> String {
    "---".to_string()
}

fn default_hsts_max_age() -> u64 {
    DEFAULT_HSTS_MAX_AGE
}

/// Process-wide fallback values applied when an entity omits the matching field.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    /// Certificate domain used by entities without their own `ssl_cert_domain`
    pub ssl_cert_domain: Option<String>,
    /// Directory holding one `<domain>/{fullchain,privkey}.pem` folder per certificate
    pub ssl_cert_dir: String,
    /// Directory holding `ssl-params.conf`, `proxy-params.conf` and `websocket.conf`
    pub snippets_dir: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            ssl_cert_domain: None,
            ssl_cert_dir: DEFAULT_SSL_CERT_DIR.to_string(),
            snippets_dir: DEFAULT_SNIPPETS_DIR.to_string(),
        }
    }
}

/// Named backend pool. Shared by the http and stream upstream categories.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Upstream {
    pub name: String,
    /// Raw body of the upstream block, emitted verbatim
    pub content: String,
    #[serde(default = "default_true")]
    pub enable: bool,
}

impl Upstream {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            enable: true,
        }
    }
}

/// Ordered `path -> raw directive body` mapping of custom locations.
///
/// Source order is preserved because nginx evaluates regex locations in the order they
/// appear. A key given twice keeps its first position and its last body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationMap(Vec<(String, String)>);

impl LocationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, body: impl Into<String>) {
        let path = path.into();
        let body = body.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == path) {
            Some(entry) => entry.1 = body,
            None => self.0.push((path, body)),
        }
    }

    pub fn contains_key(&self, path: &str) -> bool {
        self.0.iter().any(|(existing, _)| existing == path)
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == path)
            .map(|(_, body)| body.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(path, body)| (path.as_str(), body.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocationMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (path, body) in iter {
            map.insert(path, body);
        }
        map
    }
}

impl Serialize for LocationMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for LocationMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LocationMapVisitor;

        impl<'de> Visitor<'de> for LocationMapVisitor {
            type Value = LocationMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a table of location path to directive body")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = LocationMap::new();
                while let Some((path, body)) = access.next_entry::<String, String>()? {
                    map.insert(path, body);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(LocationMapVisitor)
    }
}

/// Capability set shared by every server-like entity (http, stream, mail).
pub trait ServerEntity {
    fn enabled(&self) -> bool;
    /// Plaintext port
    fn listen(&self) -> Option<u16>;
    /// TLS port
    fn listen_ssl(&self) -> Option<u16>;
    fn ssl_cert_domain(&self) -> Option<&str>;
    /// `(upstream_name, upstream_server)` when both halves are configured
    fn inline_upstream(&self) -> Option<(&str, &str)>;
    /// File stem of the generated artifact
    fn output_name(&self) -> String;
    /// Human readable identity used in logs and errors
    fn label(&self) -> String;
}

fn pair<'a>(name: &'a Option<String>, server: &'a Option<String>) -> Option<(&'a str, &'a str)> {
    match (name, server) {
        (Some(name), Some(server)) => Some((name.as_str(), server.as_str())),
        _ => None,
    }
}

/// One http `server {}` definition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HttpServer {
    #[serde(default = "default_true")]
    pub enable: bool,
    /// Routing key and file name of the generated artifact
    pub server_name: String,

    pub listen: Option<u16>,
    pub listen_ssl: Option<u16>,
    #[serde(default = "default_true")]
    pub listen_http2: bool,
    #[serde(default = "default_true")]
    pub listen_ipv6: bool,

    pub ssl_cert_domain: Option<String>,

    pub upstream_name: Option<String>,
    pub upstream_server: Option<String>,

    /// Serve `/` from this directory (exclusive with `proxy_pass`)
    pub root_path: Option<String>,
    /// Proxy `/` to this target (exclusive with `root_path`)
    pub proxy_pass: Option<String>,
    #[serde(default)]
    pub location: LocationMap,

    /// Raw nginx size, e.g. "100m"
    pub client_max_body_size: Option<String>,
    #[serde(default)]
    pub support_websocket: bool,
    #[serde(default)]
    pub hsts: bool,
    #[serde(default = "default_hsts_max_age")]
    pub hsts_max_age: u64,
}

impl HttpServer {
    /// Create a server with every optional field at its default
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            enable: true,
            server_name: server_name.into(),
            listen: None,
            listen_ssl: None,
            listen_http2: true,
            listen_ipv6: true,
            ssl_cert_domain: None,
            upstream_name: None,
            upstream_server: None,
            root_path: None,
            proxy_pass: None,
            location: LocationMap::new(),
            client_max_body_size: None,
            support_websocket: false,
            hsts: false,
            hsts_max_age: DEFAULT_HSTS_MAX_AGE,
        }
    }
}

impl ServerEntity for HttpServer {
    fn enabled(&self) -> bool {
        self.enable
    }

    fn listen(&self) -> Option<u16> {
        self.listen
    }

    fn listen_ssl(&self) -> Option<u16> {
        self.listen_ssl
    }

    fn ssl_cert_domain(&self) -> Option<&str> {
        self.ssl_cert_domain.as_deref()
    }

    fn inline_upstream(&self) -> Option<(&str, &str)> {
        pair(&self.upstream_name, &self.upstream_server)
    }

    fn output_name(&self) -> String {
        self.server_name.clone()
    }

    fn label(&self) -> String {
        match (&self.root_path, &self.proxy_pass) {
            (Some(root), None) => format!("HttpServer: [{root}] => [{}]", self.server_name),
            (None, Some(target)) => format!("HttpServer: [{target}] => [{}]", self.server_name),
            _ => format!("HttpServer: [{}]", self.server_name),
        }
    }
}

/// One stream (TCP/UDP) `server {}` definition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StreamServer {
    #[serde(default = "default_true")]
    pub enable: bool,
    /// Explicit file stem; derived from the ports when absent
    pub name: Option<String>,
    #[serde(default = "default_comment")]
    pub comment: String,

    pub listen: Option<u16>,
    pub listen_ssl: Option<u16>,

    pub ssl_cert_domain: Option<String>,

    pub upstream_name: Option<String>,
    pub upstream_server: Option<String>,

    pub proxy_pass: String,
}

impl StreamServer {
    pub fn new(proxy_pass: impl Into<String>) -> Self {
        Self {
            enable: true,
            name: None,
            comment: default_comment(),
            listen: None,
            listen_ssl: None,
            ssl_cert_domain: None,
            upstream_name: None,
            upstream_server: None,
            proxy_pass: proxy_pass.into(),
        }
    }

    /// Port based name: `p<listen>`, `p<listen_ssl>`, `p<listen>_p<listen_ssl>`, or `?`.
    pub fn derived_name(&self) -> String {
        match (self.listen, self.listen_ssl) {
            (Some(plain), Some(tls)) => format!("p{plain}_p{tls}"),
            (Some(port), None) | (None, Some(port)) => format!("p{port}"),
            (None, None) => "?".to_string(),
        }
    }
}

impl ServerEntity for StreamServer {
    fn enabled(&self) -> bool {
        self.enable
    }

    fn listen(&self) -> Option<u16> {
        self.listen
    }

    fn listen_ssl(&self) -> Option<u16> {
        self.listen_ssl
    }

    fn ssl_cert_domain(&self) -> Option<&str> {
        self.ssl_cert_domain.as_deref()
    }

    fn inline_upstream(&self) -> Option<(&str, &str)> {
        pair(&self.upstream_name, &self.upstream_server)
    }

    fn output_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.derived_name())
    }

    fn label(&self) -> String {
        format!("StreamServer: [{}] => [{}]", self.output_name(), self.proxy_pass)
    }
}

/// How a mail listener negotiates TLS.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailTlsMode {
    /// Implicit TLS on connect
    Ssl,
    /// Plaintext greeting upgraded with STARTTLS
    Starttls,
}

/// One SMTP proxy `server {}` definition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MailServer {
    #[serde(default = "default_true")]
    pub enable: bool,
    pub name: Option<String>,
    pub listen: u16,
    #[serde(rename = "type")]
    pub mode: MailTlsMode,
    /// Authentication endpoint consulted by nginx for every session
    pub auth_http: String,
    pub ssl_cert_domain: Option<String>,
}

impl ServerEntity for MailServer {
    fn enabled(&self) -> bool {
        self.enable
    }

    fn listen(&self) -> Option<u16> {
        match self.mode {
            MailTlsMode::Starttls => Some(self.listen),
            MailTlsMode::Ssl => None,
        }
    }

    fn listen_ssl(&self) -> Option<u16> {
        match self.mode {
            MailTlsMode::Ssl => Some(self.listen),
            MailTlsMode::Starttls => None,
        }
    }

    fn ssl_cert_domain(&self) -> Option<&str> {
        self.ssl_cert_domain.as_deref()
    }

    fn inline_upstream(&self) -> Option<(&str, &str)> {
        None
    }

    fn output_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("p{}", self.listen))
    }

    fn label(&self) -> String {
        format!("MailServer: [{}] => [{}]", self.listen, self.auth_http)
    }
}

/// Root of a decoded input document.
///
/// Built fresh by the loader on every run and only borrowed by the orchestrator.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub defaults: Defaults,
    pub http_upstream: Vec<Upstream>,
    pub http_server: Vec<HttpServer>,
    pub stream_upstream: Vec<Upstream>,
    pub stream_server: Vec<StreamServer>,
    pub mail_server: Vec<MailServer>,
}
