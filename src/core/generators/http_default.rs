use std::collections::BTreeSet;

use crate::{
    config::HttpServer,
    core::{
        generators::{Artifact, GenerateResult, Generation, common},
        template::{self, Bindings},
    },
};

/// File stem of the catch-all artifact
pub const DEFAULT_ARTIFACT_NAME: &str = "default";

const EMPTY_MAP: &str = "map \"\" $empty {
    default \"\";
}
";

const PLAINTEXT_TEMPLATE: &str = "server {
    listen {{ port }} default_server;
    listen [::]:{{ port }} default_server;

    server_name _;

    return 444;
}
";

// An empty certificate makes the handshake fail for unknown SNI names.
const TLS_TEMPLATE: &str = "server {
    listen {{ port }} ssl default_server;
    listen [::]:{{ port }} ssl default_server;
    http2 on;

    server_name _;

    ssl_ciphers aNULL;
    ssl_certificate data:$empty;
    ssl_certificate_key data:$empty;

    return 444;
}
";

const NO_PORTS: &str = "# no enabled http server listens on any port\n";

/// Distinct ports used by enabled http servers, in ascending order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultPorts {
    pub plaintext: BTreeSet<u16>,
    pub tls: BTreeSet<u16>,
}

impl DefaultPorts {
    pub fn collect(servers: &[HttpServer]) -> Self {
        let mut ports = Self::default();
        for server in servers.iter().filter(|s| s.enable) {
            ports.plaintext.extend(server.listen);
            ports.tls.extend(server.listen_ssl);
        }
        ports
    }

    pub fn is_empty(&self) -> bool {
        self.plaintext.is_empty() && self.tls.is_empty()
    }
}

/// Render one catch-all `server {}` per port that rejects unmatched hosts
pub fn generate(ports: &DefaultPorts) -> GenerateResult {
    if ports.is_empty() {
        return Ok(Generation::Rendered(Artifact::new(
            DEFAULT_ARTIFACT_NAME,
            NO_PORTS,
        )));
    }

    let mut blocks = Vec::with_capacity(ports.plaintext.len() + ports.tls.len() + 1);

    if !ports.tls.is_empty() {
        blocks.push(EMPTY_MAP.to_string());
    }

    for port in &ports.plaintext {
        blocks.push(template::render(
            PLAINTEXT_TEMPLATE,
            &Bindings::new().with("port", *port),
        )?);
    }

    for port in &ports.tls {
        blocks.push(template::render(
            TLS_TEMPLATE,
            &Bindings::new().with("port", *port),
        )?);
    }

    Ok(Generation::Rendered(Artifact::new(
        DEFAULT_ARTIFACT_NAME,
        common::tidy(&blocks.join("\n")),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(name: &str, listen: Option<u16>, listen_ssl: Option<u16>) -> HttpServer {
        let mut server = HttpServer::new(name);
        server.listen = listen;
        server.listen_ssl = listen_ssl;
        server.proxy_pass = Some("http://x".to_string());
        server
    }

    fn content(ports: &DefaultPorts) -> String {
        match generate(ports) {
            Ok(Generation::Rendered(artifact)) => artifact.content,
            other => panic!("expected an artifact, got {other:?}"),
        }
    }

    #[test]
    fn ports_are_deduplicated_and_sorted() {
        let mut disabled = server("c.example", Some(8080), Some(8443));
        disabled.enable = false;

        let ports = DefaultPorts::collect(&[
            server("a.example", Some(80), Some(443)),
            server("b.example", Some(80), None),
            server("d.example", None, Some(10443)),
            server("e.example", Some(10080), None),
            disabled,
        ]);

        assert_eq!(ports.plaintext.iter().copied().collect::<Vec<_>>(), vec![80, 10080]);
        assert_eq!(ports.tls.iter().copied().collect::<Vec<_>>(), vec![443, 10443]);
    }

    #[test]
    fn one_block_per_port() {
        let ports = DefaultPorts::collect(&[
            server("a.example", Some(80), Some(443)),
            server("b.example", Some(8080), None),
        ]);
        let content = content(&ports);

        assert!(content.starts_with("map \"\" $empty {\n    default \"\";\n}\n\nserver {"));
        assert_eq!(content.matches("server {").count(), 3);
        assert_eq!(content.matches("return 444;").count(), 3);
        assert!(content.contains("listen 80 default_server;\n    listen [::]:80 default_server;"));
        assert!(content.contains("listen 8080 default_server;"));
        assert!(content.contains("listen 443 ssl default_server;\n    listen [::]:443 ssl default_server;\n    http2 on;"));
        assert!(content.contains("ssl_certificate data:$empty;"));
    }

    #[test]
    fn plaintext_only_omits_empty_map() {
        let content = content(&DefaultPorts::collect(&[server("a.example", Some(80), None)]));
        assert!(!content.contains("map \"\""));
        assert!(!content.contains("ssl"));
    }

    #[test]
    fn no_ports_yields_comment_only_file() {
        let Generation::Rendered(artifact) = generate(&DefaultPorts::default()).unwrap() else {
            panic!("default artifact was skipped");
        };
        assert_eq!(artifact.name, "default");
        assert!(artifact.content.lines().all(|line| line.starts_with('#')));
    }
}
