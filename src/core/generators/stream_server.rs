use crate::{
    config::{Defaults, ServerEntity, StreamServer},
    core::{
        generators::{
            Artifact, GenerateError, GenerateResult, Generation,
            common::{self, Values},
        },
        template::{self, Bindings},
    },
};

const PLAINTEXT_TEMPLATE: &str = "server {
    # {{ comment }}
    listen {{ listen }}; listen [::]:{{ listen }};

    {{ values }}

    proxy_pass {{ proxy_pass }};
}
";

const TLS_TEMPLATE: &str = "server {
    # {{ comment }}
    listen {{ listen_ssl }} ssl; listen [::]:{{ listen_ssl }} ssl;

    {{ values }}

    proxy_ssl on;
    {{ ssl_block }}

    proxy_pass {{ proxy_pass }};
}
";

/// Render one plaintext and/or one TLS block for a stream server.
///
/// A TLS half that cannot be rendered is recorded in
/// [`Artifact::partial_failures`] as long as the plaintext half exists.
pub fn generate(server: &StreamServer, defaults: &Defaults) -> GenerateResult {
    if !server.enable {
        tracing::info!(entity = %server.label(), "Skip (disabled)");
        return Ok(Generation::Skipped);
    }

    if server.listen.is_none() && server.listen_ssl.is_none() {
        return Err(GenerateError::MissingListen {
            entity: server.label(),
        });
    }

    let values = Values::new().with("proxy_pass", &server.proxy_pass);
    let base = Bindings::new()
        .with("comment", &server.comment)
        .with("values", values.render())
        .with("proxy_pass", &server.proxy_pass);

    let mut blocks = vec![common::inline_upstream_block(server)?];
    let mut partial_failures = Vec::new();

    if let Some(port) = server.listen {
        blocks.push(template::render(
            PLAINTEXT_TEMPLATE,
            &base.clone().with("listen", port),
        )?);
    }

    if let Some(port) = server.listen_ssl {
        match common::ssl_block(server, defaults) {
            Ok(ssl_block) => blocks.push(template::render(
                TLS_TEMPLATE,
                &base.clone().with("listen_ssl", port).with("ssl_block", ssl_block),
            )?),
            Err(e) if e.is_defect() || server.listen.is_none() => return Err(e),
            Err(e) => {
                tracing::error!(entity = %server.label(), "TLS block skipped: {}", e);
                partial_failures.push(e);
            }
        }
    }

    let content = common::tidy(&blocks.join("\n"));
    Ok(Generation::Rendered(Artifact {
        name: server.output_name(),
        content,
        partial_failures,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> StreamServer {
        let mut server = StreamServer::new("10.0.0.1:9000");
        server.listen = Some(9000);
        server.listen_ssl = Some(9443);
        server
    }

    fn defaults(domain: Option<&str>) -> Defaults {
        Defaults {
            ssl_cert_domain: domain.map(str::to_string),
            ..Defaults::default()
        }
    }

    fn artifact(result: GenerateResult) -> Artifact {
        match result {
            Ok(Generation::Rendered(artifact)) => artifact,
            other => panic!("expected an artifact, got {other:?}"),
        }
    }

    #[test]
    fn plaintext_and_tls_blocks() {
        let artifact = artifact(generate(&server(), &defaults(Some("d.example"))));
        assert_eq!(artifact.name, "p9000_p9443");
        assert!(artifact.partial_failures.is_empty());

        let expected = "\
server {
    # ---
    listen 9000; listen [::]:9000;

    # values list
    set $proxy_pass \"10.0.0.1:9000\";

    proxy_pass 10.0.0.1:9000;
}

server {
    # ---
    listen 9443 ssl; listen [::]:9443 ssl;

    # values list
    set $proxy_pass \"10.0.0.1:9000\";

    proxy_ssl on;
    # SSL certificate
    ssl_certificate     /data/dnsrobocert/live/d.example/fullchain.pem;
    ssl_certificate_key /data/dnsrobocert/live/d.example/privkey.pem;
    include /app/nginx/snippets/ssl-params.conf;

    proxy_pass 10.0.0.1:9000;
}
";
        assert_eq!(artifact.content, expected);
    }

    #[test]
    fn missing_domain_fails_only_the_tls_half() {
        let artifact = artifact(generate(&server(), &defaults(None)));

        assert_eq!(artifact.content.matches("server {").count(), 1);
        assert!(!artifact.content.contains("ssl"));
        assert_eq!(artifact.partial_failures.len(), 1);
        assert!(matches!(
            artifact.partial_failures[0],
            GenerateError::MissingSslDomain { .. }
        ));
    }

    #[test]
    fn missing_domain_without_plaintext_fails_the_entity() {
        let mut server = server();
        server.listen = None;
        let err = generate(&server, &defaults(None)).unwrap_err();
        assert!(matches!(err, GenerateError::MissingSslDomain { .. }));
    }

    #[test]
    fn neither_port_is_missing_listen() {
        let mut server = server();
        server.listen = None;
        server.listen_ssl = None;
        let err = generate(&server, &defaults(Some("d.example"))).unwrap_err();
        assert!(matches!(err, GenerateError::MissingListen { .. }));
    }

    #[test]
    fn explicit_name_and_comment() {
        let mut server = server();
        server.listen_ssl = None;
        server.name = Some("ssh".to_string());
        server.comment = "bastion".to_string();
        server.upstream_name = Some("ssh_pool".to_string());
        server.upstream_server = Some("10.0.0.2:22".to_string());
        server.proxy_pass = "ssh_pool".to_string();

        let artifact = artifact(generate(&server, &defaults(None)));
        assert_eq!(artifact.name, "ssh");
        assert!(artifact.content.starts_with("# upstream server define\nupstream ssh_pool {"));
        assert!(artifact.content.contains("    # bastion\n"));
        assert!(artifact.content.contains("    proxy_pass ssh_pool;\n"));
    }

    #[test]
    fn disabled_server_is_skipped() {
        let mut server = server();
        server.enable = false;
        assert_eq!(generate(&server, &defaults(None)).unwrap(), Generation::Skipped);
    }
}
