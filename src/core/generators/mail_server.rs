use crate::{
    config::{Defaults, MailServer, MailTlsMode, ServerEntity},
    core::{
        generators::{Artifact, GenerateResult, Generation, common},
        template::{self, Bindings},
    },
};

const SSL_TEMPLATE: &str = "server {
    listen {{ listen }} ssl;
    protocol smtp;
    proxy_protocol on;
    xclient on;

    {{ ssl_block }}

    smtp_auth login plain;
    auth_http {{ auth_http }};
}
";

const STARTTLS_TEMPLATE: &str = "server {
    listen {{ listen }};
    protocol smtp;
    proxy_protocol on;
    xclient on;

    starttls on;
    {{ ssl_block }}

    smtp_auth login plain;
    auth_http {{ auth_http }};
}
";

/// Render an SMTP proxy listener. Both modes need a certificate.
pub fn generate(server: &MailServer, defaults: &Defaults) -> GenerateResult {
    if !server.enable {
        tracing::info!(entity = %server.label(), "Skip (disabled)");
        return Ok(Generation::Skipped);
    }

    let source = match server.mode {
        MailTlsMode::Ssl => SSL_TEMPLATE,
        MailTlsMode::Starttls => STARTTLS_TEMPLATE,
    };

    let bindings = Bindings::new()
        .with("listen", server.listen)
        .with("auth_http", &server.auth_http)
        .with("ssl_block", common::ssl_block(server, defaults)?);

    Ok(Generation::Rendered(Artifact::new(
        server.output_name(),
        common::tidy(&template::render(source, &bindings)?),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::generators::GenerateError;

    fn server(mode: MailTlsMode) -> MailServer {
        MailServer {
            enable: true,
            name: None,
            listen: 465,
            mode,
            auth_http: "http://auth.internal/smtp".to_string(),
            ssl_cert_domain: Some("mail.example".to_string()),
        }
    }

    fn content(server: &MailServer) -> String {
        match generate(server, &Defaults::default()) {
            Ok(Generation::Rendered(artifact)) => artifact.content,
            other => panic!("expected an artifact, got {other:?}"),
        }
    }

    #[test]
    fn implicit_tls_listener() {
        let content = content(&server(MailTlsMode::Ssl));
        assert!(content.contains("    listen 465 ssl;\n"));
        assert!(!content.contains("starttls"));
        assert!(content.contains("/data/dnsrobocert/live/mail.example/privkey.pem"));
        assert!(content.contains("    auth_http http://auth.internal/smtp;\n"));
    }

    #[test]
    fn starttls_listener() {
        let mut server = server(MailTlsMode::Starttls);
        server.listen = 587;
        let content = content(&server);
        assert!(content.contains("    listen 587;\n"));
        assert!(content.contains("    starttls on;\n    # SSL certificate\n"));
        assert!(content.contains("    smtp_auth login plain;\n"));
    }

    #[test]
    fn named_by_port_unless_named() {
        let Generation::Rendered(artifact) =
            generate(&server(MailTlsMode::Ssl), &Defaults::default()).unwrap()
        else {
            panic!("mail server was skipped");
        };
        assert_eq!(artifact.name, "p465");
    }

    #[test]
    fn certificate_is_required() {
        let mut server = server(MailTlsMode::Starttls);
        server.ssl_cert_domain = None;
        let err = generate(&server, &Defaults::default()).unwrap_err();
        assert!(matches!(err, GenerateError::MissingSslDomain { .. }));
    }
}
