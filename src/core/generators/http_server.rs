use crate::{
    config::{Defaults, HttpServer, ServerEntity},
    core::{
        generators::{
            Artifact, GenerateError, GenerateResult, Generation,
            common::{self, Values},
        },
        template::{self, Bindings, TemplateError},
    },
};

const PLAINTEXT_TEMPLATE: &str = "{{ upstream_block }}
server {
    server_name {{ server_name }};
    {{ listen }}

    {{ values }}

    {{ hsts_block }}

    {{ locations }}
}
";

const TLS_TEMPLATE: &str = "{{ upstream_block }}
server {
    server_name {{ server_name }};
    {{ listen_ssl }}

    {{ values }}

    {{ ssl_block }}

    {{ hsts_block }}

    {{ locations }}
}
";

const REDIRECT_TEMPLATE: &str = "{{ upstream_block }}
server {
    server_name {{ server_name }};
    {{ listen }}

    return 301 https://{{ server_name }}$request_uri;
}

server {
    server_name {{ server_name }};
    {{ listen_ssl }}

    {{ values }}

    proxy_buffering off;

    {{ ssl_block }}

    {{ hsts_block }}

    {{ locations }}
}
";

const HSTS_TEMPLATE: &str = "# Enable HSTS
    add_header Strict-Transport-Security \"max-age={{ hsts_max_age }}; includeSubDomains\" always;";

const ROOT_LOCATION_TEMPLATE: &str = "location / {
        root $root_path;
    }";

const PROXY_LOCATION_TEMPLATE: &str = "location / {
        {{ body_size_block }}

        include {{ snippets_dir }}/proxy-params.conf;
        {{ websocket_block }}

        proxy_pass $proxy_pass;
    }";

const BODY_SIZE_TEMPLATE: &str = "# Fix: 413 - Request Entity Too Large
        client_max_body_size {{ client_max_body_size }};";

const WEBSOCKET_TEMPLATE: &str = "# Enable WebSocket Support
        include {{ snippets_dir }}/websocket.conf;";

const CUSTOM_LOCATION_TEMPLATE: &str = "location {{ location_path }} {
        {{ location_body }}
    }";

/// Which server blocks an entity needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Plaintext,
    Tls,
    Redirect,
}

/// Render the `server {}` block(s) of one http server
pub fn generate(server: &HttpServer, defaults: &Defaults) -> GenerateResult {
    if !server.enable {
        tracing::info!(entity = %server.label(), "Skip (disabled)");
        return Ok(Generation::Skipped);
    }

    let layout = match (server.listen, server.listen_ssl) {
        (Some(_), None) => Layout::Plaintext,
        (None, Some(_)) => Layout::Tls,
        (Some(_), Some(_)) => Layout::Redirect,
        (None, None) => {
            return Err(GenerateError::MissingListen {
                entity: server.label(),
            });
        }
    };

    let ssl_block = match layout {
        Layout::Plaintext => String::new(),
        Layout::Tls | Layout::Redirect => common::ssl_block(server, defaults)?,
    };

    let (locations, values) = locations(server, defaults)?;
    let (listen, listen_ssl) = listen_directives(server);

    let hsts_block = if server.hsts {
        template::render(
            HSTS_TEMPLATE,
            &Bindings::new().with("hsts_max_age", server.hsts_max_age),
        )?
    } else {
        String::new()
    };

    let bindings = Bindings::new()
        .with("upstream_block", common::inline_upstream_block(server)?)
        .with("server_name", &server.server_name)
        .with("listen", listen)
        .with("listen_ssl", listen_ssl)
        .with("values", values.render())
        .with("ssl_block", ssl_block)
        .with("hsts_block", hsts_block)
        .with("locations", locations);

    let source = match layout {
        Layout::Plaintext => PLAINTEXT_TEMPLATE,
        Layout::Tls => TLS_TEMPLATE,
        Layout::Redirect => REDIRECT_TEMPLATE,
    };

    let content = common::tidy(&template::render(source, &bindings)?);
    Ok(Generation::Rendered(Artifact::new(
        server.output_name(),
        content,
    )))
}

/// Listen directives for the `(listen_http2, listen_ipv6)` combination
fn listen_directives(server: &HttpServer) -> (String, String) {
    let plain = server.listen.map(|p| p.to_string()).unwrap_or_default();
    let tls = server.listen_ssl.map(|p| p.to_string()).unwrap_or_default();

    match (server.listen_http2, server.listen_ipv6) {
        (true, true) => (
            format!("listen {plain}; listen [::]:{plain};"),
            format!("listen {tls} ssl; listen [::]:{tls} ssl; http2 on;"),
        ),
        (true, false) => (
            format!("listen {plain};"),
            format!("listen {tls} ssl; http2 on;"),
        ),
        (false, true) => (
            format!("listen {plain}; listen [::]:{plain};"),
            format!("listen {tls} ssl; listen [::]:{tls} ssl;"),
        ),
        (false, false) => (format!("listen {plain};"), format!("listen {tls} ssl;")),
    }
}

/// Synthesized `/` location (unless given explicitly) followed by every custom one
fn locations(server: &HttpServer, defaults: &Defaults) -> Result<(String, Values), GenerateError> {
    let mut values = Values::new();
    if let Some(proxy_pass) = &server.proxy_pass {
        values = values.with("proxy_pass", proxy_pass);
    }

    let mut blocks = Vec::with_capacity(server.location.len() + 1);

    if !server.location.contains_key("/") {
        if let Some(root_path) = &server.root_path {
            values = values.with("root_path", root_path);
            blocks.push(ROOT_LOCATION_TEMPLATE.to_string());
        } else if server.proxy_pass.is_some() {
            blocks.push(proxy_location(server, defaults)?);
        } else {
            return Err(GenerateError::MissingLocationSource {
                entity: server.label(),
            });
        }
    }

    for (path, body) in server.location.iter() {
        blocks.push(template::render(
            CUSTOM_LOCATION_TEMPLATE,
            &Bindings::new()
                .with("location_path", path)
                .with("location_body", body.trim()),
        )?);
    }

    Ok((blocks.join("\n\n    "), values))
}

fn proxy_location(server: &HttpServer, defaults: &Defaults) -> Result<String, TemplateError> {
    let snippets_dir = common::snippets_dir(defaults);

    let body_size_block = match &server.client_max_body_size {
        Some(size) => template::render(
            BODY_SIZE_TEMPLATE,
            &Bindings::new().with("client_max_body_size", size),
        )?,
        None => String::new(),
    };

    let websocket_block = if server.support_websocket {
        template::render(
            WEBSOCKET_TEMPLATE,
            &Bindings::new().with("snippets_dir", snippets_dir),
        )?
    } else {
        String::new()
    };

    template::render(
        PROXY_LOCATION_TEMPLATE,
        &Bindings::new()
            .with("body_size_block", body_size_block)
            .with("snippets_dir", snippets_dir)
            .with("websocket_block", websocket_block),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy_server() -> HttpServer {
        let mut server = HttpServer::new("a.example");
        server.listen = Some(10080);
        server.proxy_pass = Some("http://x".to_string());
        server
    }

    fn defaults() -> Defaults {
        Defaults {
            ssl_cert_domain: Some("d.example".to_string()),
            ..Defaults::default()
        }
    }

    fn render(server: &HttpServer) -> String {
        match generate(server, &defaults()) {
            Ok(Generation::Rendered(artifact)) => artifact.content,
            other => panic!("expected an artifact, got {other:?}"),
        }
    }

    #[test]
    fn plaintext_proxy_server() {
        let content = render(&proxy_server());

        let expected = "\
server {
    server_name a.example;
    listen 10080; listen [::]:10080;

    # values list
    set $proxy_pass \"http://x\";

    location / {
        include /app/nginx/snippets/proxy-params.conf;

        proxy_pass $proxy_pass;
    }
}
";
        assert_eq!(content, expected);
    }

    #[test]
    fn plaintext_only_has_no_tls_directives() {
        let content = render(&proxy_server());

        assert_eq!(content.matches("server {").count(), 1);
        assert!(!content.contains("ssl"));
        assert!(!content.contains("http2"));
        assert!(!content.contains("websocket"));
        assert!(!content.contains("client_max_body_size"));
    }

    #[test]
    fn both_ports_redirect_to_https() {
        let mut server = proxy_server();
        server.listen_ssl = Some(10443);
        let content = render(&server);

        assert_eq!(content.matches("server {").count(), 2);
        let first = content.split("server {").nth(1).unwrap();
        assert!(first.contains("return 301 https://a.example$request_uri;"));
        assert!(!first.contains("proxy_pass"));

        let second = content.split("server {").nth(2).unwrap();
        assert!(second.contains("listen 10443 ssl; listen [::]:10443 ssl; http2 on;"));
        assert!(second.contains("proxy_buffering off;"));
        assert!(second.contains("/data/dnsrobocert/live/d.example/fullchain.pem"));
    }

    #[test]
    fn tls_only_server() {
        let mut server = proxy_server();
        server.listen = None;
        server.listen_ssl = Some(443);
        let content = render(&server);

        assert_eq!(content.matches("server {").count(), 1);
        assert!(!content.contains("return 301"));
        assert!(content.contains("# SSL certificate"));
    }

    #[test]
    fn listen_matrix() {
        let cases = [
            (true, true, "listen 80; listen [::]:80;", "listen 443 ssl; listen [::]:443 ssl; http2 on;"),
            (true, false, "listen 80;", "listen 443 ssl; http2 on;"),
            (false, true, "listen 80; listen [::]:80;", "listen 443 ssl; listen [::]:443 ssl;"),
            (false, false, "listen 80;", "listen 443 ssl;"),
        ];

        for (http2, ipv6, plain, tls) in cases {
            let mut server = proxy_server();
            server.listen = Some(80);
            server.listen_ssl = Some(443);
            server.listen_http2 = http2;
            server.listen_ipv6 = ipv6;

            let content = render(&server);
            assert!(content.contains(&format!("    {plain}\n")), "{http2}/{ipv6}: {content}");
            assert!(content.contains(&format!("    {tls}\n")), "{http2}/{ipv6}: {content}");
        }
    }

    #[test]
    fn neither_port_is_missing_listen() {
        let mut server = proxy_server();
        server.listen = None;
        let err = generate(&server, &defaults()).unwrap_err();
        assert!(matches!(err, GenerateError::MissingListen { .. }));
    }

    #[test]
    fn tls_without_domain_fails() {
        let mut server = proxy_server();
        server.listen_ssl = Some(443);
        let err = generate(&server, &Defaults::default()).unwrap_err();
        assert!(matches!(err, GenerateError::MissingSslDomain { .. }));
    }

    #[test]
    fn disabled_server_is_skipped() {
        let mut server = proxy_server();
        server.enable = false;
        server.listen = None;
        assert_eq!(generate(&server, &defaults()).unwrap(), Generation::Skipped);
    }

    #[test]
    fn explicit_root_location_replaces_synthesized_one() {
        let mut server = proxy_server();
        server.location.insert("/", "return 200 'ok';");
        server.location.insert("/api/", "proxy_pass http://api;");
        let content = render(&server);

        assert!(!content.contains("proxy-params.conf"));
        assert!(!content.contains("proxy_pass $proxy_pass;"));
        assert!(content.contains("location / {\n        return 200 'ok';\n    }"));

        let root = content.find("location / {").unwrap();
        let api = content.find("location /api/ {").unwrap();
        assert!(root < api);
    }

    #[test]
    fn root_path_location() {
        let mut server = HttpServer::new("static.example");
        server.listen = Some(80);
        server.root_path = Some("/srv/www".to_string());
        let content = render(&server);

        assert!(content.contains("set $root_path \"/srv/www\";"));
        assert!(content.contains("location / {\n        root $root_path;\n    }"));
    }

    #[test]
    fn no_location_source_fails() {
        let mut server = HttpServer::new("a.example");
        server.listen = Some(80);
        server.location.insert("/api/", "proxy_pass http://api;");
        let err = generate(&server, &defaults()).unwrap_err();
        assert!(matches!(err, GenerateError::MissingLocationSource { .. }));
    }

    #[test]
    fn proxy_location_options() {
        let mut server = proxy_server();
        server.client_max_body_size = Some("100m".to_string());
        server.support_websocket = true;
        let content = render(&server);

        let expected = "    location / {
        # Fix: 413 - Request Entity Too Large
        client_max_body_size 100m;

        include /app/nginx/snippets/proxy-params.conf;
        # Enable WebSocket Support
        include /app/nginx/snippets/websocket.conf;

        proxy_pass $proxy_pass;
    }";
        assert!(content.contains(expected), "{content}");
    }

    #[test]
    fn hsts_uses_max_age() {
        let mut server = proxy_server();
        server.hsts = true;
        server.hsts_max_age = 60;
        let content = render(&server);

        assert!(content.contains(
            "add_header Strict-Transport-Security \"max-age=60; includeSubDomains\" always;"
        ));
    }

    #[test]
    fn inline_upstream_comes_first() {
        let mut server = proxy_server();
        server.upstream_name = Some("backend".to_string());
        server.upstream_server = Some("10.0.0.1:8080".to_string());
        server.proxy_pass = Some("http://backend".to_string());
        let content = render(&server);

        assert!(content.starts_with("# upstream server define\nupstream backend {\n    server 10.0.0.1:8080;\n}\n\nserver {"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut server = proxy_server();
        server.listen_ssl = Some(443);
        server.hsts = true;
        server.location.insert("~ \\.php$", "fastcgi_pass php:9000;");
        assert_eq!(render(&server), render(&server));
    }
}
