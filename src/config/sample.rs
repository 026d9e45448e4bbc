/// Commented starter document written by `nginx-forge init`
pub const SAMPLE_CONFIG: &str = r#"# nginx-forge configuration
#
# Every list below may be empty or omitted. Legacy key names `default`,
# `http_d` and `stream_d` are still accepted.

[defaults]
# Certificate used by entities without their own ssl_cert_domain
ssl_cert_domain = "example.com"
ssl_cert_dir = "/data/dnsrobocert/live"
snippets_dir = "/app/nginx/snippets"

[[http_upstream]]
name = "app_pool"
content = "server 127.0.0.1:3001; server 127.0.0.1:3002;"

# Plaintext redirect to TLS, proxied to the pool above
[[http_server]]
server_name = "www.example.com"
listen = 80
listen_ssl = 443
proxy_pass = "http://app_pool"
client_max_body_size = "100m"
support_websocket = true
hsts = true

[http_server.location]
"/static/" = "alias /srv/static/;"

# Static site over TLS only
[[http_server]]
server_name = "docs.example.com"
listen_ssl = 443
root_path = "/srv/docs"

[[stream_server]]
comment = "postgres"
listen = 5432
listen_ssl = 15432
proxy_pass = "10.0.0.10:5432"

# [[mail_server]]
# listen = 465
# type = "ssl"
# auth_http = "http://127.0.0.1:9000/auth"
"#;
