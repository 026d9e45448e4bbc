//! Blocks and helpers shared by the server generators.

use crate::{
    config::{Defaults, ServerEntity},
    core::{
        generators::GenerateError,
        template::{self, Bindings, TemplateError, TemplateValue},
    },
};

const SSL_TEMPLATE: &str = "# SSL certificate
    ssl_certificate     {{ cert_dir }}/fullchain.pem;
    ssl_certificate_key {{ cert_dir }}/privkey.pem;
    include {{ snippets_dir }}/ssl-params.conf;";

const UPSTREAM_TEMPLATE: &str = "# upstream server define
upstream {{ upstream_name }} {
    server {{ upstream_server }};
}
";

/// Ordered `set $key value;` bindings exposed to nginx for one entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values(Vec<(&'static str, TemplateValue)>);

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `key`, or overwrite it in place when already present
    pub fn with(mut self, key: &'static str, value: impl Into<TemplateValue>) -> Self {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a `# values list` block, empty when there is nothing to set
    pub fn render(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }

        let mut block = String::from("# values list");
        for (key, value) in &self.0 {
            block.push_str("\n    ");
            match value {
                TemplateValue::Text(text) => block.push_str(&format!("set ${key} \"{text}\";")),
                TemplateValue::Integer(number) => block.push_str(&format!("set ${key} {number};")),
            }
        }
        block
    }
}

/// Certificate domain of `entity`, falling back to the document defaults
pub fn resolve_ssl_domain<'a>(entity: &'a impl ServerEntity, defaults: &'a Defaults) -> Option<&'a str> {
    entity
        .ssl_cert_domain()
        .or(defaults.ssl_cert_domain.as_deref())
}

/// Certificate and TLS parameter directives for `entity`
pub fn ssl_block(entity: &impl ServerEntity, defaults: &Defaults) -> Result<String, GenerateError> {
    let domain = resolve_ssl_domain(entity, defaults).ok_or_else(|| {
        GenerateError::MissingSslDomain {
            entity: entity.label(),
        }
    })?;

    let cert_dir = format!("{}/{}", defaults.ssl_cert_dir.trim_end_matches('/'), domain);
    let bindings = Bindings::new()
        .with("cert_dir", cert_dir)
        .with("snippets_dir", snippets_dir(defaults));

    Ok(template::render(SSL_TEMPLATE, &bindings)?)
}

/// Inline `upstream {}` block, empty unless both halves are configured
pub fn inline_upstream_block(entity: &impl ServerEntity) -> Result<String, TemplateError> {
    let Some((name, server)) = entity.inline_upstream() else {
        return Ok(String::new());
    };

    template::render(
        UPSTREAM_TEMPLATE,
        &Bindings::new()
            .with("upstream_name", name)
            .with("upstream_server", server),
    )
}

pub fn snippets_dir(defaults: &Defaults) -> &str {
    defaults.snippets_dir.trim_end_matches('/')
}

/// Normalize the whitespace left behind by empty optional blocks.
///
/// Trailing whitespace is stripped, blank runs collapse to one line, blank lines
/// directly inside braces and at the start or end disappear, and the text ends
/// with exactly one newline.
pub fn tidy(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim_end) {
        if line.is_empty() {
            match lines.last() {
                None => continue,
                Some(prev) if prev.is_empty() || prev.ends_with('{') => continue,
                Some(_) => {}
            }
        } else if line.trim_start().starts_with('}') {
            while lines.last().is_some_and(|prev| prev.is_empty()) {
                lines.pop();
            }
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|prev| prev.is_empty()) {
        lines.pop();
    }

    if lines.is_empty() {
        return String::new();
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}
