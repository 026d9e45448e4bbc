//! Minimal `{{ name }}` placeholder renderer.
//!
//! Templates are compiled once into literal and placeholder segments and cached
//! process-wide, keyed by their source text. Rendering never evaluates
//! expressions: a placeholder is either bound to a value or the render fails.

use std::{fmt, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

static COMPILED: Lazy<scc::HashMap<String, Arc<CompiledTemplate>>> =
    Lazy::new(scc::HashMap::default);

/// Errors raised while rendering a template
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Template placeholder '{name}' has no bound value")]
    UnboundPlaceholder { name: String },
}

/// A value substituted into a placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Text(String),
    Integer(u64),
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateValue::Text(text) => f.write_str(text),
            TemplateValue::Integer(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::Text(value)
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

impl From<&String> for TemplateValue {
    fn from(value: &String) -> Self {
        TemplateValue::Text(value.clone())
    }
}

impl From<u16> for TemplateValue {
    fn from(value: u16) -> Self {
        TemplateValue::Integer(u64::from(value))
    }
}

impl From<u64> for TemplateValue {
    fn from(value: u64) -> Self {
        TemplateValue::Integer(value)
    }
}

/// Ordered name to value bindings for one render
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(&'static str, TemplateValue)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any earlier binding of the same name
    pub fn with(mut self, name: &'static str, value: impl Into<TemplateValue>) -> Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A template split into literal and placeholder segments
#[derive(Debug, PartialEq, Eq)]
pub struct CompiledTemplate {
    segments: Vec<Segment>,
}

impl CompiledTemplate {
    fn compile(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for captures in PLACEHOLDER.captures_iter(source) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if whole.start() > cursor {
                segments.push(Segment::Literal(source[cursor..whole.start()].to_string()));
            }
            segments.push(Segment::Placeholder(name.as_str().to_string()));
            cursor = whole.end();
        }

        if cursor < source.len() {
            segments.push(Segment::Literal(source[cursor..].to_string()));
        }

        Self { segments }
    }

    /// Names of every placeholder in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, bindings: &Bindings) -> Result<String, TemplateError> {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Placeholder(name) => {
                    let value = bindings
                        .get(name)
                        .ok_or_else(|| TemplateError::UnboundPlaceholder { name: name.clone() })?;
                    output.push_str(&value.to_string());
                }
            }
        }
        Ok(output)
    }
}

/// Fetch the compiled form of `source`, compiling it on first use
pub fn compiled(source: &str) -> Arc<CompiledTemplate> {
    if let Some(template) = COMPILED.read_sync(source, |_, template| template.clone()) {
        return template;
    }

    let template = Arc::new(CompiledTemplate::compile(source));
    // A concurrent insert of the same source yields an equivalent template.
    let _ = COMPILED.insert_sync(source.to_string(), template.clone());
    template
}

/// Render `source` with `bindings`
pub fn render(source: &str, bindings: &Bindings) -> Result<String, TemplateError> {
    compiled(source).render(bindings)
}
