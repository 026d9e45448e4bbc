use crate::{
    config::Upstream,
    core::{
        generators::{Artifact, GenerateResult, Generation, common},
        template::{self, Bindings},
    },
};

const UPSTREAM_TEMPLATE: &str = "upstream {{ upstream_name }} {
    {{ upstream_content }}
}
";

/// Render a named upstream pool, shared by the http and stream categories
pub fn generate(upstream: &Upstream) -> GenerateResult {
    if !upstream.enable {
        tracing::info!(upstream = %upstream.name, "Skip (disabled)");
        return Ok(Generation::Skipped);
    }

    let content = template::render(
        UPSTREAM_TEMPLATE,
        &Bindings::new()
            .with("upstream_name", &upstream.name)
            .with("upstream_content", upstream.content.trim()),
    )?;

    Ok(Generation::Rendered(Artifact::new(
        upstream.name.clone(),
        common::tidy(&content),
    )))
}
