pub mod generators;
pub mod orchestrator;
pub mod paths;
pub mod template;

pub use generators::{Artifact, Category, GenerateError, Generation};
pub use orchestrator::{
    CategoryReport, GenerationReport, Orchestrator, OrchestratorError, Outcome, OutputLayout,
};
pub use paths::{DeployStage, resolve_output_root};
