pub mod loader;
pub mod models;
pub mod sample;
pub mod validation;

pub use loader::{AliasPolicy, LoadError, LoadOptions, load_config, load_config_str, load_config_with};
pub use models::*;
pub use sample::SAMPLE_CONFIG;
pub use validation::{ConfigValidator, ValidationError, ValidationErrors, ValidationResult};
