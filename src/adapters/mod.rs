pub mod file_system;
pub mod reload_script;

/// Re-export commonly used types from adapters
pub use file_system::LocalFileSystem;
pub use reload_script::ScriptReloader;
