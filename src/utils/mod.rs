pub mod graceful_shutdown;
pub mod reload_worker;

pub use graceful_shutdown::{GracefulShutdown, ShutdownReason, ShutdownToken};
pub use reload_worker::ReloadWorker;
