//! The application-host launcher seam.
//!
//! The launcher that actually executes the entry module is an external
//! collaborator; the default implementation logs the hand-off and returns.

use caravel_loader::LoadedModule;
use tracing::info;

/// Receives the fully loaded entry module.
pub trait HostLauncher: Send + Sync {
    /// Launch the module with the given arguments, returning its exit
    /// code.
    ///
    /// # Errors
    /// Returns error when the host cannot take the module.
    fn launch(&self, module: &LoadedModule, args: &[String]) -> anyhow::Result<i32>;
}

/// Launcher that logs the hand-off.
#[derive(Debug, Default)]
pub struct LoggingLauncher;

impl HostLauncher for LoggingLauncher {
    fn launch(&self, module: &LoadedModule, args: &[String]) -> anyhow::Result<i32> {
        info!(
            module = %module.name,
            version = %module.version,
            exports = module.exports.len(),
            image_bytes = module.image.len(),
            ?args,
            "handing module to host"
        );
        Ok(0)
    }
}
