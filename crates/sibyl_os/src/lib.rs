pub mod local;

pub use local::LocalExecutor;

use anyhow::Result;
use async_trait::async_trait;

/// Runs the command text produced by a `<system>` element.
///
/// Implementors:
/// - `LocalExecutor`: runs the command through the local shell
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a command and return its output.
    async fn execute(&self, command: &str) -> Result<String>;

    /// Executor name, for logs.
    fn name(&self) -> &str;
}
