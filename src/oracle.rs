//! The text-generation capability the service depends on.

use async_trait::async_trait;

use crate::error::OracleError;

/// Anything that can turn a prompt into text. One attempt per call, no retries.
#[async_trait]
pub trait TextOracle: Send + Sync {
  async fn generate_text(&self, prompt: &str) -> Result<String, OracleError>;

  /// Short label for logs.
  fn describe(&self) -> String;
}
