//! Application state: settings and the oracle. Read-only after startup.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::Settings;
use crate::error::ConfigError;
use crate::gemini::Gemini;
use crate::oracle::TextOracle;

#[derive(Clone)]
pub struct AppState {
    pub oracle: Arc<dyn TextOracle>,
    pub deck_name: String,
}

impl AppState {
    /// Build state from settings: construct the Gemini client.
    #[instrument(level = "info", skip_all)]
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        let gemini = Gemini::new(settings.oracle.clone())?;
        let state = Self::with_oracle(Arc::new(gemini), settings.deck_name.clone());
        info!(
            target: "learnflow",
            oracle = %state.oracle.describe(),
            timeout = ?settings.oracle.timeout,
            safety_threshold = %settings.oracle.safety_threshold,
            "Oracle ready."
        );
        Ok(state)
    }

    pub fn with_oracle(oracle: Arc<dyn TextOracle>, deck_name: String) -> Self {
        Self { oracle, deck_name }
    }
}
