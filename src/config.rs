//! Process configuration: environment variables over an optional TOML file over defaults.
//!
//! Env variables:
//!   GEMINI_API_KEY         : required; startup fails without it
//!   GEMINI_BASE_URL        : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL           : default "gemini-2.0-flash"
//!   ORACLE_TIMEOUT_SECS    : default 60
//!   PORT                   : default 8001
//!   LEARNFLOW_CONFIG_PATH  : optional TOML file (see `FileConfig`)
//!
//! Example TOML:
//!
//! ```toml
//! [server]
//! port = 8001
//! static_dir = "./static"
//!
//! [oracle]
//! model = "gemini-2.0-flash"
//! temperature = 0.9
//! max_output_tokens = 4096
//! safety_threshold = "BLOCK_NONE"
//!
//! [deck]
//! name = "LearnFlow"
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::ConfigError;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TEMPERATURE: f32 = 0.9;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;
const DEFAULT_SAFETY_THRESHOLD: &str = "BLOCK_NONE";
const DEFAULT_PORT: u16 = 8001;
const DEFAULT_STATIC_DIR: &str = "./static";
const DEFAULT_DECK_NAME: &str = "LearnFlow";

/// Optional TOML overrides. Every key may be omitted.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)]
  pub server: ServerFileConfig,
  #[serde(default)]
  pub oracle: OracleFileConfig,
  #[serde(default)]
  pub deck: DeckFileConfig,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ServerFileConfig {
  #[serde(default)] pub port: Option<u16>,
  #[serde(default)] pub static_dir: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct OracleFileConfig {
  #[serde(default)] pub base_url: Option<String>,
  #[serde(default)] pub model: Option<String>,
  #[serde(default)] pub timeout_secs: Option<u64>,
  #[serde(default)] pub temperature: Option<f32>,
  #[serde(default)] pub max_output_tokens: Option<u32>,
  #[serde(default)] pub safety_threshold: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct DeckFileConfig {
  #[serde(default)] pub name: Option<String>,
}

/// Settings for the Gemini client.
#[derive(Clone, Debug)]
pub struct OracleSettings {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
  pub temperature: f32,
  pub max_output_tokens: u32,
  /// Applied to every harm category.
  pub safety_threshold: String,
}

/// Read-only after startup.
#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub static_dir: String,
  pub deck_name: String,
  pub oracle: OracleSettings,
}

impl Settings {
  /// Load from the process environment (and the TOML file it may point to).
  pub fn from_env() -> Result<Self, ConfigError> {
    let file = load_file_config_from_env().unwrap_or_default();
    Self::resolve(|key| std::env::var(key).ok(), file)
  }

  /// Merge env lookups over file values over defaults. Fails only on a missing API key.
  pub fn resolve(env: impl Fn(&str) -> Option<String>, file: FileConfig) -> Result<Self, ConfigError> {
    let api_key = env(API_KEY_VAR)
      .map(|k| k.trim().to_string())
      .filter(|k| !k.is_empty())
      .ok_or(ConfigError::MissingCredential(API_KEY_VAR))?;

    let port = env("PORT")
      .and_then(|p| p.parse::<u16>().ok())
      .or(file.server.port)
      .unwrap_or(DEFAULT_PORT);

    let timeout_secs = env("ORACLE_TIMEOUT_SECS")
      .and_then(|t| t.parse::<u64>().ok())
      .or(file.oracle.timeout_secs)
      .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let oracle = OracleSettings {
      api_key,
      base_url: env("GEMINI_BASE_URL")
        .or(file.oracle.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.into())
        .trim_end_matches('/')
        .to_string(),
      model: env("GEMINI_MODEL").or(file.oracle.model).unwrap_or_else(|| DEFAULT_MODEL.into()),
      timeout: Duration::from_secs(timeout_secs),
      temperature: file.oracle.temperature.unwrap_or(DEFAULT_TEMPERATURE),
      max_output_tokens: file.oracle.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
      safety_threshold: file.oracle.safety_threshold.unwrap_or_else(|| DEFAULT_SAFETY_THRESHOLD.into()),
    };

    Ok(Self {
      port,
      static_dir: file.server.static_dir.unwrap_or_else(|| DEFAULT_STATIC_DIR.into()),
      deck_name: file.deck.name.unwrap_or_else(|| DEFAULT_DECK_NAME.into()),
      oracle,
    })
  }
}

/// Attempt to load `FileConfig` from LEARNFLOW_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_file_config_from_env() -> Option<FileConfig> {
  let path = std::env::var("LEARNFLOW_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<FileConfig>(&s) {
      Ok(cfg) => {
        info!(target: "learnflow", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "learnflow", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "learnflow", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
