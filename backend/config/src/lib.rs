//! `parley-config`: agent configuration management.
//!
//! Provides:
//! - Typed config schema (identity, listener, peers, timeouts, routes, logging)
//! - YAML loading from `$PARLEY_CONFIG_DIR/agent.yaml` or `~/.parley/agent.yaml`
//! - `${ENV_VAR}` substitution
//! - Default application and normalization
//! - Validation with per-field messages

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::{apply_all_defaults, MAX_TIMEOUT_SECS};
pub use env::{resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw_config};
pub use schema::{AgentSection, LoggingSection, ParleyConfig, RouteRule, ServerSection, TimeoutSection};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load a config file, substitute env vars, apply defaults and validate.
///
/// This is the main entry point for loading a config at runtime. Warnings are
/// logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<ParleyConfig> {
    let raw = load_raw_config(path).await?;
    prepare(raw, &std::env::vars().collect())
}

/// The processing pipeline behind [`load_and_prepare`], on an in-memory tree.
pub fn prepare(raw: Value, env: &HashMap<String, String>) -> Result<ParleyConfig> {
    let value = resolve_env_vars_with(&raw, env).context("Failed to resolve env vars in config")?;

    let config: ParleyConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        let messages: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("invalid config:\n  {}", messages.join("\n  "));
    }

    Ok(config)
}
