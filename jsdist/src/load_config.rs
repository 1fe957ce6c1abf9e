//! `load_config`: reads the YAML release config and adapts it for the pipeline.
//!
//! This is the only place where the user's YAML is parsed.
//!
//! # Responsibilities
//! - Parse the config file into [`ReleaseConfig`].
//! - Resolve every relative path against the directory holding the config
//!   file, so runs behave the same from any working directory.
//! - Apply environment overrides (`JSDIST_COMPRESSOR_URL`).
//!
//! # Errors
//! Failures are `anyhow::Error`s naming the config file, surfaced at the CLI
//! boundary. Semantic checks (missing inputs, unknown fragments) happen later,
//! in [`ReleaseConfig::validate`].
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use jsdist_core::config::{CompressorConfig, ReleaseConfig};
use tracing::{error, info};

/// Overrides the URL of a `service` compressor.
pub const COMPRESSOR_URL_ENV: &str = "JSDIST_COMPRESSOR_URL";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ReleaseConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let raw: ReleaseConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML {:?}: {e}", path_ref));
        }
    };

    let root = config_root(path_ref)?;
    let mut config = raw.rebase(&root);
    apply_env_overrides(&mut config);
    config.trace_loaded();
    Ok(config)
}

/// Absolute directory containing the config file.
fn config_root(path: &Path) -> Result<std::path::PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    parent.canonicalize().map_err(|e| {
        error!(error = ?e, dir = ?parent, "Failed to resolve config directory");
        anyhow!("Failed to resolve config directory {:?}: {e}", parent)
    })
}

fn apply_env_overrides(config: &mut ReleaseConfig) {
    let Ok(override_url) = env::var(COMPRESSOR_URL_ENV) else {
        return;
    };
    if override_url.trim().is_empty() {
        return;
    }
    match &mut config.compressor {
        Some(CompressorConfig::Service { url, .. }) => {
            info!(from = %url, to = %override_url, "Compressor URL overridden from environment");
            *url = override_url;
        }
        _ => info!(
            var = COMPRESSOR_URL_ENV,
            "Ignoring compressor URL override: no service compressor configured"
        ),
    }
}
