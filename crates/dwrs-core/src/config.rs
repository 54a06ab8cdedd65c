use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// `[retry]` table: how often and how patiently a file is retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per file, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry, in seconds; doubles on each further retry.
    pub base_delay_secs: f64,
    /// Ceiling for the doubled delay, in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// How a partial destination file is checked before resuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumeValidation {
    /// Record ETag/Last-Modified in a sidecar and refuse to resume when they change.
    /// Falls back to the file size when the server offers no validator.
    #[default]
    Validators,
    /// Trust the size of the partial file alone.
    SizeOnly,
}

/// Contents of `$XDG_CONFIG_HOME/dwrs/config.toml`. Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DwrsConfig {
    /// Number of files downloaded concurrently.
    pub workers: usize,
    /// Progress bar template (indicatif syntax). Only read by the renderer.
    pub template: String,
    /// Progress bar characters: full, partial, empty. Only read by the renderer.
    pub bar_chars: String,
    /// Per-file message shown next to the bar; `{url}` and `{output}` are substituted.
    pub msg_template: String,
    /// Size in bytes of the receive buffer; one progress event per chunk.
    pub chunk_size: usize,
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Wall-clock limit of one attempt (connect + transfer) in seconds.
    pub attempt_timeout_secs: u64,
    /// Abort an attempt whose throughput stays below 1 KiB/s for this many seconds.
    pub stall_timeout_secs: u64,
    /// Resume validation policy: "validators" (default) or "size-only".
    pub resume_validation: ResumeValidation,
    pub retry: RetryConfig,
}

impl Default for DwrsConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            template: "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes:>10}/{total_bytes:10} ({percent}%) {msg}".to_string(),
            bar_chars: "█▌░".to_string(),
            msg_template: "{url} → {output}".to_string(),
            chunk_size: 256 * 1024,
            connect_timeout_secs: 30,
            attempt_timeout_secs: 3600,
            stall_timeout_secs: 60,
            resume_validation: ResumeValidation::default(),
            retry: RetryConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dwrs")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Reads the user's config file, writing one with the defaults on first use.
pub fn load_or_init() -> Result<DwrsConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DwrsConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Reads the file given with `--config`. Absent keys keep their defaults.
pub fn load_from(path: &Path) -> Result<DwrsConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: DwrsConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
