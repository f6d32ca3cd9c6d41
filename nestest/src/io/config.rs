//! Suite configuration loaded from a TOML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::tree::DEFAULT_PRINT_WIDTH;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "NESTEST_CONFIG";

/// Suite configuration (TOML).
///
/// Missing fields take their defaults. Command-line flags override every
/// field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SuiteConfig {
    /// Report line width for units that do not force their own.
    pub print_width: usize,

    /// Print `Scope::debug` diagnostics and replay isolated output.
    pub debug: bool,

    /// Wall-clock budget for one isolated run, in seconds.
    pub isolation_timeout_secs: u64,

    /// Keep at most this many bytes of each captured stream of an isolated run.
    pub output_limit_bytes: usize,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            print_width: DEFAULT_PRINT_WIDTH,
            debug: false,
            isolation_timeout_secs: 5 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

impl SuiteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.print_width == 0 {
            return Err(anyhow!("print_width must be > 0"));
        }
        if self.isolation_timeout_secs == 0 {
            return Err(anyhow!("isolation_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SuiteConfig::default()`.
pub fn load_config(path: &Path) -> Result<SuiteConfig> {
    if !path.exists() {
        return Ok(SuiteConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SuiteConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
