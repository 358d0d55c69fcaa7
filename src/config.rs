use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::ports;

/// Upper bound for concurrent probes per target.
pub const MAX_CONCURRENCY: usize = 16;

/// Scan settings handed to the engine. Every field has a default, so a TOML file
/// only needs the keys it changes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ScanConfig {
    /// Ports probed for every target, in order.
    pub ports: Vec<u16>,
    /// Per-probe connect timeout (includes name resolution).
    pub timeout_ms: u64,
    /// Pause after each target-start and each probe-start so a live stream stays readable.
    pub pacing_ms: u64,
    /// Ports of one target probed ahead of the consumer. 1 keeps probing strictly sequential.
    pub concurrency: usize,
    /// Optional bound on the whole scan.
    pub deadline_ms: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ports: ports::camera_ports(),
            timeout_ms: 1_000,
            pacing_ms: 500,
            concurrency: 1,
            deadline_ms: None,
        }
    }
}

impl ScanConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ScanConfig = toml::from_str(s).context("invalid scan config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.ports.is_empty() {
            bail!("port set must not be empty");
        }
        if self.ports.len() > ports::MAX_PORTS {
            bail!(
                "port set has {} entries, at most {} allowed",
                self.ports.len(),
                ports::MAX_PORTS
            );
        }
        if self.ports.contains(&0) {
            bail!("port 0 is not a valid TCP port");
        }
        if self.timeout_ms == 0 {
            bail!("timeout_ms must be greater than zero");
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            bail!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            );
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}
