use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::strength::DEFAULT_LOOKBACK;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TRIALS: usize = 6000;
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Runtime knobs for the engine. Model constants are not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    pub trials: usize,
    /// Most recent venue matches fed to the strength estimate.
    pub lookback: usize,
    pub parallel: bool,
    /// Trials per independently seeded worker chunk.
    pub chunk_size: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            trials: DEFAULT_TRIALS,
            lookback: DEFAULT_LOOKBACK,
            parallel: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SimConfig {
    /// Defaults overridden by `FIXTURE_SIM_*` variables (a `.env` file is
    /// read first if present). Unparseable values are ignored.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::default().with_env_overrides()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: SimConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    pub fn with_env_overrides(self) -> Self {
        let mut cfg = self;
        if let Some(v) = env_parse::<u64>("FIXTURE_SIM_SEED") {
            cfg.seed = v;
        }
        if let Some(v) = env_parse::<usize>("FIXTURE_SIM_TRIALS") {
            cfg.trials = v;
        }
        if let Some(v) = env_parse::<usize>("FIXTURE_SIM_LOOKBACK") {
            cfg.lookback = v;
        }
        if let Some(v) = env_parse::<bool>("FIXTURE_SIM_PARALLEL") {
            cfg.parallel = v;
        }
        if let Some(v) = env_parse::<usize>("FIXTURE_SIM_CHUNK") {
            cfg.chunk_size = v;
        }
        cfg.sanitized()
    }

    pub fn sanitized(self) -> Self {
        Self {
            trials: self.trials.max(1),
            chunk_size: self.chunk_size.max(1),
            ..self
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
}
