use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Env var naming a JSON config file.
pub const CONFIG_PATH_ENV: &str = "SIGNFLOW_CONFIG";
/// Env var forcing debug output ("1" or "true").
pub const DEBUG_ENV: &str = "SIGNFLOW_DEBUG";

/// Tunables for the per-session sign buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Signs below this confidence are never buffered
    pub min_confidence: f32,

    /// Same symbol again within this window is a held gesture, not a repeat
    pub debounce_ms: u64,

    /// Idle time after the last accepted sign before a sequence may commit
    pub commit_timeout_ms: u64,

    pub min_sequence_length: usize,

    /// Oldest signs are dropped beyond this
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            debounce_ms: 500,
            commit_timeout_ms: 2000,
            min_sequence_length: 2,
            capacity: 100,
        }
    }
}

impl BufferConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Classifier output below this is reported but not buffered
    pub detection_threshold: f32,

    pub buffer: BufferConfig,

    /// How often the idle-commit sweeper looks for ready sessions
    pub sweep_interval_ms: u64,

    /// Echo raw landmarks back in detection results
    pub debug: bool,

    /// Write committed sequences to the output stream. When off they are
    /// only logged.
    pub emit_sequences: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 0.7,
            buffer: BufferConfig::default(),
            sweep_interval_ms: 250,
            debug: false,
            emit_sequences: true,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the file named by `SIGNFLOW_CONFIG`, with
    /// `SIGNFLOW_DEBUG` applied on top.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };

        let debug_mode = std::env::var(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            config.debug = true;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detection_threshold) {
            bail!(
                "detection_threshold must be within [0, 1], got {}",
                self.detection_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.buffer.min_confidence) {
            bail!(
                "buffer.min_confidence must be within [0, 1], got {}",
                self.buffer.min_confidence
            );
        }
        if self.buffer.capacity == 0 {
            bail!("buffer.capacity must be greater than zero");
        }
        if self.buffer.min_sequence_length == 0 {
            bail!("buffer.min_sequence_length must be greater than zero");
        }
        if self.sweep_interval_ms == 0 {
            bail!("sweep_interval_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}
