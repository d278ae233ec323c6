use crate::command::registry::DEFAULT_REGISTRY_SIZE;
use crate::command::undo::DEFAULT_UNDO_SIZE;
use crate::logging::LogLevel;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Timing of the bundled gestures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureSettings {
    /// Delay after which an incomplete multi-tap is cancelled.
    #[serde(default = "default_tap_timeout_ms")]
    pub tap_timeout_ms: u64,
    /// Idle delay that ends a key sequence.
    #[serde(default = "default_keys_typed_timeout_ms")]
    pub keys_typed_timeout_ms: u64,
    #[serde(default = "default_long_touch_ms")]
    pub long_touch_ms: u64,
}

fn default_tap_timeout_ms() -> u64 {
    1000
}

fn default_keys_typed_timeout_ms() -> u64 {
    1000
}

fn default_long_touch_ms() -> u64 {
    1000
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            tap_timeout_ms: default_tap_timeout_ms(),
            keys_typed_timeout_ms: default_keys_typed_timeout_ms(),
            long_touch_ms: default_long_touch_ms(),
        }
    }
}

impl GestureSettings {
    pub fn tap_timeout(&self) -> Duration {
        Duration::from_millis(self.tap_timeout_ms)
    }

    pub fn keys_typed_timeout(&self) -> Duration {
        Duration::from_millis(self.keys_typed_timeout_ms)
    }

    pub fn long_touch(&self) -> Duration {
        Duration::from_millis(self.long_touch_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// When enabled the logger is initialised at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Capacity of the commands registry.
    #[serde(default = "default_registry_size_max")]
    pub registry_size_max: usize,
    #[serde(default = "default_undo_size_max")]
    pub undo_size_max: usize,
    /// Verbose logging applied to bindings that do not choose their own.
    #[serde(default)]
    pub log_levels: Vec<LogLevel>,
    #[serde(default)]
    pub gestures: GestureSettings,
}

fn default_registry_size_max() -> usize {
    DEFAULT_REGISTRY_SIZE
}

fn default_undo_size_max() -> usize {
    DEFAULT_UNDO_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            registry_size_max: default_registry_size_max(),
            undo_size_max: default_undo_size_max(),
            log_levels: Vec::new(),
            gestures: GestureSettings::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`. A missing or empty file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("invalid settings file {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write settings to {}", path.display()))?;
        Ok(())
    }
}
