//! Runtime configuration for the sync engine.
//!
//! Values come from [`SyncConfig::default`], optionally overridden by a TOML
//! file, then by `STRAND_*` environment variables, then by explicit
//! `key=value` pairs.

use crate::errors::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment overrides, e.g. `STRAND_PUT_SLICE=16`
pub const ENV_PREFIX: &str = "STRAND_";

/// Largest timer delay the scheduler accepts (2^31 - 1 ms)
pub const MAX_DEFER_MS: u64 = 2_147_483_647;

/// Tunables for the engine and its default handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Fields committed per scheduler tick when walking a put batch
    pub put_slice: usize,
    /// Fields serialized per reply slice when answering a whole-node read
    pub reply_slice: usize,
    /// Cap on how long a future-state write is deferred before re-evaluation
    pub max_defer_ms: u64,
    /// Message ids remembered by the dedup cache
    pub dedup_max_entries: usize,
    /// Age after which a remembered id is forgotten
    pub dedup_max_age_ms: u64,
    /// Length of generated message ids
    pub id_length: usize,
    /// Capacity of the runtime command channel
    pub inbox_capacity: usize,
    /// Offset added to the wall clock by the system clock handler
    pub clock_drift_ms: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            put_slice: 9,
            reply_slice: 9,
            max_defer_ms: MAX_DEFER_MS,
            dedup_max_entries: 999,
            dedup_max_age_ms: 9_000,
            id_length: 9,
            inbox_capacity: 1024,
            clock_drift_ms: 0.0,
        }
    }
}

impl SyncConfig {
    /// Load a configuration from a TOML file; missing keys keep their defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        if let Err(err) = config.validate() {
            tracing::warn!(path = %path.display(), error = %err, "rejecting sync configuration");
            return Err(err);
        }
        tracing::debug!(path = %path.display(), "loaded sync configuration");
        Ok(config)
    }

    /// Apply `STRAND_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.apply_env(std::env::vars())
    }

    /// Apply `STRAND_*` overrides from an arbitrary variable set
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                let name = name.to_lowercase();
                self.set_from_string(&name, &value)?;
                tracing::debug!(key = %name, value = %value, "config override from environment");
            }
        }
        Ok(())
    }

    /// Set a single option by name (for CLI and env parsing)
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "put_slice" => self.put_slice = parse(key, value)?,
            "reply_slice" => self.reply_slice = parse(key, value)?,
            "max_defer_ms" => self.max_defer_ms = parse(key, value)?,
            "dedup_max_entries" => self.dedup_max_entries = parse(key, value)?,
            "dedup_max_age_ms" => self.dedup_max_age_ms = parse(key, value)?,
            "id_length" => self.id_length = parse(key, value)?,
            "inbox_capacity" => self.inbox_capacity = parse(key, value)?,
            "clock_drift_ms" => self.clock_drift_ms = parse(key, value)?,
            _ => return Err(SyncError::config(format!("Unknown config key: {key}"))),
        }
        Ok(())
    }

    /// Take every value of `other` that differs from the defaults
    pub fn merge_with(&mut self, other: &Self) {
        let defaults = Self::default();
        if other.put_slice != defaults.put_slice {
            self.put_slice = other.put_slice;
        }
        if other.reply_slice != defaults.reply_slice {
            self.reply_slice = other.reply_slice;
        }
        if other.max_defer_ms != defaults.max_defer_ms {
            self.max_defer_ms = other.max_defer_ms;
        }
        if other.dedup_max_entries != defaults.dedup_max_entries {
            self.dedup_max_entries = other.dedup_max_entries;
        }
        if other.dedup_max_age_ms != defaults.dedup_max_age_ms {
            self.dedup_max_age_ms = other.dedup_max_age_ms;
        }
        if other.id_length != defaults.id_length {
            self.id_length = other.id_length;
        }
        if other.inbox_capacity != defaults.inbox_capacity {
            self.inbox_capacity = other.inbox_capacity;
        }
        if other.clock_drift_ms != defaults.clock_drift_ms {
            self.clock_drift_ms = other.clock_drift_ms;
        }
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.put_slice == 0 || self.reply_slice == 0 {
            return Err(SyncError::config("Slice sizes must be at least 1"));
        }
        if self.max_defer_ms == 0 || self.max_defer_ms > MAX_DEFER_MS {
            return Err(SyncError::config(format!(
                "max_defer_ms must be in 1..={MAX_DEFER_MS}"
            )));
        }
        if self.dedup_max_entries == 0 {
            return Err(SyncError::config("dedup_max_entries must be at least 1"));
        }
        if self.id_length < 4 {
            return Err(SyncError::config("id_length must be at least 4"));
        }
        if self.inbox_capacity == 0 {
            return Err(SyncError::config("inbox_capacity must be at least 1"));
        }
        if !self.clock_drift_ms.is_finite() {
            return Err(SyncError::config("clock_drift_ms must be finite"));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SyncError::config(format!("Invalid value for {key}: {value:?}")))
}
