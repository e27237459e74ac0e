//! # Playback Configuration
//!
//! Tuning knobs for the playback controller, loadable from TOML. Missing
//! fields take their defaults:
//!
//! ```toml
//! ticks_per_second = 20
//! pacing = "instant"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::messages::DecodeLimits;

/// How presentation time follows the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// Always present the newest received tick. Lowest latency, shows jitter.
    Instant,
    /// Keep an adaptive buffer sized from recent arrival jitter.
    Smooth,
}

/// Playback controller configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Simulation tick rate.
    pub ticks_per_second: u32,
    /// Pacing policy.
    pub pacing: Pacing,
    /// Arrival-history window in seconds.
    pub jitter_window_secs: u32,
    /// Upper clamp of the smooth-mode buffer.
    pub max_buffer_ms: i64,
    /// Excess buffer beyond which catch-up is instant.
    pub immediate_catch_up_ms: i64,
    /// Gradual catch-up rate as a fraction of real time.
    pub max_catch_up_speedup: f64,
    /// Lower bound of the per-frame tick cap.
    pub min_ticks_per_frame: u32,
    /// Normal latency-probe interval.
    pub probe_interval_ms: i64,
    /// Probe interval while local actions are being sent.
    pub accelerated_probe_interval_ms: i64,
    /// Decode guard for strings.
    pub max_string_bytes: usize,
    /// Decode guard for byte strings and snapshots.
    pub max_byte_string_bytes: usize,
    /// Decode guard for ops per timeline update.
    pub max_ops_per_update: usize,
    /// Attach per-op debug checksums when the server sends them.
    pub enhanced_debug: bool,
    /// Committed-op records kept for mismatch reports.
    pub journal_history: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 10,
            pacing: Pacing::Smooth,
            jitter_window_secs: 5,
            max_buffer_ms: 500,
            immediate_catch_up_ms: 1_000,
            max_catch_up_speedup: 0.2,
            min_ticks_per_frame: 10,
            probe_interval_ms: 5_000,
            accelerated_probe_interval_ms: 1_000,
            max_string_bytes: 64 * 1024,
            max_byte_string_bytes: 1024 * 1024,
            max_ops_per_update: 4_096,
            enhanced_debug: false,
            journal_history: 256,
        }
    }
}

impl PlaybackConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`] for
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks every field is in range.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_second == 0 {
            return Err(ConfigError::Invalid("ticks_per_second must be > 0".into()));
        }
        if self.jitter_window_secs == 0 {
            return Err(ConfigError::Invalid("jitter_window_secs must be > 0".into()));
        }
        if self.max_buffer_ms < 0 || self.immediate_catch_up_ms < 0 {
            return Err(ConfigError::Invalid("buffer limits must be >= 0".into()));
        }
        if !(self.max_catch_up_speedup.is_finite() && self.max_catch_up_speedup >= 0.0) {
            return Err(ConfigError::Invalid(
                "max_catch_up_speedup must be a finite value >= 0".into(),
            ));
        }
        if self.probe_interval_ms <= 0 || self.accelerated_probe_interval_ms <= 0 {
            return Err(ConfigError::Invalid("probe intervals must be > 0".into()));
        }
        if self.max_ops_per_update == 0 {
            return Err(ConfigError::Invalid("max_ops_per_update must be > 0".into()));
        }
        Ok(())
    }

    /// Maximum ticks extracted in one frame.
    #[inline]
    #[must_use]
    pub fn tick_cap(&self) -> u32 {
        self.min_ticks_per_frame.max(self.ticks_per_second)
    }

    /// Capacity of the arrival-history window.
    #[inline]
    #[must_use]
    pub fn jitter_capacity(&self) -> usize {
        (self.jitter_window_secs as usize).saturating_mul(self.ticks_per_second as usize)
    }

    /// Decode guards for incoming frames.
    #[must_use]
    pub const fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits {
            max_string_bytes: self.max_string_bytes,
            max_byte_string_bytes: self.max_byte_string_bytes,
            max_ops: self.max_ops_per_update,
        }
    }

    /// Model time of tick `tick`, in milliseconds.
    #[inline]
    #[must_use]
    pub fn tick_time(&self, tick: i64) -> i64 {
        tick.saturating_mul(1_000) / i64::from(self.ticks_per_second.max(1))
    }

    /// Length of one tick in milliseconds.
    #[inline]
    #[must_use]
    pub fn tick_interval_ms(&self) -> f64 {
        1_000.0 / f64::from(self.ticks_per_second.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = PlaybackConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_cap(), 10);
        assert_eq!(config.jitter_capacity(), 50);
        assert_eq!(config.tick_time(3), 300);
    }

    #[test]
    fn test_partial_toml() {
        let config = PlaybackConfig::from_toml_str(
            r#"
            ticks_per_second = 30
            pacing = "instant"
            "#,
        )
        .unwrap();
        assert_eq!(config.ticks_per_second, 30);
        assert_eq!(config.pacing, Pacing::Instant);
        assert_eq!(config.max_buffer_ms, 500);
        assert_eq!(config.tick_cap(), 30);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PlaybackConfig::from_toml_str("ticks_per_second = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlaybackConfig::from_toml_str("pacing = \"bouncy\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PlaybackConfig {
            pacing: Pacing::Instant,
            enhanced_debug: true,
            ..PlaybackConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(PlaybackConfig::from_toml_str(&text).unwrap(), config);
    }
}
