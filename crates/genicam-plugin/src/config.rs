//! Plugin configuration and validation

use genicam_core::MergePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to parse fingerprint period {value:?}: {reason}")]
    InvalidPeriod { value: String, reason: String },
    #[error("stats interval must be greater than zero")]
    InvalidStatsInterval,
}

/// Plugin configuration as supplied by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Whether devices may be reserved
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fingerprint polling period (e.g. "5s", "1m30s", "500ms")
    #[serde(default = "default_fingerprint_period")]
    pub fingerprint_period: String,
    /// Keep devices that vanished from enumeration reservable
    #[serde(default)]
    pub retain_vanished_devices: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fingerprint_period: default_fingerprint_period(),
            retain_vanished_devices: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_fingerprint_period() -> String {
    "5s".to_string()
}

impl PluginConfig {
    /// Validate and convert into runtime settings
    pub fn to_settings(&self) -> Result<PluginSettings, ConfigError> {
        let period = parse_duration(&self.fingerprint_period).map_err(|reason| {
            ConfigError::InvalidPeriod {
                value: self.fingerprint_period.clone(),
                reason,
            }
        })?;
        if period.is_zero() {
            return Err(ConfigError::InvalidPeriod {
                value: self.fingerprint_period.clone(),
                reason: "period must be greater than zero".to_string(),
            });
        }

        Ok(PluginSettings {
            enabled: self.enabled,
            fingerprint_period: period,
            merge_policy: if self.retain_vanished_devices {
                MergePolicy::Retain
            } else {
                MergePolicy::Replace
            },
        })
    }
}

/// Validated configuration used at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginSettings {
    pub enabled: bool,
    pub fingerprint_period: Duration,
    pub merge_policy: MergePolicy,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            fingerprint_period: Duration::from_secs(5),
            merge_policy: MergePolicy::Replace,
        }
    }
}

/// One recognized configuration option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigOption {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub value_type: &'static str,
    pub required: bool,
    /// Default value as a literal
    pub default: &'static str,
}

/// Options accepted in the plugin configuration block
pub fn config_schema() -> Vec<ConfigOption> {
    vec![
        ConfigOption {
            name: "enabled",
            value_type: "bool",
            required: false,
            default: "true",
        },
        ConfigOption {
            name: "fingerprint_period",
            value_type: "string",
            required: false,
            default: "\"5s\"",
        },
        ConfigOption {
            name: "retain_vanished_devices",
            value_type: "bool",
            required: false,
            default: "false",
        },
    ]
}

/// Parse a duration string such as "5s", "1m30s", "1.5h" or "250ms"
///
/// Accepted units: ns, us (or µs), ms, s, m, h. A bare "0" is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if s.starts_with('-') {
        return Err("negative duration".to_string());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut nanos = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("expected a number at {:?}", rest));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("malformed number {:?}", &rest[..number_len]))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in {:?}", input)),
            unit => return Err(format!("unknown unit {:?}", unit)),
        };
        nanos += value * scale;
        rest = &rest[unit_len..];
    }

    let nanos = nanos.round();
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Err("duration out of range".to_string());
    }
    Ok(Duration::from_nanos(nanos as u64))
}
