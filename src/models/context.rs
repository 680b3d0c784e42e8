//! Resolved contexts and their merged settings.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_ON_STATUS: [u16; 3] = [502, 503, 504];

/// A cluster referenced by a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub name: String,
    pub servers: Vec<String>,
}

/// Credentials referenced by a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub name: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl User {
    /// Basic auth credentials, only when both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() => Some((username, password)),
            _ => None,
        }
    }
}

/// A fully resolved context: the unit selected for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub name: String,
    pub cluster: Cluster,
    pub user: Option<User>,
    pub settings: Settings,
}

impl Context {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.user.as_ref().and_then(User::credentials)
    }
}

/// Behavioral settings, merged from the global, cluster and context layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    values: BTreeMap<String, Value>,
}

impl Settings {
    /// Merge layers in order; later layers override earlier ones key by key.
    pub fn layered<'a>(layers: impl IntoIterator<Item = &'a Mapping>) -> Self {
        let mut values = BTreeMap::new();
        for layer in layers {
            for (key, value) in layer {
                values.insert(key_to_string(key), value.clone());
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn no_check_certificate(&self) -> Result<bool, ConfigError> {
        Ok(self.bool_setting("no_check_certificate")?.unwrap_or(false))
    }

    pub fn http_compress(&self) -> Result<bool, ConfigError> {
        Ok(self.bool_setting("http_compress")?.unwrap_or(false))
    }

    pub fn retry_on_timeout(&self) -> Result<bool, ConfigError> {
        Ok(self.bool_setting("retry_on_timeout")?.unwrap_or(false))
    }

    pub fn fail_fast_on_connect(&self) -> Result<bool, ConfigError> {
        Ok(self.bool_setting("fail_fast_on_connect")?.unwrap_or(true))
    }

    pub fn max_retries(&self) -> Result<u32, ConfigError> {
        match self.get("max_retries") {
            None => Ok(DEFAULT_MAX_RETRIES),
            Some(value) => value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| invalid("max_retries", "a non-negative integer", value)),
        }
    }

    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        match self.get("timeout") {
            None => Ok(DEFAULT_TIMEOUT),
            Some(value) => parse_duration(value)
                .ok_or_else(|| invalid("timeout", "a duration (seconds, or e.g. '500ms', '10s', '2m')", value)),
        }
    }

    pub fn retry_on_status(&self) -> Result<Vec<u16>, ConfigError> {
        let Some(value) = self.get("retry_on_status") else {
            return Ok(DEFAULT_RETRY_ON_STATUS.to_vec());
        };
        let expected = "a list of HTTP status codes";
        value
            .as_sequence()
            .ok_or_else(|| invalid("retry_on_status", expected, value))?
            .iter()
            .map(|status| {
                status
                    .as_u64()
                    .and_then(|n| u16::try_from(n).ok())
                    .filter(|n| (100..600).contains(n))
                    .ok_or_else(|| invalid("retry_on_status", expected, value))
            })
            .collect()
    }

    fn bool_setting(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.get(key)
            .map(|value| value.as_bool().ok_or_else(|| invalid(key, "a boolean", value)))
            .transpose()
    }
}

fn invalid(key: &str, expected: &'static str, value: &Value) -> ConfigError {
    ConfigError::InvalidSetting {
        key: key.to_string(),
        expected,
        value: describe_value(value),
    }
}

pub(crate) fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => describe_value(other),
    }
}

/// Render a YAML value on a single line for diagnostics.
pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().replace('\n', " "))
            .unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// Parse a duration given as seconds (number or numeric string) or with a
/// `ms`, `s`, `m` or `h` suffix.
pub fn parse_duration(value: &Value) -> Option<Duration> {
    if let Some(secs) = value.as_f64() {
        return Duration::try_from_secs_f64(secs).ok();
    }

    let text = value.as_str()?.trim();
    let (number, unit) = if let Some(n) = text.strip_suffix("ms") {
        (n, 0.001)
    } else if let Some(n) = text.strip_suffix('s') {
        (n, 1.0)
    } else if let Some(n) = text.strip_suffix('m') {
        (n, 60.0)
    } else if let Some(n) = text.strip_suffix('h') {
        (n, 3600.0)
    } else {
        (text, 1.0)
    };

    let number: f64 = number.trim().parse().ok()?;
    Duration::try_from_secs_f64(number * unit).ok()
}
