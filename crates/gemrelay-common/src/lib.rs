use serde::{Deserialize, Serialize};

pub const ENV_AUTO_DISABLE: &str = "GEMRELAY_AUTO_DISABLE";
pub const ENV_AUTO_ENABLE: &str = "GEMRELAY_AUTO_ENABLE";
pub const ENV_DISABLE_KEYWORDS: &str = "GEMRELAY_DISABLE_KEYWORDS";
pub const ENV_DEBUG_BODY: &str = "GEMRELAY_DEBUG_BODY";

/// Upstream messages that mean the credential itself is unusable.
pub const DEFAULT_DISABLE_KEYWORDS: &[&str] = &[
    "Your credit balance is too low",
    "This organization has been disabled.",
    "Permission denied",
    "The security token included in the request is invalid",
    "Operation not allowed",
    "Your account is not authorized",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid boolean for {field}: {value:?}")]
    InvalidBool { field: &'static str, value: String },
}

/// Final, merged relay configuration used by the running process.
///
/// Merge order: CLI > ENV > defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Take channels out of rotation when an upstream failure looks fatal.
    pub automatic_disable_enabled: bool,
    /// Put auto-disabled channels back once they answer successfully.
    pub automatic_enable_enabled: bool,
    /// Case-insensitive substrings that mark an upstream message as fatal.
    pub disable_keywords: Vec<String>,
    /// Log raw upstream bodies at debug level.
    pub debug_body: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfigPatch::default().into_config()
    }
}

/// Optional layer used for merging relay config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayConfigPatch {
    pub automatic_disable_enabled: Option<bool>,
    pub automatic_enable_enabled: Option<bool>,
    pub disable_keywords: Option<Vec<String>>,
    pub debug_body: Option<bool>,
}

impl RelayConfigPatch {
    pub fn overlay(&mut self, other: RelayConfigPatch) {
        if other.automatic_disable_enabled.is_some() {
            self.automatic_disable_enabled = other.automatic_disable_enabled;
        }
        if other.automatic_enable_enabled.is_some() {
            self.automatic_enable_enabled = other.automatic_enable_enabled;
        }
        if other.disable_keywords.is_some() {
            self.disable_keywords = other.disable_keywords;
        }
        if other.debug_body.is_some() {
            self.debug_body = other.debug_body;
        }
    }

    pub fn into_config(self) -> RelayConfig {
        RelayConfig {
            automatic_disable_enabled: self.automatic_disable_enabled.unwrap_or(true),
            automatic_enable_enabled: self.automatic_enable_enabled.unwrap_or(true),
            disable_keywords: self.disable_keywords.unwrap_or_else(|| {
                DEFAULT_DISABLE_KEYWORDS
                    .iter()
                    .map(|keyword| keyword.to_string())
                    .collect()
            }),
            debug_body: self.debug_body.unwrap_or(false),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a patch from an arbitrary variable source. Unset or blank
    /// variables leave the field untouched.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Ok(Self {
            automatic_disable_enabled: get(ENV_AUTO_DISABLE)
                .map(|value| parse_bool(ENV_AUTO_DISABLE, &value))
                .transpose()?,
            automatic_enable_enabled: get(ENV_AUTO_ENABLE)
                .map(|value| parse_bool(ENV_AUTO_ENABLE, &value))
                .transpose()?,
            disable_keywords: get(ENV_DISABLE_KEYWORDS).map(|value| split_keywords(&value)),
            debug_body: get(ENV_DEBUG_BODY)
                .map(|value| parse_bool(ENV_DEBUG_BODY, &value))
                .transpose()?,
        })
    }
}

impl From<RelayConfig> for RelayConfigPatch {
    fn from(value: RelayConfig) -> Self {
        Self {
            automatic_disable_enabled: Some(value.automatic_disable_enabled),
            automatic_enable_enabled: Some(value.automatic_enable_enabled),
            disable_keywords: Some(value.disable_keywords),
            debug_body: Some(value.debug_body),
        }
    }
}

pub fn parse_bool(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            field,
            value: value.to_string(),
        }),
    }
}

/// Comma or newline separated keyword list; blank entries are dropped.
pub fn split_keywords(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_string)
        .collect()
}
