use crate::filter::{CLIENT_SUPPORT_PACKAGE, CompileOptions, DEFAULT_SPEC, FilterSpec, FilterSpecError};
use serde::{Deserialize, Serialize};
use std::env::{self, VarError};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

/// Environment variable that overrides the configured spec
pub const SPEC_ENV_VAR: &str = "UNMARSHAL_FILTER_SPEC";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Environment variable {var} is not valid UTF-8")]
    InvalidEnv { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Replacement spec. `None` uses the built-in blocklist; `""` disables filtering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    /// Package implicitly admitted when the spec is an allowlist.
    pub client_support_package: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            spec: None,
            client_support_package: CLIENT_SUPPORT_PACKAGE.to_string(),
        }
    }
}

impl FilterConfig {
    /// Replace the configured spec when an override is present
    pub fn with_override(mut self, spec: Option<String>) -> Self {
        if spec.is_some() {
            self.spec = spec;
        }
        self
    }

    /// The spec text that will be compiled
    pub fn effective_spec(&self) -> &str {
        self.spec.as_deref().unwrap_or(DEFAULT_SPEC)
    }

    pub fn is_default_spec(&self) -> bool {
        self.spec.is_none()
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            client_support_package: self.client_support_package.clone(),
        }
    }

    pub fn compile(&self) -> Result<FilterSpec, FilterSpecError> {
        FilterSpec::compile_with(self.effective_spec(), &self.compile_options())
    }
}

/// Spec override from the command line, falling back to `UNMARSHAL_FILTER_SPEC`.
/// An empty value is an override too; it disables filtering. A value that is
/// not UTF-8 is an error rather than a silent fallback to the default spec.
pub fn spec_override(flag: Option<String>) -> Result<Option<String>, ConfigError> {
    if flag.is_some() {
        return Ok(flag);
    }
    match env::var(SPEC_ENV_VAR) {
        Ok(spec) => Ok(Some(spec)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::InvalidEnv { var: SPEC_ENV_VAR }),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<FilterConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<FilterConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    toml::from_str::<FilterConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

pub fn default_config() -> &'static FilterConfig {
    static DEFAULT_CONFIG: LazyLock<FilterConfig> = LazyLock::new(FilterConfig::default);
    &DEFAULT_CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Mode;

    #[test]
    fn test_default_config_uses_builtin_spec() {
        let config = load_config(None).unwrap();
        assert!(config.is_default_spec());
        assert_eq!(config.effective_spec(), DEFAULT_SPEC);
        assert_eq!(config.compile().unwrap().mode(), Mode::Blocklist);
    }

    #[test]
    fn test_override_takes_precedence() {
        let config = FilterConfig {
            spec: Some("!a.B".to_string()),
            ..FilterConfig::default()
        };
        assert_eq!(config.clone().with_override(None).effective_spec(), "!a.B");
        assert_eq!(
            config.with_override(Some("c.*".to_string())).effective_spec(),
            "c.*"
        );
    }

    #[test]
    fn test_flag_override_wins_without_reading_env() {
        assert_eq!(
            spec_override(Some("!a.B".to_string())).unwrap(),
            Some("!a.B".to_string())
        );
    }

    #[test]
    fn test_empty_override_disables_filtering() {
        let config = FilterConfig::default().with_override(Some(String::new()));
        assert!(!config.is_default_spec());
        assert!(config.compile().unwrap().is_empty());
    }
}
