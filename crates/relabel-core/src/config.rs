//! Engine configuration
//!
//! Loaded from TOML. Every section is optional:
//!
//! ```toml
//! [logging]
//! profile = "production"
//! filter = "relabel=debug"
//!
//! [palette]
//! colors = ["#e53e3e", "#dd6b20"]
//!
//! [inference]
//! surface_latest_failure = true
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::errors::{RelabelError, Result};
use crate::logging_facility::Profile;
use crate::palette::default_palette;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub palette: PaletteConfig,
    pub inference: InferenceConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
    /// `EnvFilter` directive; overrides `RUST_LOG` when set
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaletteConfig {
    pub colors: Vec<String>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: default_palette(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    /// Report a failure of the most recent inference request to the caller.
    /// Failures of superseded requests are always dropped.
    pub surface_latest_failure: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            surface_latest_failure: true,
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// `Config` if the TOML is malformed, has unknown keys, or declares an
    /// empty palette.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(input).map_err(|e| RelabelError::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// `Config` if the file cannot be read or does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| RelabelError::Config {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&input)
    }

    fn validate(&self) -> Result<()> {
        if self.palette.colors.is_empty() {
            return Err(RelabelError::Config {
                reason: "palette.colors must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.inference.surface_latest_failure);
    }

    #[test]
    fn test_full_config() {
        let config = EngineConfig::from_toml_str(
            r##"
            [logging]
            profile = "production"
            filter = "relabel=trace"

            [palette]
            colors = ["#000000"]

            [inference]
            surface_latest_failure = false
            "##,
        )
        .unwrap();

        assert_eq!(config.logging.profile, Profile::Production);
        assert_eq!(config.logging.filter.as_deref(), Some("relabel=trace"));
        assert_eq!(config.palette.colors, vec!["#000000".to_string()]);
        assert!(!config.inference.surface_latest_failure);
    }

    #[test]
    fn test_empty_palette_is_rejected() {
        let err = EngineConfig::from_toml_str("[palette]\ncolors = []\n").unwrap_err();
        assert!(matches!(err, RelabelError::Config { .. }));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(EngineConfig::from_toml_str("[logging]\nlevel = 3\n").is_err());
    }
}
