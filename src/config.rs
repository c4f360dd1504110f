//! Configuration for the `openapi-ir` tool
//!
//! Sources, later wins:
//! - built-in defaults
//! - `openapi-ir.toml`, `.openapi-ir.toml`, `config/openapi-ir.toml`
//! - the XDG config directory
//! - an explicit `--config` file
//! - environment variables (`OPENAPI_IR__WALK__ORDER=declarations`)
//!
//! ## Example config file (openapi-ir.toml):
//! ```toml
//! [walk]
//! order = "topological"
//! prefer_groups = ["server", "schema", "parameter", "requestBody", "operation", "webhook"]
//!
//! [output]
//! format = "pretty"
//!
//! [logging]
//! filter = "openapi_ir=debug"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::graph::{GroupKind, WalkOptions, WalkOrder, DEFAULT_PREFER_GROUPS};

const FILE_NAME: &str = "openapi-ir.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrConfig {
    #[serde(default)]
    pub walk: WalkConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Emission order of the graph walker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkConfig {
    #[serde(default)]
    pub order: WalkOrder,

    /// Group kinds emitted first when several are ready at once
    #[serde(default = "default_prefer_groups")]
    pub prefer_groups: Vec<GroupKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_prefer_groups() -> Vec<GroupKind> {
    DEFAULT_PREFER_GROUPS.to_vec()
}

fn default_filter() -> String {
    "warn".to_string()
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            order: WalkOrder::default(),
            prefer_groups: default_prefer_groups(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl IrConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, with `config_path` layered over the default
    /// locations. An explicit path must exist.
    pub fn load_from(config_path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in [FILE_NAME, ".openapi-ir.toml", "config/openapi-ir.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "openapi-ir", "openapi-ir") {
            let xdg_config = dirs.config_dir().join(FILE_NAME);
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("OPENAPI_IR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::error::IrError::InvalidFormat(format!("cannot serialize config: {}", e)))
    }

    /// Walker options for the configured order and preferences
    pub fn walk_options(&self) -> WalkOptions<'static> {
        WalkOptions::new(self.walk.order).with_prefer_groups(self.walk.prefer_groups.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = IrConfig::default();
        assert_eq!(config.walk.order, WalkOrder::Topological);
        assert_eq!(config.walk.prefer_groups.first(), Some(&GroupKind::Server));
        assert_eq!(config.walk.prefer_groups.len(), 6);
        assert_eq!(config.output.format, OutputFormat::Pretty);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_serialize_config() {
        let toml_str = IrConfig::default().to_toml().unwrap();
        assert!(toml_str.contains("[walk]"));
        assert!(toml_str.contains("order = \"topological\""));
        assert!(toml_str.contains("requestBody"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[walk]\norder = \"declarations\"\nprefer_groups = [\"operation\", \"schema\"]\n\n[output]\nformat = \"compact\""
        )
        .unwrap();

        let config = IrConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.walk.order, WalkOrder::Declarations);
        assert_eq!(config.walk.prefer_groups, vec![GroupKind::Operation, GroupKind::Schema]);
        assert_eq!(config.output.format, OutputFormat::Compact);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(IrConfig::load_from(Some(&missing)).is_err());
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        let mut config = IrConfig::default();
        config.walk.order = WalkOrder::Declarations;
        config.logging.filter = "openapi_ir=trace".into();
        config.save(&path).unwrap();

        let loaded = IrConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }
}
