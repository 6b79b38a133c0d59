//! Configuration management for atareport.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "atareport";

/// Directory under the data directory holding generation artifacts.
const TEMP_DIR_NAME: &str = "temp";

/// Environment variable prefix.
const ENV_PREFIX: &str = "ATAREPORT_";

/// Logo formats that can be embedded as a data URI.
const LOGO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ATAREPORT_`, `__` between
///    section and key, e.g. `ATAREPORT_SERVER__PORT`)
/// 2. TOML config file at `~/.config/atareport/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Form storage configuration.
    pub storage: StorageConfig,
    /// Report export configuration.
    pub export: ExportConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Allow requests from any origin.
    pub permissive_cors: bool,
}

/// Form storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the index and the forms directory.
    /// Defaults to `~/.local/share/atareport`
    pub data_dir: Option<PathBuf>,
    /// Index file name inside `data_dir`.
    pub index_file: String,
    /// Forms directory name inside `data_dir`.
    pub forms_dir: String,
}

/// Report export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Where PDFs and archives are staged.
    /// Defaults to `<data_dir>/temp`
    pub temp_dir: Option<PathBuf>,
    /// HTML-to-PDF command, invoked as `<cmd> [options] - <output.pdf>`.
    pub renderer_command: String,
    /// Paper size passed to the renderer.
    pub page_size: String,
    /// Page margin on every side, in millimetres.
    pub margin_mm: u32,
    /// Upper bound on one rendering, in seconds.
    pub render_timeout_secs: u64,
    /// Logo embedded in the report header.
    pub logo_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            permissive_cors: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None, // Will be resolved to default at runtime
            index_file: "formList.json".to_string(),
            forms_dir: "forms".to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            renderer_command: "wkhtmltopdf".to_string(),
            page_size: "A4".to_string(),
            margin_mm: 20,
            render_timeout_secs: 120,
            logo_path: None,
        }
    }
}

impl StorageConfig {
    /// Get the data directory, resolving the default if not set.
    #[must_use]
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(Config::default_data_dir)
    }
}

impl ExportConfig {
    /// Get the render timeout as a Duration.
    #[must_use]
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation
    /// fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }

        validate_file_name("storage.index_file", &self.storage.index_file)?;
        validate_file_name("storage.forms_dir", &self.storage.forms_dir)?;
        if self.storage.index_file == self.storage.forms_dir {
            return Err(invalid(
                "storage.index_file and storage.forms_dir must differ",
            ));
        }

        if self.export.renderer_command.trim().is_empty() {
            return Err(invalid("export.renderer_command must not be empty"));
        }
        if self.export.page_size.trim().is_empty() {
            return Err(invalid("export.page_size must not be empty"));
        }
        if self.export.render_timeout_secs == 0 {
            return Err(invalid("export.render_timeout_secs must be greater than 0"));
        }

        if let Some(logo) = &self.export.logo_path {
            if logo_mime_type(logo).is_none() {
                return Err(invalid(format!(
                    "export.logo_path has an unsupported image type: {} (expected one of {})",
                    logo.display(),
                    LOGO_EXTENSIONS.join(", ")
                )));
            }
        }

        Ok(())
    }

    /// Get the data directory, resolving defaults if not set.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage.resolved_data_dir()
    }

    /// Get the export staging directory, resolving defaults if not set.
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.export
            .temp_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join(TEMP_DIR_NAME))
    }

    /// Get the `host:port` string the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// MIME type for a logo file, judged by its extension.
#[must_use]
pub fn logo_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn validate_file_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(invalid(format!(
            "{field} must be a plain file name, got {value:?}"
        )));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert!(config.server.permissive_cors);
        assert!(config.storage.data_dir.is_none());
        assert!(config.export.logo_path.is_none());
    }

    #[test]
    fn test_default_storage_config() {
        let storage = StorageConfig::default();

        assert_eq!(storage.index_file, "formList.json");
        assert_eq!(storage.forms_dir, "forms");
    }

    #[test]
    fn test_default_export_config() {
        let export = ExportConfig::default();

        assert_eq!(export.renderer_command, "wkhtmltopdf");
        assert_eq!(export.page_size, "A4");
        assert_eq!(export.margin_mm, 20);
        assert_eq!(export.render_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.port"));
    }

    #[test]
    fn test_validate_empty_renderer() {
        let mut config = Config::default();
        config.export.renderer_command = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("renderer_command"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.export.render_timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("render_timeout_secs"));
    }

    #[test]
    fn test_validate_file_names() {
        let mut config = Config::default();
        config.storage.index_file = "../formList.json".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.forms_dir = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.forms_dir = "formList.json".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_logo_extension() {
        let mut config = Config::default();
        config.export.logo_path = Some(PathBuf::from("/srv/logo.JPG"));
        assert!(config.validate().is_ok());

        config.export.logo_path = Some(PathBuf::from("/srv/logo.txt"));
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("logo_path"));
    }

    #[test]
    fn test_logo_mime_type() {
        assert_eq!(logo_mime_type(Path::new("a.png")), Some("image/png"));
        assert_eq!(logo_mime_type(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(logo_mime_type(Path::new("logo")), None);
    }

    #[test]
    fn test_data_dir_default() {
        let config = Config::default();
        assert!(config.data_dir().to_string_lossy().contains("atareport"));
    }

    #[test]
    fn test_temp_dir_follows_data_dir() {
        let mut config = Config::default();
        config.storage.data_dir = Some(PathBuf::from("/srv/atareport"));
        assert_eq!(config.temp_dir(), PathBuf::from("/srv/atareport/temp"));

        config.export.temp_dir = Some(PathBuf::from("/tmp/reports"));
        assert_eq!(config.temp_dir(), PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_bind_address() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 8080;
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("atareport"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_load_toml_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 4000\n\n[export]\nrender_timeout_secs = 30\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.export.render_timeout_secs, 30);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[export]\nrender_timeout_secs = 0\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_export_config_serialize() {
        let export = ExportConfig::default();
        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("renderer_command"));
    }
}
