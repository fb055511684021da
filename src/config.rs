use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wizard: WizardConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub temporary: TemporaryConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    /// Wizards hosted by the bundled server
    #[serde(default)]
    pub wizards: Vec<WizardDeclaration>,
}

/// Which store keeps in-progress wizard data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheDriver {
    #[default]
    Session,
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Cache step data between requests. When false every submitted step is
    /// handed straight to its save handler.
    #[serde(default = "default_cache_enabled")]
    pub cache: bool,
    #[serde(default)]
    pub driver: CacheDriver,
    /// Table used by the database driver
    #[serde(default = "default_table")]
    pub table: String,
    /// Prefix for default step view references
    #[serde(default = "default_step_view_path")]
    pub step_view_path: String,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_table() -> String {
    "wizards".to_string()
}

fn default_step_view_path() -> String {
    "wizard.steps".to_string()
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            cache: default_cache_enabled(),
            driver: CacheDriver::default(),
            table: default_table(),
            step_view_path: default_step_view_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://.formwizard/wizard.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Where uploads are stashed between steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporaryConfig {
    #[serde(default = "default_temporary_root")]
    pub root: String,
    #[serde(default = "default_temporary_folder")]
    pub folder: String,
}

fn default_temporary_root() -> String {
    ".formwizard/storage".to_string()
}

fn default_temporary_folder() -> String {
    "wizard_temp".to_string()
}

impl Default for TemporaryConfig {
    fn default() -> Self {
        Self {
            root: default_temporary_root(),
            folder: default_temporary_folder(),
        }
    }
}

impl TemporaryConfig {
    pub fn root_path(&self) -> PathBuf {
        absolute(&self.root)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    7010
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether the server logs to a file (false = stderr)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub state: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state: ".formwizard".to_string(),
        }
    }
}

/// A wizard declared in configuration rather than in code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardDeclaration {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDeclaration {
    /// Type tag; the slug defaults to its kebab-case form
    pub kind: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub view: Option<String>,
    /// Field name -> validation rules, e.g. `email = ["required", "email"]`
    #[serde(default)]
    pub rules: BTreeMap<String, Vec<String>>,
}

impl StepDeclaration {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            slug: None,
            label: None,
            view: None,
            rules: BTreeMap::new(),
        }
    }

    pub fn rule(mut self, field: &str, rules: &[&str]) -> Self {
        self.rules.insert(
            field.to_string(),
            rules.iter().map(|r| (*r).to_string()).collect(),
        );
        self
    }
}

fn absolute(path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}

impl Config {
    /// Path to the project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".formwizard/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the server works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        // User config in ~/.config/formwizard/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("formwizard").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with FORMWIZARD_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("FORMWIZARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to .formwizard/config.toml
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::project_config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(&config_path, toml_str).context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        absolute(&self.paths.state)
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }

    pub fn find_wizard(&self, name: &str) -> Option<&WizardDeclaration> {
        self.wizards.iter().find(|w| w.name == name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wizard: WizardConfig::default(),
            database: DatabaseConfig::default(),
            temporary: TemporaryConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            paths: PathsConfig::default(),
            wizards: vec![WizardDeclaration {
                name: "register".to_string(),
                title: Some("Create your account".to_string()),
                steps: vec![
                    StepDeclaration::new("AccountStep")
                        .rule("email", &["required", "email"])
                        .rule("password", &["required", "min:8"]),
                    StepDeclaration::new("ProfileStep").rule("name", &["required"]),
                    StepDeclaration::new("ConfirmStep"),
                ],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert!(config.wizard.cache);
        assert_eq!(config.wizard.driver, CacheDriver::Session);
        assert_eq!(config.wizard.table, "wizards");
        assert_eq!(config.server.port, 7010);
        assert_eq!(config.temporary.folder, "wizard_temp");
        assert!(config.find_wizard("register").is_some());
        assert!(config.find_wizard("missing").is_none());
    }

    #[test]
    fn test_driver_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CacheDriver::Database).unwrap(),
            "\"database\""
        );
        let driver: CacheDriver = serde_json::from_str("\"session\"").unwrap();
        assert_eq!(driver, CacheDriver::Session);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.wizards, config.wizards);
        assert_eq!(parsed.wizard.step_view_path, "wizard.steps");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [wizard]
            driver = "database"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.wizard.driver, CacheDriver::Database);
        assert!(parsed.wizard.cache);
        assert_eq!(parsed.database.max_connections, 5);
        assert!(parsed.wizards.is_empty());
    }

    #[test]
    fn test_paths_are_absolute() {
        let mut config = Config::default();
        config.paths.state = "/tmp/formwizard".to_string();

        assert_eq!(config.state_path(), PathBuf::from("/tmp/formwizard"));
        assert_eq!(config.logs_path(), PathBuf::from("/tmp/formwizard/logs"));
        assert!(config.temporary.root_path().is_absolute());
    }
}
