//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/echo-studio/config.toml)
//! 3. Project config (.echo-studio/config.toml)
//! 4. Environment variables (ECHO_* prefix, `__` separates sections)
//!
//! Provider keys missing after the merge fall back to the providers'
//! conventional variables (DEEPSEEK_API_KEY, OPENAI_API_KEY, ...).

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::{debug, info};

use super::types::{
    Config, DEEPSEEK_KEY_ENV, GEMINI_KEY_ENV, OPENAI_KEY_ENV, REPLICATE_KEY_ENV,
};
use crate::types::{EchoError, Result};

const ENV_PREFIX: &str = "ECHO_";
const PROJECT_DIR: &str = ".echo-studio";
const CONFIG_FILE: &str = "config.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_from(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Resolution chain with explicit file locations
    pub fn load_from(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // ECHO_RETRY__BASE_DELAY_MS -> retry.base_delay_ms
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Config = figment
            .extract()
            .map_err(|e| EchoError::Config(format!("Configuration error: {}", e)))?;

        config.keys = config.keys.with_env_fallback();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| EchoError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Platform config directory (~/.config/echo-studio/ on Linux)
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "echo-studio").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(PROJECT_DIR)
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join(CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths and which keys are present
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            println!("  Global:  {} {}", mark(global.exists()), global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        println!("  Project: {} {}", mark(project.exists()), project.display());

        println!();
        println!("Provider keys (environment):");
        for var in [
            DEEPSEEK_KEY_ENV,
            OPENAI_KEY_ENV,
            GEMINI_KEY_ENV,
            REPLICATE_KEY_ENV,
        ] {
            let set = std::env::var(var).is_ok_and(|v| !v.trim().is_empty());
            println!("  {} {}", mark(set), var);
        }
    }

    /// Show current effective configuration (keys omitted)
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| EchoError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write the default global config file
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            EchoError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_default(&global_dir, force)
    }

    /// Write the default project config file under `.echo-studio/`
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::write_default(&Self::project_dir(), force)
    }

    fn write_default(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_config())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_config() -> &'static str {
        r#"# Echo Studio Configuration
# Project settings in .echo-studio/config.toml override global ones.
# Environment variables override both, e.g. ECHO_SERVER__PORT=8080.

[server]
host = "127.0.0.1"
port = 3000

# Partner and personality synthesis
[text]
temperature = 0.7
timeout_secs = 120

# Portrait generation
[image]
default_count = 1
default_aspect_ratio = "9:16"
timeout_secs = 120

[retry]
base_delay_ms = 1000
max_delay_ms = 30000
jitter = true

# Keys may also come from DEEPSEEK_API_KEY, OPENAI_API_KEY,
# GOOGLE_GEMINI_API_KEY and REPLICATE_API_TOKEN.
[keys]
# deepseek = ""
# openai = ""
# gemini = ""
# replicate = ""
"#
    }
}

fn mark(present: bool) -> &'static str {
    if present { "✓" } else { "✗" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_files_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join("missing.toml");

        let config = ConfigLoader::load_from(None, &project).unwrap();
        assert_eq!(config.image.default_aspect_ratio, "9:16");
        assert_eq!(config.retry.gemini_max_attempts, 1);
    }

    #[test]
    fn test_project_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");
        fs::write(&global, "[image]\ndefault_count = 2\ngemini_model = \"g\"\n").unwrap();
        fs::write(&project, "[image]\ndefault_count = 3\n").unwrap();

        let config = ConfigLoader::load_from(Some(&global), &project).unwrap();
        assert_eq!(config.image.default_count, 3);
        assert_eq!(config.image.gemini_model, "g");
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join("config.toml");
        fs::write(&project, "[text]\ntemperature = 5.0\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from(None, &project),
            Err(EchoError::Config(_))
        ));
    }

    #[test]
    fn test_env_override() {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join("missing.toml");

        // SAFETY: no other test reads this variable
        unsafe {
            std::env::set_var("ECHO_RETRY__MAX_DELAY_MS", "4321");
        }
        let config = ConfigLoader::load_from(None, &project).unwrap();
        unsafe {
            std::env::remove_var("ECHO_RETRY__MAX_DELAY_MS");
        }
        assert_eq!(config.retry.max_delay_ms, 4321);
    }

    #[test]
    fn test_default_config_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::write_default(temp_dir.path(), false).unwrap();
        assert!(path.exists());

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.keys.openai.is_none());
    }

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "# mine\n").unwrap();

        ConfigLoader::write_default(temp_dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# mine\n");

        ConfigLoader::write_default(temp_dir.path(), true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("[retry]"));
    }
}
