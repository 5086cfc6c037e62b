//! Config Command
//!
//! Usage:
//!   echo-studio config show [-g] [-f json]
//!   echo-studio config path
//!   echo-studio config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged configuration, or the raw global file with `--global`
pub fn show(global: bool, format: &str) -> Result<()> {
    if !global {
        return ConfigLoader::show_config(format == "json");
    }

    let output = Output::new();
    match ConfigLoader::global_config_path() {
        Some(path) if path.exists() => {
            output.info(&format!("Global config: {}", path.display()));
            println!("{}", std::fs::read_to_string(&path)?);
        }
        Some(_) => {
            output.warning("No global config found.");
            output.info("Run 'echo-studio config init --global' to create one.");
        }
        None => output.error("Cannot determine global config directory."),
    }
    Ok(())
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };

    let output = Output::new();
    output.success(&format!(
        "Initialized {} configuration",
        if global { "global" } else { "project" }
    ));
    output.field("Config", &path.display().to_string());
    Ok(())
}
