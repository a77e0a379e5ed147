//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "idlmake.toml";

/// Loads and validates an `idlmake.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates an `idlmake.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.output_dir.is_empty() {
        return Err(ConfigError::MissingField("project.output_dir".to_string()));
    }
    if config.compiler.path.is_empty() {
        return Err(ConfigError::MissingField("compiler.path".to_string()));
    }
    if config.project.sources.is_empty() {
        return Err(ConfigError::ValidationError(
            "project.sources must name at least one file or directory".to_string(),
        ));
    }
    for ext in config
        .project
        .extensions
        .iter()
        .chain(&config.gc.generated_extensions)
    {
        if ext.is_empty() || ext.starts_with('.') {
            return Err(ConfigError::ValidationError(format!(
                "invalid extension '{ext}' (write extensions without the leading dot)"
            )));
        }
    }
    for (field, flag) in [
        ("compiler.output_dir_flag", &config.compiler.output_dir_flag),
        ("compiler.depend_flag", &config.compiler.depend_flag),
        ("compiler.generate_flag", &config.compiler.generate_flag),
    ] {
        if flag.is_empty() {
            return Err(ConfigError::MissingField(field.to_string()));
        }
    }
    if config.compiler.depend_flag == config.compiler.generate_flag {
        return Err(ConfigError::ValidationError(
            "compiler.depend_flag and compiler.generate_flag must differ".to_string(),
        ));
    }
    Ok(())
}
