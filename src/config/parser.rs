use crate::config::types::RawConfig;
use crate::error::{LinktagError, Result};
use std::path::Path;

/// Parse a config file from the given path.
pub fn parse_config_file(path: &Path) -> Result<RawConfig> {
	let content = std::fs::read_to_string(path).map_err(|source| LinktagError::ConfigReadError {
		path: path.to_path_buf(),
		source,
	})?;

	parse_config_str(&content, path)
}

/// Parse a config from a string (useful for testing).
///
/// Only TOML syntax errors fail. Fields of the wrong shape are dropped.
pub fn parse_config_str(content: &str, path: &Path) -> Result<RawConfig> {
	toml::from_str(content).map_err(|source| LinktagError::ConfigParseError {
		path: path.to_path_buf(),
		source,
	})
}
