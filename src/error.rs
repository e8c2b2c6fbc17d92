use std::path::PathBuf;

/// Library-level structured errors for linktag.
///
/// Only configuration loading can fail. The rewrite engine never returns an
/// error; it logs and degrades instead. The CLI binary wraps these with
/// `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum LinktagError {
	#[error("Config file not found: {path}")]
	ConfigNotFound { path: PathBuf },

	#[error("Failed to read config file: {path}")]
	ConfigReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse config file: {path}")]
	ConfigParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to resolve home directory")]
	HomeDirectoryNotFound,
}

/// Result type alias using LinktagError.
pub type Result<T> = std::result::Result<T, LinktagError>;
