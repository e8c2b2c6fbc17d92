use crate::config::parser::parse_config_file;
use crate::config::types::{LoadedConfig, MergedConfig, TagWithSource};
use crate::error::{LinktagError, Result};
use std::path::{Path, PathBuf};

/// File name searched for at every level of the cascade.
pub const CONFIG_FILE_NAME: &str = ".linktag.toml";

/// Every `.linktag.toml` from `start_dir` up to the filesystem root, most
/// specific first, followed by `~/.linktag.toml`.
///
/// The walk ends early after a file with `root = true`. The user file is only
/// ever appended at the end, and is skipped when an env var named by
/// `root-config-lookup-disable-env-var` in any collected file is truthy.
pub fn discover_configs(start_dir: &Path) -> Result<Vec<LoadedConfig>> {
	let user_path = user_config_path().ok();
	let mut configs = Vec::new();

	for dir in start_dir.ancestors() {
		let path = dir.join(CONFIG_FILE_NAME);
		if !path.exists() || user_path.as_ref() == Some(&path) {
			continue;
		}

		let config = parse_config_file(&path)?;
		let stop = config.root;
		configs.push(LoadedConfig { config, path });
		if stop {
			break;
		}
	}

	if let Some(user_config) = load_user_config(&configs)? {
		configs.push(user_config);
	}

	Ok(configs)
}

/// Load the user's ~/.linktag.toml if it exists and isn't disabled.
fn load_user_config(existing_configs: &[LoadedConfig]) -> Result<Option<LoadedConfig>> {
	for loaded in existing_configs {
		if let Some(ref env_var) = loaded.config.root_config_lookup_disable_env_var
			&& is_env_truthy(env_var)
		{
			return Ok(None);
		}
	}

	let user_config_path = user_config_path()?;

	if user_config_path.exists() {
		let config = parse_config_file(&user_config_path)?;
		Ok(Some(LoadedConfig {
			config,
			path: user_config_path,
		}))
	} else {
		Ok(None)
	}
}

fn is_env_truthy(var_name: &str) -> bool {
	std::env::var(var_name).is_ok_and(|value| is_truthy(&value))
}

/// Anything except empty, `0`, `false` and `no` (case-insensitive).
fn is_truthy(value: &str) -> bool {
	let value = value.trim();
	!value.is_empty() && !["0", "false", "no"].iter().any(|f| value.eq_ignore_ascii_case(f))
}

/// Merge multiple configs into a single effective config.
///
/// Tags are collected in cascade order, so tags from the most specific file
/// compose first. Logging is enabled if any config enables it.
pub fn merge_configs(configs: &[LoadedConfig]) -> MergedConfig {
	let mut merged = MergedConfig::default();

	for loaded in configs {
		for tag in loaded.config.tags.iter().filter_map(|t| t.0.as_ref()) {
			merged.tags.push(TagWithSource {
				tag: tag.clone(),
				source: loaded.path.clone(),
			});
		}

		merged.log |= loaded.config.log;
	}

	merged
}

/// Convenience function to discover, load, and merge configs from a directory.
pub fn load_merged_config(start_dir: &Path) -> Result<MergedConfig> {
	let configs = discover_configs(start_dir)?;
	Ok(merge_configs(&configs))
}

/// Load a single explicitly named config file, bypassing the cascade.
pub fn load_config_file(path: &Path) -> Result<MergedConfig> {
	if !path.exists() {
		return Err(LinktagError::ConfigNotFound {
			path: path.to_path_buf(),
		});
	}

	let config = parse_config_file(path)?;
	Ok(merge_configs(&[LoadedConfig {
		config,
		path: path.to_path_buf(),
	}]))
}

/// Get the path to the user's config file.
pub fn user_config_path() -> Result<PathBuf> {
	let home_dir = dirs::home_dir().ok_or(LinktagError::HomeDirectoryNotFound)?;
	Ok(home_dir.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn test_truthy_values() {
		for value in ["1", "yes", "TRUE", "on"] {
			assert!(is_truthy(value), "{value:?} should be truthy");
		}
		for value in ["", " ", "0", "false", "FALSE", "No"] {
			assert!(!is_truthy(value), "{value:?} should not be truthy");
		}
		assert!(!is_env_truthy("LINKTAG_TEST_SURELY_UNSET_VARIABLE"));
	}

	#[test]
	fn test_root_config_stops_cascade() {
		let temp_dir = tempfile::tempdir().unwrap();
		let nested = temp_dir.path().join("a/b");
		fs::create_dir_all(&nested).unwrap();

		fs::write(
			temp_dir.path().join(CONFIG_FILE_NAME),
			"[[tags]]\nhosts = \"outer.example\"\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("a").join(CONFIG_FILE_NAME),
			"root = true\nroot-config-lookup-disable-env-var = \"PATH\"\n[[tags]]\nhosts = \"middle.example\"\n",
		)
		.unwrap();
		fs::write(
			nested.join(CONFIG_FILE_NAME),
			"[[tags]]\nhosts = \"inner.example\"\n",
		)
		.unwrap();

		let configs = discover_configs(&nested).unwrap();
		assert_eq!(configs.len(), 2);

		let merged = merge_configs(&configs);
		let hosts: Vec<_> = merged.tags.iter().map(|t| t.tag.hosts.0[0].as_str()).collect();
		assert_eq!(hosts, vec!["inner.example", "middle.example"]);
		assert_eq!(merged.tags[0].source, nested.join(CONFIG_FILE_NAME));
	}

	#[test]
	fn test_merge_ors_log_flag_and_skips_invalid_tags() {
		let temp_dir = tempfile::tempdir().unwrap();
		let path = temp_dir.path().join(CONFIG_FILE_NAME);
		fs::write(&path, "log = true\ntags = [1, { hosts = \"shop.example\" }]\n").unwrap();

		let merged = load_config_file(&path).unwrap();
		assert!(merged.log);
		assert_eq!(merged.tags.len(), 1);
	}

	#[test]
	fn test_load_config_file_missing() {
		let temp_dir = tempfile::tempdir().unwrap();
		let path = temp_dir.path().join("nope.toml");

		match load_config_file(&path).unwrap_err() {
			LinktagError::ConfigNotFound { path: p } => assert_eq!(p, path),
			other => panic!("Expected ConfigNotFound, got {other:?}"),
		}
	}

	#[test]
	fn test_user_config_path() {
		let path = user_config_path().unwrap();
		assert!(path.ends_with(CONFIG_FILE_NAME));
	}
}
