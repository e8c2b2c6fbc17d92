//! Configuration loading and normalization for linktag.
//!
//! This module handles:
//! - Lenient TOML config file parsing
//! - Directory cascade discovery
//! - Config merging
//! - Normalization into engine-ready tags and the host filter set

pub mod cascade;
pub mod normalize;
pub mod parser;
pub mod template;
pub mod types;

pub use cascade::{
	CONFIG_FILE_NAME, discover_configs, load_config_file, load_merged_config, merge_configs,
	user_config_path,
};
pub use normalize::{Config, HostSet, Replacement, Tag, normalize, normalize_host};
pub use parser::{parse_config_file, parse_config_str};
pub use template::generate_init_template;
pub use types::{
	Hosts, Lenient, LoadedConfig, MergedConfig, QueryTable, QueryValue, RawConfig, RawReplace, RawTag,
	TagWithSource,
};
