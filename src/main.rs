use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use url::Url;

use linktag::config::{
	CONFIG_FILE_NAME, LoadedConfig, MergedConfig, RawTag, discover_configs,
	generate_init_template, load_config_file, load_merged_config, merge_configs, normalize,
	parse_config_file, user_config_path,
};
use linktag::dom::{Document, Tree};
use linktag::engine::Engine;
use linktag::log::Logger;
use linktag::modify::ModifierRegistry;

#[derive(Parser)]
#[command(name = "linktag")]
#[command(
	author,
	version,
	about = "Rewrite outbound links into affiliate-tagged equivalents"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	/// Create a template .linktag.toml in the current directory
	#[arg(long)]
	init: bool,

	/// Overwrite existing .linktag.toml when using --init
	#[arg(long, requires = "init")]
	force: bool,

	/// Use this config file instead of the directory cascade
	#[arg(long, global = true, value_name = "FILE")]
	config: Option<PathBuf>,

	/// Print diagnostics even if the config does not enable them
	#[arg(long, global = true)]
	log: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Rewrite URLs with the configured tags and print one result per line
	Rewrite {
		/// Base URL for resolving relative links
		#[arg(long, value_name = "URL")]
		base: Option<String>,

		/// Links to rewrite
		#[arg(required = true)]
		urls: Vec<String>,
	},

	/// Configuration management commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},

	/// List the built-in modifiers usable in `modify = "..."`
	Modifiers,
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Display merged effective configuration with source annotations
	Show,
	/// Check all config files for errors without rewriting anything
	Validate,
}

fn main() -> ExitCode {
	init_tracing();

	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

/// stderr subscriber filtered by `LINKTAG_LOG` (default `info`).
fn init_tracing() {
	let filter = EnvFilter::try_from_env("LINKTAG_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();

	if cli.init {
		return handle_init(cli.force);
	}

	if let Some(command) = cli.command {
		return match command {
			Commands::Rewrite { base, urls } => {
				handle_rewrite(cli.config.as_deref(), cli.log, base.as_deref(), &urls)
			}
			Commands::Config { action } => match action {
				ConfigAction::Show => handle_config_show(cli.config.as_deref()),
				ConfigAction::Validate => handle_config_validate(cli.config.as_deref()),
			},
			Commands::Modifiers => handle_modifiers(),
		};
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_init(force: bool) -> Result<ExitCode> {
	let config_path = PathBuf::from(CONFIG_FILE_NAME);

	if config_path.exists() && !force {
		anyhow::bail!("{CONFIG_FILE_NAME} already exists. Use --force to overwrite.");
	}

	std::fs::write(&config_path, generate_init_template())
		.with_context(|| format!("Failed to write {}", config_path.display()))?;

	println!("Created {CONFIG_FILE_NAME}");
	Ok(ExitCode::SUCCESS)
}

/// Either the explicit `--config` file or the cascade from the current directory.
fn load_config(explicit: Option<&Path>) -> Result<MergedConfig> {
	match explicit {
		Some(path) => load_config_file(path)
			.with_context(|| format!("Failed to load {}", path.display())),
		None => {
			let cwd = std::env::current_dir().context("Failed to get current directory")?;
			load_merged_config(&cwd).context("Failed to load configuration")
		}
	}
}

fn loaded_configs(explicit: Option<&Path>) -> Result<Vec<LoadedConfig>> {
	match explicit {
		Some(path) => {
			let config = parse_config_file(path)
				.with_context(|| format!("Failed to load {}", path.display()))?;
			Ok(vec![LoadedConfig {
				config,
				path: path.to_path_buf(),
			}])
		}
		None => {
			let cwd = std::env::current_dir().context("Failed to get current directory")?;
			discover_configs(&cwd).context("Failed to discover config files")
		}
	}
}

fn handle_rewrite(
	explicit: Option<&Path>,
	force_log: bool,
	base: Option<&str>,
	urls: &[String],
) -> Result<ExitCode> {
	let merged = load_config(explicit)?;
	let mut raw = merged.to_raw();
	raw.log |= force_log;

	let logger = Logger::new(raw.log);
	let config = normalize(&raw, &ModifierRegistry::with_builtins(), &logger);
	if config.tags().is_empty() {
		logger.info("no tags configured, links pass through unchanged");
	}

	let mut tree = Tree::new();
	if let Some(base) = base {
		let base = Url::parse(base).with_context(|| format!("Invalid base URL: {base}"))?;
		tree = tree.with_base_url(base);
	}

	let body = tree.body().context("document has no body")?;
	let links: Vec<_> = urls.iter().map(|href| tree.append_link(body, href)).collect();

	let engine = Engine::for_document(config, &mut tree).with_logger(logger);
	let report = engine.traverse(&mut tree, None);

	for link in links {
		println!("{}", tree.href(link).unwrap_or_default());
	}

	tracing::debug!(
		links = report.links,
		matched = report.matched,
		rewritten = report.rewritten,
		"rewrite finished"
	);
	Ok(ExitCode::SUCCESS)
}

fn handle_config_show(explicit: Option<&Path>) -> Result<ExitCode> {
	let configs = loaded_configs(explicit)?;

	if configs.is_empty() {
		println!("No configuration files found.");
		return Ok(ExitCode::SUCCESS);
	}

	println!("Configuration files (in cascade order):\n");

	for loaded in &configs {
		println!("# Source: {}", loaded.path.display());
		println!("# root: {}", loaded.config.root);
		println!("# log: {}", loaded.config.log);
		if let Some(ref env_var) = loaded.config.root_config_lookup_disable_env_var {
			println!("# root-config-lookup-disable-env-var: {}", env_var);
		}
		println!("# tags: {}", loaded.config.tags.len());
		println!();

		for (i, entry) in loaded.config.tags.iter().enumerate() {
			match &entry.0 {
				Some(tag) => print_tag(i, tag),
				None => println!("  Tag {}: (malformed, ignored)\n", i + 1),
			}
		}
	}

	if explicit.is_none()
		&& let Ok(user_path) = user_config_path()
	{
		println!("User config path: {}", user_path.display());
		if user_path.exists() {
			println!("  (exists)");
		} else {
			println!("  (not found)");
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn print_tag(index: usize, tag: &RawTag) {
	match &tag.name {
		Some(name) => println!("  Tag {}: {}", index + 1, name),
		None => println!("  Tag {}:", index + 1),
	}
	println!("    hosts: {}", tag.hosts.0.join(", "));
	for (key, value) in tag.query.iter() {
		if let Some(value) = &value.0 {
			println!("    query: {key}={value}");
		}
	}
	for replace in tag.replace.iter().filter_map(|r| r.0.as_ref()) {
		let scope = if replace.all { " (all)" } else { "" };
		println!("    replace: {:?} -> {:?}{scope}", replace.from, replace.to);
	}
	if let Some(ref modify) = tag.modify {
		println!("    modify: {modify}");
	}
	println!();
}

fn handle_config_validate(explicit: Option<&Path>) -> Result<ExitCode> {
	let configs = match loaded_configs(explicit) {
		Ok(configs) => configs,
		Err(e) => {
			eprintln!("Configuration error: {e:#}");
			return Ok(ExitCode::FAILURE);
		}
	};

	if configs.is_empty() {
		println!("No configuration files found.");
		return Ok(ExitCode::SUCCESS);
	}

	let registry = ModifierRegistry::with_builtins();
	println!("All configuration files parsed:");
	for loaded in &configs {
		let dropped = loaded.config.tags.iter().filter(|t| t.0.is_none()).count();
		let valid = loaded.config.tags.len() - dropped;
		println!("  {} ({} tags)", loaded.path.display(), valid);

		if dropped > 0 {
			println!("    warning: {dropped} malformed tag entries ignored");
		}
		for tag in loaded.config.tags.iter().filter_map(|t| t.0.as_ref()) {
			if let Some(ref modify) = tag.modify
				&& registry.get(modify).is_none()
			{
				println!("    warning: unknown modifier {modify:?}");
			}
			if tag.hosts.0.iter().all(|h| h.trim().is_empty()) {
				let name = tag.name.as_deref().unwrap_or("(unnamed)");
				println!("    warning: tag {name} lists no hosts and matches nothing");
			}
		}
	}

	let merged = merge_configs(&configs);
	println!("Effective tags: {}", merged.tags.len());
	Ok(ExitCode::SUCCESS)
}

fn handle_modifiers() -> Result<ExitCode> {
	let registry = ModifierRegistry::with_builtins();
	for name in registry.names() {
		println!("{name}");
	}
	Ok(ExitCode::SUCCESS)
}
