use crate::config::types::{RawConfig, RawTag};
use crate::log::Logger;
use crate::modify::{Modified, Modifier, ModifierRegistry, ModifyError};
use std::collections::HashSet;
use url::Url;

/// One literal `{from, to}` replacement over the serialized URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
	pub from: String,
	pub to: String,

	/// Replace every occurrence instead of only the first.
	pub all: bool,
}

impl Replacement {
	pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
		Replacement {
			from: from.into(),
			to: to.into(),
			all: false,
		}
	}

	pub fn apply(&self, input: &str) -> String {
		if self.all {
			input.replace(&self.from, &self.to)
		} else {
			input.replacen(&self.from, &self.to, 1)
		}
	}
}

/// A normalized rewrite rule. Immutable once handed to an engine.
#[derive(Debug, Clone)]
pub struct Tag {
	pub name: String,
	pub hosts: Vec<String>,
	/// Merged into the URL in this order; keys are unique.
	pub query: Vec<(String, String)>,
	pub replace: Vec<Replacement>,
	pub modify: Option<Modifier>,
}

impl Tag {
	pub fn new(name: impl Into<String>) -> Self {
		Tag {
			name: name.into(),
			hosts: Vec::new(),
			query: Vec::new(),
			replace: Vec::new(),
			modify: None,
		}
	}

	pub fn host(mut self, host: &str) -> Self {
		if let Some(host) = normalize_host(host) {
			self.hosts.push(host);
		}
		self
	}

	/// Add a query parameter. Setting a key again replaces its value in place.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		let (key, value) = (key.into(), value.into());
		match self.query.iter_mut().find(|(k, _)| *k == key) {
			Some(slot) => slot.1 = value,
			None => self.query.push((key, value)),
		}
		self
	}

	pub fn replace(mut self, replacement: Replacement) -> Self {
		self.replace.push(replacement);
		self
	}

	pub fn modify<F>(mut self, f: F) -> Self
	where
		F: Fn(&Url) -> Result<Modified, ModifyError> + Send + Sync + 'static,
	{
		self.modify = Some(Modifier::new(f));
		self
	}

	/// Whether `host` (as produced by the engine's host key) is one of this tag's hosts.
	pub fn matches_host(&self, host: &str) -> bool {
		self.hosts.iter().any(|h| h == host)
	}
}

/// Union of every tag's hosts, for rejecting irrelevant links before per-tag work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSet(HashSet<String>);

impl HostSet {
	pub fn contains(&self, host: &str) -> bool {
		self.0.contains(host)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Normalized engine configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
	tags: Vec<Tag>,
	hosts: HostSet,
	pub log: bool,
}

impl Config {
	/// Build from tags, deriving the host filter set.
	///
	/// Hosts are normalized again here, so tags built as struct literals
	/// match the same way as ones built through [`Tag::host`].
	pub fn from_tags(mut tags: Vec<Tag>, log: bool) -> Self {
		for tag in &mut tags {
			let mut hosts: Vec<String> = Vec::with_capacity(tag.hosts.len());
			for host in tag.hosts.iter().filter_map(|h| normalize_host(h)) {
				if !hosts.contains(&host) {
					hosts.push(host);
				}
			}
			tag.hosts = hosts;
		}

		let hosts = HostSet(tags.iter().flat_map(|t| t.hosts.iter().cloned()).collect());
		Config { tags, hosts, log }
	}

	pub fn tags(&self) -> &[Tag] {
		&self.tags
	}

	pub fn hosts(&self) -> &HostSet {
		&self.hosts
	}
}

/// Lowercase and trim a host; `None` for an empty one.
pub fn normalize_host(host: &str) -> Option<String> {
	let host = host.trim();
	(!host.is_empty()).then(|| host.to_ascii_lowercase())
}

/// Normalize a raw configuration. Never fails.
///
/// Invalid tag entries and fields were already dropped while deserializing.
/// Here missing names get a positional default, hosts are cleaned, values are
/// stringified and `modify` names are resolved against `modifiers`. An
/// unknown modifier name is logged and the tag keeps its other steps.
pub fn normalize(raw: &RawConfig, modifiers: &ModifierRegistry, logger: &Logger) -> Config {
	let tags = raw
		.tags
		.iter()
		.enumerate()
		.filter_map(|(index, entry)| entry.0.as_ref().map(|tag| (index, tag)))
		.map(|(index, tag)| normalize_tag(index, tag, modifiers, logger))
		.collect();

	Config::from_tags(tags, raw.log)
}

fn normalize_tag(index: usize, raw: &RawTag, modifiers: &ModifierRegistry, logger: &Logger) -> Tag {
	let name = raw
		.name
		.clone()
		.filter(|n| !n.trim().is_empty())
		.unwrap_or_else(|| format!("tag-{index}"));

	let mut hosts: Vec<String> = Vec::new();
	for host in raw.hosts.0.iter().filter_map(|h| normalize_host(h)) {
		if !hosts.contains(&host) {
			hosts.push(host);
		}
	}

	let query = raw
		.query
		.iter()
		.filter_map(|(k, v)| v.0.as_ref().map(|v| (k.to_string(), v.to_string())))
		.collect();

	let replace = raw
		.replace
		.iter()
		.filter_map(|r| r.0.as_ref())
		.filter(|r| !r.from.is_empty())
		.map(|r| Replacement {
			from: r.from.clone(),
			to: r.to.clone(),
			all: r.all,
		})
		.collect();

	let modify = raw.modify.as_deref().and_then(|modifier| {
		let found = modifiers.get(modifier).cloned();
		if found.is_none() {
			logger.error(format_args!("tag {name}: unknown modifier {modifier:?}, skipping it"));
		}
		found
	});

	Tag {
		name,
		hosts,
		query,
		replace,
		modify,
	}
}
