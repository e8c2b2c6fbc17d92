use serde::Deserialize;
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use std::fmt;
use std::path::PathBuf;

/// Top-level configuration from a `.linktag.toml` file.
///
/// Every field is read leniently: a value of the wrong shape is dropped and
/// the field falls back to its default instead of failing the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawConfig {
	/// If true, stop directory cascade and jump directly to ~/.linktag.toml.
	#[serde(default, deserialize_with = "lenient")]
	pub root: bool,

	/// Environment variable name that, if truthy, skips ~/.linktag.toml lookup.
	#[serde(default, deserialize_with = "lenient")]
	pub root_config_lookup_disable_env_var: Option<String>,

	/// Enables diagnostic output from the engine.
	#[serde(default, deserialize_with = "lenient")]
	pub log: bool,

	/// Tags in declaration order. Matching tags compose in this order.
	#[serde(default, deserialize_with = "lenient")]
	pub tags: Vec<Lenient<RawTag>>,
}

/// A tag as written in configuration, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTag {
	#[serde(default, deserialize_with = "lenient")]
	pub name: Option<String>,

	/// A single host or a list of hosts.
	#[serde(default, deserialize_with = "lenient")]
	pub hosts: Hosts,

	/// Query parameters merged into every matched URL, in file order.
	#[serde(default, deserialize_with = "lenient")]
	pub query: QueryTable,

	/// Literal replacements applied to the serialized URL, in order.
	#[serde(default, deserialize_with = "lenient")]
	pub replace: Vec<Lenient<RawReplace>>,

	/// Name of a registered modifier.
	#[serde(default, deserialize_with = "lenient")]
	pub modify: Option<String>,
}

/// One `{from, to}` replacement pair.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReplace {
	pub from: String,

	#[serde(default)]
	pub to: String,

	/// Replace every occurrence instead of only the first.
	#[serde(default)]
	pub all: bool,
}

/// Host list that accepts either `hosts = "a.com"` or `hosts = ["a.com", "b.com"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hosts(pub Vec<String>);

impl<'de> Deserialize<'de> for Hosts {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Shape {
			One(String),
			Many(Vec<Lenient<String>>),
		}

		Ok(match Shape::deserialize(deserializer)? {
			Shape::One(host) => Hosts(vec![host]),
			Shape::Many(hosts) => Hosts(hosts.into_iter().filter_map(|h| h.0).collect()),
		})
	}
}

impl From<&str> for Hosts {
	fn from(host: &str) -> Self {
		Hosts(vec![host.to_string()])
	}
}

impl From<Vec<&str>> for Hosts {
	fn from(hosts: Vec<&str>) -> Self {
		Hosts(hosts.into_iter().map(str::to_string).collect())
	}
}

/// `query = { .. }` as written, keys kept in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTable(pub Vec<(String, Lenient<QueryValue>)>);

impl QueryTable {
	pub fn get(&self, key: &str) -> Option<&Lenient<QueryValue>> {
		self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Lenient<QueryValue>)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl<'de> Deserialize<'de> for QueryTable {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct TableVisitor;

		impl<'de> Visitor<'de> for TableVisitor {
			type Value = QueryTable;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a table of query parameters")
			}

			fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
				let mut entries: Vec<(String, Lenient<QueryValue>)> = Vec::new();
				while let Some((key, value)) = map.next_entry::<String, Lenient<QueryValue>>()? {
					match entries.iter_mut().find(|(k, _)| *k == key) {
						Some(slot) => slot.1 = value,
						None => entries.push((key, value)),
					}
				}
				Ok(QueryTable(entries))
			}
		}

		deserializer.deserialize_map(TableVisitor)
	}
}

/// A query parameter value. Numbers and booleans are accepted and stringified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
	Text(String),
	Integer(i64),
	Float(f64),
	Bool(bool),
}

impl fmt::Display for QueryValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			QueryValue::Text(s) => f.write_str(s),
			QueryValue::Integer(n) => write!(f, "{n}"),
			QueryValue::Float(n) => write!(f, "{n}"),
			QueryValue::Bool(b) => write!(f, "{b}"),
		}
	}
}

impl From<&str> for QueryValue {
	fn from(value: &str) -> Self {
		QueryValue::Text(value.to_string())
	}
}

/// A value that is `None` when the input had the wrong shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Lenient<T>(pub Option<T>);

impl<T> From<T> for Lenient<T> {
	fn from(value: T) -> Self {
		Lenient(Some(value))
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Either<V> {
	Valid(V),
	Invalid(IgnoredAny),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Lenient<T> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Ok(match Either::<T>::deserialize(deserializer)? {
			Either::Valid(value) => Lenient(Some(value)),
			Either::Invalid(_) => Lenient(None),
		})
	}
}

/// Field deserializer that falls back to `T::default()` on a shape mismatch.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de> + Default,
{
	Ok(Lenient::<T>::deserialize(deserializer)?.0.unwrap_or_default())
}

/// A loaded configuration with its source path for debugging/display.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
	/// The parsed configuration.
	pub config: RawConfig,

	/// The path this config was loaded from.
	pub path: PathBuf,
}

/// Merged configuration from multiple config files in the cascade.
#[derive(Debug, Clone, Default)]
pub struct MergedConfig {
	/// All tags from all configs, in cascade order.
	pub tags: Vec<TagWithSource>,

	/// Whether any config in the cascade enabled logging.
	pub log: bool,
}

/// A tag with its source config path for debugging/display.
#[derive(Debug, Clone)]
pub struct TagWithSource {
	/// The tag itself.
	pub tag: RawTag,

	/// The config file this tag came from.
	pub source: PathBuf,
}

impl MergedConfig {
	/// Flatten back into a single raw config for normalization.
	pub fn to_raw(&self) -> RawConfig {
		RawConfig {
			log: self.log,
			tags: self
				.tags
				.iter()
				.map(|t| Lenient(Some(t.tag.clone())))
				.collect(),
			..Default::default()
		}
	}
}
