//! Custom URL transforms for tags.
//!
//! A tag's `modify` step is an arbitrary function over the parsed URL. Code
//! can attach a closure directly; configuration files refer to a transform by
//! name, resolved through a [`ModifierRegistry`].

pub mod builtin;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Error type returned by a failing modifier.
pub type ModifyError = Box<dyn std::error::Error + Send + Sync>;

/// What a modifier produced. Both forms are re-parsed before the pipeline continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modified {
	Url(Url),
	Text(String),
}

impl From<Url> for Modified {
	fn from(url: Url) -> Self {
		Modified::Url(url)
	}
}

impl From<String> for Modified {
	fn from(text: String) -> Self {
		Modified::Text(text)
	}
}

/// A user-supplied transform over a parsed URL.
#[derive(Clone)]
pub struct Modifier(Arc<dyn Fn(&Url) -> Result<Modified, ModifyError> + Send + Sync>);

impl Modifier {
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(&Url) -> Result<Modified, ModifyError> + Send + Sync + 'static,
	{
		Modifier(Arc::new(f))
	}

	/// Invoke the transform.
	pub fn call(&self, url: &Url) -> Result<Modified, ModifyError> {
		(self.0)(url)
	}
}

impl fmt::Debug for Modifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Modifier(..)")
	}
}

/// Named modifiers that configuration files can reference.
#[derive(Debug, Clone, Default)]
pub struct ModifierRegistry {
	entries: BTreeMap<String, Modifier>,
}

impl ModifierRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry preloaded with the built-in modifiers.
	pub fn with_builtins() -> Self {
		let mut registry = Self::new();
		builtin::register_all(&mut registry);
		registry
	}

	/// Register (or replace) a modifier under `name`.
	pub fn register(&mut self, name: impl Into<String>, modifier: Modifier) {
		self.entries.insert(name.into(), modifier);
	}

	pub fn get(&self, name: &str) -> Option<&Modifier> {
		self.entries.get(name)
	}

	/// Registered names in sorted order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}
}
