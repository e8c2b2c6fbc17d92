use crate::modify::{Modified, Modifier, ModifierRegistry, ModifyError};
use url::Url;

/// Register every built-in modifier.
pub fn register_all(registry: &mut ModifierRegistry) {
	registry.register("https", Modifier::new(upgrade_https));
	registry.register("strip-fragment", Modifier::new(strip_fragment));
	registry.register("strip-utm", Modifier::new(strip_utm));
}

/// Upgrade `http` URLs to `https`. Other schemes pass through.
pub fn upgrade_https(url: &Url) -> Result<Modified, ModifyError> {
	let mut next = url.clone();
	if next.scheme() == "http" {
		next.set_scheme("https")
			.map_err(|()| format!("cannot upgrade {url} to https"))?;
	}
	Ok(next.into())
}

/// Drop the `#fragment`.
pub fn strip_fragment(url: &Url) -> Result<Modified, ModifyError> {
	let mut next = url.clone();
	next.set_fragment(None);
	Ok(next.into())
}

/// Remove `utm_*` campaign parameters.
pub fn strip_utm(url: &Url) -> Result<Modified, ModifyError> {
	let kept: Vec<(String, String)> = url
		.query_pairs()
		.into_owned()
		.filter(|(k, _)| !k.starts_with("utm_"))
		.collect();

	let mut next = url.clone();
	if kept.is_empty() {
		next.set_query(None);
	} else {
		next.query_pairs_mut().clear().extend_pairs(&kept);
	}
	Ok(next.into())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn run(f: fn(&Url) -> Result<Modified, ModifyError>, input: &str) -> String {
		match f(&Url::parse(input).unwrap()).unwrap() {
			Modified::Url(url) => url.to_string(),
			Modified::Text(text) => text,
		}
	}

	#[test]
	fn test_upgrade_https() {
		assert_eq!(run(upgrade_https, "http://shop.example/x"), "https://shop.example/x");
		assert_eq!(run(upgrade_https, "ftp://files.example/x"), "ftp://files.example/x");
	}

	#[test]
	fn test_strip_fragment() {
		assert_eq!(run(strip_fragment, "http://shop.example/x#top"), "http://shop.example/x");
	}

	#[test]
	fn test_strip_utm() {
		assert_eq!(
			run(strip_utm, "http://shop.example/x?utm_source=a&id=7&utm_medium=b"),
			"http://shop.example/x?id=7"
		);
		assert_eq!(
			run(strip_utm, "http://shop.example/x?utm_source=a"),
			"http://shop.example/x"
		);
	}
}
