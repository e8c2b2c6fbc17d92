use crate::dom::{Document, NodeId};
use crate::engine::provenance::{self, ElementStore};
use crate::engine::{Engine, ScanReport};
use url::Url;

/// Host key a URL is matched on: host plus any explicit non-default port, lowercased.
pub fn host_key(url: &Url) -> Option<String> {
	let host = url.host_str()?.to_ascii_lowercase();
	Some(match url.port() {
		Some(port) => format!("{host}:{port}"),
		None => host,
	})
}

/// Parse an href, resolving it against `base` when given.
pub fn parse_href(base: Option<&Url>, href: &str) -> Option<Url> {
	match base {
		Some(base) => base.join(href).ok(),
		None => Url::parse(href).ok(),
	}
}

impl Engine {
	/// Rewrite every matching link in the subtree under `root` (the body when `None`).
	///
	/// Links already carrying the engine's last write are skipped, so repeated
	/// calls are no-ops for links that are current.
	pub fn traverse<D>(&self, doc: &mut D, root: Option<NodeId>) -> ScanReport
	where
		D: Document + ElementStore,
	{
		let Some(root) = root.or_else(|| doc.body()) else {
			return ScanReport::default();
		};

		let mut report = ScanReport {
			roots: 1,
			..Default::default()
		};

		for link in doc.links(root) {
			report.links += 1;

			let Some(href) = doc.href(link).filter(|h| !h.is_empty()) else {
				continue;
			};
			let Some(url) = parse_href(doc.base_url(), &href) else {
				continue;
			};
			let Some(host) = host_key(&url) else {
				continue;
			};
			if !self.config.hosts().contains(&host) {
				continue;
			}
			report.matched += 1;

			// Checked once per pass so later tags compose on earlier results.
			if provenance::is_current(&*doc, link, &href) {
				continue;
			}

			let mut current = Some(url);
			for tag in self.config.tags().iter().filter(|t| t.matches_host(&host)) {
				let Some(url) = current.take() else {
					break;
				};
				current = self.rewrite(doc, link, url, tag);
			}
			report.rewritten += 1;
		}

		report
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{Config, Replacement, Tag};
	use crate::dom::Tree;
	use crate::engine::Capabilities;

	fn engine(tags: Vec<Tag>) -> Engine {
		Engine::new(Config::from_tags(tags, false), Capabilities { live_updates: true })
	}

	#[test]
	fn test_host_key() {
		let key = |s: &str| host_key(&Url::parse(s).unwrap());
		assert_eq!(key("http://Shop.Example/x").as_deref(), Some("shop.example"));
		assert_eq!(key("http://shop.example:80/x").as_deref(), Some("shop.example"));
		assert_eq!(key("http://shop.example:8080/x").as_deref(), Some("shop.example:8080"));
		assert_eq!(key("mailto:someone@shop.example"), None);
	}

	#[test]
	fn test_unlisted_host_is_untouched() {
		let tag = Tag::new("t")
			.host("shop.example")
			.query("ref", "A")
			.replace(Replacement::new("http", "XXXX"));
		let engine = engine(vec![tag]);

		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let link = tree.append_link(body, "http://other.example/x");

		let report = engine.traverse(&mut tree, None);
		assert_eq!(report.links, 1);
		assert_eq!(report.matched, 0);
		assert_eq!(tree.href(link).as_deref(), Some("http://other.example/x"));
		assert!(tree.provenance(link).is_none());
	}

	#[test]
	fn test_multi_tag_composition() {
		let tag1 = Tag::new("one").host("shop.example").query("ref", "A");
		let tag2 = Tag::new("two")
			.host("shop.example")
			.replace(Replacement::new("ref=A", "ref=B"));
		let engine = engine(vec![tag1, tag2]);

		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let link = tree.append_link(body, "http://shop.example/x");

		engine.traverse(&mut tree, None);
		assert_eq!(tree.href(link).as_deref(), Some("http://shop.example/x?ref=B"));

		let p = tree.provenance(link).unwrap();
		assert_eq!(p.was, "http://shop.example/x");
		assert_eq!(p.is, "http://shop.example/x?ref=B");
	}

	#[test]
	fn test_root_link_itself_is_scanned() {
		let engine = engine(vec![Tag::new("t").host("shop.example").query("ref", "A")]);

		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let inside = tree.append_link(body, "http://shop.example/a");
		let sibling = tree.append_link(body, "http://shop.example/b");

		let report = engine.traverse(&mut tree, Some(inside));
		assert_eq!(report.rewritten, 1);
		assert_eq!(tree.href(inside).as_deref(), Some("http://shop.example/a?ref=A"));
		assert_eq!(tree.href(sibling).as_deref(), Some("http://shop.example/b"));
	}

	#[test]
	fn test_repeat_traverse_is_noop() {
		let engine = engine(vec![Tag::new("t").host("shop.example").query("ref", "A")]);

		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let link = tree.append_link(body, "http://shop.example/a");

		assert_eq!(engine.traverse(&mut tree, None).rewritten, 1);
		let second = engine.traverse(&mut tree, None);
		assert_eq!(second.matched, 1);
		assert_eq!(second.rewritten, 0);
		assert_eq!(tree.href(link).as_deref(), Some("http://shop.example/a?ref=A"));
	}

	#[test]
	fn test_empty_and_unparseable_hrefs_are_skipped() {
		let engine = engine(vec![Tag::new("t").host("shop.example").query("ref", "A")]);

		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let empty = tree.append_link(body, "");
		let relative = tree.append_link(body, "/x");
		let bare = tree.create_element("a");
		tree.append_child(body, bare);

		let report = engine.traverse(&mut tree, None);
		assert_eq!(report.links, 3);
		assert_eq!(report.matched, 0);
		assert_eq!(tree.href(empty).as_deref(), Some(""));
		assert_eq!(tree.href(relative).as_deref(), Some("/x"));
	}

	#[test]
	fn test_relative_href_resolves_against_base() {
		let engine = engine(vec![Tag::new("t").host("shop.example").query("ref", "A")]);

		let base = Url::parse("http://shop.example/dir/page").unwrap();
		let mut tree = Tree::new().with_base_url(base);
		let body = tree.body().unwrap();
		let link = tree.append_link(body, "item?id=7");

		engine.traverse(&mut tree, None);
		assert_eq!(
			tree.href(link).as_deref(),
			Some("http://shop.example/dir/item?id=7&ref=A")
		);
	}

	#[test]
	fn test_port_must_match_exactly() {
		let engine = engine(vec![Tag::new("t").host("shop.example:8080").query("ref", "A")]);

		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let plain = tree.append_link(body, "http://shop.example/x");
		let ported = tree.append_link(body, "http://shop.example:8080/x");

		engine.traverse(&mut tree, None);
		assert_eq!(tree.href(plain).as_deref(), Some("http://shop.example/x"));
		assert_eq!(tree.href(ported).as_deref(), Some("http://shop.example:8080/x?ref=A"));
	}
}
