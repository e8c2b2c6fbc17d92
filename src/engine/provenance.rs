use crate::dom::NodeId;

/// What the engine knows about a link it has rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
	/// href as first observed, before any rewrite.
	pub was: String,

	/// href after the most recent rewrite.
	pub is: String,
}

/// Per-element metadata keyed by element identity, never by attribute value.
pub trait ElementStore {
	fn provenance(&self, element: NodeId) -> Option<&Provenance>;

	fn set_provenance(&mut self, element: NodeId, record: Provenance);
}

/// True when `href` is exactly what the engine last wrote to `element`.
pub fn is_current<S: ElementStore + ?Sized>(store: &S, element: NodeId, href: &str) -> bool {
	store.provenance(element).is_some_and(|p| p.is == href)
}

/// Record a rewrite. An existing `was` is kept so it always holds the
/// pristine pre-engine href.
pub fn record<S: ElementStore + ?Sized>(store: &mut S, element: NodeId, was: String, is: String) {
	let was = match store.provenance(element) {
		Some(existing) => existing.was.clone(),
		None => was,
	};
	store.set_provenance(element, Provenance { was, is });
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	#[derive(Default)]
	struct SideTable(HashMap<NodeId, Provenance>);

	impl ElementStore for SideTable {
		fn provenance(&self, element: NodeId) -> Option<&Provenance> {
			self.0.get(&element)
		}

		fn set_provenance(&mut self, element: NodeId, record: Provenance) {
			self.0.insert(element, record);
		}
	}

	#[test]
	fn test_first_record_keeps_given_was() {
		let mut store = SideTable::default();
		record(&mut store, NodeId(3), "http://a/".into(), "http://a/?x=1".into());

		let p = store.provenance(NodeId(3)).unwrap();
		assert_eq!(p.was, "http://a/");
		assert_eq!(p.is, "http://a/?x=1");
	}

	#[test]
	fn test_later_record_preserves_original_was() {
		let mut store = SideTable::default();
		record(&mut store, NodeId(3), "http://a/".into(), "http://a/?x=1".into());
		record(&mut store, NodeId(3), "http://a/?x=1".into(), "http://a/?x=2".into());

		let p = store.provenance(NodeId(3)).unwrap();
		assert_eq!(p.was, "http://a/");
		assert_eq!(p.is, "http://a/?x=2");
	}

	#[test]
	fn test_is_current() {
		let mut store = SideTable::default();
		assert!(!is_current(&store, NodeId(1), "http://a/"));

		record(&mut store, NodeId(1), "http://a/".into(), "http://b/".into());
		assert!(is_current(&store, NodeId(1), "http://b/"));
		assert!(!is_current(&store, NodeId(1), "http://a/"));
		assert!(!is_current(&store, NodeId(2), "http://b/"));
	}
}
