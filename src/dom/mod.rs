//! Document collaborators the engine works against.
//!
//! The engine never owns a document. Hosts hand it `&mut` access for the
//! duration of one call, and deliver change records in batches through
//! [`crate::engine::Engine::handle_batch`]. [`Tree`] is an in-memory
//! implementation of every trait here.

pub mod tree;

pub use tree::{NodeKind, Tree};

use url::Url;

/// Stable identity of a node. Ids are never reused within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
	Loading,
	Interactive,
	Complete,
}

impl ReadyState {
	/// Past the initial loading stage.
	pub fn is_ready(self) -> bool {
		!matches!(self, ReadyState::Loading)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
	Attributes,
	ChildList,
	CharacterData,
}

/// One reported change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
	pub kind: MutationKind,

	/// Element whose attribute changed, parent whose children changed, or the
	/// text node whose data changed.
	pub target: NodeId,

	/// Set for attribute changes.
	pub attribute_name: Option<String>,
}

impl MutationRecord {
	pub fn attribute(target: NodeId, name: impl Into<String>) -> Self {
		MutationRecord {
			kind: MutationKind::Attributes,
			target,
			attribute_name: Some(name.into()),
		}
	}

	pub fn child_list(target: NodeId) -> Self {
		MutationRecord {
			kind: MutationKind::ChildList,
			target,
			attribute_name: None,
		}
	}

	pub fn character_data(target: NodeId) -> Self {
		MutationRecord {
			kind: MutationKind::CharacterData,
			target,
			attribute_name: None,
		}
	}
}

/// Which changes a subscription wants delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObserveOptions {
	pub attributes: bool,

	/// When non-empty, only these attribute names are reported.
	pub attribute_filter: Vec<String>,
	pub child_list: bool,
	pub character_data: bool,
	pub subtree: bool,
}

impl ObserveOptions {
	/// href attribute, child-list and character-data changes over a whole subtree.
	pub fn links() -> Self {
		ObserveOptions {
			attributes: true,
			attribute_filter: vec!["href".to_string()],
			child_list: true,
			character_data: true,
			subtree: true,
		}
	}

	/// Whether a record of this kind passes the filter. Target scoping is the feed's job.
	pub fn wants(&self, record: &MutationRecord) -> bool {
		match record.kind {
			MutationKind::Attributes => {
				self.attributes
					&& (self.attribute_filter.is_empty()
						|| record.attribute_name.as_deref().is_some_and(|name| {
							self.attribute_filter
								.iter()
								.any(|f| f.eq_ignore_ascii_case(name))
						}))
			}
			MutationKind::ChildList => self.child_list,
			MutationKind::CharacterData => self.character_data,
		}
	}
}

/// The document tree as the engine sees it.
pub trait Document {
	fn ready_state(&self) -> ReadyState;

	/// Root content element; the default traversal root.
	fn body(&self) -> Option<NodeId>;

	/// Base for resolving relative hrefs.
	fn base_url(&self) -> Option<&Url>;

	/// Hyperlink elements in the subtree rooted at `root`, in document order,
	/// including `root` itself when it is one.
	fn links(&self, root: NodeId) -> Vec<NodeId>;

	fn parent(&self, node: NodeId) -> Option<NodeId>;

	fn href(&self, element: NodeId) -> Option<String>;

	fn set_href(&mut self, element: NodeId, href: &str);

	/// Ask to be told once when the document leaves [`ReadyState::Loading`].
	fn notify_when_ready(&mut self);

	/// The change-notification facility, if the environment has one.
	fn change_feed(&mut self) -> Option<&mut dyn ChangeFeed>;
}

/// Change-notification facility. Records are delivered by the host.
pub trait ChangeFeed {
	fn observe(&mut self, target: NodeId, options: ObserveOptions);

	/// Stop reporting and discard undelivered records.
	fn disconnect(&mut self);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_link_options_filter_attributes() {
		let options = ObserveOptions::links();
		let node = NodeId(1);

		assert!(options.wants(&MutationRecord::attribute(node, "href")));
		assert!(options.wants(&MutationRecord::attribute(node, "HREF")));
		assert!(!options.wants(&MutationRecord::attribute(node, "class")));
		assert!(options.wants(&MutationRecord::child_list(node)));
		assert!(options.wants(&MutationRecord::character_data(node)));
	}

	#[test]
	fn test_default_options_want_nothing() {
		let options = ObserveOptions::default();
		assert!(!options.wants(&MutationRecord::attribute(NodeId(1), "href")));
		assert!(!options.wants(&MutationRecord::child_list(NodeId(1))));
	}

	#[test]
	fn test_ready_state() {
		assert!(!ReadyState::Loading.is_ready());
		assert!(ReadyState::Interactive.is_ready());
		assert!(ReadyState::Complete.is_ready());
	}
}
