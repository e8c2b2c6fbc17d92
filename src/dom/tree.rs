use crate::dom::{ChangeFeed, Document, MutationRecord, NodeId, ObserveOptions, ReadyState};
use crate::engine::provenance::{ElementStore, Provenance};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
	},
	Text(String),
}

#[derive(Debug)]
struct Node {
	kind: NodeKind,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	provenance: Option<Provenance>,
}

/// In-memory document.
///
/// Nodes live in an arena slot per id. Removing a node frees its slot (and
/// any provenance attached to it); ids are never handed out twice, so a stale
/// id simply stops resolving.
#[derive(Debug)]
pub struct Tree {
	nodes: Vec<Option<Node>>,
	body: NodeId,
	base_url: Option<Url>,
	ready_state: ReadyState,
	ready_waiters: usize,
	feed_available: bool,
	observer: Option<(NodeId, ObserveOptions)>,
	pending: Vec<MutationRecord>,
}

impl Default for Tree {
	fn default() -> Self {
		Self::new()
	}
}

impl Tree {
	/// A complete document with an empty `body` and a change feed.
	pub fn new() -> Self {
		let mut tree = Tree {
			nodes: Vec::new(),
			body: NodeId(0),
			base_url: None,
			ready_state: ReadyState::Complete,
			ready_waiters: 0,
			feed_available: true,
			observer: None,
			pending: Vec::new(),
		};
		tree.body = tree.create_element("body");
		tree
	}

	/// A document that is still loading.
	pub fn loading() -> Self {
		Tree {
			ready_state: ReadyState::Loading,
			..Self::new()
		}
	}

	/// Simulate an environment with no change-notification facility.
	pub fn without_change_feed(mut self) -> Self {
		self.feed_available = false;
		self
	}

	pub fn with_base_url(mut self, base: Url) -> Self {
		self.base_url = Some(base);
		self
	}

	/// Advance the ready state. Returns true when pending readiness waiters
	/// were released, meaning the host should call `Engine::on_ready`.
	pub fn set_ready_state(&mut self, state: ReadyState) -> bool {
		self.ready_state = state;
		if state.is_ready() && self.ready_waiters > 0 {
			self.ready_waiters = 0;
			return true;
		}
		false
	}

	pub fn ready_waiters(&self) -> usize {
		self.ready_waiters
	}

	pub fn create_element(&mut self, tag: &str) -> NodeId {
		self.push(NodeKind::Element {
			tag: tag.to_ascii_lowercase(),
			attributes: Vec::new(),
		})
	}

	pub fn create_text(&mut self, text: &str) -> NodeId {
		self.push(NodeKind::Text(text.to_string()))
	}

	fn push(&mut self, kind: NodeKind) -> NodeId {
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(Some(Node {
			kind,
			parent: None,
			children: Vec::new(),
			provenance: None,
		}));
		id
	}

	fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(id.0 as usize).and_then(Option::as_ref)
	}

	fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
	}

	/// Whether `id` still refers to a live node.
	pub fn contains(&self, id: NodeId) -> bool {
		self.node(id).is_some()
	}

	pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
		self.node(id).map(|n| &n.kind)
	}

	pub fn children(&self, id: NodeId) -> &[NodeId] {
		self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
	}

	/// Move `child` under `parent`, detaching it from any previous parent.
	pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
		if parent == child || !self.contains(parent) || !self.contains(child) {
			return;
		}
		if self.is_inclusive_ancestor(child, parent) {
			return;
		}

		if let Some(old_parent) = self.node(child).and_then(|n| n.parent) {
			if let Some(node) = self.node_mut(old_parent) {
				node.children.retain(|&c| c != child);
			}
			self.record(MutationRecord::child_list(old_parent));
		}

		if let Some(node) = self.node_mut(child) {
			node.parent = Some(parent);
		}
		if let Some(node) = self.node_mut(parent) {
			node.children.push(child);
		}
		self.record(MutationRecord::child_list(parent));
	}

	/// Remove `child` from `parent` and drop its whole subtree.
	pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
		let Some(node) = self.node_mut(parent) else {
			return false;
		};
		let before = node.children.len();
		node.children.retain(|&c| c != child);
		if node.children.len() == before {
			return false;
		}

		self.record(MutationRecord::child_list(parent));

		let mut stack = vec![child];
		while let Some(id) = stack.pop() {
			if let Some(node) = self.nodes.get_mut(id.0 as usize).and_then(Option::take) {
				stack.extend(node.children);
			}
		}
		true
	}

	/// Create an `<a href=..>` and append it to `parent`.
	pub fn append_link(&mut self, parent: NodeId, href: &str) -> NodeId {
		let link = self.create_element("a");
		self.set_attribute(link, "href", href);
		self.append_child(parent, link);
		link
	}

	pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
		match &self.node(id)?.kind {
			NodeKind::Element { attributes, .. } => attributes
				.iter()
				.find(|(k, _)| k.eq_ignore_ascii_case(name))
				.map(|(_, v)| v.as_str()),
			NodeKind::Text(_) => None,
		}
	}

	pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
		let Some(Node {
			kind: NodeKind::Element { attributes, .. },
			..
		}) = self.node_mut(id)
		else {
			return;
		};

		let name = name.to_ascii_lowercase();
		match attributes.iter_mut().find(|(k, _)| *k == name) {
			Some(slot) => slot.1 = value.to_string(),
			None => attributes.push((name.clone(), value.to_string())),
		}
		self.record(MutationRecord::attribute(id, name));
	}

	pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
		let Some(Node {
			kind: NodeKind::Element { attributes, .. },
			..
		}) = self.node_mut(id)
		else {
			return;
		};

		let before = attributes.len();
		attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
		if attributes.len() != before {
			self.record(MutationRecord::attribute(id, name.to_ascii_lowercase()));
		}
	}

	pub fn text(&self, id: NodeId) -> Option<&str> {
		match &self.node(id)?.kind {
			NodeKind::Text(text) => Some(text),
			NodeKind::Element { .. } => None,
		}
	}

	pub fn set_text(&mut self, id: NodeId, value: &str) {
		if let Some(Node {
			kind: NodeKind::Text(text),
			..
		}) = self.node_mut(id)
		{
			*text = value.to_string();
			self.record(MutationRecord::character_data(id));
		}
	}

	/// Drain records queued since the last call, as one batch.
	pub fn take_records(&mut self) -> Vec<MutationRecord> {
		std::mem::take(&mut self.pending)
	}

	pub fn is_observed(&self) -> bool {
		self.observer.is_some()
	}

	fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.node(node).and_then(|n| n.parent) {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}

	fn record(&mut self, record: MutationRecord) {
		let Some((target, options)) = &self.observer else {
			return;
		};
		if !options.wants(&record) {
			return;
		}

		let in_scope = if options.subtree {
			self.is_inclusive_ancestor(*target, record.target)
		} else {
			record.target == *target
		};
		if in_scope {
			self.pending.push(record);
		}
	}
}

impl Document for Tree {
	fn ready_state(&self) -> ReadyState {
		self.ready_state
	}

	fn body(&self) -> Option<NodeId> {
		self.contains(self.body).then_some(self.body)
	}

	fn base_url(&self) -> Option<&Url> {
		self.base_url.as_ref()
	}

	fn links(&self, root: NodeId) -> Vec<NodeId> {
		let mut links = Vec::new();
		let mut stack = vec![root];

		while let Some(id) = stack.pop() {
			let Some(node) = self.node(id) else {
				continue;
			};
			if let NodeKind::Element { tag, .. } = &node.kind
				&& (tag == "a" || tag == "area")
			{
				links.push(id);
			}
			stack.extend(node.children.iter().rev());
		}

		links
	}

	fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.node(node)?.parent
	}

	fn href(&self, element: NodeId) -> Option<String> {
		self.attribute(element, "href").map(str::to_string)
	}

	fn set_href(&mut self, element: NodeId, href: &str) {
		self.set_attribute(element, "href", href);
	}

	fn notify_when_ready(&mut self) {
		self.ready_waiters += 1;
	}

	fn change_feed(&mut self) -> Option<&mut dyn ChangeFeed> {
		if self.feed_available {
			Some(self as &mut dyn ChangeFeed)
		} else {
			None
		}
	}
}

impl ChangeFeed for Tree {
	fn observe(&mut self, target: NodeId, options: ObserveOptions) {
		self.observer = Some((target, options));
	}

	fn disconnect(&mut self) {
		self.observer = None;
		self.pending.clear();
	}
}

impl ElementStore for Tree {
	fn provenance(&self, element: NodeId) -> Option<&Provenance> {
		self.node(element)?.provenance.as_ref()
	}

	fn set_provenance(&mut self, element: NodeId, record: Provenance) {
		if let Some(node) = self.node_mut(element) {
			node.provenance = Some(record);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::MutationKind;

	#[test]
	fn test_links_in_document_order_including_root() {
		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let first = tree.append_link(body, "http://a.example/");
		let div = tree.create_element("div");
		tree.append_child(body, div);
		let nested = tree.append_link(div, "http://b.example/");
		let area = tree.create_element("AREA");
		tree.append_child(div, area);
		let last = tree.append_link(body, "http://c.example/");

		assert_eq!(tree.links(body), vec![first, nested, area, last]);
		assert_eq!(tree.links(nested), vec![nested]);
		assert_eq!(tree.links(div), vec![nested, area]);
	}

	#[test]
	fn test_no_records_without_observer() {
		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		tree.append_link(body, "http://a.example/");
		assert!(tree.take_records().is_empty());
	}

	#[test]
	fn test_observer_filters_and_scopes_records() {
		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let link = tree.append_link(body, "http://a.example/");
		let detached = tree.create_element("div");

		tree.observe(body, ObserveOptions::links());
		tree.set_attribute(link, "class", "x");
		tree.set_href(link, "http://b.example/");
		tree.append_link(detached, "http://c.example/");
		let text = tree.create_text("hi");
		tree.append_child(link, text);
		tree.set_text(text, "hello");

		let records = tree.take_records();
		assert_eq!(
			records,
			vec![
				MutationRecord::attribute(link, "href"),
				MutationRecord::child_list(link),
				MutationRecord::character_data(text),
			]
		);
		assert!(tree.take_records().is_empty());
	}

	#[test]
	fn test_non_subtree_observer_sees_only_target() {
		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let div = tree.create_element("div");
		tree.append_child(body, div);

		tree.observe(
			body,
			ObserveOptions {
				child_list: true,
				..Default::default()
			},
		);
		tree.append_link(div, "http://a.example/");
		tree.append_link(body, "http://b.example/");

		let kinds: Vec<_> = tree.take_records().into_iter().map(|r| (r.kind, r.target)).collect();
		assert_eq!(kinds, vec![(MutationKind::ChildList, body)]);
	}

	#[test]
	fn test_disconnect_discards_pending() {
		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		tree.observe(body, ObserveOptions::links());
		tree.append_link(body, "http://a.example/");

		tree.disconnect();
		assert!(!tree.is_observed());
		assert!(tree.take_records().is_empty());
	}

	#[test]
	fn test_remove_child_drops_subtree_and_provenance() {
		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let div = tree.create_element("div");
		tree.append_child(body, div);
		let link = tree.append_link(div, "http://a.example/");
		tree.set_provenance(
			link,
			Provenance {
				was: "http://a.example/".into(),
				is: "http://a.example/?ref=A".into(),
			},
		);

		assert!(tree.remove_child(body, div));
		assert!(!tree.contains(div));
		assert!(!tree.contains(link));
		assert!(tree.provenance(link).is_none());
		assert!(!tree.remove_child(body, div));

		let fresh = tree.create_element("a");
		assert_ne!(fresh, link);
	}

	#[test]
	fn test_append_child_moves_node() {
		let mut tree = Tree::new();
		let body = tree.body().unwrap();
		let a = tree.create_element("div");
		let b = tree.create_element("div");
		tree.append_child(body, a);
		tree.append_child(body, b);
		let link = tree.append_link(a, "http://a.example/");

		tree.append_child(b, link);
		assert_eq!(tree.children(a), &[] as &[NodeId]);
		assert_eq!(tree.children(b), &[link]);
		assert_eq!(tree.parent(link), Some(b));

		// Cycles are refused.
		tree.append_child(link, b);
		assert_eq!(tree.parent(b), Some(body));
	}

	#[test]
	fn test_ready_state_releases_waiters_once() {
		let mut tree = Tree::loading();
		tree.notify_when_ready();
		assert_eq!(tree.ready_waiters(), 1);

		assert!(!tree.set_ready_state(ReadyState::Loading));
		assert!(tree.set_ready_state(ReadyState::Interactive));
		assert!(!tree.set_ready_state(ReadyState::Complete));
	}

	#[test]
	fn test_change_feed_capability() {
		let mut tree = Tree::new();
		assert!(tree.change_feed().is_some());

		let mut bare = Tree::new().without_change_feed();
		assert!(bare.change_feed().is_none());
	}
}
