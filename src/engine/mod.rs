//! The link-rewrite engine.
//!
//! This module handles:
//! - Scanning a subtree for hyperlinks and matching them against tags
//! - The per-tag transform pipeline and provenance tracking
//! - The attach/detach lifecycle of the change subscription

pub mod matcher;
pub mod provenance;
pub mod rewriter;

pub use matcher::{host_key, parse_href};
pub use provenance::{ElementStore, Provenance};
pub use rewriter::merge_query;

use crate::config::Config;
use crate::dom::{Document, MutationKind, MutationRecord, NodeId, ObserveOptions};
use crate::log::Logger;
use std::collections::HashSet;
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	Detached,
	/// `attach` was called while the document was loading; waiting for `on_ready`.
	AwaitingReady,
	Attached,
}

/// What the host environment offers, detected once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
	pub live_updates: bool,
}

impl Capabilities {
	pub fn detect<D: Document>(doc: &mut D) -> Self {
		Capabilities {
			live_updates: doc.change_feed().is_some(),
		}
	}
}

/// Counters from one or more traversals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
	/// Traversals run.
	pub roots: usize,
	/// Hyperlink elements seen.
	pub links: usize,
	/// Links whose host some tag lists.
	pub matched: usize,
	/// Links actually rewritten.
	pub rewritten: usize,
}

impl AddAssign for ScanReport {
	fn add_assign(&mut self, other: Self) {
		self.roots += other.roots;
		self.links += other.links;
		self.matched += other.matched;
		self.rewritten += other.rewritten;
	}
}

#[derive(Debug)]
pub struct Engine {
	config: Config,
	capabilities: Capabilities,
	state: State,
	/// A readiness notification is registered with the document and has not fired yet.
	ready_pending: bool,
	logger: Logger,
}

impl Engine {
	pub fn new(config: Config, capabilities: Capabilities) -> Self {
		let logger = Logger::new(config.log);
		Engine {
			config,
			capabilities,
			state: State::Detached,
			ready_pending: false,
			logger,
		}
	}

	/// Build an engine, detecting capabilities from `doc`.
	pub fn for_document<D: Document>(config: Config, doc: &mut D) -> Self {
		let capabilities = Capabilities::detect(doc);
		Self::new(config, capabilities)
	}

	pub fn with_logger(mut self, logger: Logger) -> Self {
		self.logger = logger;
		self
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn capabilities(&self) -> Capabilities {
		self.capabilities
	}

	pub fn state(&self) -> State {
		self.state
	}

	pub fn is_attached(&self) -> bool {
		self.state == State::Attached
	}

	/// Start tracking the document.
	///
	/// While the document is loading this registers a single readiness
	/// notification and returns; the host then calls [`Engine::on_ready`].
	pub fn attach<D>(&mut self, doc: &mut D) -> ScanReport
	where
		D: Document + ElementStore,
	{
		if self.state != State::Detached {
			return ScanReport::default();
		}

		if !doc.ready_state().is_ready() {
			self.state = State::AwaitingReady;
			// One left over from an attach cancelled by `detach` still counts.
			if !self.ready_pending {
				doc.notify_when_ready();
				self.ready_pending = true;
			}
			self.logger.info("document still loading, attach deferred");
			return ScanReport::default();
		}

		self.start(doc)
	}

	/// Resume a deferred attach once the document is ready.
	pub fn on_ready<D>(&mut self, doc: &mut D) -> ScanReport
	where
		D: Document + ElementStore,
	{
		if !doc.ready_state().is_ready() {
			return ScanReport::default();
		}
		self.ready_pending = false;
		if self.state != State::AwaitingReady {
			return ScanReport::default();
		}
		self.start(doc)
	}

	fn start<D>(&mut self, doc: &mut D) -> ScanReport
	where
		D: Document + ElementStore,
	{
		let report = self.traverse(doc, None);
		self.state = State::Attached;

		if !self.capabilities.live_updates {
			self.logger
				.info("change notifications unavailable, live updates disabled");
			return report;
		}

		let body = doc.body();
		match (body, doc.change_feed()) {
			(Some(body), Some(feed)) => feed.observe(body, ObserveOptions::links()),
			_ => self
				.logger
				.error("change feed or body went missing, live updates disabled"),
		}

		self.logger.info(format_args!(
			"attached: {} links seen, {} rewritten",
			report.links, report.rewritten
		));
		report
	}

	/// Stop tracking. A no-op when the environment has no change feed.
	pub fn detach<D: Document>(&mut self, doc: &mut D) {
		if !self.capabilities.live_updates {
			return;
		}

		if let Some(feed) = doc.change_feed() {
			feed.disconnect();
		}
		self.state = State::Detached;
	}

	/// Handle one batch of change records.
	///
	/// href changes that match the element's last engine write are the
	/// engine's own and are skipped. Every other relevant change rescans its
	/// target subtree, each distinct target once per batch.
	pub fn handle_batch<D>(&self, doc: &mut D, records: &[MutationRecord]) -> ScanReport
	where
		D: Document + ElementStore,
	{
		let mut report = ScanReport::default();
		if self.state != State::Attached {
			return report;
		}

		let mut targets: Vec<NodeId> = Vec::new();
		let mut seen: HashSet<NodeId> = HashSet::new();
		for record in records {
			let target = match record.kind {
				MutationKind::Attributes => {
					let is_href = record
						.attribute_name
						.as_deref()
						.is_some_and(|name| name.eq_ignore_ascii_case("href"));
					if !is_href {
						continue;
					}
					if let Some(href) = doc.href(record.target)
						&& provenance::is_current(&*doc, record.target, &href)
					{
						continue;
					}
					record.target
				}
				MutationKind::ChildList => record.target,
				// Text nodes hold no links; rescan the element around them.
				MutationKind::CharacterData => match doc.parent(record.target) {
					Some(parent) => parent,
					None => continue,
				},
			};

			if seen.insert(target) {
				targets.push(target);
			}
		}

		for target in targets {
			report += self.traverse(doc, Some(target));
		}
		report
	}
}
