use crate::config::Tag;
use crate::dom::{Document, NodeId};
use crate::engine::Engine;
use crate::engine::provenance::{self, ElementStore};
use crate::modify::{Modified, ModifyError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use url::Url;

/// Merge `query` into the URL's query string. Existing keys are overwritten in
/// place (later duplicates removed), new keys are appended in `query` order.
pub fn merge_query(url: &mut Url, query: &[(String, String)]) {
	if query.is_empty() {
		return;
	}

	let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
	for (key, value) in query {
		let mut seen = false;
		pairs.retain_mut(|(k, v)| {
			if *k != *key {
				return true;
			}
			if seen {
				return false;
			}
			seen = true;
			*v = value.clone();
			true
		});
		if !seen {
			pairs.push((key.clone(), value.clone()));
		}
	}

	url.query_pairs_mut().clear().extend_pairs(&pairs);
}

impl Engine {
	/// Run one tag's pipeline over `link`, unless the link already reflects
	/// the engine's last write. Returns whether the link was rewritten.
	pub fn apply_tag<D>(&self, doc: &mut D, link: NodeId, url: Url, tag: &Tag) -> bool
	where
		D: Document + ElementStore,
	{
		if let Some(href) = doc.href(link)
			&& provenance::is_current(&*doc, link, &href)
		{
			return false;
		}

		self.rewrite(doc, link, url, tag);
		true
	}

	/// Query merge, modify, replace, write back. No idempotence check.
	///
	/// Returns the written href re-parsed, for the next matching tag.
	pub(crate) fn rewrite<D>(&self, doc: &mut D, link: NodeId, mut url: Url, tag: &Tag) -> Option<Url>
	where
		D: Document + ElementStore,
	{
		let original = doc.href(link).unwrap_or_else(|| url.to_string());

		merge_query(&mut url, &tag.query);

		if let Some(modify) = &tag.modify {
			// A panicking closure is handled like one returning an error.
			let outcome: Result<Modified, ModifyError> =
				panic::catch_unwind(AssertUnwindSafe(|| modify.call(&url)))
					.unwrap_or_else(|payload| Err(panic_message(payload.as_ref()).into()));

			url = match outcome {
				Ok(Modified::Url(next)) => next,
				Ok(Modified::Text(text)) => match url.join(&text) {
					Ok(next) => next,
					Err(err) => {
						self.logger.error(format_args!(
							"tag {}: modify returned unparseable url {text:?}: {err}",
							tag.name
						));
						url
					}
				},
				Err(err) => {
					self.logger.error(format_args!("tag {}: modify failed: {err}", tag.name));
					url
				}
			};
		}

		let mut href = String::from(url);
		for replacement in &tag.replace {
			href = replacement.apply(&href);
		}

		doc.set_href(link, &href);
		provenance::record(doc, link, original, href.clone());

		match Url::parse(&href) {
			Ok(next) => Some(next),
			Err(err) => {
				self.logger.error(format_args!(
					"tag {}: rewritten href {href:?} no longer parses: {err}",
					tag.name
				));
				None
			}
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	let detail = payload
		.downcast_ref::<&str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("non-string payload");
	format!("panicked: {detail}")
}
