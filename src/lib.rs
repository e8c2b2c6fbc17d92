//! linktag - rewrite outbound hyperlinks into affiliate-tagged equivalents and
//! keep them rewritten as the document changes.
//!
//! This library provides the core functionality for linktag, including:
//! - Configuration file parsing, cascade discovery and normalization
//! - Host matching and the per-tag transform pipeline
//! - Provenance tracking so links are never rewritten twice
//! - The attach/detach lifecycle over a document change feed
//!
//! # Example
//!
//! ```no_run
//! use linktag::config::{Config, Tag};
//! use linktag::dom::{Document, Tree};
//! use linktag::engine::Engine;
//!
//! let mut tree = Tree::new();
//! let body = tree.body().unwrap();
//! let link = tree.append_link(body, "http://shop.example/x");
//!
//! let config = Config::from_tags(
//!     vec![Tag::new("shop").host("shop.example").query("ref", "A")],
//!     false,
//! );
//! let mut engine = Engine::for_document(config, &mut tree);
//! engine.attach(&mut tree);
//! assert_eq!(tree.href(link).as_deref(), Some("http://shop.example/x?ref=A"));
//!
//! // Later changes arrive as batches from the change feed.
//! tree.append_link(body, "http://shop.example/y");
//! let batch = tree.take_records();
//! engine.handle_batch(&mut tree, &batch);
//! ```

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod log;
pub mod modify;

pub use error::{LinktagError, Result};
