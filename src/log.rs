//! Diagnostic logger handed to the engine.
//!
//! Disabled loggers drop every message without formatting it. Enabled loggers
//! forward to `tracing` unless a custom sink is installed.

use std::fmt;
use std::sync::Arc;

/// Receives `(is_error, message)` pairs.
pub type LogSink = Arc<dyn Fn(bool, &str) + Send + Sync>;

#[derive(Clone, Default)]
pub struct Logger {
	enabled: bool,
	sink: Option<LogSink>,
}

impl Logger {
	pub fn new(enabled: bool) -> Self {
		Logger {
			enabled,
			sink: None,
		}
	}

	pub fn disabled() -> Self {
		Self::new(false)
	}

	/// Route messages to `sink` instead of `tracing`.
	pub fn with_sink(mut self, sink: LogSink) -> Self {
		self.sink = Some(sink);
		self
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn log(&self, is_error: bool, message: impl fmt::Display) {
		if !self.enabled {
			return;
		}

		match &self.sink {
			Some(sink) => sink(is_error, &message.to_string()),
			None if is_error => tracing::error!(target: "linktag", "{message}"),
			None => tracing::info!(target: "linktag", "{message}"),
		}
	}

	pub fn error(&self, message: impl fmt::Display) {
		self.log(true, message);
	}

	pub fn info(&self, message: impl fmt::Display) {
		self.log(false, message);
	}
}

impl fmt::Debug for Logger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Logger")
			.field("enabled", &self.enabled)
			.field("custom_sink", &self.sink.is_some())
			.finish()
	}
}
