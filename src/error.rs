//! Error types shared by the builder and parser.

use std::fmt;

/// A wire-protocol violation raised by [`Parser::handle`](crate::parser::Parser::handle).
///
/// The message text is part of the contract: callers (and the tests this
/// crate's parser is modeled on) match against the literal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError(pub(crate) &'static str);

impl ParseError {
	pub fn message(&self) -> &'static str {
		self.0
	}
}

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.0)
	}
}

impl std::error::Error for ParseError {}

/// Outcome of a [`Builder`](crate::builder::Builder) call that may flush staged bytes.
///
/// `NotFlushed`/`Flushed` distinguish whether the writer was invoked at all
/// during the call (tests observe `flush_count`, and callers may want to
/// know whether a write syscall happened); `WriteStalled` reports the
/// writer returning `0` while bytes remained, which spec calls a "dead
/// sink" condition. The builder never raises for this — the caller decides
/// what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
	NotFlushed,
	Flushed,
	WriteStalled,
}

impl FlushOutcome {
	/// The numeric status code from the original contract (§4.2, §7): `0`
	/// for no-op success, `1` for a flush that completed normally, `2` for
	/// a stalled writer. Exposed for callers that want the legacy
	/// three-way contract rather than matching on the enum.
	pub fn code(self) -> u8 {
		match self {
			FlushOutcome::NotFlushed => 0,
			FlushOutcome::Flushed => 1,
			FlushOutcome::WriteStalled => 2,
		}
	}
}
