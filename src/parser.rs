//! Incremental, zero-lookahead parser for meta-protocol responses.
//!
//! [`Parser::handle`] consumes a chunk of arbitrary size — including chunks
//! that split a token, a CRLF, or a value payload across calls — and
//! appends any responses it completes to an internal FIFO. Every byte is
//! consumed or accounted for the instant it arrives; nothing is ever
//! buffered "for lookahead".

use std::collections::{vec_deque, VecDeque};

use crate::error::ParseError;
use crate::response::{Response, ResponseKind};

#[derive(Debug, Clone, Copy)]
enum Phase {
	Start,
	AfterV,
	AfterH,
	AfterN,
	AfterE,
	/// Matching the remaining `"RSION"` of a `VERSION` header; `idx` counts
	/// how many of those five bytes have matched so far.
	VersionLiteral(u8),
	/// Accumulating the (possibly empty, possibly space-padded) version
	/// token up to the terminating `\r`.
	VersionToken,
	VaLen { acc: u64, has_digit: bool },
	VaAwaitCr,
	VaAwaitLf,
	VaBody,
	VaBodyCr,
	VaBodyLf,
	/// Discarding an arbitrary argument area up to `\r`, for `HD`/`NS`/`EX`/`NF`.
	TailSkip(ResponseKind),
	ExpectLf(ResponseKind),
}

/// Streaming state machine that turns a byte stream into [`Response`] records.
#[derive(Debug)]
pub struct Parser {
	phase: Phase,
	scratch: Vec<u8>,
	expected_len: usize,
	queue: VecDeque<Response>,
	current: Option<Response>,
}

impl Parser {
	pub fn new() -> Self {
		Self { phase: Phase::Start, scratch: Vec::new(), expected_len: 0, queue: VecDeque::new(), current: None }
	}

	/// Feed the next chunk of bytes read from the connection.
	///
	/// Chunks may be any size, including empty (a no-op that preserves
	/// state) or a single byte. Any number of complete responses — zero or
	/// more — are appended to the internal queue.
	pub fn handle(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
		let mut i = 0;
		while i < chunk.len() {
			let byte = chunk[i];
			i += 1;
			if let Some(kind) = self.step(byte)? {
				let remaining_len = chunk.len() - i;
				self.emit(kind, remaining_len);
			}
		}
		Ok(())
	}

	/// Retrieve the kind code of the next queued response (popping it), or
	/// `0` if the queue is empty.
	///
	/// `get_string`/`get_data`/`get_len` then read fields of whichever
	/// response was most recently retrieved this way.
	pub fn get(&mut self) -> u8 {
		match self.queue.pop_front() {
			Some(response) => {
				let code = response.kind.map_or(0, ResponseKind::code);
				self.current = Some(response);
				code
			},
			None => 0,
		}
	}

	/// The version token of the most recently retrieved `VERSION` response.
	pub fn get_string(&self) -> &[u8] {
		self.current.as_ref().map_or(&[][..], |r| r.string())
	}

	/// The value payload of the most recently retrieved `VA` response.
	pub fn get_data(&self) -> &[u8] {
		self.current.as_ref().map_or(&[][..], |r| r.data())
	}

	/// Bytes of the latest `handle()` input left unconsumed when the
	/// current head response was emitted.
	pub fn get_len(&self) -> usize {
		self.current.as_ref().map_or(0, Response::remaining_len)
	}

	/// Drain every queued response in wire order.
	///
	/// An idiomatic alternative to the stateful `get`/`get_string`/`get_data`
	/// observer trio above, for callers that would rather pattern-match a
	/// [`Response`] directly.
	pub fn drain(&mut self) -> vec_deque::Drain<'_, Response> {
		self.queue.drain(..)
	}

	fn start_transition(byte: u8) -> Phase {
		match byte {
			b'V' => Phase::AfterV,
			b'H' => Phase::AfterH,
			b'N' => Phase::AfterN,
			b'E' => Phase::AfterE,
			// The state table defines no error here: an unrecognized byte in
			// `Start` is discarded rather than raised, so trailing garbage
			// after a completed response doesn't poison the parser (see
			// DESIGN.md, resolving the ambiguity exercised by the original
			// `test_version_split` fixture).
			_ => Phase::Start,
		}
	}

	/// Advance the state machine by one byte. Returns the kind of response
	/// completed by this byte, if any.
	fn step(&mut self, byte: u8) -> Result<Option<ResponseKind>, ParseError> {
		match self.phase {
			Phase::Start => {
				self.phase = Self::start_transition(byte);
				Ok(None)
			},
			Phase::AfterV => {
				self.phase = match byte {
					b'A' => Phase::VaLen { acc: 0, has_digit: false },
					b'E' => Phase::VersionLiteral(0),
					other => Self::start_transition(other),
				};
				Ok(None)
			},
			Phase::AfterH => match byte {
				b'D' => {
					self.phase = Phase::TailSkip(ResponseKind::Hd);
					Ok(None)
				},
				_ => Err(ParseError("invalid character after H")),
			},
			Phase::AfterN => match byte {
				b'S' => {
					self.phase = Phase::TailSkip(ResponseKind::Ns);
					Ok(None)
				},
				b'F' => {
					self.phase = Phase::TailSkip(ResponseKind::Nf);
					Ok(None)
				},
				_ => Err(ParseError("invalid character after N")),
			},
			Phase::AfterE => match byte {
				b'X' => {
					self.phase = Phase::TailSkip(ResponseKind::Ex);
					Ok(None)
				},
				_ => Err(ParseError("invalid character after E")),
			},
			Phase::VersionLiteral(idx) => {
				const REST: &[u8] = b"RSION";
				if byte == REST[idx as usize] {
					let next = idx + 1;
					self.phase = if next as usize == REST.len() {
						self.scratch.clear();
						Phase::VersionToken
					} else {
						Phase::VersionLiteral(next)
					};
				} else {
					self.phase = Self::start_transition(byte);
				}
				Ok(None)
			},
			Phase::VersionToken => match byte {
				b'\r' => {
					trim_spaces(&mut self.scratch);
					self.phase = Phase::ExpectLf(ResponseKind::Version);
					Ok(None)
				},
				_ => {
					self.scratch.push(byte);
					Ok(None)
				},
			},
			Phase::VaLen { acc, has_digit } => match byte {
				b'0'..=b'9' => {
					let digit = u64::from(byte - b'0');
					self.phase = Phase::VaLen { acc: acc.wrapping_mul(10).wrapping_add(digit), has_digit: true };
					Ok(None)
				},
				b' ' if !has_digit => Ok(None),
				b' ' => {
					self.expected_len = acc as usize;
					self.phase = Phase::VaAwaitCr;
					Ok(None)
				},
				_ => Err(ParseError("not a VA number")),
			},
			Phase::VaAwaitCr => match byte {
				b'\r' => {
					self.phase = Phase::VaAwaitLf;
					Ok(None)
				},
				b' ' => Ok(None),
				_ => Err(ParseError("invalid CR state")),
			},
			Phase::VaAwaitLf => match byte {
				b'\n' => {
					self.scratch.clear();
					self.phase = if self.expected_len == 0 { Phase::VaBodyCr } else { Phase::VaBody };
					Ok(None)
				},
				_ => Err(ParseError("invalid LF state")),
			},
			Phase::VaBody => {
				self.scratch.push(byte);
				if self.scratch.len() == self.expected_len {
					self.phase = Phase::VaBodyCr;
				}
				Ok(None)
			},
			Phase::VaBodyCr => match byte {
				b'\r' => {
					self.phase = Phase::VaBodyLf;
					Ok(None)
				},
				_ => Err(ParseError("invalid CR state")),
			},
			Phase::VaBodyLf => match byte {
				b'\n' => {
					self.phase = Phase::Start;
					Ok(Some(ResponseKind::Va))
				},
				_ => Err(ParseError("invalid LF state")),
			},
			Phase::TailSkip(kind) => match byte {
				b'\r' => {
					self.phase = Phase::ExpectLf(kind);
					Ok(None)
				},
				_ => Ok(None),
			},
			Phase::ExpectLf(kind) => match byte {
				b'\n' => {
					self.phase = Phase::Start;
					Ok(Some(kind))
				},
				_ => Err(ParseError("invalid LF state")),
			},
		}
	}

	fn emit(&mut self, kind: ResponseKind, remaining_len: usize) {
		let mut response = Response { kind: Some(kind), remaining_len, ..Response::default() };
		match kind {
			ResponseKind::Version => response.string = std::mem::take(&mut self.scratch),
			ResponseKind::Va => response.data = std::mem::take(&mut self.scratch),
			ResponseKind::Hd | ResponseKind::Ns | ResponseKind::Ex | ResponseKind::Nf => {},
		}
		self.expected_len = 0;
		self.queue.push_back(response);
	}
}

impl Default for Parser {
	fn default() -> Self {
		Self::new()
	}
}

fn trim_spaces(buf: &mut Vec<u8>) {
	let start = buf.iter().position(|&b| b != b' ').unwrap_or(buf.len());
	let end = buf.iter().rposition(|&b| b != b' ').map_or(start, |p| p + 1);
	buf.drain(end..);
	buf.drain(..start);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn version_simple() {
		let mut p = Parser::new();
		assert_eq!(p.get(), 0);
		p.handle(b"VERSION 123.abcd\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Version.code());
		assert_eq!(p.get_string(), b"123.abcd");
		assert_eq!(p.get_len(), 0);
	}

	#[test]
	fn version_split_byte_by_byte() {
		let mut p = Parser::new();
		for chunk in [&b"V"[..], b"E", b"R", b"SION", b"  ", b"11.2", b"2\r", b"\nabcd"] {
			p.handle(chunk).unwrap();
		}
		assert_eq!(p.get(), ResponseKind::Version.code());
		assert_eq!(p.get_string(), b"11.22");
		assert_eq!(p.get_len(), 4);
	}

	#[test]
	fn version_missing_value_is_empty_string() {
		let mut p = Parser::new();
		p.handle(b"VERSION\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Version.code());
		assert_eq!(p.get_string(), b"");
		assert_eq!(p.get_len(), 0);
	}

	#[test]
	fn version_split_with_empty_chunk() {
		let mut p = Parser::new();
		p.handle(b"VERSION").unwrap();
		p.handle(b"").unwrap();
		p.handle(b"   123\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Version.code());
		assert_eq!(p.get_string(), b"123");
	}

	#[test]
	fn no_lf_after_cr_errors() {
		let mut p = Parser::new();
		p.handle(b"VERSION").unwrap();
		let err = p.handle(b"   123\ra").unwrap_err();
		assert_eq!(err.message(), "invalid LF state");
	}

	#[test]
	fn va_basic() {
		let mut p = Parser::new();
		p.handle(b"VA 3\r\nABC\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Va.code());
		assert_eq!(p.get_data(), b"ABC");
		assert_eq!(p.get_len(), 0);
	}

	#[test]
	fn va_zero_length_body() {
		let mut p = Parser::new();
		p.handle(b"VA 0\r\n\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Va.code());
		assert_eq!(p.get_data(), b"");
	}

	#[test]
	fn va_split_mid_value() {
		let mut p = Parser::new();
		p.handle(b"VA 5\r\n").unwrap();
		assert_eq!(p.get(), 0);
		p.handle(b"ABCDE\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Va.code());
		assert_eq!(p.get_data(), b"ABCDE");
	}

	#[test]
	fn va_missing_cr_errors() {
		let mut p = Parser::new();
		let err = p.handle(b"VA 2\r\nAAB\n").unwrap_err();
		assert_eq!(err.message(), "invalid CR state");
	}

	#[test]
	fn va_missing_lf_errors() {
		let mut p = Parser::new();
		let err = p.handle(b"VA 2\r\nAA\rA").unwrap_err();
		assert_eq!(err.message(), "invalid LF state");
	}

	#[test]
	fn va_not_a_number_errors() {
		let mut p = Parser::new();
		let err = p.handle(b"VA A\r\n").unwrap_err();
		assert_eq!(err.message(), "not a VA number");
	}

	#[test]
	fn va_allows_extra_spaces_around_length() {
		let mut p = Parser::new();
		p.handle(b"VA    3  \r\nABC\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Va.code());
		assert_eq!(p.get_data(), b"ABC");
	}

	#[test]
	fn four_responses_packed_into_one_chunk() {
		let mut p = Parser::new();
		let first = &b"VA 3\r\nABC\r\n"[..];
		let second = &b"VA 2\r\nXX\r\n"[..];
		let third = &b"VA  1  \r\nY\r\n"[..];
		let fourth = &b"VERSION 123\r\n"[..];
		let mut all = Vec::new();
		all.extend_from_slice(first);
		all.extend_from_slice(second);
		all.extend_from_slice(third);
		all.extend_from_slice(fourth);
		p.handle(&all).unwrap();

		assert_eq!(p.get(), ResponseKind::Va.code());
		assert_eq!(p.get_len(), second.len() + third.len() + fourth.len());
		assert_eq!(p.get_data(), b"ABC");

		assert_eq!(p.get(), ResponseKind::Va.code());
		assert_eq!(p.get_len(), third.len() + fourth.len());
		assert_eq!(p.get_data(), b"XX");

		assert_eq!(p.get(), ResponseKind::Va.code());
		assert_eq!(p.get_len(), fourth.len());
		assert_eq!(p.get_data(), b"Y");

		assert_eq!(p.get(), ResponseKind::Version.code());
		assert_eq!(p.get_len(), 0);
		assert_eq!(p.get_string(), b"123");
	}

	#[test]
	fn fresh_parser_reports_empty_everything() {
		let mut p = Parser::new();
		assert_eq!(p.get_len(), 0);
		assert_eq!(p.get_data(), b"");
		assert_eq!(p.get_string(), b"");
	}

	#[test]
	fn hd_with_and_without_trailing_tokens() {
		let mut p = Parser::new();
		p.handle(b"HD abcd\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Hd.code());

		let mut p = Parser::new();
		p.handle(b"HD\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Hd.code());
	}

	#[test]
	fn hx_errors() {
		let mut p = Parser::new();
		let err = p.handle(b"HX\r\n").unwrap_err();
		assert_eq!(err.message(), "invalid character after H");
	}

	#[test]
	fn ns_and_nf() {
		let mut p = Parser::new();
		p.handle(b"NS abcd\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Ns.code());

		let mut p = Parser::new();
		p.handle(b"NF\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Nf.code());
	}

	#[test]
	fn nx_errors() {
		let mut p = Parser::new();
		let err = p.handle(b"NX\r\n").unwrap_err();
		assert_eq!(err.message(), "invalid character after N");
	}

	#[test]
	fn ex_and_es_error() {
		let mut p = Parser::new();
		p.handle(b"EX abcd\r\n").unwrap();
		assert_eq!(p.get(), ResponseKind::Ex.code());

		let mut p = Parser::new();
		let err = p.handle(b"ES abcd\r\n").unwrap_err();
		assert_eq!(err.message(), "invalid character after E");
	}

	#[test]
	fn split_at_every_byte_boundary_matches_single_chunk() {
		let data = b"VA 3\r\nABC\r\nVA 2\r\nXX\r\nVA  1  \r\nY\r\nVERSION 123\r\nHD ok\r\nNS no\r\nEX err\r\nNF miss\r\n";
		let mut whole = Parser::new();
		whole.handle(data).unwrap();
		let whole_responses: Vec<Response> = whole.drain().collect();

		let mut split = Parser::new();
		for byte in data {
			split.handle(std::slice::from_ref(byte)).unwrap();
		}
		let split_responses: Vec<Response> = split.drain().collect();

		assert_eq!(whole_responses.len(), split_responses.len());
		for (a, b) in whole_responses.iter().zip(&split_responses) {
			assert_eq!(a.kind(), b.kind());
			assert_eq!(a.string(), b.string());
			assert_eq!(a.data(), b.data());
		}
	}
}
