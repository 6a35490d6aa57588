//! Fixed-capacity staging buffer that serializes meta-protocol commands and
//! flushes them through a caller-supplied [`Writer`].

use std::fmt::Display;
use std::io;

use crate::error::FlushOutcome;

/// A byte sink that reports how many leading bytes it accepted.
///
/// Mirrors a raw `write(2)`-style call rather than `io::Write::write_all`:
/// a short return is not an error, it's backpressure, and the builder
/// compacts and retries around it. Any `FnMut(&[u8]) -> io::Result<usize>`
/// closure already implements this.
pub trait Writer {
	fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;
}

impl<F> Writer for F
where
	F: FnMut(&[u8]) -> io::Result<usize>,
{
	fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
		self(bytes)
	}
}

/// Adapts any [`std::io::Write`] into a [`Writer`] — `io::Write::write`
/// already returns the accepted-byte count the builder expects, so this is
/// a direct pass-through.
pub struct IoWriter<W>(pub W);

impl<W: io::Write> Writer for IoWriter<W> {
	fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
		self.0.write(bytes)
	}
}

/// Accumulates meta-protocol command images in a fixed-size buffer and
/// flushes through `writer` whenever the buffer fills before a command is
/// fully staged.
///
/// The buffer is never flushed simply because it reaches exact capacity —
/// only when more bytes need a place to go and none is left, matching the
/// "flush lazily, on overflow" contract observed in the builder's test
/// fixtures rather than an eager "flush the instant you're full" one.
pub struct Builder<W> {
	buf: Box<[u8]>,
	len: usize,
	writer: W,
	flush_count: u64,
}

impl<W: Writer> Builder<W> {
	/// `capacity` must be at least 1.
	pub fn new(writer: W, capacity: usize) -> Self {
		assert!(capacity > 0, "capacity must be at least 1");
		Self { buf: vec![0u8; capacity].into_boxed_slice(), len: 0, writer, flush_count: 0 }
	}

	/// Number of `writer` calls made since construction.
	pub fn flush_count(&self) -> u64 {
		self.flush_count
	}

	/// Stage `mg <key> [N<n> ]v\r\n`. `recache_ttl` is emitted as `N<n>` only
	/// when it is `Some` and strictly positive.
	pub fn add_mget(&mut self, key: &[u8], recache_ttl: Option<i64>) -> io::Result<FlushOutcome> {
		let mut image = Vec::with_capacity(key.len() + 16);
		image.extend_from_slice(b"mg ");
		image.extend_from_slice(key);
		image.push(b' ');
		if let Some(n) = recache_ttl {
			if n > 0 {
				image.push(b'N');
				image.extend_from_slice(n.to_string().as_bytes());
				image.push(b' ');
			}
		}
		image.extend_from_slice(b"v\r\n");
		self.stage(&image)
	}

	/// Stage `ms <key> <len>[ C<cas>]\r\n<value>\r\n`.
	///
	/// `cas` is generic over `Display` rather than a fixed integer width so
	/// that a CAS token of any magnitude — beyond what `u64` represents —
	/// can be supplied verbatim. The token is emitted whenever `cas` is
	/// `Some`, including `Some(0)`.
	pub fn add_mset<C: Display>(&mut self, key: &[u8], value: &[u8], cas: Option<C>) -> io::Result<FlushOutcome> {
		let mut image = Vec::with_capacity(key.len() + value.len() + 32);
		image.extend_from_slice(b"ms ");
		image.extend_from_slice(key);
		image.push(b' ');
		image.extend_from_slice(value.len().to_string().as_bytes());
		if let Some(cas) = cas {
			image.extend_from_slice(b" C");
			image.extend_from_slice(cas.to_string().as_bytes());
		}
		image.extend_from_slice(b"\r\n");
		image.extend_from_slice(value);
		image.extend_from_slice(b"\r\n");
		self.stage(&image)
	}

	/// Stage `md <key>\r\n`.
	pub fn add_delete(&mut self, key: &[u8]) -> io::Result<FlushOutcome> {
		let mut image = Vec::with_capacity(key.len() + 6);
		image.extend_from_slice(b"md ");
		image.extend_from_slice(key);
		image.extend_from_slice(b"\r\n");
		self.stage(&image)
	}

	/// Stage `version\r\n`, the one command outside the `mg`/`ms`/`md` family.
	pub fn add_version(&mut self) -> io::Result<FlushOutcome> {
		self.stage(b"version\r\n")
	}

	/// Flush any staged bytes. A no-op, successful call if nothing is staged.
	pub fn finish(&mut self) -> io::Result<FlushOutcome> {
		self.flush_step()
	}

	fn stage(&mut self, mut bytes: &[u8]) -> io::Result<FlushOutcome> {
		let mut outcome = FlushOutcome::NotFlushed;
		while !bytes.is_empty() {
			if self.len == self.buf.len() {
				match self.flush_step()? {
					FlushOutcome::Flushed => outcome = FlushOutcome::Flushed,
					FlushOutcome::WriteStalled => return Ok(FlushOutcome::WriteStalled),
					FlushOutcome::NotFlushed => unreachable!("full buffer always has staged bytes"),
				}
			}
			let capacity_left = self.buf.len() - self.len;
			let take = capacity_left.min(bytes.len());
			self.buf[self.len..self.len + take].copy_from_slice(&bytes[..take]);
			self.len += take;
			bytes = &bytes[take..];
		}
		Ok(outcome)
	}

	/// Attempt exactly one `writer` call over the staged bytes, compacting
	/// any partially-accepted remainder to the front of the buffer.
	fn flush_step(&mut self) -> io::Result<FlushOutcome> {
		if self.len == 0 {
			return Ok(FlushOutcome::NotFlushed);
		}
		let written = self.writer.write(&self.buf[..self.len])?;
		self.flush_count += 1;
		if written == 0 {
			return Ok(FlushOutcome::WriteStalled);
		}
		if written < self.len {
			self.buf.copy_within(written..self.len, 0);
		}
		self.len -= written;
		Ok(FlushOutcome::Flushed)
	}
}
