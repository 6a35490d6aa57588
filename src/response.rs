//! Response records emitted by the [`parser`](crate::parser) state machine.

/// Tag identifying which kind of response a [`Response`] carries.
///
/// The numeric values are part of the wire-level contract (`get()` returns
/// the bare code, `0` meaning "no response ready").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseKind {
	Version = 1,
	Va = 2,
	Hd = 3,
	Ns = 4,
	Ex = 5,
	Nf = 6,
}

impl ResponseKind {
	pub fn code(self) -> u8 {
		self as u8
	}
}

/// A single parsed response.
///
/// `string` is only meaningful for [`ResponseKind::Version`] (the version
/// token); `data` is only meaningful for [`ResponseKind::Va`] (the value
/// payload). Other kinds carry neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
	pub(crate) kind: Option<ResponseKind>,
	pub(crate) string: Vec<u8>,
	pub(crate) data: Vec<u8>,
	/// Bytes of the `handle()` input that remained unconsumed the moment
	/// this response completed. See `Parser::get_len`.
	pub(crate) remaining_len: usize,
}

impl Response {
	pub fn kind(&self) -> Option<ResponseKind> {
		self.kind
	}

	pub fn string(&self) -> &[u8] {
		&self.string
	}

	pub fn data(&self) -> &[u8] {
		&self.data
	}

	pub fn remaining_len(&self) -> usize {
		self.remaining_len
	}
}
