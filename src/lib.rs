//! Client core for a memcached-compatible server speaking the "meta" text
//! protocol (`mg`/`ms`/`md`; responses `VA`/`HD`/`NS`/`EX`/`NF`/`VERSION`).
//!
//! This crate is the mechanical core only: it formats and parses bytes. It
//! does not open sockets, resolve DNS, negotiate TLS, or retry anything —
//! the embedder drives a [`client::Client`] with its own I/O loop, handing
//! inbound bytes to [`client::Client::feed`] and letting outbound commands
//! flow through [`builder::Builder`]'s [`builder::Writer`] capability.
//!
//! The three subsystems that matter:
//!
//! - [`pool`] — a dense, index-addressed registry with free-list recycling,
//!   used to back the process-wide table of open connections.
//! - [`builder`] — formats `mg`/`ms`/`md`/`version` commands into a
//!   fixed-capacity staging buffer and flushes it through a caller-supplied
//!   [`builder::Writer`], splitting oversize commands across multiple
//!   writes.
//! - [`parser`] — an incremental, zero-lookahead state machine that turns
//!   arbitrary byte chunks into a FIFO of typed [`response::Response`]
//!   records.
//!
//! [`client`] binds the three together into [`client::Client`] and
//! [`client::Pipeline`] handles over the process-wide connection pool.

pub mod builder;
pub mod client;
pub mod error;
pub mod parser;
pub mod pool;
pub mod response;

pub use builder::{Builder, IoWriter, Writer};
pub use client::{Client, Pipeline, Socket};
pub use error::{FlushOutcome, ParseError};
pub use parser::Parser;
pub use pool::Pool;
pub use response::{Response, ResponseKind};
