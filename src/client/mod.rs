//! Client handles and pipelines bound to a process-wide connection pool.

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use log::{debug, trace};
use once_cell::sync::Lazy;

use crate::builder::{Builder, Writer};
use crate::error::{FlushOutcome, ParseError};
use crate::parser::Parser;
use crate::pool::Pool;
use crate::response::ResponseKind;

/// Default staging-buffer capacity for a [`Client`]'s [`Builder`], matching
/// the typical `1024` used in the wire-format examples.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Anything a [`Client`] can be opened over.
///
/// Blanket-implemented for any type that is already `Read + Write + Send`,
/// so a `TcpStream`, `UnixStream`, or a test double all qualify without
/// writing the impl by hand.
pub trait Socket: Read + Write + Send {}
impl<T: Read + Write + Send> Socket for T {}

type PooledSocket = Arc<Mutex<dyn Socket + Send>>;

/// The process-wide registry of live connections backing every [`Client`].
///
/// A single lazily-initialized mutex is sufficient — opens and closes are
/// not hot paths (§5 of the connection-pool contract this mirrors).
static CLIENT_POOL: Lazy<Mutex<Pool<PooledSocket>>> = Lazy::new(|| Mutex::new(Pool::new()));

/// Snapshot of which pool slots are currently occupied, in index order.
pub fn pool_occupied_slots() -> Vec<bool> {
	CLIENT_POOL.lock().unwrap().slots().iter().map(Option::is_some).collect()
}

/// Snapshot of the pool's free-index list.
pub fn pool_free_indices() -> Vec<usize> {
	CLIENT_POOL.lock().unwrap().free_indices().to_vec()
}

/// Adapts a pooled, type-erased socket into a [`Writer`] for the builder.
struct SocketWriter(PooledSocket);

impl Writer for SocketWriter {
	fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
		self.0.lock().unwrap().write(bytes)
	}
}

struct Inner {
	socket: PooledSocket,
	builder: Builder<SocketWriter>,
	parser: Parser,
	index: usize,
}

impl Drop for Inner {
	fn drop(&mut self) {
		CLIENT_POOL.lock().unwrap().remove(self.index);
		trace!("released pool slot {}", self.index);
	}
}

fn open_socket(socket: Arc<Mutex<impl Socket + 'static>>, capacity: usize) -> Rc<RefCell<Inner>> {
	let erased: PooledSocket = socket;
	let index = CLIENT_POOL.lock().unwrap().insert(Arc::clone(&erased));
	debug!("opened client at pool slot {index}");
	let builder = Builder::new(SocketWriter(Arc::clone(&erased)), capacity);
	Rc::new(RefCell::new(Inner { socket: erased, builder, parser: Parser::new(), index }))
}

/// An open connection: an opaque socket plus the [`Builder`] and [`Parser`]
/// bound to it.
///
/// Cheap to clone its lifetime via [`Client::pipeline`] — both handles share
/// the same underlying state and the pool slot is released only when the
/// last of them is dropped.
pub struct Client {
	inner: Rc<RefCell<Inner>>,
}

/// A second handle onto a [`Client`]'s builder, for batching commands from
/// a different scope without re-opening the connection.
pub struct Pipeline {
	inner: Rc<RefCell<Inner>>,
}

impl Client {
	/// Open a client over an already-connected socket, using
	/// [`DEFAULT_BUFFER_CAPACITY`].
	pub fn open<S: Socket + 'static>(socket: S) -> Self {
		Self::open_with_capacity(socket, DEFAULT_BUFFER_CAPACITY)
	}

	/// Open a client over an already-connected socket with an explicit
	/// staging-buffer capacity.
	pub fn open_with_capacity<S: Socket + 'static>(socket: S, capacity: usize) -> Self {
		Self { inner: open_socket(Arc::new(Mutex::new(socket)), capacity) }
	}

	/// Open a client by calling a nullary factory to produce the socket.
	///
	/// Distinct from [`Client::open`] (rather than one overloaded entry
	/// point) because a single trait spanning both `S` and `FnOnce() -> S`
	/// would require a blanket impl that the compiler cannot prove doesn't
	/// overlap with itself.
	pub fn open_with<S, F>(factory: F) -> Self
	where
		S: Socket + 'static,
		F: FnOnce() -> S,
	{
		Self::open_with_capacity(factory(), DEFAULT_BUFFER_CAPACITY)
	}

	/// A pipeline sharing this client's builder and parser state.
	pub fn pipeline(&self) -> Pipeline {
		Pipeline { inner: Rc::clone(&self.inner) }
	}

	/// The pool index this client currently occupies.
	pub fn slot_index(&self) -> usize {
		self.inner.borrow().index
	}

	pub fn add_mget(&self, key: &[u8], recache_ttl: Option<i64>) -> io::Result<FlushOutcome> {
		add_mget(&self.inner, key, recache_ttl)
	}

	pub fn add_mset<C: std::fmt::Display>(&self, key: &[u8], value: &[u8], cas: Option<C>) -> io::Result<FlushOutcome> {
		add_mset(&self.inner, key, value, cas)
	}

	pub fn add_delete(&self, key: &[u8]) -> io::Result<FlushOutcome> {
		add_delete(&self.inner, key)
	}

	pub fn finish(&self) -> io::Result<FlushOutcome> {
		finish(&self.inner)
	}

	/// Feed bytes read from the socket to the parser.
	pub fn feed(&self, chunk: &[u8]) -> Result<(), ParseError> {
		feed(&self.inner, chunk)
	}

	pub fn get(&self) -> u8 {
		get(&self.inner)
	}

	pub fn get_string(&self) -> Vec<u8> {
		get_string(&self.inner)
	}

	pub fn get_data(&self) -> Vec<u8> {
		get_data(&self.inner)
	}

	pub fn get_len(&self) -> usize {
		get_len(&self.inner)
	}

	/// Issue `version\r\n` and block until a `VERSION` record arrives,
	/// returning its decoded token.
	///
	/// The only operation in this crate that reads from the socket itself —
	/// everywhere else, ingress bytes are handed to [`Client::feed`] by the
	/// embedder's own read loop.
	pub fn version(&self) -> io::Result<Vec<u8>> {
		{
			let mut inner = self.inner.borrow_mut();
			inner.builder.add_version()?;
			inner.builder.finish()?;
		}
		let socket = Arc::clone(&self.inner.borrow().socket);
		let mut buf = [0u8; 256];
		loop {
			let n = socket.lock().unwrap().read(&mut buf)?;
			if n == 0 {
				return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed while awaiting VERSION"));
			}
			let mut inner = self.inner.borrow_mut();
			inner.parser.handle(&buf[..n]).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
			loop {
				match inner.parser.get() {
					0 => break,
					code if code == ResponseKind::Version.code() => return Ok(inner.parser.get_string().to_vec()),
					_ => {},
				}
			}
		}
	}
}

impl Pipeline {
	pub fn add_mget(&self, key: &[u8], recache_ttl: Option<i64>) -> io::Result<FlushOutcome> {
		add_mget(&self.inner, key, recache_ttl)
	}

	pub fn add_mset<C: std::fmt::Display>(&self, key: &[u8], value: &[u8], cas: Option<C>) -> io::Result<FlushOutcome> {
		add_mset(&self.inner, key, value, cas)
	}

	pub fn add_delete(&self, key: &[u8]) -> io::Result<FlushOutcome> {
		add_delete(&self.inner, key)
	}

	pub fn finish(&self) -> io::Result<FlushOutcome> {
		finish(&self.inner)
	}

	pub fn feed(&self, chunk: &[u8]) -> Result<(), ParseError> {
		feed(&self.inner, chunk)
	}

	pub fn get(&self) -> u8 {
		get(&self.inner)
	}

	pub fn get_string(&self) -> Vec<u8> {
		get_string(&self.inner)
	}

	pub fn get_data(&self) -> Vec<u8> {
		get_data(&self.inner)
	}

	pub fn get_len(&self) -> usize {
		get_len(&self.inner)
	}
}

fn add_mget(inner: &Rc<RefCell<Inner>>, key: &[u8], recache_ttl: Option<i64>) -> io::Result<FlushOutcome> {
	inner.borrow_mut().builder.add_mget(key, recache_ttl)
}

fn add_mset<C: std::fmt::Display>(inner: &Rc<RefCell<Inner>>, key: &[u8], value: &[u8], cas: Option<C>) -> io::Result<FlushOutcome> {
	inner.borrow_mut().builder.add_mset(key, value, cas)
}

fn add_delete(inner: &Rc<RefCell<Inner>>, key: &[u8]) -> io::Result<FlushOutcome> {
	inner.borrow_mut().builder.add_delete(key)
}

fn finish(inner: &Rc<RefCell<Inner>>) -> io::Result<FlushOutcome> {
	inner.borrow_mut().builder.finish()
}

fn feed(inner: &Rc<RefCell<Inner>>, chunk: &[u8]) -> Result<(), ParseError> {
	inner.borrow_mut().parser.handle(chunk)
}

fn get(inner: &Rc<RefCell<Inner>>) -> u8 {
	inner.borrow_mut().parser.get()
}

fn get_string(inner: &Rc<RefCell<Inner>>) -> Vec<u8> {
	inner.borrow().parser.get_string().to_vec()
}

fn get_data(inner: &Rc<RefCell<Inner>>) -> Vec<u8> {
	inner.borrow().parser.get_data().to_vec()
}

fn get_len(inner: &Rc<RefCell<Inner>>) -> usize {
	inner.borrow().parser.get_len()
}
