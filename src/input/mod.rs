//! Byte-level input connections a response is read from.
//!
//! All operations take `&self` so that one thread may close a connection
//! while another is reading from it. What happens to the in-flight read is
//! up to the transport.

mod bytes;
mod reader;
mod socket;

use std::io::{self, Read};
use std::sync::Arc;

pub use bytes::BytesInput;
pub use reader::ReaderInput;
pub use socket::SocketInput;

/// Chunk size used when skipping by reading and discarding.
const SKIP_CHUNK: usize = 8192;

/// A closable byte source.
pub trait InputConnection: Send + Sync {
    /// Read into `buf`, returning the number of bytes read. `Ok(0)` is end of stream.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard up to `n` bytes, returning how many were discarded.
    ///
    /// Stops early at end of stream.
    fn skip(&self, n: u64) -> io::Result<u64> {
        let mut chunk = [0u8; SKIP_CHUNK];
        let mut skipped = 0u64;
        while skipped < n {
            let want = usize::try_from(n - skipped).map_or(SKIP_CHUNK, |r| r.min(SKIP_CHUNK));
            match self.read(&mut chunk[..want]) {
                Ok(0) => break,
                Ok(len) => skipped += len as u64,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(skipped)
    }

    /// Whether the connection has been closed.
    fn is_closed(&self) -> bool;

    /// Close the connection. Closing an already closed connection should be a no-op,
    /// but callers must not rely on it.
    fn close(&self) -> io::Result<()>;
}

impl<T: InputConnection + ?Sized> InputConnection for Box<T> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn skip(&self, n: u64) -> io::Result<u64> {
        (**self).skip(n)
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }
}

impl<T: InputConnection + ?Sized> InputConnection for Arc<T> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn skip(&self, n: u64) -> io::Result<u64> {
        (**self).skip(n)
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }
}

/// `std::io::Read` adapter over a borrowed connection.
pub struct ConnectionReader<'a> {
    input: &'a dyn InputConnection,
}

impl<'a> ConnectionReader<'a> {
    /// Wrap a connection.
    pub fn new(input: &'a dyn InputConnection) -> Self {
        Self { input }
    }

    /// The wrapped connection.
    pub fn get_ref(&self) -> &'a dyn InputConnection {
        self.input
    }
}

impl Read for ConnectionReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

/// Error returned by reads on a closed connection.
pub(crate) fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "input connection is closed")
}
