//! Input connection over any `Read` implementation.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{InputConnection, closed_error};

/// Wraps a reader such as an HTTP response body.
///
/// Closing drops the reader. A close issued while another thread is inside
/// `read` waits for that read to return.
pub struct ReaderInput<R> {
    reader: Mutex<Option<R>>,
    closed: AtomicBool,
}

impl<R: Read + Send> ReaderInput<R> {
    /// Wrap an open reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            closed: AtomicBool::new(false),
        }
    }
}

impl<R: Read + Send> InputConnection for ReaderInput<R> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(closed_error());
        }
        match self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            Some(reader) => reader.read(buf),
            None => Err(closed_error()),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> io::Result<()> {
        self.closed.store(true, Ordering::Release);
        drop(
            self.reader
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        Ok(())
    }
}
