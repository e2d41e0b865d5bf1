//! In-memory input connection.

use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{InputConnection, closed_error};

/// Input connection over a fully buffered body.
///
/// Counts how many times [`close`](InputConnection::close) was called, which
/// makes it handy for checking release behaviour.
#[derive(Debug)]
pub struct BytesInput {
    cursor: Mutex<Cursor<Vec<u8>>>,
    closed: AtomicBool,
    close_count: AtomicUsize,
}

impl BytesInput {
    /// Create an open connection over `data`.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            cursor: Mutex::new(Cursor::new(data.into())),
            closed: AtomicBool::new(false),
            close_count: AtomicUsize::new(0),
        }
    }

    /// Number of bytes not read yet.
    pub fn remaining(&self) -> usize {
        let cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let len = cursor.get_ref().len() as u64;
        usize::try_from(len.saturating_sub(cursor.position())).unwrap_or(usize::MAX)
    }

    /// Number of times `close` was called, including redundant calls.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::Acquire)
    }
}

impl InputConnection for BytesInput {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(closed_error());
        }
        self.cursor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read(buf)
    }

    fn skip(&self, n: u64) -> io::Result<u64> {
        if self.is_closed() {
            return Err(closed_error());
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let len = cursor.get_ref().len() as u64;
        let position = cursor.position().min(len);
        let skipped = n.min(len - position);
        cursor.set_position(position + skipped);
        Ok(skipped)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> io::Result<()> {
        self.close_count.fetch_add(1, Ordering::AcqRel);
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
