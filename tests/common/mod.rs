//! Test utilities for zero-stream integration tests.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zero_stream::{
    Column, Config, CreateError, Error, InputConnection, Processor, ProcessorFactory, Settings,
};

/// An in-memory connection whose operations can be made to fail.
pub struct FaultyInput {
    data: Mutex<io::Cursor<Vec<u8>>>,
    closed: AtomicBool,
    fail_read: bool,
    fail_skip: bool,
    fail_close: bool,
    skip_delay: Option<Duration>,
    skip_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl FaultyInput {
    /// Create a connection over `data` that behaves normally.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Mutex::new(io::Cursor::new(data.into())),
            closed: AtomicBool::new(false),
            fail_read: false,
            fail_skip: false,
            fail_close: false,
            skip_delay: None,
            skip_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Every read fails with `ConnectionReset`.
    pub fn failing_read(mut self) -> Self {
        self.fail_read = true;
        self
    }

    /// Every skip fails with `TimedOut`.
    pub fn failing_skip(mut self) -> Self {
        self.fail_skip = true;
        self
    }

    /// Close fails with `BrokenPipe`, leaving the connection open.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Skip sleeps before draining, to widen race windows.
    pub fn slow_skip(mut self, delay: Duration) -> Self {
        self.skip_delay = Some(delay);
        self
    }

    pub fn skip_calls(&self) -> usize {
        self.skip_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl InputConnection for FaultyInput {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_read {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "read failed"));
        }
        if self.is_closed() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        self.data.lock().unwrap().read(buf)
    }

    fn skip(&self, n: u64) -> io::Result<u64> {
        self.skip_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.skip_delay {
            std::thread::sleep(delay);
        }
        if self.fail_skip {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "skip timed out"));
        }
        let mut data = self.data.lock().unwrap();
        let len = data.get_ref().len() as u64;
        let skipped = n.min(len - data.position());
        let position = data.position() + skipped;
        data.set_position(position);
        Ok(skipped)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) -> io::Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "close failed"));
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A factory that never binds, handing the connection back.
pub struct RejectingFactory;

impl ProcessorFactory for RejectingFactory {
    fn create(
        &self,
        _config: &Config,
        input: Box<dyn InputConnection>,
        _settings: &Settings,
        _columns: Option<Vec<Column>>,
    ) -> Result<Box<dyn Processor>, CreateError> {
        Err(CreateError::new(
            Error::Protocol("malformed response metadata".into()),
            input,
        ))
    }
}

/// Shared handle to a connection that is also given to a response.
pub fn shared<T: InputConnection>(input: T) -> Arc<T> {
    Arc::new(input)
}
