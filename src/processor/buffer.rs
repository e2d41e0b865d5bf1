//! Read buffer shared by the built-in processors.

use std::io;

use crate::error::{Error, Result};
use crate::input::InputConnection;

const MIN_CAPACITY: usize = 64;

/// Upper bound for a single length-prefixed value or line.
const MAX_VALUE_LEN: usize = 1 << 30;

/// Growable buffer that pulls bytes from an input connection on demand.
#[derive(Debug)]
pub(crate) struct ReadBuffer {
    buf: Vec<u8>,
    pos: usize,
    end: usize,
    eof: bool,
    max_len: usize,
}

impl ReadBuffer {
    pub fn new(capacity: usize) -> Self {
        Self::with_limit(capacity, MAX_VALUE_LEN)
    }

    /// Buffer refusing values and lines longer than `max_len` bytes.
    pub fn with_limit(capacity: usize, max_len: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(MIN_CAPACITY)],
            pos: 0,
            end: 0,
            eof: false,
            max_len,
        }
    }

    /// Pull more bytes. Returns false once the input is exhausted.
    fn fill(&mut self, input: &dyn InputConnection) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.end, 0);
            self.end -= self.pos;
            self.pos = 0;
        }
        if self.end == self.buf.len() {
            let len = self.buf.len() * 2;
            self.buf.resize(len, 0);
        }
        loop {
            match input.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.end += n;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Make at least `n` bytes available. Returns false if the input ends first.
    fn ensure(&mut self, input: &dyn InputConnection, n: usize) -> Result<bool> {
        while self.end - self.pos < n {
            if !self.fill(input)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Returns true if at least one more byte can be read.
    pub fn has_data(&mut self, input: &dyn InputConnection) -> Result<bool> {
        self.ensure(input, 1)
    }

    /// Consume exactly `n` bytes.
    pub fn take(&mut self, input: &dyn InputConnection, n: usize) -> Result<&[u8]> {
        if n > self.max_len {
            return Err(Error::Protocol(format!("value too long: {} bytes", n)));
        }
        if !self.ensure(input, n)? {
            return Err(Error::Protocol(format!(
                "unexpected end of stream: need {} bytes, {} available",
                n,
                self.end - self.pos
            )));
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..start + n])
    }

    pub fn read_u8(&mut self, input: &dyn InputConnection) -> Result<u8> {
        Ok(self.take(input, 1)?[0])
    }

    /// Read an unsigned LEB128 integer.
    pub fn read_varint(&mut self, input: &dyn InputConnection) -> Result<u64> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = self.read_u8(input)?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::Protocol("varint longer than 10 bytes".into()))
    }

    /// Read a LEB128 length followed by that many bytes.
    pub fn read_prefixed(&mut self, input: &dyn InputConnection) -> Result<&[u8]> {
        let len = self.read_varint(input)?;
        let len = usize::try_from(len)
            .map_err(|_| Error::Protocol(format!("value too long: {} bytes", len)))?;
        self.take(input, len)
    }

    /// Read a line without its trailing `\n`.
    ///
    /// Returns `None` at end of stream. A final line without terminator is returned as is.
    pub fn read_line(&mut self, input: &dyn InputConnection) -> Result<Option<&[u8]>> {
        let mut scanned = 0;
        loop {
            if let Some(i) = memchr::memchr(b'\n', &self.buf[self.pos + scanned..self.end]) {
                let start = self.pos;
                let line_end = start + scanned + i;
                self.pos = line_end + 1;
                return Ok(Some(&self.buf[start..line_end]));
            }
            scanned = self.end - self.pos;
            if scanned > self.max_len {
                return Err(Error::Protocol(format!(
                    "line longer than {} bytes",
                    self.max_len
                )));
            }
            if !self.fill(input)? {
                if self.pos == self.end {
                    return Ok(None);
                }
                let start = self.pos;
                self.pos = self.end;
                return Ok(Some(&self.buf[start..self.end]));
            }
        }
    }
}
