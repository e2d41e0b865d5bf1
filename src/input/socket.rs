//! Socket-backed input connection.

use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{InputConnection, closed_error};

enum Socket {
    Tcp(TcpStream),
    Unix(UnixStream),
}

/// Input connection reading straight from a socket.
///
/// Closing shuts the socket down in both directions, which also wakes a
/// reader blocked on another thread.
pub struct SocketInput {
    socket: Socket,
    closed: AtomicBool,
}

impl SocketInput {
    pub fn tcp(stream: TcpStream) -> Self {
        Self {
            socket: Socket::Tcp(stream),
            closed: AtomicBool::new(false),
        }
    }

    pub fn unix(stream: UnixStream) -> Self {
        Self {
            socket: Socket::Unix(stream),
            closed: AtomicBool::new(false),
        }
    }

    /// Set the read timeout of the underlying socket.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match &self.socket {
            Socket::Tcp(s) => s.set_read_timeout(timeout),
            Socket::Unix(s) => s.set_read_timeout(timeout),
        }
    }
}

impl From<TcpStream> for SocketInput {
    fn from(stream: TcpStream) -> Self {
        Self::tcp(stream)
    }
}

impl From<UnixStream> for SocketInput {
    fn from(stream: UnixStream) -> Self {
        Self::unix(stream)
    }
}

impl InputConnection for SocketInput {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(closed_error());
        }
        match &self.socket {
            Socket::Tcp(s) => (&*s).read(buf),
            Socket::Unix(s) => (&*s).read(buf),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = match &self.socket {
            Socket::Tcp(s) => s.shutdown(Shutdown::Both),
            Socket::Unix(s) => s.shutdown(Shutdown::Both),
        };
        match result {
            // Peer already went away
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unix_pair() {
        let (mut tx, rx) = UnixStream::pair().unwrap();
        tx.write_all(b"hello").unwrap();
        drop(tx);

        let input = SocketInput::from(rx);
        let mut buf = [0u8; 16];
        let n = input.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(input.skip(u64::MAX).unwrap(), 0);

        input.close().unwrap();
        input.close().unwrap();
        assert!(input.is_closed());
        assert!(input.read(&mut buf).is_err());
    }

    #[test]
    fn test_close_wakes_blocked_reader() {
        let (_tx, rx) = UnixStream::pair().unwrap();
        let input = std::sync::Arc::new(SocketInput::from(rx));
        let reader = std::sync::Arc::clone(&input);
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 4];
            reader.read(&mut buf)
        });
        std::thread::sleep(Duration::from_millis(50));
        input.close().unwrap();
        // Shutdown turns a blocked read into end of stream
        match handle.join().unwrap() {
            Ok(0) => {}
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
            other => panic!("unexpected read result: {other:?}"),
        }
    }
}
