use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Outcome of a bounded [`Transport::read`] call.
#[derive(Debug)]
pub enum ReadOutcome {
    /// `n` bytes were read into the caller's buffer.
    Read(usize),
    /// The read timed out before any byte arrived; not an error, used by
    /// the yield loop (§4.G) to poll without blocking forever.
    NothingToRead,
}

/// Uniform blocking byte-stream transport with millisecond timeouts (§4.B,
/// §6 "Transport collaborator").
///
/// The client core never names `TcpStream` directly outside
/// [`TcpTransport`]; a TLS collaborator implements this trait the same way.
pub trait Transport: Send + Sized {
    fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<Self>;
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome>;
    fn write(&mut self, buf: &[u8], timeout: Duration) -> io::Result<usize>;
    fn disconnect(&mut self) -> io::Result<()>;
    fn is_connected(&self) -> bool;
}

/// Default transport: a blocking [`TcpStream`] with read/write timeouts,
/// matching the non-TLS path `HAL_OS_linux.c` takes in the original.
pub struct TcpTransport {
    stream: TcpStream,
    connected: bool,
}

impl Transport for TcpTransport {
    fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no address resolved"))?;
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true)?;
        Ok(TcpTransport {
            stream,
            connected: true,
        })
    }
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome> {
        self.stream.set_read_timeout(Some(timeout))?;
        match self.stream.read(buf) {
            Ok(0) => {
                self.connected = false;
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed connection"))
            }
            Ok(n) => Ok(ReadOutcome::Read(n)),
            Err(ref err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(ReadOutcome::NothingToRead)
            }
            Err(err) => {
                self.connected = false;
                Err(err)
            }
        }
    }

    fn write(&mut self, buf: &[u8], timeout: Duration) -> io::Result<usize> {
        self.stream.set_write_timeout(Some(timeout))?;
        match self.stream.write(buf) {
            Ok(n) => Ok(n),
            Err(err) => {
                self.connected = false;
                Err(err)
            }
        }
    }

    fn disconnect(&mut self) -> io::Result<()> {
        self.connected = false;
        self.stream.shutdown(std::net::Shutdown::Both)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
