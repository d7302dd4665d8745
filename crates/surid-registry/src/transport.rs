//! RegistryTransport trait and the TCP transport. The trait seam enables
//! mock injection for testing, the same way the host boundary is mocked.

use std::io::{BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::RegistryError;
use crate::resp::{Reply, encode_command, read_reply};

/// Per-call IO bound so a slow or dead registry cannot stall the
/// surface-assignment path indefinitely.
pub const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport over which registry commands travel.
pub trait RegistryTransport {
    fn command(&mut self, args: &[&str]) -> Result<Reply, RegistryError>;
}

/// Real transport: one TCP connection speaking RESP, with connect, read,
/// and write all bounded by [`IO_TIMEOUT`].
pub struct TcpTransport {
    reader: BufReader<TcpStream>,
}

impl TcpTransport {
    pub fn connect(host: &str, port: u16) -> Result<Self, RegistryError> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| RegistryError::Unresolvable(format!("{host}:{port}")))?;
        let stream = TcpStream::connect_timeout(&addr, IO_TIMEOUT)?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        Ok(Self {
            reader: BufReader::new(stream),
        })
    }
}

impl RegistryTransport for TcpTransport {
    fn command(&mut self, args: &[&str]) -> Result<Reply, RegistryError> {
        let request = encode_command(args);
        self.reader.get_mut().write_all(&request)?;
        read_reply(&mut self.reader)
    }
}
