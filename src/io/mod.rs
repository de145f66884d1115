//! Blocking byte-stream transport with readiness polling.
//!
//! No async runtime is involved anywhere in this module: [`Transport::recv`] and
//! [`Transport::flush`] block the calling thread, using [`mio`]'s readiness poll to
//! wait for the socket to become read/write-ready rather than busy-spinning.
#[cfg(feature = "tls")]
pub mod tls;

use std::{
    io::{self, Read, Write},
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

use bytes::{Buf, BufMut, BytesMut};
use mio::{Events, Interest, Poll, Token};

use crate::{
    common::verbose,
    error::{ClientError, Error, Result},
    options::Endpoint,
    protocol::{backend::BackendProtocol, frontend::FrontendProtocol},
};

const TOKEN: Token = Token(0);
const READ_CHUNK: usize = 16 * 1024;

/// What a caller wants to wait for from [`poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Want {
    Read,
    Write,
    Both,
}

impl Want {
    fn interest(self) -> Interest {
        match self {
            Want::Read => Interest::READABLE,
            Want::Write => Interest::WRITABLE,
            Want::Both => Interest::READABLE.add(Interest::WRITABLE),
        }
    }
}

/// Readiness flags returned by [`poll`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ready {
    pub readable: bool,
    pub writable: bool,
}

pub(crate) enum Socket {
    Tcp(mio::net::TcpStream),
    #[cfg(unix)]
    Uds(mio::net::UnixStream),
}

impl Socket {
    fn as_source(&mut self) -> &mut dyn mio::event::Source {
        match self {
            Socket::Tcp(s) => s,
            #[cfg(unix)]
            Socket::Uds(s) => s,
        }
    }
}

impl Read for Socket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Socket::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Socket::Uds(s) => s.read(buf),
        }
    }
}

impl Write for Socket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Socket::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Socket::Uds(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Socket::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Socket::Uds(s) => s.flush(),
        }
    }
}

/// The raw channel underneath a [`Transport`]: plaintext, or TLS-wrapped after a
/// successful `SSLRequest` negotiation (see [`tls::negotiate`]).
enum Channel {
    Plain(Socket),
    #[cfg(feature = "tls")]
    Tls(Box<rustls::StreamOwned<rustls::ClientConnection, Socket>>),
    /// Transient placeholder used only while swapping `Plain` for `Tls` in place.
    Closed,
}

impl Channel {
    fn as_source(&mut self) -> &mut dyn mio::event::Source {
        match self {
            Channel::Plain(s) => s.as_source(),
            #[cfg(feature = "tls")]
            Channel::Tls(s) => s.sock.as_source(),
            Channel::Closed => unreachable!("transport used after close"),
        }
    }
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Channel::Plain(s) => s.read(buf),
            #[cfg(feature = "tls")]
            Channel::Tls(s) => s.read(buf),
            Channel::Closed => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }
}

impl Write for Channel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Channel::Plain(s) => s.write(buf),
            #[cfg(feature = "tls")]
            Channel::Tls(s) => s.write(buf),
            Channel::Closed => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Channel::Plain(s) => s.flush(),
            #[cfg(feature = "tls")]
            Channel::Tls(s) => s.flush(),
            Channel::Closed => Ok(()),
        }
    }
}

/// A buffered, blocking PostgreSQL byte-stream transport.
pub struct Transport {
    channel: Channel,
    poll: Poll,
    events: Events,
    read_buf: BytesMut,
    write_buf: BytesMut,
}

impl Transport {
    pub fn connect(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<Self> {
        match endpoint {
            Endpoint::Net { host, address, port } => {
                let target = address.as_deref().or(host.as_deref()).expect("validated by Options");
                let addr = resolve(target, *port)?;
                let stream = std::net::TcpStream::connect(addr).map_err(Error::from)?;
                Self::from_tcp(stream, timeout)
            }
            #[cfg(unix)]
            Endpoint::Uds { directory, port } => {
                let path = format!("{directory}/.s.PGSQL.{port}");
                let stream = std::os::unix::net::UnixStream::connect(path).map_err(Error::from)?;
                Self::from_uds(stream, timeout)
            }
            #[cfg(not(unix))]
            Endpoint::Uds { .. } => Err(Error::client(ClientError::Generic(
                "unix-domain sockets are not supported on this platform".into(),
            ))),
        }
    }

    fn from_tcp(stream: std::net::TcpStream, timeout: Option<Duration>) -> Result<Self> {
        stream.set_nonblocking(true).map_err(Error::from)?;
        stream.set_nodelay(true).ok();
        Self::new(Socket::Tcp(mio::net::TcpStream::from_std(stream)), timeout)
    }

    #[cfg(unix)]
    fn from_uds(stream: std::os::unix::net::UnixStream, timeout: Option<Duration>) -> Result<Self> {
        stream.set_nonblocking(true).map_err(Error::from)?;
        Self::new(Socket::Uds(mio::net::UnixStream::from_std(stream)), timeout)
    }

    fn new(mut socket: Socket, timeout: Option<Duration>) -> Result<Self> {
        let poll = Poll::new().map_err(Error::from)?;
        poll.registry()
            .register(socket.as_source(), TOKEN, Interest::READABLE.add(Interest::WRITABLE))
            .map_err(Error::from)?;

        let mut transport = Self {
            channel: Channel::Plain(socket),
            poll,
            events: Events::with_capacity(8),
            read_buf: BytesMut::with_capacity(8 * 1024),
            write_buf: BytesMut::with_capacity(4 * 1024),
        };
        // A nonblocking connect(2) reports completion via writability; wait for it
        // (or the caller's connect_timeout) before proceeding to the startup phase.
        transport.wait(Want::Write, timeout)?;
        Ok(transport)
    }

    /// Swap the plaintext channel for a TLS-wrapped one after a successful
    /// `SSLRequest` negotiation. Registration with the readiness poll is untouched:
    /// the underlying file descriptor doesn't change.
    #[cfg(feature = "tls")]
    pub(crate) fn upgrade_to_tls(&mut self, conn: rustls::ClientConnection) {
        let Channel::Plain(socket) = std::mem::replace(&mut self.channel, Channel::Closed) else {
            unreachable!("upgrade_to_tls called twice or after close");
        };
        self.channel = Channel::Tls(Box::new(rustls::StreamOwned::new(conn, socket)));
    }

    /// Write `buf` in full, bypassing the frontend-message write buffer. Used only
    /// for the raw `SSLRequest` handshake, which predates normal message framing.
    pub(crate) fn write_raw(&mut self, buf: &[u8], timeout: Option<Duration>) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            match self.channel.write(&buf[offset..]) {
                Ok(0) => return Err(Error::client(ClientError::ConnectionLost)),
                Ok(n) => offset += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.wait(Want::Write, timeout)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Read exactly one raw byte, bypassing the read buffer. Used only to observe the
    /// single-byte `S`/`N` response to `SSLRequest`.
    pub(crate) fn read_raw_byte(&mut self, timeout: Option<Duration>) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.channel.read(&mut byte) {
                Ok(0) => return Err(Error::client(ClientError::ConnectionLost)),
                Ok(_) => return Ok(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.wait(Want::Read, timeout)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Block until the socket is ready for `want`, or `timeout` elapses.
    pub fn wait(&mut self, want: Want, timeout: Option<Duration>) -> Result<Ready> {
        self.events.clear();
        self.poll
            .poll(&mut self.events, timeout)
            .map_err(Error::from)?;

        if self.events.is_empty() {
            return Err(Error::client(ClientError::TimedOut));
        }

        let mut ready = Ready::default();
        for event in self.events.iter() {
            if event.is_readable() {
                ready.readable = true;
            }
            if event.is_writable() {
                ready.writable = true;
            }
        }
        let _ = want;
        Ok(ready)
    }

    /// Queue a frontend message for the next [`flush`][Self::flush]. Not sent yet.
    pub fn send<F: FrontendProtocol>(&mut self, message: F) {
        verbose!(msgtype = ?F::MSGTYPE, "send");
        message.encode(&mut self.write_buf);
    }

    /// Block until every buffered byte has been written to the socket.
    pub fn flush(&mut self, timeout: Option<Duration>) -> Result<()> {
        while !self.write_buf.is_empty() {
            match self.channel.write(&self.write_buf) {
                Ok(0) => return Err(Error::client(ClientError::ConnectionLost)),
                Ok(n) => self.write_buf.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.wait(Want::Write, timeout)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Block until one full backend message is available and decode it.
    pub fn recv<B: BackendProtocol>(&mut self, timeout: Option<Duration>) -> Result<B> {
        loop {
            match B::decode(&mut self.read_buf) {
                Ok(std::ops::ControlFlow::Break(message)) => return Ok(message),
                Ok(std::ops::ControlFlow::Continue(needed)) => {
                    self.read_buf.reserve(needed.max(READ_CHUNK));
                }
                Err(e) => return Err(e.into()),
            }
            self.fill(timeout)?;
        }
    }

    fn fill(&mut self, timeout: Option<Duration>) -> Result<()> {
        loop {
            let mut chunk = [0u8; READ_CHUNK];
            match self.channel.read(&mut chunk) {
                Ok(0) => return Err(Error::client(ClientError::ConnectionLost)),
                Ok(n) => {
                    self.read_buf.put_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.wait(Want::Read, timeout)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The `tls-server-end-point` channel-binding data (RFC 5929): a SHA-256 hash of
    /// the server's leaf certificate, or `None` if the channel isn't TLS.
    #[cfg(feature = "tls")]
    pub(crate) fn tls_server_end_point_binding(&self) -> Option<Vec<u8>> {
        use sha2::{Digest, Sha256};
        match &self.channel {
            Channel::Tls(stream) => {
                let cert = stream.conn.peer_certificates()?.first()?;
                Some(Sha256::digest(cert).to_vec())
            }
            _ => None,
        }
    }

    /// Deregister from the poll and drop the socket, closing it.
    pub fn close(mut self) {
        self.poll.registry().deregister(self.channel.as_source()).ok();
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    (host, port)
        .to_socket_addrs()
        .map_err(Error::from)?
        .next()
        .ok_or_else(|| Error::client(ClientError::Generic(format!("could not resolve host {host:?}"))))
}

/// Standalone readiness poll over a raw [`Descriptor`], matching SPEC_FULL.md §4.2's
/// `poll(descriptor, want_read|want_write, timeout)` entry point. [`Transport`] uses
/// its own internally-registered [`Poll`] for the hot path; this free function exists
/// for callers (e.g. cancellation) that hold a bare socket and want a one-shot wait.
pub fn poll(socket: &mut impl mio::event::Source, want: Want, timeout: Option<Duration>) -> io::Result<Ready> {
    let poll = Poll::new()?;
    poll.registry().register(socket, TOKEN, want.interest())?;
    let mut events = Events::with_capacity(1);
    poll.poll(&mut events, timeout)?;
    let mut ready = Ready::default();
    for event in events.iter() {
        ready.readable |= event.is_readable();
        ready.writable |= event.is_writable();
    }
    poll.registry().deregister(socket).ok();
    Ok(ready)
}
