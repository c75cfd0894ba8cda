//! UDP socket wrapper for RUDP
//!
//! Provides a blocking UDP socket with read deadlines and an explicit close
//! flag, built on `socket2` so buffer sizes and address reuse can be tuned.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, ErrorKind};
use std::mem::MaybeUninit;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Socket errors
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Timed out waiting for datagram")]
    Timeout,

    #[error("Socket is closed")]
    Closed,

    #[error("Invalid socket address")]
    InvalidAddress,
}

impl SocketError {
    /// Classify an I/O error, folding read-deadline expiry into `Timeout`
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => SocketError::Timeout,
            _ => SocketError::Io(err),
        }
    }

    /// Check if this error is a read-deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, SocketError::Timeout)
    }
}

/// RUDP socket wrapper
///
/// Wraps a blocking UDP socket. Clones made with [`RudpSocket::try_clone`]
/// share the close flag, so closing one handle aborts I/O on all of them.
pub struct RudpSocket {
    inner: Socket,
    closed: Arc<AtomicBool>,
}

impl RudpSocket {
    /// Create a new socket bound to the given address
    pub fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;

        tracing::debug!("Bound UDP socket to {}", addr);

        Ok(RudpSocket {
            inner: socket,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Create a socket on an ephemeral local port connected to `remote`
    ///
    /// The local address family follows the remote one, and loopback remotes
    /// get a loopback local address.
    pub fn connect_to(remote: SocketAddr) -> Result<Self, SocketError> {
        let local: SocketAddr = match (remote.is_ipv4(), remote.ip().is_loopback()) {
            (true, true) => SocketAddr::from(([127, 0, 0, 1], 0)),
            (true, false) => SocketAddr::from(([0, 0, 0, 0], 0)),
            (false, true) => SocketAddr::from(([0u16, 0, 0, 0, 0, 0, 0, 1], 0)),
            (false, false) => SocketAddr::from(([0u16; 8], 0)),
        };

        let socket = Self::bind(local)?;
        socket.connect(remote)?;
        Ok(socket)
    }

    /// Fix the peer address for `send` and `recv_timeout`
    pub fn connect(&self, remote: SocketAddr) -> Result<(), SocketError> {
        self.inner.connect(&remote.into())?;
        tracing::debug!("Connected UDP socket to {}", remote);
        Ok(())
    }

    /// Set the read timeout used by blocking receives (`None` blocks forever)
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), SocketError> {
        self.inner.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Set the kernel receive buffer size
    pub fn set_recv_buffer_size(&self, size: usize) -> Result<(), SocketError> {
        self.inner.set_recv_buffer_size(size)?;
        Ok(())
    }

    /// Get the kernel receive buffer size
    pub fn recv_buffer_size(&self) -> Result<usize, SocketError> {
        Ok(self.inner.recv_buffer_size()?)
    }

    /// Get the local address this socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        self.inner
            .local_addr()?
            .as_socket()
            .ok_or(SocketError::InvalidAddress)
    }

    /// Get the connected peer address
    pub fn peer_addr(&self) -> Result<SocketAddr, SocketError> {
        self.inner
            .peer_addr()?
            .as_socket()
            .ok_or(SocketError::InvalidAddress)
    }

    /// Mark the socket closed
    ///
    /// Every later send or receive on this socket (or its clones) fails with
    /// [`SocketError::Closed`]. A receive already blocked returns when its
    /// read timeout expires.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Check whether [`RudpSocket::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), SocketError> {
        if self.is_closed() {
            Err(SocketError::Closed)
        } else {
            Ok(())
        }
    }

    /// Send data to the connected peer
    pub fn send(&self, buf: &[u8]) -> Result<usize, SocketError> {
        self.ensure_open()?;
        self.inner.send(buf).map_err(SocketError::from_io)
    }

    /// Send data to the given address
    pub fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        self.ensure_open()?;
        let target: SockAddr = target.into();
        self.inner.send_to(buf, &target).map_err(SocketError::from_io)
    }

    /// Receive one datagram from the connected peer
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize, SocketError> {
        self.ensure_open()?;
        let n = self
            .inner
            .recv(as_uninit(buf))
            .map_err(SocketError::from_io)?;
        self.ensure_open()?;
        Ok(n)
    }

    /// Receive one datagram, waiting at most `timeout`
    pub fn recv_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, SocketError> {
        if timeout.is_zero() {
            return Err(SocketError::Timeout);
        }
        self.set_read_timeout(Some(timeout))?;
        self.recv(buf)
    }

    /// Receive one datagram and its source address
    pub fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), SocketError> {
        self.ensure_open()?;
        let (n, addr) = self
            .inner
            .recv_from(as_uninit(buf))
            .map_err(SocketError::from_io)?;
        self.ensure_open()?;
        Ok((n, addr.as_socket().ok_or(SocketError::InvalidAddress)?))
    }

    /// Try to clone the socket
    pub fn try_clone(&self) -> Result<Self, SocketError> {
        Ok(RudpSocket {
            inner: self.inner.try_clone()?,
            closed: Arc::clone(&self.closed),
        })
    }
}

fn as_uninit(buf: &mut [u8]) -> &mut [MaybeUninit<u8>] {
    // SAFETY: `u8` and `MaybeUninit<u8>` share layout, and the kernel only
    // writes initialized bytes into the slice.
    unsafe { std::slice::from_raw_parts_mut(buf.as_mut_ptr() as *mut MaybeUninit<u8>, buf.len()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_creation() {
        let socket = RudpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = socket.local_addr().unwrap();
        assert!(addr.port() > 0);
    }

    #[test]
    fn test_recv_buffer_size() {
        let socket = RudpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();

        socket.set_recv_buffer_size(262144).unwrap();

        // May not match exactly due to OS limits
        assert!(socket.recv_buffer_size().unwrap() > 0);
    }

    #[test]
    fn test_connected_send_recv() {
        let receiver = RudpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let receiver_addr = receiver.local_addr().unwrap();
        let sender = RudpSocket::connect_to(receiver_addr).unwrap();
        assert_eq!(sender.peer_addr().unwrap(), receiver_addr);

        sender.send(b"Hello, RUDP!").unwrap();

        receiver
            .set_read_timeout(Some(Duration::from_secs(1)))
            .unwrap();
        let mut buf = [0u8; 1024];
        let (n, from) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"Hello, RUDP!");
        assert_eq!(from, sender.local_addr().unwrap());

        receiver.send_to(b"ACK", from).unwrap();
        let n = sender
            .recv_timeout(&mut buf, Duration::from_secs(1))
            .unwrap();
        assert_eq!(&buf[..n], b"ACK");
    }

    #[test]
    fn test_recv_timeout_expires() {
        let peer = RudpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let socket = RudpSocket::connect_to(peer.local_addr().unwrap()).unwrap();

        let mut buf = [0u8; 16];
        let err = socket
            .recv_timeout(&mut buf, Duration::from_millis(20))
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_close_is_shared_with_clones() {
        let peer = RudpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let socket = RudpSocket::connect_to(peer.local_addr().unwrap()).unwrap();
        let clone = socket.try_clone().unwrap();

        socket.close();
        assert!(clone.is_closed());
        assert!(matches!(clone.send(b"late"), Err(SocketError::Closed)));
    }

    #[test]
    fn test_socket_ipv6() {
        // May fail on systems without IPv6
        if let Ok(socket) = RudpSocket::bind("[::1]:0".parse().unwrap()) {
            let addr = socket.local_addr().unwrap();
            assert!(addr.is_ipv6());
        }
    }
}
