//! Datagram transport traits
//!
//! The reliable-delivery layer does not own sockets. The sender drives a
//! connected, point-to-point [`DatagramConnection`] and the receiver drives an
//! unconnected [`DatagramListener`]. Both are implemented for [`RudpSocket`]
//! and for `std::net::UdpSocket`.

use crate::socket::{RudpSocket, SocketError};
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// Connected datagram endpoint used by the sending side
pub trait DatagramConnection: Send + Sync {
    /// Write one datagram to the peer
    fn send(&self, buf: &[u8]) -> Result<usize, SocketError>;

    /// Read one datagram, failing with [`SocketError::Timeout`] once
    /// `timeout` elapses
    fn recv_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, SocketError>;
}

/// Unconnected datagram endpoint used by the receiving side
pub trait DatagramListener: Send + Sync {
    /// Block until a datagram arrives and report its source
    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), SocketError>;

    /// Write one datagram to `target`
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError>;
}

impl DatagramConnection for RudpSocket {
    fn send(&self, buf: &[u8]) -> Result<usize, SocketError> {
        RudpSocket::send(self, buf)
    }

    fn recv_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, SocketError> {
        RudpSocket::recv_timeout(self, buf, timeout)
    }
}

impl DatagramListener for RudpSocket {
    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), SocketError> {
        RudpSocket::recv_from(self, buf)
    }

    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        RudpSocket::send_to(self, buf, target)
    }
}

impl DatagramConnection for UdpSocket {
    fn send(&self, buf: &[u8]) -> Result<usize, SocketError> {
        UdpSocket::send(self, buf).map_err(SocketError::from_io)
    }

    fn recv_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, SocketError> {
        if timeout.is_zero() {
            return Err(SocketError::Timeout);
        }
        self.set_read_timeout(Some(timeout))?;
        self.recv(buf).map_err(SocketError::from_io)
    }
}

impl DatagramListener for UdpSocket {
    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), SocketError> {
        UdpSocket::recv_from(self, buf).map_err(SocketError::from_io)
    }

    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        UdpSocket::send_to(self, buf, target).map_err(SocketError::from_io)
    }
}
