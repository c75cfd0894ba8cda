//! Scripted in-memory transports for unit tests

use parking_lot::Mutex;
use rudp_io::{DatagramConnection, DatagramListener, SocketError};
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// What the next read returns
#[derive(Debug, Clone)]
pub enum Reply {
    Datagram(Vec<u8>),
    Timeout,
    Fault,
}

fn fault() -> SocketError {
    SocketError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "scripted fault"))
}

/// Connection whose reads follow a script; reads past the end time out
#[derive(Default)]
pub struct ScriptedConnection {
    replies: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<Vec<u8>>>,
    fail_sends: bool,
}

impl ScriptedConnection {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        ScriptedConnection {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn failing_sends() -> Self {
        ScriptedConnection {
            fail_sends: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }
}

impl DatagramConnection for ScriptedConnection {
    fn send(&self, buf: &[u8]) -> Result<usize, SocketError> {
        if self.fail_sends {
            return Err(fault());
        }
        self.sent.lock().push(buf.to_vec());
        Ok(buf.len())
    }

    fn recv_timeout(&self, buf: &mut [u8], _timeout: Duration) -> Result<usize, SocketError> {
        match self.replies.lock().pop_front() {
            Some(Reply::Datagram(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(Reply::Fault) => Err(fault()),
            Some(Reply::Timeout) | None => Err(SocketError::Timeout),
        }
    }
}

/// Listener fed from a queue of incoming datagrams; reads past the end fail
#[derive(Default)]
pub struct ScriptedListener {
    incoming: Mutex<VecDeque<(Vec<u8>, SocketAddr)>>,
    sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    fail_sends: bool,
}

impl ScriptedListener {
    pub fn new(incoming: impl IntoIterator<Item = (Vec<u8>, SocketAddr)>) -> Self {
        ScriptedListener {
            incoming: Mutex::new(incoming.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn failing_sends(incoming: impl IntoIterator<Item = (Vec<u8>, SocketAddr)>) -> Self {
        ScriptedListener {
            fail_sends: true,
            ..Self::new(incoming)
        }
    }

    pub fn sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.sent.lock().clone()
    }
}

impl DatagramListener for ScriptedListener {
    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), SocketError> {
        match self.incoming.lock().pop_front() {
            Some((bytes, from)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok((n, from))
            }
            None => Err(fault()),
        }
    }

    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        if self.fail_sends {
            return Err(fault());
        }
        self.sent.lock().push((buf.to_vec(), target));
        Ok(buf.len())
    }
}
