//! Acknowledgement framing
//!
//! Two framings are supported:
//!
//! - [`AckMode::Marker`]: the data datagram is the bare payload and the ACK is
//!   the three bytes `ACK`. Any marker received while a packet is outstanding
//!   acknowledges it, so concurrent senders sharing one connection can consume
//!   each other's ACKs.
//! - [`AckMode::Sequenced`]: the data datagram carries an 8-byte big-endian
//!   sequence number ahead of the payload, and the ACK echoes it after the
//!   marker. A sender only accepts the ACK for its own packet.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Acknowledgement marker bytes
pub const ACK_MARKER: &[u8] = b"ACK";

/// Length of the sequence number carried by sequenced frames
pub const SEQUENCE_LEN: usize = 8;

/// Acknowledgement framing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AckMode {
    /// Content-only marker, no correlation with the packet
    #[default]
    Marker,
    /// Marker followed by the echoed sequence number
    Sequenced,
}

impl AckMode {
    /// Bytes the mode prepends to each data payload
    #[inline]
    pub fn header_len(self) -> usize {
        match self {
            AckMode::Marker => 0,
            AckMode::Sequenced => SEQUENCE_LEN,
        }
    }

    /// Length of an acknowledgement datagram in this mode
    #[inline]
    pub fn ack_len(self) -> usize {
        ACK_MARKER.len() + self.header_len()
    }
}

/// A parsed or to-be-sent acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Marker,
    Sequenced(u64),
}

impl Ack {
    /// Build the acknowledgement for a received frame
    pub fn for_frame(mode: AckMode, sequence: Option<u64>) -> Self {
        match (mode, sequence) {
            (AckMode::Sequenced, Some(seq)) => Ack::Sequenced(seq),
            _ => Ack::Marker,
        }
    }

    /// Serialize to datagram bytes
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Ack::Marker => Bytes::from_static(ACK_MARKER),
            Ack::Sequenced(seq) => {
                let mut buf = BytesMut::with_capacity(ACK_MARKER.len() + SEQUENCE_LEN);
                buf.put_slice(ACK_MARKER);
                buf.put_u64(*seq);
                buf.freeze()
            }
        }
    }

    /// Parse a datagram as an acknowledgement
    ///
    /// The datagram must match the mode's layout exactly; trailing bytes make
    /// it a mismatch.
    pub fn from_bytes(bytes: &[u8], mode: AckMode) -> Option<Self> {
        if bytes.len() != mode.ack_len() || !bytes.starts_with(ACK_MARKER) {
            return None;
        }

        match mode {
            AckMode::Marker => Some(Ack::Marker),
            AckMode::Sequenced => {
                let mut rest = &bytes[ACK_MARKER.len()..];
                Some(Ack::Sequenced(rest.get_u64()))
            }
        }
    }

    /// Check whether this acknowledgement confirms packet `sequence`
    pub fn acknowledges(&self, sequence: u64) -> bool {
        match self {
            Ack::Marker => true,
            Ack::Sequenced(seq) => *seq == sequence,
        }
    }

    /// Parse `bytes` and check it confirms `sequence`
    pub fn matches(bytes: &[u8], mode: AckMode, sequence: u64) -> bool {
        Ack::from_bytes(bytes, mode).is_some_and(|ack| ack.acknowledges(sequence))
    }
}
