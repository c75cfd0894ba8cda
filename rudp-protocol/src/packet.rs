//! Packet model
//!
//! A [`Packet`] is one payload in flight: a process-unique sequence number,
//! the payload bytes, and the monotonic time it was created. The size limit is
//! enforced here, at construction, so oversized payloads never reach a socket.

use crate::ack::{AckMode, SEQUENCE_LEN};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use rudp_io::Timestamp;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Maximum payload size in the reference configuration
pub const MAX_PACKET_SIZE: usize = crate::config::DEFAULT_MAX_PACKET_SIZE;

/// Packet errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet size {size} exceeds maximum allowed size of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("frame of {len} bytes is shorter than the sequence header")]
    Truncated { len: usize },
}

/// Check a payload length against the limit
#[inline]
pub fn validate_payload(len: usize, max: usize) -> Result<(), PacketError> {
    if len > max {
        Err(PacketError::TooLarge { size: len, max })
    } else {
        Ok(())
    }
}

/// Source of packet sequence numbers
///
/// Hands out 1, 2, 3, ... and never repeats. Whoever builds packets owns one;
/// share it through an `Arc` when several senders must draw from the same
/// sequence space.
#[derive(Debug)]
pub struct SequenceGenerator {
    next: AtomicU64,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        SequenceGenerator {
            next: AtomicU64::new(first),
        }
    }

    /// Take the next sequence number
    #[inline]
    pub fn next_sequence(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The number the next call to [`SequenceGenerator::next_sequence`] returns
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A payload tracked by the sender
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    sequence: u64,
    payload: Bytes,
    created_at: Timestamp,
}

impl Packet {
    /// Create a packet with an explicit sequence number
    pub fn new(sequence: u64, payload: Bytes, max_size: usize) -> Result<Self, PacketError> {
        validate_payload(payload.len(), max_size)?;
        Ok(Packet {
            sequence,
            payload,
            created_at: Timestamp::now(),
        })
    }

    /// Validate `payload` and stamp it with the generator's next sequence number
    ///
    /// Oversized payloads are rejected before a sequence number is consumed.
    pub fn create(
        generator: &SequenceGenerator,
        payload: Bytes,
        max_size: usize,
    ) -> Result<Self, PacketError> {
        validate_payload(payload.len(), max_size)?;
        Ok(Packet {
            sequence: generator.next_sequence(),
            payload,
            created_at: Timestamp::now(),
        })
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    #[inline]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Serialize for the wire
    ///
    /// Marker mode sends the bare payload, so the sequence number never leaves
    /// the process.
    pub fn encode(&self, mode: AckMode) -> Bytes {
        match mode {
            AckMode::Marker => self.payload.clone(),
            AckMode::Sequenced => {
                let mut buf = BytesMut::with_capacity(SEQUENCE_LEN + self.payload.len());
                buf.put_u64(self.sequence);
                buf.put_slice(&self.payload);
                buf.freeze()
            }
        }
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("sequence", &self.sequence)
            .field("len", &self.payload.len())
            .finish()
    }
}

/// A data datagram as seen by the receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    /// Sequence number, present only in sequenced mode
    pub sequence: Option<u64>,
    pub payload: Bytes,
}

impl DataFrame {
    /// Parse a received datagram
    pub fn decode(datagram: &[u8], mode: AckMode) -> Result<Self, PacketError> {
        match mode {
            AckMode::Marker => Ok(DataFrame {
                sequence: None,
                payload: Bytes::copy_from_slice(datagram),
            }),
            AckMode::Sequenced => {
                if datagram.len() < SEQUENCE_LEN {
                    return Err(PacketError::Truncated {
                        len: datagram.len(),
                    });
                }
                let mut buf = datagram;
                let sequence = buf.get_u64();
                Ok(DataFrame {
                    sequence: Some(sequence),
                    payload: Bytes::copy_from_slice(buf),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_boundary() {
        let generator = SequenceGenerator::new();
        let exact = Bytes::from(vec![0u8; MAX_PACKET_SIZE]);
        assert!(Packet::create(&generator, exact, MAX_PACKET_SIZE).is_ok());

        let over = Bytes::from(vec![0u8; MAX_PACKET_SIZE + 1]);
        assert_eq!(
            Packet::create(&generator, over, MAX_PACKET_SIZE).unwrap_err(),
            PacketError::TooLarge {
                size: MAX_PACKET_SIZE + 1,
                max: MAX_PACKET_SIZE
            }
        );
    }

    #[test]
    fn test_rejection_does_not_consume_sequence() {
        let generator = SequenceGenerator::new();
        let over = Bytes::from(vec![0u8; 11]);
        assert!(Packet::create(&generator, over, 10).is_err());

        let packet = Packet::create(&generator, Bytes::from_static(b"ok"), 10).unwrap();
        assert_eq!(packet.sequence(), 1);
    }

    #[test]
    fn test_sequence_numbers_are_unique_and_start_at_one() {
        let generator = SequenceGenerator::new();
        let seqs: Vec<u64> = (0..5)
            .map(|_| {
                Packet::create(&generator, Bytes::new(), MAX_PACKET_SIZE)
                    .unwrap()
                    .sequence()
            })
            .collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        assert_eq!(generator.peek(), 6);
    }

    #[test]
    fn test_marker_encoding_is_bare_payload() {
        let packet = Packet::new(9, Bytes::from_static(b"hello"), MAX_PACKET_SIZE).unwrap();
        assert_eq!(&packet.encode(AckMode::Marker)[..], b"hello");

        let frame = DataFrame::decode(b"hello", AckMode::Marker).unwrap();
        assert_eq!(frame.sequence, None);
        assert_eq!(&frame.payload[..], b"hello");
    }

    #[test]
    fn test_sequenced_encoding_prefixes_sequence() {
        let packet = Packet::new(0x0102, Bytes::from_static(b"hi"), MAX_PACKET_SIZE).unwrap();
        let wire = packet.encode(AckMode::Sequenced);
        assert_eq!(&wire[..], &[0, 0, 0, 0, 0, 0, 1, 2, b'h', b'i']);

        let frame = DataFrame::decode(&wire, AckMode::Sequenced).unwrap();
        assert_eq!(frame.sequence, Some(0x0102));
        assert_eq!(&frame.payload[..], b"hi");
    }

    #[test]
    fn test_sequenced_decode_rejects_short_frames() {
        assert_eq!(
            DataFrame::decode(&[1, 2, 3], AckMode::Sequenced),
            Err(PacketError::Truncated { len: 3 })
        );
    }
}
