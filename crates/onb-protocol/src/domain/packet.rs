//! # Packet Codec
//!
//! Every transport frame carries exactly one ONB packet: a fixed 4-byte
//! header followed by an opaque payload that runs to the end of the frame.
//!
//! ```text
//!  byte 0        byte 1..2             byte 3      byte 4..
//! ┌───────────┬─────────────────────┬───────────┬──────────────┐
//! │ flags     │ componentID (u16 LE)│ objectID  │ payload      │
//! └───────────┴─────────────────────┴───────────┴──────────────┘
//!   bit 0 svc        0 = module level
//!   bit 1 local
//!   bit 2 classInfo
//! ```
//!
//! Decoding never trusts a length field: the payload is whatever follows the
//! header in the frame the transport delivered.

use super::errors::PacketError;

/// Size of the fixed packet header in bytes.
pub const HEADER_LEN: usize = 4;

const FLAG_SVC: u8 = 0x01;
const FLAG_LOCAL: u8 = 0x02;
const FLAG_CLASS_INFO: u8 = 0x04;

/// Fixed packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// Object (or service object) addressed inside the component.
    pub object_id: u8,
    /// Component address, 0 for module-level traffic.
    pub component_id: u16,
    /// Service/control channel rather than data channel.
    pub svc: bool,
    /// Host-local message rather than one relayed from a lower bus.
    pub local: bool,
    /// Class-discovery sub-channel rather than the instance sub-channel.
    pub class_info: bool,
}

impl Header {
    /// Header for a host-local service message.
    #[must_use]
    pub fn service(object_id: u8, component_id: u16) -> Self {
        Self {
            object_id,
            component_id,
            svc: true,
            local: true,
            class_info: false,
        }
    }

    /// Header for a host-local data message.
    #[must_use]
    pub fn data(object_id: u8, component_id: u16) -> Self {
        Self {
            object_id,
            component_id,
            svc: false,
            local: true,
            class_info: false,
        }
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.svc {
            flags |= FLAG_SVC;
        }
        if self.local {
            flags |= FLAG_LOCAL;
        }
        if self.class_info {
            flags |= FLAG_CLASS_INFO;
        }
        flags
    }
}

/// One ONB packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: Header,
    payload: Vec<u8>,
}

impl Packet {
    /// Create a packet from a header and payload.
    pub fn new(header: Header, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// Create a packet with an empty payload.
    #[must_use]
    pub fn empty(header: Header) -> Self {
        Self {
            header,
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Move the packet onto the class-discovery sub-channel.
    #[must_use]
    pub fn into_class_channel(mut self) -> Self {
        self.header.class_info = true;
        self
    }

    /// Serialize header and payload into one frame.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(HEADER_LEN + self.payload.len());
        frame.push(self.header.flags());
        frame.extend_from_slice(&self.header.component_id.to_le_bytes());
        frame.push(self.header.object_id);
        frame.extend_from_slice(&self.payload);
        frame
    }

    /// Parse one frame. Reserved flag bits are ignored.
    pub fn decode(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() < HEADER_LEN {
            return Err(PacketError::Truncated { len: frame.len() });
        }
        let flags = frame[0];
        let header = Header {
            object_id: frame[3],
            component_id: u16::from_le_bytes([frame[1], frame[2]]),
            svc: flags & FLAG_SVC != 0,
            local: flags & FLAG_LOCAL != 0,
            class_info: flags & FLAG_CLASS_INFO != 0,
        };
        Ok(Self {
            header,
            payload: frame[HEADER_LEN..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let packet = Packet::new(Header::service(0x08, 0x1234), vec![5]);
        assert_eq!(packet.encode(), vec![0x03, 0x34, 0x12, 0x08, 5]);
    }

    #[test]
    fn test_decode_flags_and_payload() {
        let packet = Packet::decode(&[0x05, 0x02, 0x00, 0x10, 0xAA, 0xBB]).unwrap();
        let header = packet.header();
        assert!(header.svc);
        assert!(!header.local);
        assert!(header.class_info);
        assert_eq!(header.component_id, 2);
        assert_eq!(header.object_id, 0x10);
        assert_eq!(packet.payload(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_decode_header_only() {
        let packet = Packet::decode(&[0x00, 0x00, 0x00, 0x07]).unwrap();
        assert!(packet.payload().is_empty());
        assert!(!packet.header().svc);
    }

    #[test]
    fn test_decode_truncated_frame() {
        assert_eq!(
            Packet::decode(&[0x01, 0x00]),
            Err(PacketError::Truncated { len: 2 })
        );
    }

    #[test]
    fn test_reserved_flag_bits_ignored() {
        let packet = Packet::decode(&[0xF8, 0x01, 0x00, 0x00]).unwrap();
        assert_eq!(packet.header().flags(), 0);
    }

    #[test]
    fn test_class_channel_sets_flag() {
        let packet = Packet::empty(Header::service(1, 3)).into_class_channel();
        assert!(packet.header().class_info);
        assert_eq!(packet.encode()[0], 0x07);
    }
}
