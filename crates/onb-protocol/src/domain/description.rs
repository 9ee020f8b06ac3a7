//! # Object Descriptions and Metadata
//!
//! An `objectInfo` reply carries one [`ObjectDescription`]:
//!
//! ```text
//!  0    1      2..3        4      5      6..7       8..9        10..
//! ┌────┬──────┬───────────┬──────┬──────┬──────────┬───────────┬──────┐
//! │ id │flags │ extFlags  │rType │wType │ readSize │ writeSize │ name │
//! └────┴──────┴───────────┴──────┴──────┴──────────┴───────────┴──────┘
//! ```
//!
//! Each set bit `k` of `extFlags` announces one metadata reply
//! (`MetaKind` code `k + 1`), requested individually after the description.

use super::errors::DecodeError;
use super::value::{Layout, Value, ValueType};
use std::fmt;

/// Fixed part of an encoded description.
pub const DESCRIPTION_HEADER_LEN: usize = 10;

/// Object flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ObjectFlags(pub u8);

impl ObjectFlags {
    pub const VOLATILE: u8 = 0x01;
    pub const READ: u8 = 0x02;
    pub const WRITE: u8 = 0x04;
    pub const SAVE: u8 = 0x08;
    pub const HIDDEN: u8 = 0x10;
    pub const DUAL: u8 = 0x20;
    pub const ARRAY: u8 = 0x40;
    pub const FUNCTION: u8 = 0x80;

    #[must_use]
    pub fn contains(self, bits: u8) -> bool {
        self.0 & bits == bits
    }

    #[must_use]
    pub fn is_readable(self) -> bool {
        self.contains(Self::READ)
    }

    #[must_use]
    pub fn is_writable(self) -> bool {
        self.contains(Self::WRITE)
    }

    #[must_use]
    pub fn is_volatile(self) -> bool {
        self.contains(Self::VOLATILE)
    }

    #[must_use]
    pub fn is_function(self) -> bool {
        self.contains(Self::FUNCTION)
    }

    #[must_use]
    pub fn is_array(self) -> bool {
        self.contains(Self::ARRAY)
    }

    #[must_use]
    pub fn is_dual(self) -> bool {
        self.contains(Self::DUAL)
    }

    /// Readable and volatile: the component consumes values.
    #[must_use]
    pub fn is_input(self) -> bool {
        self.is_readable() && self.is_volatile()
    }

    /// Writable and volatile: the component produces values.
    #[must_use]
    pub fn is_output(self) -> bool {
        self.is_writable() && self.is_volatile()
    }

    /// Persistent, readable and writable parameter.
    #[must_use]
    pub fn is_setting(self) -> bool {
        self.is_readable() && self.is_writable() && !self.is_volatile() && !self.is_function()
    }
}

impl fmt::Display for ObjectFlags {
    /// Compact `vrwshdaf` notation, `-` for cleared bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LETTERS: [(u8, char); 8] = [
            (ObjectFlags::VOLATILE, 'v'),
            (ObjectFlags::READ, 'r'),
            (ObjectFlags::WRITE, 'w'),
            (ObjectFlags::SAVE, 's'),
            (ObjectFlags::HIDDEN, 'h'),
            (ObjectFlags::DUAL, 'd'),
            (ObjectFlags::ARRAY, 'a'),
            (ObjectFlags::FUNCTION, 'f'),
        ];
        for (bit, letter) in LETTERS {
            let c = if self.0 & bit != 0 { letter } else { '-' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Static description of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescription {
    pub id: u8,
    pub flags: ObjectFlags,
    /// Metadata kinds the module will supply, bit `k` for kind `k + 1`.
    pub ext_flags: u16,
    pub read_type: ValueType,
    pub write_type: ValueType,
    pub read_size: u16,
    pub write_size: u16,
    pub name: String,
}

impl ObjectDescription {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < DESCRIPTION_HEADER_LEN {
            return Err(DecodeError::Truncated {
                what: "object description",
                need: DESCRIPTION_HEADER_LEN,
                got: bytes.len(),
            });
        }
        let read_type = ValueType::from_code(bytes[4]).ok_or(DecodeError::UnknownType(bytes[4]))?;
        let write_type =
            ValueType::from_code(bytes[5]).ok_or(DecodeError::UnknownType(bytes[5]))?;
        let name = std::str::from_utf8(&bytes[DESCRIPTION_HEADER_LEN..])
            .map_err(|_| DecodeError::InvalidUtf8("object name"))?
            .trim_end_matches('\0')
            .to_string();

        Ok(Self {
            id: bytes[0],
            flags: ObjectFlags(bytes[1]),
            ext_flags: u16::from_le_bytes([bytes[2], bytes[3]]),
            read_type,
            write_type,
            read_size: u16::from_le_bytes([bytes[6], bytes[7]]),
            write_size: u16::from_le_bytes([bytes[8], bytes[9]]),
            name,
        })
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DESCRIPTION_HEADER_LEN + self.name.len());
        out.push(self.id);
        out.push(self.flags.0);
        out.extend_from_slice(&self.ext_flags.to_le_bytes());
        out.push(self.read_type.code());
        out.push(self.write_type.code());
        out.extend_from_slice(&self.read_size.to_le_bytes());
        out.extend_from_slice(&self.write_size.to_le_bytes());
        out.extend_from_slice(self.name.as_bytes());
        out
    }

    /// A usable description names the object and declares at least one side.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && !(self.read_type == ValueType::Void && self.write_type == ValueType::Void)
    }

    #[must_use]
    pub fn read_layout(&self) -> Layout {
        Layout::new(self.read_type, self.read_size, self.flags.is_array())
    }

    #[must_use]
    pub fn write_layout(&self) -> Layout {
        Layout::new(self.write_type, self.write_size, self.flags.is_array())
    }

    /// Whether a write (module to hub) buffer exists for this object.
    #[must_use]
    pub fn has_write_buffer(&self) -> bool {
        self.write_size > 0 || self.write_type.is_dynamic()
    }

    /// Whether a read (hub to module) buffer exists for this object.
    #[must_use]
    pub fn has_read_buffer(&self) -> bool {
        self.read_size > 0 || self.read_type.is_dynamic()
    }

    /// Type a channel is advertised with in configs: writable objects report
    /// what they write, the rest what they read.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        if self.flags.is_output() {
            self.write_type.name()
        } else {
            self.read_type.name()
        }
    }
}

/// Metadata kinds, numbered from 1; kind `k` travels on service id
/// `OBJECT_INFO + k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    Min,
    Max,
    Def,
    Step,
    Mime,
    Hint,
    Unit,
    Options,
    ExtInfo,
    Enum,
}

impl MetaKind {
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        let kind = match code {
            1 => Self::Min,
            2 => Self::Max,
            3 => Self::Def,
            4 => Self::Step,
            5 => Self::Mime,
            6 => Self::Hint,
            7 => Self::Unit,
            8 => Self::Options,
            9 => Self::ExtInfo,
            10 => Self::Enum,
            _ => return None,
        };
        Some(kind)
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Min => 1,
            Self::Max => 2,
            Self::Def => 3,
            Self::Step => 4,
            Self::Mime => 5,
            Self::Hint => 6,
            Self::Unit => 7,
            Self::Options => 8,
            Self::ExtInfo => 9,
            Self::Enum => 10,
        }
    }
}

/// Rate and timestamp characteristics of a publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedInfo {
    /// Recommended minimum interval between updates, milliseconds.
    pub rmip: u16,
    pub need_timestamp: bool,
}

impl ExtendedInfo {
    pub const ENCODED_LEN: usize = 3;

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < Self::ENCODED_LEN {
            return Err(DecodeError::Truncated {
                what: "extended info",
                need: Self::ENCODED_LEN,
                got: bytes.len(),
            });
        }
        Ok(Self {
            rmip: u16::from_le_bytes([bytes[0], bytes[1]]),
            need_timestamp: bytes[2] != 0,
        })
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.rmip.to_le_bytes().to_vec();
        out.push(u8::from(self.need_timestamp));
        out
    }
}

/// Optional per-object metadata gathered during negotiation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectMeta {
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub def: Option<Value>,
    pub step: Option<Value>,
    pub mime_type: String,
    pub hint: String,
    pub unit: String,
    pub options: String,
    pub ext_info: ExtendedInfo,
    pub enum_values: Vec<String>,
}

impl ObjectMeta {
    /// Store one metadata reply. Numeric bounds decode with the write layout.
    pub fn apply(
        &mut self,
        kind: MetaKind,
        bytes: &[u8],
        desc: &ObjectDescription,
    ) -> Result<(), DecodeError> {
        let text = || {
            String::from_utf8_lossy(bytes)
                .trim_end_matches('\0')
                .to_string()
        };
        match kind {
            MetaKind::Min => self.min = Some(Value::decode(&desc.write_layout(), bytes)?),
            MetaKind::Max => self.max = Some(Value::decode(&desc.write_layout(), bytes)?),
            MetaKind::Def => self.def = Some(Value::decode(&desc.write_layout(), bytes)?),
            MetaKind::Step => self.step = Some(Value::decode(&desc.write_layout(), bytes)?),
            MetaKind::Mime => self.mime_type = text(),
            MetaKind::Hint => self.hint = text(),
            MetaKind::Unit => self.unit = text(),
            MetaKind::Options => self.options = text(),
            MetaKind::ExtInfo => self.ext_info = ExtendedInfo::decode(bytes)?,
            MetaKind::Enum => {
                self.enum_values = text()
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }
        Ok(())
    }
}
