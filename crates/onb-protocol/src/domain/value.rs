//! # Object Values
//!
//! A closed set of primitive kinds travels over ONB. [`ValueType`] names the
//! kind (the numeric codes are part of the wire contract), [`Layout`] adds the
//! declared byte size and the array flag, and [`Value`] holds one decoded
//! value.
//!
//! ## Conversion Rules
//!
//! | From \ To | numeric | bool | string | bytes |
//! |-----------|---------|------|--------|-------|
//! | numeric   | `as` cast (truncating) | `!= 0` | decimal text | LE encoding |
//! | bool      | 0 / 1   | same | `true`/`false` | 1 byte |
//! | string    | parsed, else rejected | `true`/`1`/`false`/`0` | same | UTF-8 |
//! | bytes     | rejected | rejected | lossy UTF-8 | same |

use super::errors::DecodeError;
use serde_json::Value as Json;
use std::fmt;

/// Primitive kind of an object channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Void,
    Bool,
    Int,
    UInt,
    LongLong,
    ULongLong,
    Double,
    Long,
    Short,
    Char,
    ULong,
    UShort,
    UChar,
    Float,
    SChar,
    String,
    /// Raw bytes, fixed length when the declared size is non-zero.
    Common,
    /// Opaque serialized variant, carried as bytes.
    Variant,
}

impl ValueType {
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        let ty = match code {
            0 => Self::Void,
            1 => Self::Bool,
            2 => Self::Int,
            3 => Self::UInt,
            4 => Self::LongLong,
            5 => Self::ULongLong,
            6 => Self::Double,
            10 => Self::String,
            12 => Self::Common,
            32 => Self::Long,
            33 => Self::Short,
            34 => Self::Char,
            35 => Self::ULong,
            36 => Self::UShort,
            37 => Self::UChar,
            38 => Self::Float,
            40 => Self::SChar,
            41 => Self::Variant,
            _ => return None,
        };
        Some(ty)
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Void => 0,
            Self::Bool => 1,
            Self::Int => 2,
            Self::UInt => 3,
            Self::LongLong => 4,
            Self::ULongLong => 5,
            Self::Double => 6,
            Self::String => 10,
            Self::Common => 12,
            Self::Long => 32,
            Self::Short => 33,
            Self::Char => 34,
            Self::ULong => 35,
            Self::UShort => 36,
            Self::UChar => 37,
            Self::Float => 38,
            Self::SChar => 40,
            Self::Variant => 41,
        }
    }

    /// Encoded width of one scalar, `None` for variable-length kinds.
    #[must_use]
    pub fn scalar_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Char | Self::UChar | Self::SChar => Some(1),
            Self::Short | Self::UShort => Some(2),
            Self::Int | Self::UInt | Self::Long | Self::ULong | Self::Float => Some(4),
            Self::LongLong | Self::ULongLong | Self::Double => Some(8),
            Self::Void | Self::String | Self::Common | Self::Variant => None,
        }
    }

    /// Kinds whose buffer exists even with a declared size of zero.
    #[must_use]
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::String | Self::Common | Self::Variant)
    }

    /// Type name as it appears in component configs and scheme files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::LongLong => "qlonglong",
            Self::ULongLong => "qulonglong",
            Self::Double => "double",
            Self::Long => "long",
            Self::Short => "short",
            Self::Char => "char",
            Self::ULong => "ulong",
            Self::UShort => "ushort",
            Self::UChar => "uchar",
            Self::Float => "float",
            Self::SChar => "signed char",
            Self::String => "QString",
            Self::Common => "QByteArray",
            Self::Variant => "QVariant",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared shape of a value buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub ty: ValueType,
    pub size: u16,
    pub array: bool,
}

impl Layout {
    #[must_use]
    pub fn new(ty: ValueType, size: u16, array: bool) -> Self {
        Self { ty, size, array }
    }

    /// Number of elements of an array layout.
    fn element_count(&self) -> usize {
        match self.ty.scalar_size() {
            Some(sz) => usize::from(self.size) / sz,
            None => 0,
        }
    }
}

/// One decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i32),
    UInt(u32),
    LongLong(i64),
    ULongLong(u64),
    Double(f64),
    Long(i32),
    Short(i16),
    Char(i8),
    ULong(u32),
    UShort(u16),
    UChar(u8),
    Float(f32),
    SChar(i8),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Variant(Vec<u8>),
}

enum Numeric {
    Int(i128),
    Float(f64),
}

impl Value {
    /// Kind of this value; arrays report their element kind.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Void => ValueType::Void,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::UInt(_) => ValueType::UInt,
            Self::LongLong(_) => ValueType::LongLong,
            Self::ULongLong(_) => ValueType::ULongLong,
            Self::Double(_) => ValueType::Double,
            Self::Long(_) => ValueType::Long,
            Self::Short(_) => ValueType::Short,
            Self::Char(_) => ValueType::Char,
            Self::ULong(_) => ValueType::ULong,
            Self::UShort(_) => ValueType::UShort,
            Self::UChar(_) => ValueType::UChar,
            Self::Float(_) => ValueType::Float,
            Self::SChar(_) => ValueType::SChar,
            Self::String(_) => ValueType::String,
            Self::Bytes(_) => ValueType::Common,
            Self::Variant(_) => ValueType::Variant,
            Self::Array(items) => items.first().map_or(ValueType::Void, Value::value_type),
        }
    }

    /// Zero value for a buffer of the given layout.
    #[must_use]
    pub fn zero(layout: &Layout) -> Self {
        if layout.array && layout.ty.scalar_size().is_some() {
            let scalar = Layout::new(layout.ty, 0, false);
            return Self::Array(vec![Self::zero(&scalar); layout.element_count()]);
        }
        match layout.ty {
            ValueType::Void => Self::Void,
            ValueType::Bool => Self::Bool(false),
            ValueType::Int => Self::Int(0),
            ValueType::UInt => Self::UInt(0),
            ValueType::LongLong => Self::LongLong(0),
            ValueType::ULongLong => Self::ULongLong(0),
            ValueType::Double => Self::Double(0.0),
            ValueType::Long => Self::Long(0),
            ValueType::Short => Self::Short(0),
            ValueType::Char => Self::Char(0),
            ValueType::ULong => Self::ULong(0),
            ValueType::UShort => Self::UShort(0),
            ValueType::UChar => Self::UChar(0),
            ValueType::Float => Self::Float(0.0),
            ValueType::SChar => Self::SChar(0),
            ValueType::String => Self::String(String::new()),
            ValueType::Common => Self::Bytes(vec![0; usize::from(layout.size)]),
            ValueType::Variant => Self::Variant(Vec::new()),
        }
    }

    /// Decode bytes received for a buffer of the given layout.
    pub fn decode(layout: &Layout, bytes: &[u8]) -> Result<Self, DecodeError> {
        match layout.ty {
            ValueType::Void => Ok(Self::Void),
            ValueType::String => Ok(Self::String(
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .to_string(),
            )),
            ValueType::Common if layout.size > 0 => {
                let need = usize::from(layout.size);
                if bytes.len() < need {
                    return Err(DecodeError::Truncated {
                        what: "fixed byte buffer",
                        need,
                        got: bytes.len(),
                    });
                }
                Ok(Self::Bytes(bytes[..need].to_vec()))
            }
            ValueType::Common => Ok(Self::Bytes(bytes.to_vec())),
            ValueType::Variant => Ok(Self::Variant(bytes.to_vec())),
            ty if layout.array => {
                let sz = ty.scalar_size().unwrap_or(1);
                let count = layout.element_count();
                let need = count * sz;
                if bytes.len() < need {
                    return Err(DecodeError::Truncated {
                        what: "array value",
                        need,
                        got: bytes.len(),
                    });
                }
                bytes[..need]
                    .chunks_exact(sz)
                    .map(|chunk| Self::decode_scalar(ty, chunk))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::Array)
            }
            ty => Self::decode_scalar(ty, bytes),
        }
    }

    fn decode_scalar(ty: ValueType, bytes: &[u8]) -> Result<Self, DecodeError> {
        let need = ty.scalar_size().unwrap_or(0);
        if bytes.len() < need {
            return Err(DecodeError::Truncated {
                what: "scalar value",
                need,
                got: bytes.len(),
            });
        }
        let b = bytes;
        let value = match ty {
            ValueType::Bool => Self::Bool(b[0] != 0),
            ValueType::Char => Self::Char(i8::from_le_bytes([b[0]])),
            ValueType::SChar => Self::SChar(i8::from_le_bytes([b[0]])),
            ValueType::UChar => Self::UChar(b[0]),
            ValueType::Short => Self::Short(i16::from_le_bytes([b[0], b[1]])),
            ValueType::UShort => Self::UShort(u16::from_le_bytes([b[0], b[1]])),
            ValueType::Int => Self::Int(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            ValueType::Long => Self::Long(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            ValueType::UInt => Self::UInt(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            ValueType::ULong => Self::ULong(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            ValueType::Float => Self::Float(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            ValueType::LongLong => Self::LongLong(i64::from_le_bytes(eight(b))),
            ValueType::ULongLong => Self::ULongLong(u64::from_le_bytes(eight(b))),
            ValueType::Double => Self::Double(f64::from_le_bytes(eight(b))),
            other => return Err(DecodeError::UnknownType(other.code())),
        };
        Ok(value)
    }

    /// Append the wire encoding of this value.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Void => {}
            Self::Bool(v) => out.push(u8::from(*v)),
            Self::Int(v) | Self::Long(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::UInt(v) | Self::ULong(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::LongLong(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::ULongLong(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Short(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::UShort(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Char(v) | Self::SChar(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::UChar(v) => out.push(*v),
            Self::String(s) => out.extend_from_slice(s.as_bytes()),
            Self::Bytes(b) | Self::Variant(b) => out.extend_from_slice(b),
            Self::Array(items) => items.iter().for_each(|item| item.encode_into(out)),
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn numeric(&self) -> Option<Numeric> {
        let n = match self {
            Self::Bool(v) => Numeric::Int(i128::from(*v)),
            Self::Int(v) | Self::Long(v) => Numeric::Int(i128::from(*v)),
            Self::UInt(v) | Self::ULong(v) => Numeric::Int(i128::from(*v)),
            Self::LongLong(v) => Numeric::Int(i128::from(*v)),
            Self::ULongLong(v) => Numeric::Int(i128::from(*v)),
            Self::Short(v) => Numeric::Int(i128::from(*v)),
            Self::UShort(v) => Numeric::Int(i128::from(*v)),
            Self::Char(v) | Self::SChar(v) => Numeric::Int(i128::from(*v)),
            Self::UChar(v) => Numeric::Int(i128::from(*v)),
            Self::Double(v) => Numeric::Float(*v),
            Self::Float(v) => Numeric::Float(f64::from(*v)),
            Self::String(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i128>() {
                    Numeric::Int(i)
                } else if let Ok(f) = s.parse::<f64>() {
                    Numeric::Float(f)
                } else if s.eq_ignore_ascii_case("true") {
                    Numeric::Int(1)
                } else if s.eq_ignore_ascii_case("false") {
                    Numeric::Int(0)
                } else {
                    return None;
                }
            }
            _ => return None,
        };
        Some(n)
    }

    /// Convert to a scalar (or string/bytes) kind.
    #[must_use]
    pub fn convert(&self, ty: ValueType) -> Option<Self> {
        if self.value_type() == ty && !matches!(self, Self::Array(_)) {
            return Some(self.clone());
        }
        match ty {
            ValueType::Void => Some(Self::Void),
            ValueType::String => match self {
                Self::Bytes(b) | Self::Variant(b) => {
                    Some(Self::String(String::from_utf8_lossy(b).into_owned()))
                }
                other => Some(Self::String(other.to_string())),
            },
            ValueType::Common => match self {
                Self::String(s) => Some(Self::Bytes(s.as_bytes().to_vec())),
                Self::Variant(b) => Some(Self::Bytes(b.clone())),
                other => Some(Self::Bytes(other.encode())),
            },
            ValueType::Variant => match self {
                Self::Bytes(b) => Some(Self::Variant(b.clone())),
                other => Some(Self::Variant(other.encode())),
            },
            ValueType::Bool => match self.numeric()? {
                Numeric::Int(i) => Some(Self::Bool(i != 0)),
                Numeric::Float(f) => Some(Self::Bool(f != 0.0)),
            },
            ValueType::Double => Some(Self::Double(self.as_f64()?)),
            ValueType::Float => Some(Self::Float(self.as_f64()? as f32)),
            integer => {
                let i = match self.numeric()? {
                    Numeric::Int(i) => i,
                    Numeric::Float(f) => f as i128,
                };
                Some(match integer {
                    ValueType::Int => Self::Int(i as i32),
                    ValueType::Long => Self::Long(i as i32),
                    ValueType::UInt => Self::UInt(i as u32),
                    ValueType::ULong => Self::ULong(i as u32),
                    ValueType::LongLong => Self::LongLong(i as i64),
                    ValueType::ULongLong => Self::ULongLong(i as u64),
                    ValueType::Short => Self::Short(i as i16),
                    ValueType::UShort => Self::UShort(i as u16),
                    ValueType::Char => Self::Char(i as i8),
                    ValueType::SChar => Self::SChar(i as i8),
                    ValueType::UChar => Self::UChar(i as u8),
                    _ => return None,
                })
            }
        }
    }

    /// Convert into a value that fits the given buffer layout exactly.
    #[must_use]
    pub fn coerce(&self, layout: &Layout) -> Option<Self> {
        if layout.array && layout.ty.scalar_size().is_some() {
            let Self::Array(items) = self else {
                return None;
            };
            let scalar = Layout::new(layout.ty, 0, false);
            let mut out = items
                .iter()
                .take(layout.element_count())
                .map(|item| item.convert(layout.ty))
                .collect::<Option<Vec<_>>>()?;
            out.resize(layout.element_count(), Self::zero(&scalar));
            return Some(Self::Array(out));
        }
        let converted = self.convert(layout.ty)?;
        match converted {
            Self::Bytes(mut b) if layout.size > 0 => {
                b.resize(usize::from(layout.size), 0);
                Some(Self::Bytes(b))
            }
            other => Some(other),
        }
    }

    /// Interpret a scheme/settings JSON value against a buffer layout.
    #[must_use]
    pub fn from_json(json: &Json, layout: &Layout) -> Option<Self> {
        Self::raw_from_json(json)?.coerce(layout)
    }

    fn raw_from_json(json: &Json) -> Option<Self> {
        match json {
            Json::Bool(b) => Some(Self::Bool(*b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::LongLong(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Self::ULongLong(u))
                } else {
                    n.as_f64().map(Self::Double)
                }
            }
            Json::String(s) => Some(Self::String(s.clone())),
            Json::Array(items) => items
                .iter()
                .map(Self::raw_from_json)
                .collect::<Option<Vec<_>>>()
                .map(Self::Array),
            Json::Null | Json::Object(_) => None,
        }
    }

    /// JSON representation used in settings and component configs.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Void => Json::Null,
            Self::Bool(v) => Json::Bool(*v),
            Self::Double(v) => serde_json::Number::from_f64(*v).map_or(Json::Null, Json::Number),
            Self::Float(v) => {
                serde_json::Number::from_f64(f64::from(*v)).map_or(Json::Null, Json::Number)
            }
            Self::String(s) => Json::String(s.clone()),
            Self::Bytes(b) | Self::Variant(b) => {
                Json::String(String::from_utf8_lossy(b).into_owned())
            }
            Self::Array(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            other => match other.numeric() {
                Some(Numeric::Int(i)) => i64::try_from(i)
                    .map(Json::from)
                    .or_else(|_| u64::try_from(i).map(Json::from))
                    .unwrap_or(Json::Null),
                _ => Json::Null,
            },
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self.numeric()? {
            Numeric::Int(i) => Some(i as f64),
            Numeric::Float(f) => Some(f),
        }
    }
}

fn eight(b: &[u8]) -> [u8; 8] {
    [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) | Self::Long(v) => write!(f, "{v}"),
            Self::UInt(v) | Self::ULong(v) => write!(f, "{v}"),
            Self::LongLong(v) => write!(f, "{v}"),
            Self::ULongLong(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::UShort(v) => write!(f, "{v}"),
            Self::Char(v) | Self::SChar(v) => write!(f, "{v}"),
            Self::UChar(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::Bytes(b) | Self::Variant(b) => f.write_str(&String::from_utf8_lossy(b)),
            Self::Array(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}
