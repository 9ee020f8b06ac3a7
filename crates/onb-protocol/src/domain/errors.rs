//! Domain errors for the ONB protocol layer.

use super::packet::HEADER_LEN;
use thiserror::Error;

/// Errors raised while splitting a transport frame into header and payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Frame is shorter than the fixed header.
    #[error("frame of {len} bytes is shorter than the {HEADER_LEN}-byte header")]
    Truncated { len: usize },
}

/// Errors raised while decoding values, descriptions and metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes were present than the declared layout requires.
    #[error("{what}: need {need} bytes, got {got}")]
    Truncated {
        what: &'static str,
        need: usize,
        got: usize,
    },

    /// A type code outside the closed primitive set.
    #[error("unknown value type code {0}")]
    UnknownType(u8),

    /// A text field was not valid UTF-8.
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
}

/// Errors raised when a value cannot be stored in an object buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The value has no conversion to the buffer type.
    #[error("cannot convert {from} to {to}")]
    Incompatible { from: String, to: String },

    /// The object has no buffer on this side.
    #[error("object {0} has no buffer to hold the value")]
    NoBuffer(String),
}

/// Errors returned by component-level commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// No object with this name or id.
    #[error("unknown object {0}")]
    UnknownObject(String),

    /// Subscriptions only apply to volatile writable objects.
    #[error("object {0} cannot be subscribed")]
    NotSubscribable(String),

    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Errors returned by module-level directory commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// No class with this name or id is known to the module.
    #[error("unknown class {0}")]
    UnknownClass(String),

    /// The class describes self-registering hardware and cannot be instantiated.
    #[error("class {0} is not a factory")]
    NotFactory(String),

    /// No live component with this name or id.
    #[error("unknown component {0}")]
    UnknownComponent(String),

    /// Another live component already uses the requested name.
    #[error("component name {0} is already taken")]
    NameTaken(String),
}

/// Errors returned by the object link engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Publisher write side and subscriber read side disagree on type or size.
    #[error("incompatible link: publisher writes {publisher}, subscriber reads {subscriber}")]
    Incompatible {
        publisher: String,
        subscriber: String,
    },

    /// The publisher has no write buffer to share.
    #[error("publisher has no write buffer")]
    NoWriteBuffer,

    /// The subscriber is not reading from this publisher.
    #[error("subscriber is not linked to this publisher")]
    NotLinked,
}
