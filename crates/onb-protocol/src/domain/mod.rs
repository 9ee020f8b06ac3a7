//! Domain layer: wire types, values and live objects.

pub mod description;
pub mod errors;
pub mod object;
pub mod packet;
pub mod svc;
pub mod value;

pub use description::{ExtendedInfo, MetaKind, ObjectDescription, ObjectFlags, ObjectMeta};
pub use errors::{ComponentError, DecodeError, LinkError, ModuleError, PacketError, ValueError};
pub use object::{Object, ObjectBuffer, PublisherHandle, SharedBuffer};
pub use packet::{Header, Packet, HEADER_LEN};
pub use svc::BusType;
pub use value::{Layout, Value, ValueType};
