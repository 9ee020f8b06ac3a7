//! Outbound packet queue shared by a module and its components.
//!
//! Every proxy of one module pushes into the same queue, so packets leave in
//! the order they were produced. The owner drains the queue and hands the
//! frames to the transport.

use crate::domain::Packet;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PacketSink {
    queue: Arc<Mutex<VecDeque<Packet>>>,
    class_channel: bool,
}

impl PacketSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to the same queue that tags every packet for the class
    /// discovery sub-channel.
    #[must_use]
    pub fn class_channel(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            class_channel: true,
        }
    }

    pub fn push(&self, packet: Packet) {
        let packet = if self.class_channel {
            packet.into_class_channel()
        } else {
            packet
        };
        self.queue.lock().push_back(packet);
    }

    /// Take every queued packet in production order.
    #[must_use]
    pub fn drain(&self) -> Vec<Packet> {
        self.queue.lock().drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Header;

    #[test]
    fn test_shared_queue_keeps_order() {
        let sink = PacketSink::new();
        let classes = sink.class_channel();

        sink.push(Packet::empty(Header::service(1, 1)));
        classes.push(Packet::empty(Header::service(2, 1)));
        sink.push(Packet::empty(Header::service(3, 1)));

        let drained = sink.drain();
        let ids: Vec<u8> = drained.iter().map(|p| p.header().object_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!drained[0].header().class_info);
        assert!(drained[1].header().class_info);
        assert!(sink.is_empty());
    }
}
