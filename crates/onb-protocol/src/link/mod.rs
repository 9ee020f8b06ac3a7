//! # Object Link Engine
//!
//! Pub-sub edges between one component's output and another component's
//! input. Linking makes the subscriber read straight from the publisher's
//! write buffer; the engine remembers the edge and which publisher events
//! must trigger a send on the subscriber.
//!
//! ## Forwarding Policy
//!
//! | Publisher declares | Policy | Forwarded on |
//! |--------------------|--------|--------------|
//! | `needTimestamp`    | [`ForwardPolicy::Timed`] | every receive, with timestamp |
//! | `RMIP == 0`        | [`ForwardPolicy::OnReceive`] | every receive |
//! | `RMIP > 0`         | [`ForwardPolicy::OnChange`] | value change only |
//!
//! Objects are addressed by [`ObjectAddr`]; the engine never owns objects.
//! Callers pass the subscriber object in for the duration of `link`/`unlink`.

use crate::domain::{LinkError, Object, PublisherHandle};
use std::collections::BTreeMap;
use tracing::{debug, warn};


/// Address of one object: module name, component id, object id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectAddr {
    pub module: String,
    pub component: u16,
    pub object: u8,
}

impl ObjectAddr {
    pub fn new(module: impl Into<String>, component: u16, object: u8) -> Self {
        Self {
            module: module.into(),
            component,
            object,
        }
    }

    #[must_use]
    pub fn belongs_to(&self, module: &str, component: Option<u16>) -> bool {
        self.module == module && component.map_or(true, |c| c == self.component)
    }
}

/// How publisher activity is forwarded to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardPolicy {
    Timed,
    OnReceive,
    OnChange,
}

impl ForwardPolicy {
    #[must_use]
    pub fn for_publisher(publisher: &PublisherHandle) -> Self {
        if publisher.need_timestamp() {
            Self::Timed
        } else if publisher.rmip() == 0 {
            Self::OnReceive
        } else {
            Self::OnChange
        }
    }
}

/// Publisher activity reported by the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Received,
    Changed,
}

/// Result of a successful `link`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linked {
    pub policy: ForwardPolicy,
    /// `false` when the pair was already linked.
    pub fresh: bool,
}

/// One send the caller must perform on a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forward {
    pub subscriber: ObjectAddr,
    pub timed: bool,
}

/// One live edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub publisher: ObjectAddr,
    pub subscriber: ObjectAddr,
    pub policy: ForwardPolicy,
}

#[derive(Debug)]
struct Subscription {
    publisher: ObjectAddr,
    handle: PublisherHandle,
    policy: ForwardPolicy,
}

/// Directory of live object links.
#[derive(Debug, Default)]
pub struct LinkEngine {
    /// Keyed by subscriber; a subscriber reads from one publisher at a time.
    by_subscriber: BTreeMap<ObjectAddr, Subscription>,
}

impl LinkEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `subscriber` to `publisher`.
    ///
    /// Incompatible types leave both sides untouched. Re-linking the same
    /// pair is a no-op reported with `fresh == false`.
    pub fn link(
        &mut self,
        publisher: ObjectAddr,
        handle: &PublisherHandle,
        subscriber: ObjectAddr,
        subscriber_obj: &mut Object,
    ) -> Result<Linked, LinkError> {
        let policy = ForwardPolicy::for_publisher(handle);

        if let Some(existing) = self.by_subscriber.get(&subscriber) {
            if existing.publisher == publisher && subscriber_obj.is_linked() {
                return Ok(Linked {
                    policy: existing.policy,
                    fresh: false,
                });
            }
        }

        if let Err(e) = subscriber_obj.attach(handle) {
            warn!(publisher = ?publisher, subscriber = ?subscriber, error = %e, "Link refused");
            return Err(e);
        }

        debug!(publisher = ?publisher, subscriber = ?subscriber, policy = ?policy, "Objects linked");
        self.by_subscriber.insert(
            subscriber,
            Subscription {
                publisher,
                handle: handle.clone(),
                policy,
            },
        );
        Ok(Linked {
            policy,
            fresh: true,
        })
    }

    /// Undo a link; the subscriber reverts to its own buffer and no longer
    /// receives forwards. Returns the publisher it was linked to.
    pub fn unlink(
        &mut self,
        subscriber: &ObjectAddr,
        subscriber_obj: &mut Object,
    ) -> Result<ObjectAddr, LinkError> {
        let subscription = self
            .by_subscriber
            .remove(subscriber)
            .ok_or(LinkError::NotLinked)?;
        // a stale alias is dropped even if the object was re-created
        let _ = subscriber_obj.detach(&subscription.handle);
        debug!(publisher = ?subscription.publisher, subscriber = ?subscriber, "Objects unlinked");
        Ok(subscription.publisher)
    }

    /// Drop the record of a link whose subscriber object no longer exists.
    pub fn forget(&mut self, subscriber: &ObjectAddr) -> Option<ObjectAddr> {
        self.by_subscriber
            .remove(subscriber)
            .map(|s| s.publisher)
    }

    /// Sends to perform after publisher activity.
    #[must_use]
    pub fn forwards(&self, publisher: &ObjectAddr, trigger: Trigger) -> Vec<Forward> {
        self.by_subscriber
            .iter()
            .filter(|(_, s)| &s.publisher == publisher)
            .filter_map(|(subscriber, s)| {
                let timed = match (trigger, s.policy) {
                    (Trigger::Received, ForwardPolicy::Timed) => true,
                    (Trigger::Received, ForwardPolicy::OnReceive)
                    | (Trigger::Changed, ForwardPolicy::OnChange) => false,
                    _ => return None,
                };
                Some(Forward {
                    subscriber: subscriber.clone(),
                    timed,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn publisher_of(&self, subscriber: &ObjectAddr) -> Option<&ObjectAddr> {
        self.by_subscriber.get(subscriber).map(|s| &s.publisher)
    }

    #[must_use]
    pub fn is_linked(&self, publisher: &ObjectAddr, subscriber: &ObjectAddr) -> bool {
        self.publisher_of(subscriber) == Some(publisher)
    }

    /// Every edge with either end in the given module (and component).
    #[must_use]
    pub fn edges_touching(&self, module: &str, component: Option<u16>) -> Vec<Edge> {
        self.edges()
            .filter(|e| {
                e.publisher.belongs_to(module, component) || e.subscriber.belongs_to(module, component)
            })
            .collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.by_subscriber.iter().map(|(subscriber, s)| Edge {
            publisher: s.publisher.clone(),
            subscriber: subscriber.clone(),
            policy: s.policy,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_subscriber.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_subscriber.is_empty()
    }
}
