//! Scheme connections onto live object links.
//!
//! A link is the data side of a connection: the subscriber reads the
//! publisher's buffer. On top of that the publisher output is subscribed on
//! the module, rate-limited publishers get a poll timer at the connection's
//! RMIP, and locally polled buses get an auto-request timer.

use super::Hub;
use crate::ports::TimerKey;
use hub_telemetry::LINKS_ACTIVE;
use onb_protocol::{Edge, ForwardPolicy, Object, ObjectAddr, Subscription, Trigger};
use scheme_store::ComponentConnection;
use shared_bus::HubEvent;
use std::time::Duration;
use tracing::{debug, info};

impl Hub {
    /// Switch data flow on or off.
    ///
    /// Every link is torn down first; when enabling, every enabled
    /// connection is linked again.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        info!(enabled, "Hub links {}", if enabled { "enabled" } else { "disabled" });
        self.publish(HubEvent::EnableChanged { enabled });
        self.relink();
        self.flush();
    }

    /// Unlink everything, then link each enabled connection if the hub is
    /// enabled.
    pub(super) fn relink(&mut self) {
        self.unlink_all();
        if self.enabled {
            let connections: Vec<ComponentConnection> = self
                .scheme
                .iter()
                .flat_map(|s| s.connections())
                .filter(|c| c.enabled)
                .cloned()
                .collect();
            for conn in &connections {
                self.link_connection(conn);
            }
        }
        self.update_link_gauge();
    }

    /// Link the enabled connections touching one component.
    pub(super) fn link_component(&mut self, name: &str) {
        let connections: Vec<ComponentConnection> = self
            .scheme
            .iter()
            .flat_map(|s| s.connections())
            .filter(|c| c.enabled && c.touches(name))
            .cloned()
            .collect();
        for conn in &connections {
            self.link_connection(conn);
        }
        self.update_link_gauge();
    }

    /// Link one connection. Returns `false` when an endpoint is not live or
    /// the objects are incompatible; the next reconciliation retries.
    pub(super) fn link_connection(&mut self, conn: &ComponentConnection) -> bool {
        let key = conn.key();
        let Some(publisher) = self.resolve_object(&conn.output_component, &conn.output_name) else {
            debug!(connection = %key, "Publisher not live, link deferred");
            return false;
        };
        let Some(subscriber) = self.resolve_object(&conn.input_component, &conn.input_name) else {
            debug!(connection = %key, "Subscriber not live, link deferred");
            return false;
        };
        let Some(handle) = self.object(&publisher).and_then(Object::publisher_handle) else {
            debug!(connection = %key, "Publisher has no write buffer");
            return false;
        };

        let Some(subscriber_obj) = self
            .modules
            .get_mut(&subscriber.module)
            .and_then(|m| m.component_mut(subscriber.component))
            .and_then(|c| c.object_mut(subscriber.object))
        else {
            return false;
        };
        let linked = match self
            .links
            .link(publisher.clone(), &handle, subscriber.clone(), subscriber_obj)
        {
            Ok(linked) => linked,
            Err(e) => {
                debug!(connection = %key, error = %e, "Link refused");
                return false;
            }
        };

        let rmip = if conn.rmip > 0 {
            conn.rmip
        } else {
            u32::from(handle.rmip())
        };
        if linked.fresh {
            self.subscribe_publisher(&publisher, &conn.output_name, rmip);
        }
        if linked.policy == ForwardPolicy::OnChange && rmip > 0 {
            self.add_publisher_poll(publisher, subscriber, rmip);
        }
        true
    }

    /// Tear down every live link and every poll.
    pub(super) fn unlink_all(&mut self) {
        let edges: Vec<Edge> = self.links.edges().collect();
        for edge in &edges {
            self.unlink_edge(edge);
        }
        for publisher in std::mem::take(&mut self.publisher_polls).into_keys() {
            self.timers.cancel(&TimerKey::PublisherPoll(publisher));
        }
        self.update_link_gauge();
    }

    /// Tear down one link. The publisher is unsubscribed once nothing reads
    /// from it any more.
    pub(super) fn unlink_edge(&mut self, edge: &Edge) {
        let subscriber_obj = self
            .modules
            .get_mut(&edge.subscriber.module)
            .and_then(|m| m.component_mut(edge.subscriber.component))
            .and_then(|c| c.object_mut(edge.subscriber.object));
        match subscriber_obj {
            Some(obj) => {
                if let Err(e) = self.links.unlink(&edge.subscriber, obj) {
                    debug!(subscriber = ?edge.subscriber, error = %e, "Unlink skipped");
                }
            }
            None => {
                self.links.forget(&edge.subscriber);
            }
        }
        self.remove_publisher_poll(&edge.publisher, &edge.subscriber);

        if self.links.edges().any(|e| e.publisher == edge.publisher) {
            return;
        }
        self.timers
            .cancel(&TimerKey::AutoRequest(edge.publisher.clone()));
        let Some(component) = self
            .modules
            .get_mut(&edge.publisher.module)
            .and_then(|m| m.component_mut(edge.publisher.component))
        else {
            return;
        };
        let Some(name) = component
            .object(edge.publisher.object)
            .map(|o| o.name().to_string())
        else {
            return;
        };
        if let Err(e) = component.unsubscribe(&name) {
            debug!(publisher = ?edge.publisher, error = %e, "Unsubscribe skipped");
        }
    }

    /// Send whatever publisher activity must reach its subscribers.
    pub(super) fn forward(&self, publisher: &ObjectAddr, trigger: Trigger) {
        for fwd in self.links.forwards(publisher, trigger) {
            let Some(component) = self
                .modules
                .get(&fwd.subscriber.module)
                .and_then(|m| m.component(fwd.subscriber.component))
            else {
                continue;
            };
            if fwd.timed {
                component.send_timed_object(fwd.subscriber.object);
            } else {
                component.send_object(fwd.subscriber.object);
            }
        }
    }

    pub(super) fn update_link_gauge(&self) {
        LINKS_ACTIVE.set(self.links.len() as i64);
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn resolve_object(&self, component: &str, object: &str) -> Option<ObjectAddr> {
        let live = self.components_by_name.get(component)?;
        let oid = self
            .modules
            .get(&live.module)?
            .component(live.id)?
            .object_id(object)?;
        Some(ObjectAddr::new(live.module.clone(), live.id, oid))
    }

    fn object(&self, addr: &ObjectAddr) -> Option<&Object> {
        self.modules
            .get(&addr.module)?
            .component(addr.component)?
            .object(addr.object)
    }

    fn subscribe_publisher(&mut self, publisher: &ObjectAddr, output: &str, rmip: u32) {
        let Some(component) = self
            .modules
            .get_mut(&publisher.module)
            .and_then(|m| m.component_mut(publisher.component))
        else {
            return;
        };
        let period_ms = i32::try_from(rmip).unwrap_or(i32::MAX);
        match component.subscribe(output, period_ms) {
            Ok(Subscription::Remote) => {}
            Ok(Subscription::LocalPoll(period)) => {
                let period = if period == 0 {
                    self.config.instance_poll_interval
                } else {
                    Duration::from_millis(u64::from(period))
                };
                self.timers
                    .arm(TimerKey::AutoRequest(publisher.clone()), period);
            }
            Err(e) => debug!(publisher = ?publisher, error = %e, "Publisher not subscribed"),
        }
    }

    /// Poll a rate-limited publisher at the shortest period any of its
    /// subscribers asks for.
    fn add_publisher_poll(&mut self, publisher: ObjectAddr, subscriber: ObjectAddr, period_ms: u32) {
        let periods = self.publisher_polls.entry(publisher.clone()).or_default();
        periods.insert(subscriber, period_ms);
        let shortest = periods.values().copied().min().unwrap_or(period_ms);
        self.timers.arm(
            TimerKey::PublisherPoll(publisher),
            Duration::from_millis(u64::from(shortest)),
        );
    }

    fn remove_publisher_poll(&mut self, publisher: &ObjectAddr, subscriber: &ObjectAddr) {
        let Some(periods) = self.publisher_polls.get_mut(publisher) else {
            return;
        };
        if periods.remove(subscriber).is_none() {
            return;
        }
        match periods.values().copied().min() {
            Some(shortest) => self.timers.arm(
                TimerKey::PublisherPoll(publisher.clone()),
                Duration::from_millis(u64::from(shortest)),
            ),
            None => {
                self.publisher_polls.remove(publisher);
                self.timers.cancel(&TimerKey::PublisherPoll(publisher.clone()));
            }
        }
    }
}
