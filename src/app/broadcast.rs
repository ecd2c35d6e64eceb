//! Event broadcaster — fan-out of named events to long-lived listeners.
//!
//! Listeners are event-stream clients and WebSocket peers that asked for
//! system notifications. Subscription is independent of the command
//! channel: broadcast events never travel through a response sink, and a
//! response never travels through the broadcaster.

use core::fmt::Write;

use log::debug;

use crate::config::EVENT_KEEPALIVE_MS;

use super::events::{AppEvent, CHANNEL_HELLO};
use super::ports::EventSink;

/// Opaque handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u32);

/// Receives every broadcast event as `(channel, message)`.
pub trait EventListener {
    fn on_event(&mut self, channel: &str, message: &str);
}

/// Fan-out channel for system notifications.
///
/// Bounded only by memory; in practice the listener count tracks the
/// handful of connected browsers. No delivery-order guarantee between
/// listeners, only per-listener ordering.
pub struct EventBroadcaster {
    listeners: Vec<(ListenerId, Box<dyn EventListener>)>,
    next_id: u32,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a listener and greet it with the hello event carrying the
    /// keep-alive interval, mirroring what the event-stream surface sends
    /// on connect.
    pub fn subscribe(&mut self, mut listener: Box<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let mut hello: heapless::String<32> = heapless::String::new();
        let _ = write!(hello, "hello! keepalive={EVENT_KEEPALIVE_MS}");
        listener.on_event(CHANNEL_HELLO, &hello);

        self.listeners.push((id, listener));
        debug!("broadcast: listener {:?} subscribed", id);
        id
    }

    /// Drop a listener. Safe to call with an already-removed id (the
    /// disconnect and error paths can race on the same peer).
    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
        debug!("broadcast: listener {:?} unsubscribed", id);
    }

    /// Deliver a named event to every current listener.
    pub fn publish(&mut self, event: &AppEvent) {
        let channel = event.channel();
        let message = event.message();
        for (_, listener) in &mut self.listeners {
            listener.on_event(channel, &message);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl EventSink for EventBroadcaster {
    fn emit(&mut self, event: &AppEvent) {
        self.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<(String, String)>>>);

    impl EventListener for Recorder {
        fn on_event(&mut self, channel: &str, message: &str) {
            self.0.borrow_mut().push((channel.into(), message.into()));
        }
    }

    #[test]
    fn subscribe_sends_hello_exactly_once() {
        let mut b = EventBroadcaster::new();
        let rec = Recorder::default();
        b.subscribe(Box::new(rec.clone()));
        let seen = rec.0.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "hello");
        assert!(seen[0].1.contains("keepalive=1000"));
    }

    #[test]
    fn publish_reaches_every_listener() {
        let mut b = EventBroadcaster::new();
        let a = Recorder::default();
        let c = Recorder::default();
        b.subscribe(Box::new(a.clone()));
        b.subscribe(Box::new(c.clone()));

        b.publish(&AppEvent::UpdateProgress { bytes: 42 });

        assert_eq!(a.0.borrow().last().unwrap().0, "ota");
        assert_eq!(c.0.borrow().last().unwrap().1, "Progress: 42B");
    }

    #[test]
    fn unsubscribed_listener_receives_nothing_further() {
        let mut b = EventBroadcaster::new();
        let rec = Recorder::default();
        let id = b.subscribe(Box::new(rec.clone()));
        b.unsubscribe(id);
        b.publish(&AppEvent::UpdateProgress { bytes: 1 });
        // Only the hello remains recorded.
        assert_eq!(rec.0.borrow().len(), 1);
        assert_eq!(b.listener_count(), 0);
    }

    #[test]
    fn unsubscribe_twice_is_harmless() {
        let mut b = EventBroadcaster::new();
        let id = b.subscribe(Box::new(Recorder::default()));
        b.unsubscribe(id);
        b.unsubscribe(id);
        assert_eq!(b.listener_count(), 0);
    }
}
