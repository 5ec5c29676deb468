//! Event bus announcing module load/unload/error events.
//!
//! The bus distributes [`HostEvent`]s to all subscribers over a broadcast
//! channel. Publishing is synchronous: the registry runs on the host's
//! single control thread and must be able to emit an event mid-operation
//! (for example between list removal and finalizer invocation) without
//! suspending.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::event::{EventMetadata, HostEvent};

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast bus for host events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<(HostEvent, EventMetadata)>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus buffering up to `capacity` events for slow subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event. Returns `true` if at least one subscriber
    /// received it; with no subscribers the event is discarded.
    pub fn publish(&self, event: HostEvent) -> bool {
        self.publish_with_source(event, "registry")
    }

    /// Publish an event with a custom source.
    pub fn publish_with_source(&self, event: HostEvent, source: impl Into<String>) -> bool {
        let metadata = EventMetadata::new(source);
        self.tx.send((event, metadata)).is_ok()
    }

    /// Subscribe to all events.
    pub fn subscribe(&self) -> EventBusReceiver {
        EventBusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Subscribe to events matching a filter predicate.
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&HostEvent) -> bool + Send + 'static,
    {
        FilteredReceiver::new(self.tx.subscribe(), filter)
    }

    /// Filtered subscription helpers for common patterns.
    pub fn filter(&self) -> FilterBuilder {
        FilterBuilder {
            tx: self.tx.clone(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Receiver for all events from the bus.
pub struct EventBusReceiver {
    rx: broadcast::Receiver<(HostEvent, EventMetadata)>,
}

impl EventBusReceiver {
    /// Receive the next event. Returns `None` once the bus is closed.
    pub async fn recv(&mut self) -> Option<(HostEvent, EventMetadata)> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => self.rx.try_recv().ok(),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<(HostEvent, EventMetadata)> {
        self.rx.try_recv().ok()
    }
}

/// Receiver delivering only events that match a filter.
pub struct FilteredReceiver<F>
where
    F: Fn(&HostEvent) -> bool + Send,
{
    rx: broadcast::Receiver<(HostEvent, EventMetadata)>,
    filter: F,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&HostEvent) -> bool + Send,
{
    fn new(rx: broadcast::Receiver<(HostEvent, EventMetadata)>, filter: F) -> Self {
        Self { rx, filter }
    }

    /// Receive the next matching event. Returns `None` once the bus closes.
    pub async fn recv(&mut self) -> Option<(HostEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok((event, meta)) => {
                    if (self.filter)(&event) {
                        return Some((event, meta));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive a matching event without blocking.
    pub fn try_recv(&mut self) -> Option<(HostEvent, EventMetadata)> {
        while let Ok((event, meta)) = self.rx.try_recv() {
            if (self.filter)(&event) {
                return Some((event, meta));
            }
        }
        None
    }
}

/// Builder for common filtered subscriptions.
pub struct FilterBuilder {
    tx: broadcast::Sender<(HostEvent, EventMetadata)>,
}

impl FilterBuilder {
    /// Subscribe to load events only.
    pub fn loaded(&self) -> FilteredReceiver<fn(&HostEvent) -> bool> {
        FilteredReceiver::new(self.tx.subscribe(), |event| {
            matches!(event, HostEvent::ModuleLoaded { .. })
        })
    }

    /// Subscribe to unload events only.
    pub fn unloaded(&self) -> FilteredReceiver<fn(&HostEvent) -> bool> {
        FilteredReceiver::new(self.tx.subscribe(), |event| {
            matches!(event, HostEvent::ModuleUnloaded { .. })
        })
    }

    /// Subscribe to load-failure events only.
    pub fn errors(&self) -> FilteredReceiver<fn(&HostEvent) -> bool> {
        FilteredReceiver::new(self.tx.subscribe(), HostEvent::is_error)
    }

    /// Subscribe to events concerning one module name.
    pub fn module(
        &self,
        name: impl Into<String>,
    ) -> FilteredReceiver<impl Fn(&HostEvent) -> bool + Send + 'static> {
        let target = name.into();
        FilteredReceiver::new(self.tx.subscribe(), move |event| {
            event.module_name().eq_ignore_ascii_case(&target)
        })
    }

    /// Subscribe with a custom filter function.
    pub fn custom<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&HostEvent) -> bool + Send + 'static,
    {
        FilteredReceiver::new(self.tx.subscribe(), filter)
    }
}

/// Shared event bus handle.
pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModuleError;
    use crate::event::ModuleInfo;
    use chrono::Utc;
    use std::path::PathBuf;

    fn loaded(name: &str) -> HostEvent {
        HostEvent::ModuleLoaded {
            module: ModuleInfo {
                name: name.to_string(),
                path: PathBuf::from(format!("lib{name}.so")),
                loaded_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn publish_subscribe() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(loaded("proxy"));

        let (event, meta) = rx.recv().await.unwrap();
        assert_eq!(event.type_name(), "ModuleLoaded");
        assert_eq!(meta.source, "registry");
    }

    #[tokio::test]
    async fn multiple_subscribers_see_every_event() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(loaded("proxy"));

        assert_eq!(rx1.recv().await.unwrap().0.module_name(), "proxy");
        assert_eq!(rx2.recv().await.unwrap().0.module_name(), "proxy");
    }

    #[test]
    fn publish_without_subscribers_discards() {
        let bus = EventBus::new();
        assert!(!bus.publish(loaded("proxy")));
    }

    #[tokio::test]
    async fn error_filter() {
        let bus = EventBus::new();
        let mut rx = bus.filter().errors();

        bus.publish(loaded("proxy"));
        bus.publish(HostEvent::ModuleError {
            error: ModuleError::NotFound("stats".to_string()),
        });

        let (event, _) = rx.recv().await.unwrap();
        assert!(event.is_error());
        assert_eq!(event.module_name(), "stats");
    }

    #[tokio::test]
    async fn module_filter_is_case_insensitive() {
        let bus = EventBus::new();
        let mut rx = bus.filter().module("Proxy");

        bus.publish(loaded("stats"));
        bus.publish(loaded("proxy"));

        let (event, _) = rx.recv().await.unwrap();
        assert_eq!(event.module_name(), "proxy");
    }

    #[test]
    fn try_recv_filtered() {
        let bus = EventBus::new();
        let mut rx = bus.filter().unloaded();

        bus.publish(loaded("proxy"));
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn custom_source() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish_with_source(loaded("proxy"), "autoload");

        let (_, meta) = rx.recv().await.unwrap();
        assert_eq!(meta.source, "autoload");
    }
}
