//! Page-facing event subscriptions.
//!
//! Listeners are registered per [`EventName`] and invoked in registration
//! order. Dispatch runs on a snapshot, so a listener may add or remove
//! listeners (itself included) without deadlocking.

use parking_lot::RwLock;
use serde_json::Value;
use shared_types::{EventName, ProviderEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by [`EventListeners::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct EventListeners {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<EventName, Vec<(ListenerId, Listener)>>>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, event: EventName, listener: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(event)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove one listener. Returns false if it was not registered.
    pub fn off(&self, event: EventName, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(list) = listeners.get_mut(&event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        before != list.len()
    }

    /// Remove every listener for `event`, or every listener when `None`.
    pub fn remove_all(&self, event: Option<EventName>) {
        let mut listeners = self.listeners.write();
        match event {
            Some(event) => {
                listeners.remove(&event);
            }
            None => listeners.clear(),
        }
    }

    pub fn listener_count(&self, event: EventName) -> usize {
        self.listeners.read().get(&event).map_or(0, Vec::len)
    }

    /// Deliver an event to its listeners. Returns how many were invoked.
    pub fn emit(&self, event: &ProviderEvent) -> usize {
        let snapshot: Vec<Listener> = match self.listeners.read().get(&event.name()) {
            Some(list) => list.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return 0,
        };
        let payload = event.payload();
        for listener in &snapshot {
            listener(&payload);
        }
        snapshot.len()
    }
}
