//! Controller event stream.
//!
//! The UI binding layer subscribes here to know when to re-render; the core
//! never calls back into the UI directly. Sending never fails: events emitted
//! with no live subscriber are dropped.

use tokio::sync::broadcast;

use crate::export::ExportFormat;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// A filter mutation or reset committed, starting a new result epoch.
    FiltersChanged { epoch: u64 },
    /// The accumulated result list changed (first page replaced or a page appended).
    ResultsUpdated {
        count: usize,
        total_count: u64,
        has_next_page: bool,
    },
    /// A page fetch failed; the accumulated list is unchanged.
    FetchFailed { message: String },
    ExportStarted { format: ExportFormat },
    ExportFinished { file_name: String, rows: Option<u64> },
    ExportFailed { message: String },
    /// Credential refresh failed; local credentials were cleared.
    SessionExpired,
    SubscriptionUpdated,
}

/// Cloneable pub-sub handle shared by every service that reports state changes.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ControllerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ControllerEvent) {
        // No receivers is fine; the CLI may not be listening.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(ControllerEvent::FiltersChanged { epoch: 3 });

        match rx.recv().await {
            Ok(ControllerEvent::FiltersChanged { epoch }) => assert_eq!(epoch, 3),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.emit(ControllerEvent::SubscriptionUpdated);
    }
}
