use spine_model::{CmdClassifier, CmdPayload, FeatureAddress, Function};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventType {
    DataChange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementChange {
    Add,
    Update,
    Delete,
}

/// Data-change notification published by the device's event hub.
#[derive(Clone, Debug)]
pub struct EventPayload {
    pub ski: String,
    pub event_type: EventType,
    pub change_type: ElementChange,
    pub classifier: Option<CmdClassifier>,
    pub feature: FeatureAddress,
    pub function: Option<Function>,
    pub data: Option<CmdPayload>,
}

/// Fan-out point for data-change events. Owned by the local device and
/// handed to features at construction; every subscriber gets an independent
/// receiver.
pub struct EventHub {
    tx: broadcast::Sender<EventPayload>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventPayload> {
        self.tx.subscribe()
    }

    /// Publishing with no subscribers is a no-op.
    pub fn publish(&self, payload: EventPayload) {
        let _ = self.tx.send(payload);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
