//! Discrete pipeline events and their broadcast.
//!
//! `EventBus` hands every event to each subscriber over a bounded channel.
//! A subscriber that stops draining loses new events once its queue is full;
//! one that dropped its receiver is pruned on the next emit.

use std::sync::Mutex;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::classification::SoundLabel;
use crate::trend::{CategoryTransition, SoundCategory};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineEvent {
    /// The loudness-trend category changed (edge-triggered)
    CategoryChanged {
        from: Option<SoundCategory>,
        to: SoundCategory,
    },
    /// A gated classification replaced the current label with a different one
    ClassificationChanged { label: SoundLabel, confidence: f32 },
}

impl From<CategoryTransition> for PipelineEvent {
    fn from(transition: CategoryTransition) -> Self {
        PipelineEvent::CategoryChanged {
            from: transition.from,
            to: transition.to,
        }
    }
}

/// Events buffered per subscriber before new ones are dropped
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Broadcast mechanism for pipeline events
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<PipelineEvent>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to events. Returns a receiver for future events; at most
    /// `EVENT_QUEUE_CAPACITY` undrained events are held for it.
    pub fn subscribe(&self) -> Receiver<PipelineEvent> {
        let (tx, rx) = bounded(EVENT_QUEUE_CAPACITY);
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| match tx.try_send(event) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|subs| subs.len()).unwrap_or(0)
    }
}
