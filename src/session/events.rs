//! Session events and subscriber streams.
//!
//! Each subscriber owns a bounded channel. Publishing never blocks: a full
//! buffer drops the event for that subscriber, and disconnected subscribers
//! are pruned.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::generator::Strategy;
use crate::rule::{Decision, RuleId};

/// Something that happened to a session's rule set.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A generated rule joined the set.
    RuleAdded {
        rule_id: RuleId,
        description: String,
        decision: Decision,
        specificity: usize,
        difficulty: u32,
        strategy: Strategy,
    },

    /// The set reached its configured size; no more rules will be generated.
    MaxRulesReached {
        rule_count: usize,
    },

    /// A milestone passed without a new rule.
    GenerationFailed {
        difficulty: u32,
        attempts: u32,
    },

    /// The set was cleared and reseeded.
    RulesReset {
        rule_count: usize,
    },
}

/// Receiving half of a session subscription.
#[derive(Debug)]
pub struct EventStream {
    rx: Receiver<SessionEvent>,
}

impl EventStream {
    /// Next buffered event, if any.
    #[must_use]
    pub fn try_recv(&self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout or once the session is gone and the buffer
    /// is empty.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Takes every buffered event.
    #[must_use]
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.rx.try_iter().collect()
    }
}

#[derive(Debug)]
pub(crate) struct EventHub {
    subscribers: Vec<Sender<SessionEvent>>,
    capacity: usize,
}

impl EventHub {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            subscribers: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn subscribe(&mut self) -> EventStream {
        let (tx, rx) = bounded(self.capacity);
        self.subscribers.push(tx);
        EventStream { rx }
    }

    pub(crate) fn publish(&mut self, event: &SessionEvent) {
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("event buffer full; dropping event for subscriber");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
