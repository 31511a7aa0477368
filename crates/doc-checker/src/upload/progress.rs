use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CAPACITY: usize = 256;

/// Change to the progress map, broadcast to subscribers in the order applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Advanced { requirement_id: String, percent: u8 },
    Cleared { requirement_id: String },
}

/// Claim on a requirement's transfer slot. Only the most recent claim for a
/// requirement may move or clear its progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTicket {
    requirement_id: String,
    attempt: u64,
}

impl TransferTicket {
    pub fn requirement_id(&self) -> &str {
        &self.requirement_id
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    attempt: u64,
    percent: Option<u8>,
}

/// Ephemeral per-requirement upload progress, kept apart from requirement and
/// status data.
#[derive(Debug)]
pub struct ProgressTracker {
    slots: Mutex<HashMap<String, Slot>>,
    next_attempt: AtomicU64,
    events: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            slots: Mutex::new(HashMap::new()),
            next_attempt: AtomicU64::new(1),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Takes the transfer slot for `requirement_id`, superseding any transfer
    /// that still holds it. Nothing is displayed until the first advance.
    pub fn claim(&self, requirement_id: &str) -> TransferTicket {
        let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        let previous = self.lock().insert(
            requirement_id.to_string(),
            Slot {
                attempt,
                percent: None,
            },
        );
        if let Some(previous) = previous {
            debug!(
                requirement_id,
                superseded_attempt = previous.attempt,
                "new transfer supersedes one still in flight"
            );
        }

        TransferTicket {
            requirement_id: requirement_id.to_string(),
            attempt,
        }
    }

    /// Records `percent` for the ticket's requirement. Ignored when the ticket
    /// was superseded or the value would move progress backwards.
    pub fn advance(&self, ticket: &TransferTicket, percent: u8) -> bool {
        let percent = percent.min(100);
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(&ticket.requirement_id) else {
            return false;
        };
        if slot.attempt != ticket.attempt || slot.percent.is_some_and(|current| percent <= current)
        {
            return false;
        }

        slot.percent = Some(percent);
        let _ = self.events.send(ProgressEvent::Advanced {
            requirement_id: ticket.requirement_id.clone(),
            percent,
        });
        true
    }

    /// Removes the ticket's progress if the ticket still owns the slot.
    pub fn clear(&self, ticket: &TransferTicket) -> bool {
        let mut slots = self.lock();
        let owned = slots
            .get(&ticket.requirement_id)
            .is_some_and(|slot| slot.attempt == ticket.attempt);
        if !owned {
            return false;
        }

        slots.remove(&ticket.requirement_id);
        let _ = self.events.send(ProgressEvent::Cleared {
            requirement_id: ticket.requirement_id.clone(),
        });
        true
    }

    pub fn owns_slot(&self, ticket: &TransferTicket) -> bool {
        self.lock()
            .get(&ticket.requirement_id)
            .is_some_and(|slot| slot.attempt == ticket.attempt)
    }

    pub fn percent(&self, requirement_id: &str) -> Option<u8> {
        self.lock().get(requirement_id).and_then(|slot| slot.percent)
    }

    /// Displayed progress by requirement id.
    pub fn snapshot(&self) -> BTreeMap<String, u8> {
        self.lock()
            .iter()
            .filter_map(|(id, slot)| slot.percent.map(|percent| (id.clone(), percent)))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
