use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Per-card-number admission control for payment creation.
///
/// A non-blocking test-and-set: a second caller for a held card number is
/// refused immediately instead of waiting. Released keys are removed, so the
/// set only ever holds in-flight card numbers.
#[derive(Debug, Default)]
pub struct AdmissionGate {
    held: Mutex<HashSet<String>>,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `card_number` as held. Returns `false` if it already was.
    pub fn try_acquire(&self, card_number: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(card_number.to_string())
    }

    pub fn release(&self, card_number: &str) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(card_number);
    }

    /// Acquires `card_number` and returns a permit that releases it on drop,
    /// or `None` under contention.
    pub fn admit(&self, card_number: &str) -> Option<AdmissionPermit<'_>> {
        self.try_acquire(card_number).then(|| AdmissionPermit {
            gate: self,
            card_number: card_number.to_string(),
        })
    }

    /// Number of card numbers currently held.
    pub fn in_flight(&self) -> usize {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held admission for one card number. Dropping it releases the key, so
/// every exit path of the holder releases exactly once.
#[must_use]
pub struct AdmissionPermit<'a> {
    gate: &'a AdmissionGate,
    card_number: String,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.gate.release(&self.card_number);
    }
}
