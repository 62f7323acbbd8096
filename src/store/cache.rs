use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

use super::{TopicIndex, TopicKey};

type Slot = Arc<OnceCell<Arc<TopicIndex>>>;

/// Per-key single-flight slots. The map lock is only held to find or insert
/// a slot; builds run outside it, and concurrent builders of one key await
/// the same `OnceCell`. A failed build leaves its slot empty for the next
/// caller to retry, and the last caller to give up removes it.
#[derive(Default)]
pub(super) struct IndexCache {
    slots: Mutex<HashMap<TopicKey, Slot>>,
}

impl IndexCache {
    fn lock(&self) -> MutexGuard<'_, HashMap<TopicKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn slot(&self, key: &TopicKey) -> Slot {
        self.lock().entry(key.clone()).or_default().clone()
    }

    /// Removes the slot for `key` if its build failed and no other caller
    /// still holds it. Callers must drop their own handle first.
    pub(super) fn discard_unbuilt(&self, key: &TopicKey) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get(key)
            && !slot.initialized()
            && Arc::strong_count(slot) == 1
        {
            slots.remove(key);
        }
    }

    #[cfg(test)]
    pub(super) fn slot_count(&self) -> usize {
        self.lock().len()
    }

    pub(super) fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub(super) fn clear(&self) {
        self.lock().clear();
    }
}
