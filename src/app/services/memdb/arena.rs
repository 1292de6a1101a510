//! Append-only slot storage
//!
//! Entities live in `Option<T>` cells addressed by their position. Removing an
//! entity leaves a hole; holes are never reused, so a slot id held by an index
//! or by another entity can never start pointing at a different entity.

use crate::app::models::SlotId;
use crate::{Error, Result};

/// Slot-addressed entity storage
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity and return its slot id
    pub fn add(&mut self, value: T) -> SlotId {
        self.slots.push(Some(value));
        self.live += 1;
        self.slots.len() - 1
    }

    /// Entity at `id`, or `None` for holes and out of range ids
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id).and_then(Option::as_mut)
    }

    /// Like [`Arena::get`], reporting missing entities as errors
    pub fn try_get(&self, id: SlotId) -> Result<&T> {
        self.get(id)
            .ok_or_else(|| Error::not_found(format!("no entity at slot {}", id)))
    }

    pub fn try_get_mut(&mut self, id: SlotId) -> Result<&mut T> {
        self.get_mut(id)
            .ok_or_else(|| Error::not_found(format!("no entity at slot {}", id)))
    }

    /// Turn a slot into a hole, returning the entity it held
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let removed = self.slots.get_mut(id).and_then(Option::take);
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live entities
    pub fn count_live(&self) -> usize {
        self.live
    }

    /// Number of slots ever issued, holes included
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live entities in ascending slot order
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|value| (id, value)))
    }

    /// Drop every entity and restart slot numbering
    ///
    /// Only valid when nothing outside the arena refers to its slots anymore.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.live = 0;
    }
}
