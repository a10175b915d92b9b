//! Tracked entries and the tracker that stages them.
//!
//! An [`EntryTracker`] turns raw rows into [`TrackedEntry`] values whose
//! [`EntityState`] says what a save executor should do with them. Trackers are
//! short-lived: provisioning creates one per call and drops it after saving.

use crate::metadata::EntityType;
use crate::value::Row;
use std::sync::Arc;

/// Lifecycle state of a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityState {
    /// Not tracked; ignored on save
    #[default]
    Detached,
    /// Tracked and unchanged; ignored on save
    Unchanged,
    /// To be inserted
    Added,
    /// To be updated
    Modified,
    /// To be removed
    Deleted,
}

impl EntityState {
    /// Whether a save executor has work to do for this state.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            EntityState::Added | EntityState::Modified | EntityState::Deleted
        )
    }
}

/// A staged write: a row, its entity type and what to do with it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntry {
    entity_type: Arc<EntityType>,
    values: Row,
    state: EntityState,
}

impl TrackedEntry {
    /// Create a detached entry.
    pub fn new(entity_type: Arc<EntityType>, values: Row) -> Self {
        Self {
            entity_type,
            values,
            state: EntityState::Detached,
        }
    }

    /// Entity type of the row.
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.entity_type
    }

    /// Row values.
    pub fn values(&self) -> &Row {
        &self.values
    }

    /// Current state.
    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Change the state.
    pub fn set_state(&mut self, state: EntityState) {
        self.state = state;
    }
}

/// Stages tracked entries for a single save.
#[derive(Debug, Default)]
pub struct EntryTracker {
    entries: Vec<TrackedEntry>,
}

impl EntryTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `values` as a detached entry of `entity_type` and return it for
    /// the caller to set its state.
    pub fn create_entry(&mut self, values: Row, entity_type: &Arc<EntityType>) -> &mut TrackedEntry {
        self.entries
            .push(TrackedEntry::new(Arc::clone(entity_type), values));
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    /// Entries with pending work, in staging order.
    pub fn entries_to_save(&self) -> Vec<TrackedEntry> {
        self.entries
            .iter()
            .filter(|e| e.state().is_pending())
            .cloned()
            .collect()
    }

    /// Number of tracked entries, pending or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Creates entry trackers.
pub trait EntryTrackerFactory: Send + Sync {
    /// Create a fresh, empty tracker.
    fn create(&self) -> EntryTracker;
}

/// Factory returning plain [`EntryTracker`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEntryTrackerFactory;

impl EntryTrackerFactory for DefaultEntryTrackerFactory {
    fn create(&self) -> EntryTracker {
        EntryTracker::new()
    }
}
