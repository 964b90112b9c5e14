//! Bounded linear undo/redo.
//!
//! Each entry keeps both directions of its action, so redo re-applies the
//! forward change instead of only moving the cursor.

mod edit;

pub use edit::{
    EditTarget, RemovedObject, SceneEdit, StrokeDab, StrokeKind, StrokeRecord, TransformChange,
};
pub(crate) use edit::transform_payload;

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// An action that can be re-applied and reverted against a target.
pub trait Reversible<T: ?Sized> {
    fn apply(&self, target: &mut T);
    fn revert(&self, target: &mut T);
}

/// Closure-backed action, mostly for callers with ad-hoc state.
pub struct FnAction<T: ?Sized> {
    forward: Box<dyn Fn(&mut T)>,
    inverse: Box<dyn Fn(&mut T)>,
}

impl<T: ?Sized> FnAction<T> {
    pub fn new(forward: impl Fn(&mut T) + 'static, inverse: impl Fn(&mut T) + 'static) -> Self {
        Self {
            forward: Box::new(forward),
            inverse: Box::new(inverse),
        }
    }
}

impl<T: ?Sized> Reversible<T> for FnAction<T> {
    fn apply(&self, target: &mut T) {
        (self.forward)(target)
    }

    fn revert(&self, target: &mut T) {
        (self.inverse)(target)
    }
}

pub struct HistoryEntry<A> {
    pub label: String,
    pub action: A,
    pub timestamp: DateTime<Utc>,
}

/// Linear timeline of entries with a cursor.
///
/// `cursor` counts the entries currently applied: entries `[0, cursor)` can
/// be undone, entries `[cursor, len)` can be redone.
pub struct HistoryLog<A> {
    entries: VecDeque<HistoryEntry<A>>,
    cursor: usize,
    capacity: usize,
}

impl<A> HistoryLog<A> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    /// Records an action that has already been applied.
    pub fn record(&mut self, label: impl Into<String>, action: A) {
        self.entries.truncate(self.cursor);
        self.entries.push_back(HistoryEntry {
            label: label.into(),
            action,
            timestamp: Utc::now(),
        });
        self.cursor = self.entries.len();
        if self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                log::debug!("History full, evicted '{}'", evicted.label);
            }
            self.cursor -= 1;
        }
    }

    /// Reverts the entry before the cursor. Returns its label.
    pub fn undo<T: ?Sized>(&mut self, target: &mut T) -> Option<&str>
    where
        A: Reversible<T>,
    {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        let entry = &self.entries[self.cursor];
        entry.action.revert(target);
        Some(&entry.label)
    }

    /// Re-applies the entry at the cursor. Returns its label.
    pub fn redo<T: ?Sized>(&mut self, target: &mut T) -> Option<&str>
    where
        A: Reversible<T>,
    {
        let entry = self.entries.get(self.cursor)?;
        entry.action.apply(target);
        self.cursor += 1;
        Some(&entry.label)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.label.as_str()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry<A>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}
