//! Undo/redo log
//!
//! A bounded list of reversible placements and deletions with a cursor.
//! The log only orders entries; the sandbox applies them to the world.
//!
//! `applied` counts the entries currently in effect, so the classic cursor
//! index is `applied - 1`: zero applied means nothing to undo, all applied
//! means nothing to redo.

use super::factory::EntityKind;
use super::seesaw::Seesaw;
use super::world::BodyHandle;
use crate::Pose;

/// Default number of retained actions
pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Place,
    Delete,
}

/// What an action touched. Updated in place whenever undo/redo re-creates
/// the object, so the entry always names the newest incarnation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Body(BodyHandle),
    Seesaw(Seesaw),
}

/// One user-initiated placement or deletion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub entity: EntityKind,
    /// Pose at the time of the action (pivot position for seesaws)
    pub pose: Pose,
    pub target: Target,
}

#[derive(Debug, Clone)]
pub struct ActionHistory {
    entries: Vec<Action>,
    applied: usize,
    capacity: usize,
}

impl Default for ActionHistory {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl ActionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            applied: 0,
            capacity: capacity.max(1),
        }
    }

    /// Append an action, discarding any undone tail and the oldest entries
    /// beyond capacity
    pub fn record(&mut self, action: Action) {
        self.entries.truncate(self.applied);
        self.entries.push(action);
        self.applied += 1;

        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
            self.applied -= excess;
        }
        log::debug!(
            "History: recorded {:?} {} ({}/{})",
            action.kind,
            action.entity,
            self.applied,
            self.entries.len()
        );
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Cursor position, `None` when nothing can be undone
    pub fn index(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }

    /// Step the cursor back over the newest applied action, handing it to
    /// `revert`. The cursor moves whatever `revert` reports.
    pub fn undo_with<R>(&mut self, revert: impl FnOnce(&mut Action) -> R) -> Option<R> {
        let index = self.index()?;
        let result = revert(&mut self.entries[index]);
        self.applied -= 1;
        Some(result)
    }

    /// Step the cursor forward over the oldest undone action, handing it to
    /// `apply`
    pub fn redo_with<R>(&mut self, apply: impl FnOnce(&mut Action) -> R) -> Option<R> {
        if !self.can_redo() {
            return None;
        }
        self.applied += 1;
        Some(apply(&mut self.entries[self.applied - 1]))
    }

    /// Point every entry naming `from` at `to`
    pub fn retarget(&mut self, from: Target, to: Target) {
        for entry in &mut self.entries {
            if entry.target == from {
                entry.target = to;
            }
        }
    }

    pub fn entries(&self) -> &[Action] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(n: u64) -> Action {
        Action {
            kind: ActionKind::Place,
            entity: EntityKind::Ball,
            pose: Pose::new(n as f32, 0.0, 0.0),
            target: Target::Body(BodyHandle(n)),
        }
    }

    #[test]
    fn test_empty_history() {
        let mut history = ActionHistory::new(10);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.index(), None);
        assert!(history.undo_with(|_| ()).is_none());
        assert!(history.redo_with(|_| ()).is_none());
    }

    #[test]
    fn test_undo_redo_walks_cursor() {
        let mut history = ActionHistory::new(10);
        history.record(place(1));
        history.record(place(2));
        assert_eq!(history.index(), Some(1));

        let undone = history.undo_with(|a| a.target).unwrap();
        assert_eq!(undone, Target::Body(BodyHandle(2)));
        assert_eq!(history.index(), Some(0));
        assert!(history.can_redo());

        let redone = history.redo_with(|a| a.target).unwrap();
        assert_eq!(redone, Target::Body(BodyHandle(2)));
        assert_eq!(history.index(), Some(1));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_truncates_future() {
        let mut history = ActionHistory::new(10);
        for n in 1..=4 {
            history.record(place(n));
        }
        history.undo_with(|_| ());
        history.undo_with(|_| ());
        history.record(place(9));

        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        assert_eq!(history.index(), Some(history.len() - 1));
    }

    #[test]
    fn test_capacity_prunes_oldest() {
        let mut history = ActionHistory::new(3);
        for n in 1..=5 {
            history.record(place(n));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.index(), Some(2));
        assert_eq!(history.entries()[0].target, Target::Body(BodyHandle(3)));

        let mut undone = 0;
        while history.undo_with(|_| ()).is_some() {
            undone += 1;
        }
        assert_eq!(undone, 3);
    }

    #[test]
    fn test_revert_can_rewrite_target() {
        let mut history = ActionHistory::new(10);
        history.record(place(1));
        history.undo_with(|_| ());
        history.redo_with(|a| a.target = Target::Body(BodyHandle(7)));
        assert_eq!(history.entries()[0].target, Target::Body(BodyHandle(7)));
    }

    #[test]
    fn test_retarget_follows_recreated_object() {
        let mut history = ActionHistory::new(10);
        history.record(place(1));
        history.record(Action {
            kind: ActionKind::Delete,
            ..place(1)
        });
        history.record(place(2));

        history.retarget(Target::Body(BodyHandle(1)), Target::Body(BodyHandle(5)));
        let targets: Vec<Target> = history.entries().iter().map(|a| a.target).collect();
        assert_eq!(
            targets,
            vec![
                Target::Body(BodyHandle(5)),
                Target::Body(BodyHandle(5)),
                Target::Body(BodyHandle(2)),
            ]
        );
    }
}
