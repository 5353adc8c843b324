//! Bounded undo/redo log of scene snapshots
//!
//! Every completed annotation mutation records one [`HistoryEntry`] holding
//! the serialized object list. The cursor points at the entry matching the
//! current scene; `None` means the initial, annotation-free state, which has
//! no entry of its own.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::scene::Scene;
use crate::domain::{AnnotationObject, ObjectSnapshot};

/// Maximum number of entries kept; the oldest is evicted beyond this
pub const MAX_HISTORY_SIZE: usize = 50;

/// One immutable snapshot of the annotation objects
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub snapshot: Vec<ObjectSnapshot>,
    pub created_at: DateTime<Utc>,
}

/// Whether the log accepts new entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPhase {
    Recording,
    /// A restore of entry `target` is rebuilding the scene; saves are dropped
    Restoring { target: usize },
}

/// `canUndo` for a cursor position
pub fn can_undo_at(cursor: Option<usize>) -> bool {
    cursor.is_some()
}

/// `canRedo` for a cursor position and log length
pub fn can_redo_at(cursor: Option<usize>, len: usize) -> bool {
    match cursor {
        Some(index) => index + 1 < len,
        None => len > 0,
    }
}

#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    cursor: Option<usize>,
    phase: HistoryPhase,
}

impl Default for History {
    fn default() -> Self {
        Self {
            entries: VecDeque::with_capacity(MAX_HISTORY_SIZE + 1),
            cursor: None,
            phase: HistoryPhase::Recording,
        }
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current object list
    ///
    /// Drops any redo branch beyond the cursor. Returns `false` when the save
    /// was suppressed because a restore is in progress.
    pub fn save(&mut self, objects: &[AnnotationObject]) -> bool {
        if let HistoryPhase::Restoring { target } = self.phase {
            log::debug!("History save suppressed while restoring entry {target}");
            return false;
        }

        let keep = self.cursor.map_or(0, |index| index + 1);
        if keep < self.entries.len() {
            log::debug!("Discarding {} redo entries", self.entries.len() - keep);
            self.entries.truncate(keep);
        }

        self.entries.push_back(HistoryEntry {
            snapshot: objects.iter().map(ObjectSnapshot::capture).collect(),
            created_at: Utc::now(),
        });

        if self.entries.len() > MAX_HISTORY_SIZE {
            // Evict instead of advancing: the cursor keeps pointing at the
            // last slot, which now holds the new entry.
            self.entries.pop_front();
        } else {
            self.cursor = Some(self.cursor.map_or(0, |index| index + 1));
        }

        log::debug!(
            "History saved: {} objects, cursor {:?} of {}",
            objects.len(),
            self.cursor,
            self.entries.len()
        );
        true
    }

    /// Enter the restoring phase for entry `index`
    ///
    /// The returned session exposes the snapshot to rebuild from. Dropping it
    /// leaves the restoring phase and moves the cursor to `index`.
    pub fn begin_restore(&mut self, index: usize) -> Option<RestoreSession<'_>> {
        if index >= self.entries.len() {
            log::warn!("Ignoring restore of missing history entry {index}");
            return None;
        }
        self.phase = HistoryPhase::Restoring { target: index };
        Some(RestoreSession {
            history: self,
            target: index,
        })
    }

    /// Rebuild the scene's objects from entry `index`
    pub fn restore(&mut self, index: usize, scene: &mut Scene) -> bool {
        let Some(session) = self.begin_restore(index) else {
            return false;
        };
        scene.reinstate(session.snapshot());
        true
    }

    /// Step back one entry
    ///
    /// From the first entry the scene is cleared directly and the cursor
    /// returns to the initial state; there is no entry to restore for it.
    pub fn undo(&mut self, scene: &mut Scene) -> bool {
        match self.cursor {
            None => false,
            Some(0) => {
                scene.clear_objects();
                self.cursor = None;
                log::debug!("Undo to initial state");
                true
            }
            Some(index) => self.restore(index - 1, scene),
        }
    }

    /// Step forward one entry
    pub fn redo(&mut self, scene: &mut Scene) -> bool {
        if !self.can_redo() {
            return false;
        }
        let next = self.cursor.map_or(0, |index| index + 1);
        self.restore(next, scene)
    }

    pub fn can_undo(&self) -> bool {
        can_undo_at(self.cursor)
    }

    pub fn can_redo(&self) -> bool {
        can_redo_at(self.cursor, self.entries.len())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn phase(&self) -> HistoryPhase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// Entry matching the current scene, if any
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|index| self.entries.get(index))
    }
}

/// A restore in progress
///
/// While this exists the log is in [`HistoryPhase::Restoring`] and every
/// save is suppressed.
pub struct RestoreSession<'a> {
    history: &'a mut History,
    target: usize,
}

impl RestoreSession<'_> {
    pub fn phase(&self) -> HistoryPhase {
        self.history.phase
    }

    pub fn snapshot(&self) -> &[ObjectSnapshot] {
        self.history
            .entries
            .get(self.target)
            .map(|entry| entry.snapshot.as_slice())
            .unwrap_or_default()
    }

    /// Save attempted by a side effect of the restore; always suppressed
    pub fn save(&mut self, objects: &[AnnotationObject]) -> bool {
        self.history.save(objects)
    }
}

impl Drop for RestoreSession<'_> {
    fn drop(&mut self) {
        self.history.phase = HistoryPhase::Recording;
        self.history.cursor = Some(self.target);
        log::debug!("History restored to entry {}", self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::image::SourceImage;
    use crate::domain::{
        Color, ObjectKind, Padding, Placement, Point, RectShape, ShapeStyle,
    };

    fn scene() -> Scene {
        Scene::new(SourceImage::empty(), Padding::uniform(0.0), "#ffffff".to_string(), 0.0)
    }

    fn add_rect(scene: &mut Scene, x: f32) {
        let id = scene.allocate_id();
        scene.add(AnnotationObject::new(
            id,
            Placement::at(Point::new(x, 0.0)),
            ObjectKind::Rect(RectShape {
                width: 10.0,
                height: 10.0,
                style: ShapeStyle::outline(Color::BLACK, 2.0),
            }),
        ));
    }

    /// Perform one drawing action and record it
    fn act(history: &mut History, scene: &mut Scene, x: f32) {
        add_rect(scene, x);
        assert!(history.save(scene.objects()));
    }

    #[test]
    fn test_can_undo_and_redo_predicates() {
        assert!(!can_undo_at(None));
        assert!(can_undo_at(Some(0)));
        assert!(can_redo_at(Some(0), 2));
        assert!(!can_redo_at(Some(1), 2));
        assert!(can_redo_at(None, 1));
        assert!(!can_redo_at(None, 0));
    }

    #[test]
    fn test_fresh_history() {
        let history = History::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.cursor(), None);
        assert_eq!(history.phase(), HistoryPhase::Recording);
    }

    #[test]
    fn test_save_advances_cursor() {
        let mut history = History::new();
        let mut scene = scene();
        act(&mut history, &mut scene, 0.0);
        act(&mut history, &mut scene, 10.0);
        assert_eq!(history.cursor(), Some(1));
        assert_eq!(history.len(), 2);
        assert_eq!(history.entry(1).unwrap().snapshot.len(), 2);
    }

    #[test]
    fn test_log_is_bounded_and_keeps_most_recent() {
        let mut history = History::new();
        let mut scene = scene();
        for i in 0..60 {
            act(&mut history, &mut scene, i as f32);
        }
        assert_eq!(history.len(), MAX_HISTORY_SIZE);
        assert_eq!(history.cursor(), Some(MAX_HISTORY_SIZE - 1));
        // Oldest surviving entry is the 11th action
        assert_eq!(history.entry(0).unwrap().snapshot.len(), 11);

        let mut undone = 0;
        while history.cursor().is_some_and(|c| c > 0) {
            assert!(history.undo(&mut scene));
            undone += 1;
        }
        assert_eq!(undone, MAX_HISTORY_SIZE - 1);
        assert_eq!(scene.objects().len(), 11);

        assert!(history.undo(&mut scene));
        assert!(scene.objects().is_empty());
        assert!(!history.undo(&mut scene));
    }

    #[test]
    fn test_new_action_truncates_redo_branch() {
        let mut history = History::new();
        let mut scene = scene();
        for i in 0..4 {
            act(&mut history, &mut scene, i as f32 * 10.0);
        }
        assert!(history.undo(&mut scene));
        assert!(history.undo(&mut scene));
        assert_eq!(history.cursor(), Some(1));
        let entry0 = history.entry(0).unwrap().snapshot.clone();
        let entry1 = history.entry(1).unwrap().snapshot.clone();

        act(&mut history, &mut scene, 99.0);
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(history.entry(0).unwrap().snapshot, entry0);
        assert_eq!(history.entry(1).unwrap().snapshot, entry1);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_from_first_entry_clears_without_restore() {
        let mut history = History::new();
        let mut scene = scene();
        act(&mut history, &mut scene, 0.0);

        assert!(history.undo(&mut scene));
        assert_eq!(history.cursor(), None);
        assert!(scene.objects().is_empty());
        assert!(!history.can_undo());
        assert!(history.can_redo());

        assert!(history.redo(&mut scene));
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(scene.objects().len(), 1);
    }

    #[test]
    fn test_undo_redo_round_trip_is_byte_identical() {
        let mut history = History::new();
        let mut scene = scene();
        act(&mut history, &mut scene, 5.0);
        act(&mut history, &mut scene, 25.0);
        let before = serde_json::to_vec(&history.current().unwrap().snapshot).unwrap();

        assert!(history.undo(&mut scene));
        assert_eq!(scene.objects().len(), 1);
        assert!(history.redo(&mut scene));

        let live: Vec<ObjectSnapshot> = scene.objects().iter().map(ObjectSnapshot::capture).collect();
        assert_eq!(serde_json::to_vec(&live).unwrap(), before);
    }

    #[test]
    fn test_save_suppressed_while_restoring() {
        let mut history = History::new();
        let mut scene = scene();
        act(&mut history, &mut scene, 0.0);
        act(&mut history, &mut scene, 10.0);

        {
            let mut session = history.begin_restore(0).unwrap();
            assert_eq!(session.phase(), HistoryPhase::Restoring { target: 0 });
            assert_eq!(session.snapshot().len(), 1);
            assert!(!session.save(scene.objects()));
        }

        assert_eq!(history.phase(), HistoryPhase::Recording);
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_restore_out_of_range_is_ignored() {
        let mut history = History::new();
        let mut scene = scene();
        act(&mut history, &mut scene, 0.0);
        assert!(!history.restore(5, &mut scene));
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(history.phase(), HistoryPhase::Recording);
    }

    #[test]
    fn test_redo_at_end_is_noop() {
        let mut history = History::new();
        let mut scene = scene();
        assert!(!history.redo(&mut scene));
        act(&mut history, &mut scene, 0.0);
        assert!(!history.redo(&mut scene));
    }
}
