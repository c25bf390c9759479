//! Queue state machine
//!
//! Pure, in-memory queue of track ids with a current pointer. Duplicates
//! are disallowed within one queue instance, every index operation is a
//! no-op on invalid input, and shuffle keeps the playing track first.

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

/// Where `add_to_queue` inserts new entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePosition {
    /// Directly after the current entry
    Next,
    /// At the end of the queue
    End,
}

/// Ordered queue of unique track ids with a current pointer
#[derive(Debug, Clone, Default)]
pub struct QueueState {
    entries: Vec<Uuid>,
    current: Option<Uuid>,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue contents, deduplicating while preserving order.
    ///
    /// `current` becomes the pointer if present in the new queue; otherwise
    /// the first entry (or nothing, when the queue is empty).
    pub fn set(&mut self, ids: Vec<Uuid>, current: Option<Uuid>) {
        self.entries = dedup_preserving_order(ids);
        self.current = match current {
            Some(id) if self.entries.contains(&id) => Some(id),
            _ => self.entries.first().copied(),
        };
    }

    pub fn entries(&self) -> &[Uuid] {
        &self.entries
    }

    pub fn to_vec(&self) -> Vec<Uuid> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_track(&self) -> Option<Uuid> {
        self.current
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current.and_then(|id| self.position_of(id))
    }

    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|e| *e == id)
    }

    /// The literal next entry after the current one, without wrapping
    pub fn peek_next(&self) -> Option<Uuid> {
        let idx = self.current_index()?;
        self.entries.get(idx + 1).copied()
    }

    /// The entry before the current one
    pub fn peek_previous(&self) -> Option<Uuid> {
        let idx = self.current_index()?;
        idx.checked_sub(1).and_then(|i| self.entries.get(i).copied())
    }

    /// Advance the pointer one position; None at the end of the queue
    pub fn advance(&mut self) -> Option<Uuid> {
        let next = self.peek_next()?;
        self.current = Some(next);
        Some(next)
    }

    /// Retreat the pointer one position; None at the start of the queue
    pub fn retreat(&mut self) -> Option<Uuid> {
        let prev = self.peek_previous()?;
        self.current = Some(prev);
        Some(prev)
    }

    /// Point at the first entry (repeat-queue wrap)
    pub fn wrap_to_start(&mut self) -> Option<Uuid> {
        let first = self.entries.first().copied()?;
        self.current = Some(first);
        Some(first)
    }

    /// Move the pointer to a specific track if it is in the queue
    pub fn advance_to(&mut self, id: Uuid) -> bool {
        if self.entries.contains(&id) {
            self.current = Some(id);
            true
        } else {
            false
        }
    }

    /// Insert ids after the current entry or at the end.
    ///
    /// Ids already present in the queue are skipped. Returns how many were
    /// actually added.
    pub fn insert(&mut self, ids: Vec<Uuid>, position: QueuePosition) -> usize {
        let fresh: Vec<Uuid> = dedup_preserving_order(ids)
            .into_iter()
            .filter(|id| !self.entries.contains(id))
            .collect();
        let added = fresh.len();
        if added == 0 {
            return 0;
        }

        let at = match position {
            QueuePosition::Next => self
                .current_index()
                .map(|i| i + 1)
                .unwrap_or(self.entries.len()),
            QueuePosition::End => self.entries.len(),
        };
        self.entries.splice(at..at, fresh);

        if self.current.is_none() {
            self.current = self.entries.first().copied();
        }
        added
    }

    /// Pure index move; no-op on out-of-range or equal indices
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.entries.len() || to >= self.entries.len() {
            return false;
        }
        let id = self.entries.remove(from);
        self.entries.insert(to, id);
        true
    }

    /// Remove one entry.
    ///
    /// Removing the current entry moves the pointer to the element that now
    /// occupies its slot (or the new last element, or nothing when the queue
    /// empties).
    pub fn remove(&mut self, id: Uuid) -> bool {
        let Some(idx) = self.position_of(id) else {
            return false;
        };

        let was_current = self.current == Some(id);
        self.entries.remove(idx);

        if was_current {
            self.current = self
                .entries
                .get(idx)
                .or_else(|| self.entries.last())
                .copied();
        }
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
    }

    /// Plain shuffle of the whole queue; the pointer moves to the new
    /// first entry
    pub fn shuffle_all<R: Rng>(&mut self, rng: &mut R) {
        self.entries.shuffle(rng);
        self.current = self.entries.first().copied();
    }

    /// Reshuffle with the current track fixed first.
    ///
    /// Stable resume: the playing track stays at index 0 while the rest is
    /// randomized. With no current track this is a plain shuffle.
    pub fn shuffle_keep_current<R: Rng>(&mut self, rng: &mut R) {
        match self.current {
            Some(current) => {
                let mut rest: Vec<Uuid> = self
                    .entries
                    .iter()
                    .copied()
                    .filter(|id| *id != current)
                    .collect();
                rest.shuffle(rng);

                self.entries.clear();
                self.entries.push(current);
                self.entries.extend(rest);
            }
            None => {
                self.entries.shuffle(rng);
                self.current = self.entries.first().copied();
            }
        }
    }
}

fn dedup_preserving_order(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_set_dedups_and_points_at_current() {
        let tracks = ids(3);
        let mut with_dup = tracks.clone();
        with_dup.push(tracks[0]);

        let mut queue = QueueState::new();
        queue.set(with_dup, Some(tracks[1]));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.current_track(), Some(tracks[1]));
        assert_eq!(queue.current_index(), Some(1));
    }

    #[test]
    fn test_set_with_unknown_current_falls_back_to_first() {
        let tracks = ids(2);
        let mut queue = QueueState::new();
        queue.set(tracks.clone(), Some(Uuid::new_v4()));
        assert_eq!(queue.current_track(), Some(tracks[0]));
    }

    #[test]
    fn test_advance_and_retreat() {
        let tracks = ids(3);
        let mut queue = QueueState::new();
        queue.set(tracks.clone(), None);

        assert_eq!(queue.advance(), Some(tracks[1]));
        assert_eq!(queue.advance(), Some(tracks[2]));
        assert_eq!(queue.advance(), None); // no wrap
        assert_eq!(queue.current_track(), Some(tracks[2]));

        assert_eq!(queue.retreat(), Some(tracks[1]));
        queue.retreat();
        assert_eq!(queue.retreat(), None); // clamped at the start
        assert_eq!(queue.current_track(), Some(tracks[0]));
    }

    #[test]
    fn test_peek_next_is_literal() {
        let tracks = ids(2);
        let mut queue = QueueState::new();
        queue.set(tracks.clone(), Some(tracks[1]));
        assert_eq!(queue.peek_next(), None);
    }

    #[test]
    fn test_insert_next_skips_duplicates() {
        let tracks = ids(3);
        let mut queue = QueueState::new();
        queue.set(tracks.clone(), Some(tracks[0]));

        let fresh = Uuid::new_v4();
        let added = queue.insert(vec![tracks[2], fresh], QueuePosition::Next);

        assert_eq!(added, 1);
        assert_eq!(queue.entries(), &[tracks[0], fresh, tracks[1], tracks[2]]);
    }

    #[test]
    fn test_insert_end() {
        let tracks = ids(2);
        let mut queue = QueueState::new();
        queue.set(tracks.clone(), None);

        let fresh = Uuid::new_v4();
        queue.insert(vec![fresh], QueuePosition::End);
        assert_eq!(queue.entries().last(), Some(&fresh));
    }

    #[test]
    fn test_insert_into_empty_sets_current() {
        let mut queue = QueueState::new();
        let fresh = Uuid::new_v4();
        queue.insert(vec![fresh], QueuePosition::End);
        assert_eq!(queue.current_track(), Some(fresh));
    }

    #[test]
    fn test_reorder_moves_entry() {
        let tracks = ids(4);
        let mut queue = QueueState::new();
        queue.set(tracks.clone(), Some(tracks[1]));

        assert!(queue.reorder(0, 3));
        assert_eq!(queue.entries(), &[tracks[1], tracks[2], tracks[3], tracks[0]]);
        // Pointer follows the id, not the index
        assert_eq!(queue.current_track(), Some(tracks[1]));
    }

    #[test]
    fn test_reorder_invalid_is_noop() {
        let tracks = ids(2);
        let mut queue = QueueState::new();
        queue.set(tracks.clone(), None);

        assert!(!queue.reorder(0, 0));
        assert!(!queue.reorder(5, 0));
        assert!(!queue.reorder(0, 5));
        assert_eq!(queue.entries(), &tracks[..]);
    }

    #[test]
    fn test_remove_current_moves_pointer_forward() {
        let tracks = ids(3);
        let mut queue = QueueState::new();
        queue.set(tracks.clone(), Some(tracks[1]));

        assert!(queue.remove(tracks[1]));
        assert_eq!(queue.current_track(), Some(tracks[2]));

        assert!(queue.remove(tracks[2]));
        assert_eq!(queue.current_track(), Some(tracks[0]));

        assert!(queue.remove(tracks[0]));
        assert_eq!(queue.current_track(), None);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let tracks = ids(2);
        let mut queue = QueueState::new();
        queue.set(tracks.clone(), None);
        assert!(!queue.remove(Uuid::new_v4()));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_shuffle_keeps_current_first() {
        let tracks = ids(5);
        let mut queue = QueueState::new();
        queue.set(tracks.clone(), Some(tracks[2]));

        let mut rng = StdRng::seed_from_u64(7);
        queue.shuffle_keep_current(&mut rng);

        assert_eq!(queue.entries()[0], tracks[2]);
        assert_eq!(queue.current_index(), Some(0));
        assert_eq!(queue.len(), 5);

        // Repeated shuffles never move the current track
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            queue.shuffle_keep_current(&mut rng);
            assert_eq!(queue.entries()[0], tracks[2]);
        }
    }

    #[test]
    fn test_shuffle_without_current_picks_first() {
        let tracks = ids(4);
        let mut queue = QueueState::new();
        queue.set(tracks, None);
        // set() points at the first entry; clear the pointer by hand
        queue.current = None;

        let mut rng = StdRng::seed_from_u64(3);
        queue.shuffle_keep_current(&mut rng);
        assert_eq!(queue.current_track(), Some(queue.entries()[0]));
    }
}
