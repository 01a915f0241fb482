//! Gap-aware job generation
//!
//! Question IDs are dense integers, so the work left to do is every ID missing from the
//! stored set: the holes between stored IDs, followed by everything past the last stored
//! ID up to the configured ceiling. Zero acts as the implicit first stored ID.
//!
//! The ceiling only bounds the trailing range. Holes below a stored ID are always
//! reported, even when they lie above the ceiling.

use crate::model::QuestionId;
use tokio::sync::mpsc;

/// Iterator over the IDs that still need a fetch, in ascending order
#[derive(Debug, Clone)]
pub struct GapScanner {
    known: std::vec::IntoIter<QuestionId>,
    next_known: Option<QuestionId>,
    /// Smallest ID not yet emitted or skipped
    cursor: QuestionId,
    max_id: QuestionId,
    exhausted: bool,
}

impl GapScanner {
    /// Creates a scanner over the ascending list of stored IDs
    pub fn new(known_ids: Vec<QuestionId>, max_id: QuestionId) -> Self {
        let mut known = known_ids.into_iter();
        let next_known = known.next();
        Self {
            known,
            next_known,
            cursor: 1,
            max_id,
            exhausted: false,
        }
    }
}

impl Iterator for GapScanner {
    type Item = QuestionId;

    fn next(&mut self) -> Option<QuestionId> {
        if self.exhausted {
            return None;
        }

        // Interior gaps
        while let Some(known) = self.next_known {
            if self.cursor < known {
                let id = self.cursor;
                self.cursor += 1;
                return Some(id);
            }
            let Some(after_known) = known.checked_add(1) else {
                self.exhausted = true;
                return None;
            };
            self.cursor = self.cursor.max(after_known);
            self.next_known = self.known.next();
        }

        // Trailing range up to the ceiling
        if self.cursor <= self.max_id {
            let id = self.cursor;
            match self.cursor.checked_add(1) {
                Some(next) => self.cursor = next,
                None => self.exhausted = true,
            }
            return Some(id);
        }

        self.exhausted = true;
        None
    }
}

/// Pushes every missing ID into the job queue, then closes it by dropping the sender
///
/// Returns the number of IDs handed to workers. Stops early if every worker has already
/// exited, since nobody is left to take the remaining jobs.
pub async fn enqueue_missing(
    known_ids: Vec<QuestionId>,
    max_id: QuestionId,
    sender: mpsc::Sender<QuestionId>,
) -> u64 {
    let mut enqueued = 0u64;

    for id in GapScanner::new(known_ids, max_id) {
        if sender.send(id).await.is_err() {
            tracing::warn!(
                "All workers have stopped; {} IDs enqueued before giving up at {}",
                enqueued,
                id
            );
            return enqueued;
        }
        enqueued += 1;
    }

    tracing::info!("Gap scan finished: {} IDs enqueued", enqueued);
    enqueued
}
