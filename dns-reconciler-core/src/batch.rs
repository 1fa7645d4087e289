//! Packing mutations into change batches
//!
//! The provider limits how many resource records one batch may touch. The
//! mutations of one logical change are never split, since a partially applied
//! change could leave dangling aliases behind.

use dns_reconciler_provider::Change;

use crate::error::{CoreError, CoreResult};
use crate::ordering::order_changes;

/// Resource records touched by a group of mutations. Alias sets count zero.
pub fn entry_count(changes: &[Change]) -> usize {
    changes
        .iter()
        .map(|c| c.resource_record_set.resource_record_count())
        .sum()
}

/// Accumulates mutation groups into batches of at most `max` entries.
#[derive(Debug)]
pub struct BatchPlanner {
    max: usize,
    current: Vec<Change>,
    current_count: usize,
}

impl BatchPlanner {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            current: Vec::new(),
            current_count: 0,
        }
    }

    /// Add the mutations of one logical change.
    ///
    /// Returns the completed batch when the group does not fit beside what is
    /// already pending; the group then starts the next batch.
    pub fn push(&mut self, group: Vec<Change>) -> CoreResult<Option<Vec<Change>>> {
        let count = entry_count(&group);
        if count > self.max {
            return Err(CoreError::TooManyChanges {
                count,
                max: self.max,
            });
        }

        if self.current_count + count <= self.max {
            self.current.extend(group);
            self.current_count += count;
            return Ok(None);
        }

        let mut done = std::mem::replace(&mut self.current, group);
        self.current_count = count;
        order_changes(&mut done);
        Ok(Some(done))
    }

    /// The last pending batch, if anything is pending.
    pub fn finish(self) -> Option<Vec<Change>> {
        let mut last = self.current;
        if last.is_empty() {
            return None;
        }
        order_changes(&mut last);
        Some(last)
    }
}

/// Pack every group at once. Fails before producing any batch if one group is too large.
pub fn plan_batches(groups: Vec<Vec<Change>>, max: usize) -> CoreResult<Vec<Vec<Change>>> {
    if let Some(count) = groups
        .iter()
        .map(|g| entry_count(g))
        .find(|count| *count > max)
    {
        return Err(CoreError::TooManyChanges { count, max });
    }

    let mut planner = BatchPlanner::new(max);
    let mut batches = Vec::new();
    for group in groups {
        if let Some(batch) = planner.push(group)? {
            batches.push(batch);
        }
    }
    batches.extend(planner.finish());
    Ok(batches)
}
