//! Set difference of compiled record sets

use std::collections::HashSet;

use dns_reconciler_provider::{Change, ChangeAction, ResourceRecordSet};

use crate::rrset::RecordSet;

/// What turns `existing` into `desired`.
#[derive(Debug, Clone, Default)]
pub struct RecordSetDiff {
    /// In existing only.
    pub deletes: Vec<RecordSet>,
    /// In desired only.
    pub creates: Vec<RecordSet>,
    /// In both, carrying the desired payload.
    pub upserts: Vec<RecordSet>,
}

impl RecordSetDiff {
    pub fn new(existing: &HashSet<RecordSet>, desired: &HashSet<RecordSet>) -> Self {
        let sorted = |mut sets: Vec<RecordSet>| {
            sets.sort_by_cached_key(RecordSet::identity);
            sets
        };

        Self {
            deletes: sorted(existing.difference(desired).cloned().collect()),
            creates: sorted(desired.difference(existing).cloned().collect()),
            upserts: sorted(
                desired
                    .iter()
                    .filter(|set| existing.contains(*set))
                    .cloned()
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.deletes.len() + self.creates.len() + self.upserts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Provider mutations, deletes first. Order them before submitting.
    pub fn to_changes(&self, existing: &[ResourceRecordSet]) -> Vec<Change> {
        let deletes = self
            .deletes
            .iter()
            .map(|set| set.to_change(ChangeAction::Delete, existing));
        let creates = self
            .creates
            .iter()
            .map(|set| set.to_change(ChangeAction::Create, existing));
        let upserts = self
            .upserts
            .iter()
            .map(|set| set.to_change(ChangeAction::Upsert, existing));
        deletes.chain(creates).chain(upserts).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::record::{PoolValue, Status};
    use crate::test_utils::{dynamic_a_record, fixed_lookup, ZONE_ID};

    #[test]
    fn identical_sets_only_upsert() {
        let sets = compile(&dynamic_a_record(), ZONE_ID, true, &fixed_lookup).unwrap();
        let diff = RecordSetDiff::new(&sets, &sets);
        assert!(diff.deletes.is_empty());
        assert!(diff.creates.is_empty());
        assert_eq!(diff.upserts.len(), sets.len());
    }

    #[test]
    fn added_value_is_a_create() {
        let before = dynamic_a_record();
        let mut after = before.clone();
        if let Some(pool) = after
            .dynamic
            .as_mut()
            .and_then(|d| d.pools.get_mut("two"))
        {
            pool.values.push(PoolValue::new("4.4.4.4").with_status(Status::Up));
        }

        let existing = compile(&before, ZONE_ID, false, &fixed_lookup).unwrap();
        let desired = compile(&after, ZONE_ID, true, &fixed_lookup).unwrap();
        let diff = RecordSetDiff::new(&existing, &desired);

        assert!(diff.deletes.is_empty());
        assert_eq!(diff.creates.len(), 1);
        assert_eq!(
            diff.creates[0].set_identifier().as_deref(),
            Some("two-001")
        );
        assert_eq!(diff.upserts.len(), existing.len());
    }

    #[test]
    fn removed_pool_is_deleted() {
        let before = dynamic_a_record();
        let mut after = before.clone();
        if let Some(dynamic) = after.dynamic.as_mut() {
            dynamic.pools.remove("one");
            dynamic.rules.remove(0);
            if let Some(pool) = dynamic.pools.get_mut("two") {
                pool.fallback = None;
            }
        }

        let existing = compile(&before, ZONE_ID, false, &fixed_lookup).unwrap();
        let desired = compile(&after, ZONE_ID, true, &fixed_lookup).unwrap();
        let diff = RecordSetDiff::new(&existing, &desired);

        let deleted: Vec<_> = diff
            .deletes
            .iter()
            .filter_map(RecordSet::set_identifier)
            .collect();
        assert!(deleted.contains(&"one-Primary".to_string()));
        assert!(deleted.contains(&"one-000".to_string()));
        // fallback of "two" moved from "three" to default
        assert!(deleted.contains(&"two-Secondary-three".to_string()));
        assert!(diff
            .creates
            .iter()
            .any(|s| s.set_identifier().as_deref() == Some("two-Secondary-default")));

        let changes = diff.to_changes(&[]);
        assert_eq!(changes.len(), diff.len());
        assert_eq!(changes[0].action, ChangeAction::Delete);
    }

    #[test]
    fn deterministic_order() {
        let sets = compile(&dynamic_a_record(), ZONE_ID, true, &fixed_lookup).unwrap();
        let empty = HashSet::new();
        let a = RecordSetDiff::new(&empty, &sets);
        let b = RecordSetDiff::new(&empty, &sets);
        let names = |d: &RecordSetDiff| {
            d.creates
                .iter()
                .map(|s| (s.name(), s.set_identifier()))
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&a), names(&b));
    }
}
