//! Mutation ordering
//!
//! Inside a batch every alias target must exist before the alias is written
//! and must outlive it when deleted. Sorting by [`change_key`] gives:
//!
//! 1. deletes, most dependent first: geo rules, secondary failovers, other aliases, plain sets
//! 2. creates and upserts, least dependent first: plain sets, aliases, secondaries, geo rules

use dns_reconciler_provider::{Change, ChangeAction, Failover};

/// `(action class, rank, unique id)`.
pub type ChangeKey = (u8, i8, String);

pub fn change_key(change: &Change) -> ChangeKey {
    let rrset = &change.resource_record_set;

    let rank: i8 = if rrset.geo_location.is_some() {
        3
    } else if rrset.alias_target.is_some() {
        if rrset.failover == Some(Failover::Secondary) {
            2
        } else {
            1
        }
    } else {
        0
    };

    let unique_id = match (&rrset.geo_location, &rrset.set_identifier) {
        (Some(_), Some(set_id)) => set_id.clone(),
        (_, Some(set_id)) => format!("{}-{set_id}", rrset.name),
        (_, None) => rrset.name.clone(),
    };

    if change.action == ChangeAction::Delete {
        (0, -rank, unique_id)
    } else {
        (1, rank, unique_id)
    }
}

/// Stable sort by [`change_key`].
pub fn order_changes(changes: &mut [Change]) {
    changes.sort_by_cached_key(change_key);
}
