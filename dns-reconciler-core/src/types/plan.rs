//! Plan and apply result types

use dns_reconciler_provider::ChangeInfo;
use serde::Serialize;

use crate::record::{Record, RecordType, Zone};

/// A record-level change between the live zone and the desired one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RecordChange {
    Create(Record),
    Update { existing: Record, new: Record },
    Delete(Record),
}

impl RecordChange {
    /// The record this change leaves behind, or the one it removes.
    pub fn record(&self) -> &Record {
        match self {
            Self::Create(record) | Self::Delete(record) => record,
            Self::Update { new, .. } => new,
        }
    }

    pub fn key(&self) -> (&str, RecordType) {
        self.record().key()
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Delete(_) => 0,
            Self::Create(_) => 1,
            Self::Update { .. } => 2,
        }
    }

    /// `(name, type, kind)`, used to keep plans deterministic.
    pub(crate) fn sort_key(&self) -> (String, RecordType, u8) {
        let (name, record_type) = self.key();
        (name.to_string(), record_type, self.rank())
    }
}

/// What [`apply`](crate::Reconciler::apply) would do to one zone.
#[derive(Debug, Clone)]
pub struct Plan {
    /// The desired zone after unsupported features were handled.
    pub desired: Zone,
    pub changes: Vec<RecordChange>,
    /// Whether the zone already exists at the provider.
    pub exists: bool,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Outcome of a successful apply.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub zone_id: String,
    /// Record-level changes applied.
    pub changes: usize,
    /// Provider mutations submitted across all batches.
    pub mutations: usize,
    /// One receipt per submitted batch, in submission order.
    pub batches: Vec<ChangeInfo>,
    /// Health checks deleted after the batches went through.
    pub deleted_health_checks: Vec<String>,
}
