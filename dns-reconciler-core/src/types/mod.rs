//! Type definitions shared by the service layer

mod plan;

pub use plan::{ApplyReport, Plan, RecordChange};

// Re-export provider types used in results
pub use dns_reconciler_provider::{ChangeInfo, ChangeStatus, HostedZone};
