//! # dns-reconciler-provider
//!
//! The remote side of record-set reconciliation: wire types for hosted zones,
//! record sets, change batches and health checks, plus the async
//! [`DnsProvider`] trait every backend implements.
//!
//! ## Feature Flags
//!
//! - **`memory`** *(default)*: the in-process [`MemoryProvider`], which keeps
//!   everything in memory and enforces the same batch semantics as the remote
//!   API (atomic batches, alias targets must exist).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dns_reconciler_provider::{
//!     Change, ChangeAction, ChangeBatch, DnsProvider, MemoryProvider, ResourceRecord,
//!     ResourceRecordSet,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = MemoryProvider::new();
//!     let zone = provider.add_zone("example.com.", false).await;
//!
//!     let mut rrset = ResourceRecordSet::new("www.example.com.", "A");
//!     rrset.ttl = Some(300);
//!     rrset.resource_records = vec![ResourceRecord::new("192.0.2.1")];
//!
//!     let batch = ChangeBatch {
//!         comment: Some("initial".to_string()),
//!         changes: vec![Change::new(ChangeAction::Create, rrset)],
//!     };
//!     let info = provider.change_resource_record_sets(&zone.id, &batch).await?;
//!     println!("{} {:?}", info.id, info.status);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All provider operations return [`Result<T, ProviderError>`](ProviderError).
//!
//! - [`ProviderError::HostedZoneNotFound`]: unknown zone id
//! - [`ProviderError::InvalidChangeBatch`]: the batch was rejected as a whole
//! - [`ProviderError::RateLimited`]: API rate limit exceeded (retryable)
//! - [`ProviderError::NetworkError`]: network connectivity issue (retryable)
//!
//! Nothing in this crate retries. See [`ProviderError`] for the full list.

mod error;
mod providers;
mod traits;
mod types;
mod utils;

// Re-export error types
pub use error::{ProviderError, Result};

// Re-export core trait
pub use traits::DnsProvider;

// Re-export types
pub use types::{
    AliasTarget, Change, ChangeAction, ChangeBatch, ChangeInfo, ChangeStatus,
    CreateHostedZoneRequest, DEFAULT_COUNTRY_CODE, Failover, GeoLocation, HealthCheck,
    HealthCheckConfig, HealthCheckType, HostedZone, HostedZoneConfig, PaginatedResponse,
    ProviderLimits, RecordSetCursor, ResourceRecord, ResourceRecordSet, Tag, TagResourceType,
};

// Re-export name helpers
pub use providers::common::{
    ensure_trailing_dot, full_name_to_relative, normalize_domain_name, octal_replace,
    relative_to_full_name, short_zone_id,
};

// Re-export utils modules
pub use utils::{log_sanitizer, timestamp};

// Re-export concrete providers (behind feature flags)
#[cfg(feature = "memory")]
pub use providers::MemoryProvider;
