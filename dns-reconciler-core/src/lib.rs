//! DNS Reconciler Core Library
//!
//! Turns a desired zone into provider mutations and applies them:
//! - Record model and presentation value codecs
//! - Compilation of simple, alias and dynamic records into provider record sets
//! - Health check binding for dynamic pool values
//! - Change ordering and batching under the provider's batch limit
//! - Planning and applying through [`Reconciler`]
//!
//! The provider is reached only through [`dns_reconciler_provider::DnsProvider`].

pub mod batch;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod diff;
pub mod error;
pub mod geo;
pub mod health;
pub mod ordering;
pub mod populate;
pub mod record;
pub mod rrset;
pub mod services;
pub mod types;
pub mod values;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use config::ReconcilerConfig;
pub use error::{CoreError, CoreResult};
pub use record::{
    Dynamic, HealthCheckOptions, Healthcheck, Pool, PoolValue, Record, RecordType, Rule, Status,
    Zone,
};
pub use services::Reconciler;
pub use types::{ApplyReport, Plan, RecordChange};
pub use values::RecordData;

// Re-export the provider library
pub use dns_reconciler_provider;
