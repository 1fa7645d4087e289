use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ChangeBatch, ChangeInfo, CreateHostedZoneRequest, HealthCheck, HealthCheckConfig, HostedZone,
    PaginatedResponse, ProviderLimits, RecordSetCursor, ResourceRecordSet, Tag, TagResourceType,
};

/// Remote DNS hosting API.
///
/// The reconciler only ever talks to the provider through this trait. Listing
/// calls are paginated: callers pass back the continuation token from the
/// previous page until the provider returns `None`.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Provider identifier used in logs and error messages.
    fn id(&self) -> &'static str;

    /// Hard limits of the remote API.
    fn limits(&self) -> ProviderLimits {
        ProviderLimits::default()
    }

    /// List hosted zones, one page at a time.
    ///
    /// With `delegation_set_id` only zones of that delegation set are listed.
    async fn list_hosted_zones(
        &self,
        marker: Option<&str>,
        delegation_set_id: Option<&str>,
    ) -> Result<PaginatedResponse<HostedZone>>;

    /// List hosted zones whose name is lexicographically at or after `name`.
    ///
    /// Used for name-targeted lookups when scanning every zone is too slow.
    /// The provider returns at most one page, starting at `name`.
    async fn list_hosted_zones_by_name(&self, name: &str) -> Result<Vec<HostedZone>>;

    /// Create a hosted zone.
    async fn create_hosted_zone(&self, request: &CreateHostedZoneRequest) -> Result<HostedZone>;

    /// List record sets of a zone in `(name, type, set identifier)` order.
    async fn list_resource_record_sets(
        &self,
        zone_id: &str,
        start: Option<&RecordSetCursor>,
    ) -> Result<PaginatedResponse<ResourceRecordSet, RecordSetCursor>>;

    /// Submit a change batch. Either every change applies or none does.
    async fn change_resource_record_sets(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<ChangeInfo>;

    /// List health checks, one page at a time.
    async fn list_health_checks(&self, marker: Option<&str>)
    -> Result<PaginatedResponse<HealthCheck>>;

    /// Create a health check. `caller_reference` must be unique.
    async fn create_health_check(
        &self,
        caller_reference: &str,
        config: &HealthCheckConfig,
    ) -> Result<HealthCheck>;

    /// Delete a health check.
    async fn delete_health_check(&self, health_check_id: &str) -> Result<()>;

    /// Add or replace tags on a resource.
    async fn change_tags_for_resource(
        &self,
        resource_type: TagResourceType,
        resource_id: &str,
        tags: &[Tag],
    ) -> Result<()>;
}
