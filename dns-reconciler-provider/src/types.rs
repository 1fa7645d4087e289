use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============ Pagination ============

/// A single page of a listing call.
///
/// Providers return a finite page of items plus an opaque continuation token.
/// Callers keep requesting pages, passing the token back, until `next` is
/// `None`.
///
/// # Type Parameters
///
/// * `T`: the item type (e.g., [`HostedZone`], [`ResourceRecordSet`]).
/// * `C`: the continuation token type. Plain marker strings for most
///   listings, [`RecordSetCursor`] for record sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T, C = String> {
    /// Items in the current page.
    pub items: Vec<T>,
    /// Continuation token for the next page, `None` on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<C>,
}

impl<T, C> PaginatedResponse<T, C> {
    /// Create a new page.
    pub fn new(items: Vec<T>, next: Option<C>) -> Self {
        Self { items, next }
    }

    /// Whether there are more pages after this one.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// Continuation cursor for record set listings.
///
/// Record sets are listed in `(name, type, set identifier)` order, so a page
/// boundary is identified by all three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordSetCursor {
    /// `StartRecordName`.
    pub name: String,
    /// `StartRecordType`.
    #[serde(rename = "Type")]
    pub record_type: String,
    /// `StartRecordIdentifier`, only present for variant record sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

// ============ Provider Limits ============

/// Hard limits imposed by the remote provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLimits {
    /// Maximum number of resource records a single change batch may touch.
    pub max_changes_per_batch: usize,
    /// Maximum number of items returned per listing page.
    pub max_page_size: usize,
    /// Maximum length of a health check caller reference.
    pub max_caller_reference_len: usize,
}

impl Default for ProviderLimits {
    fn default() -> Self {
        Self {
            max_changes_per_batch: 1000,
            max_page_size: 100,
            max_caller_reference_len: 64,
        }
    }
}

// ============ Hosted Zones ============

/// Optional hosted zone settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedZoneConfig {
    /// Free-form comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Whether the zone is a private (VPC-only) zone.
    #[serde(default)]
    pub private_zone: bool,
}

/// A hosted zone (the provider's container for a DNS zone).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedZone {
    /// Zone identifier, usually in the `/hostedzone/Z123` form.
    pub id: String,
    /// Zone name with a trailing dot. May contain octal escapes (`\052`).
    pub name: String,
    /// Caller reference used at creation time.
    pub caller_reference: String,
    /// Zone settings, if any were returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<HostedZoneConfig>,
    /// Number of record sets in the zone, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_record_set_count: Option<u64>,
    /// Reusable delegation set the zone was created in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation_set_id: Option<String>,
}

impl HostedZone {
    /// Whether this is a private zone. Missing config means public.
    pub fn is_private(&self) -> bool {
        self.config.as_ref().is_some_and(|c| c.private_zone)
    }
}

/// Request to create a hosted zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateHostedZoneRequest {
    /// Zone name with a trailing dot.
    pub name: String,
    /// Unique caller reference, makes the request idempotent.
    pub caller_reference: String,
    /// Reusable delegation set to assign, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegation_set_id: Option<String>,
    /// Zone settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_zone_config: Option<HostedZoneConfig>,
}

// ============ Resource Record Sets ============

/// A single value inside a record set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecord {
    /// Presentation-format value, e.g. `"10 mx.example.com."`.
    pub value: String,
}

impl ResourceRecord {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Target of an alias record set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasTarget {
    /// Fully qualified target name.
    #[serde(rename = "DNSName")]
    pub dns_name: String,
    /// Whether the alias inherits the health of its target.
    #[serde(rename = "EvaluateTargetHealth")]
    pub evaluate_target_health: bool,
    /// Zone the target lives in (short form, `Z123`).
    #[serde(rename = "HostedZoneId")]
    pub hosted_zone_id: String,
}

/// Geolocation selector of a record set.
///
/// Exactly one of the following shapes is meaningful:
/// - `ContinentCode`
/// - `CountryCode` (`"*"` is the catch-all default location)
/// - `CountryCode` + `SubdivisionCode`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeoLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdivision_code: Option<String>,
}

/// Country code used by the provider for "every location not matched otherwise".
pub const DEFAULT_COUNTRY_CODE: &str = "*";

impl GeoLocation {
    /// The catch-all location.
    pub fn default_location() -> Self {
        Self::country(DEFAULT_COUNTRY_CODE)
    }

    pub fn continent(code: impl Into<String>) -> Self {
        Self {
            continent_code: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn country(code: impl Into<String>) -> Self {
        Self {
            country_code: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn subdivision(country: impl Into<String>, subdivision: impl Into<String>) -> Self {
        Self {
            country_code: Some(country.into()),
            subdivision_code: Some(subdivision.into()),
            ..Self::default()
        }
    }

    /// Whether this is the catch-all location.
    pub fn is_default(&self) -> bool {
        self.continent_code.is_none() && self.country_code.as_deref() == Some(DEFAULT_COUNTRY_CODE)
    }
}

/// Failover role of a record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Failover {
    Primary,
    Secondary,
}

impl std::fmt::Display for Failover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "PRIMARY"),
            Self::Secondary => write!(f, "SECONDARY"),
        }
    }
}

/// A record set as stored by the provider.
///
/// This is the provider's smallest independently addressable unit: a name and
/// type, optionally disambiguated by a set identifier when several variant
/// record sets (weighted, failover, geolocation) share the same name and type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecordSet {
    /// Fully qualified name with a trailing dot.
    pub name: String,
    /// Record type (`"A"`, `"TXT"`, ...).
    #[serde(rename = "Type")]
    pub record_type: String,
    /// Disambiguator for variant record sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,
    /// Relative weight for weighted record sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u64>,
    /// Latency region for latency-based record sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Geolocation selector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_location: Option<GeoLocation>,
    /// Failover role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failover: Option<Failover>,
    /// Time to live in seconds. Alias record sets have none.
    #[serde(rename = "TTL", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Values. Empty for alias record sets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_records: Vec<ResourceRecord>,
    /// Alias target, mutually exclusive with `resource_records`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_target: Option<AliasTarget>,
    /// Health check bound to this record set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_id: Option<String>,
    /// Set when the record set is managed by a traffic policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic_policy_instance_id: Option<String>,
}

impl ResourceRecordSet {
    /// A bare record set with only name and type filled in.
    pub fn new(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            ..Self::default()
        }
    }

    /// Iterate over the presentation values.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.resource_records.iter().map(|rr| rr.value.as_str())
    }

    /// Number of resource records, which is what batch limits count.
    pub fn resource_record_count(&self) -> usize {
        self.resource_records.len()
    }

    /// The `(name, type, set identifier)` key the provider addresses record sets by.
    pub fn key(&self) -> (&str, &str, Option<&str>) {
        (
            self.name.as_str(),
            self.record_type.as_str(),
            self.set_identifier.as_deref(),
        )
    }
}

// ============ Change Batches ============

/// What a change does to its record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Create,
    Delete,
    Upsert,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Upsert => write!(f, "UPSERT"),
        }
    }
}

/// A single mutation inside a change batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Change {
    pub action: ChangeAction,
    pub resource_record_set: ResourceRecordSet,
}

impl Change {
    pub fn new(action: ChangeAction, resource_record_set: ResourceRecordSet) -> Self {
        Self {
            action,
            resource_record_set,
        }
    }
}

/// An ordered list of changes applied atomically by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeBatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub changes: Vec<Change>,
}

/// Propagation status of a submitted change batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeStatus {
    Pending,
    Insync,
}

/// Receipt for a submitted change batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeInfo {
    pub id: String,
    pub status: ChangeStatus,
    /// When the batch was accepted.
    #[serde(with = "crate::utils::timestamp")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// ============ Health Checks ============

/// Protocol used by a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthCheckType {
    Http,
    Https,
    Tcp,
}

impl std::fmt::Display for HealthCheckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "HTTP"),
            Self::Https => write!(f, "HTTPS"),
            Self::Tcp => write!(f, "TCP"),
        }
    }
}

/// Live configuration of a health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Address probed. The provider may reformat it (IPv6 compression).
    #[serde(rename = "IPAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "Port", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(rename = "Type")]
    pub check_type: HealthCheckType,
    /// Request path for HTTP(S) checks.
    #[serde(rename = "ResourcePath", skip_serializing_if = "Option::is_none")]
    pub resource_path: Option<String>,
    /// Host header for HTTP(S) checks, or the probed host when there is no IP.
    #[serde(
        rename = "FullyQualifiedDomainName",
        skip_serializing_if = "Option::is_none"
    )]
    pub fully_qualified_domain_name: Option<String>,
    /// Seconds between probes (10 or 30).
    #[serde(rename = "RequestInterval")]
    pub request_interval: u32,
    /// Consecutive failures before the target is considered unhealthy.
    #[serde(rename = "FailureThreshold")]
    pub failure_threshold: u32,
    #[serde(rename = "MeasureLatency")]
    pub measure_latency: bool,
    #[serde(rename = "Inverted")]
    pub inverted: bool,
    #[serde(rename = "Disabled")]
    pub disabled: bool,
    #[serde(rename = "EnableSNI")]
    pub enable_sni: bool,
}

/// A health check resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    pub id: String,
    /// Idempotency token supplied at creation time, never changes afterwards.
    pub caller_reference: String,
    pub health_check_config: HealthCheckConfig,
    #[serde(default)]
    pub health_check_version: u64,
    /// Tags attached through `change_tags_for_resource`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// A resource tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Kind of resource a tag call applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagResourceType {
    Healthcheck,
    Hostedzone,
}
