//! In-memory provider.
//!
//! Keeps hosted zones, record sets and health checks in process memory and
//! enforces the same contract as the remote API: paginated listings with
//! opaque continuation tokens, atomic change batches and unique health check
//! caller references. Used by the test suites and for dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{ProviderError, Result};
use crate::providers::common::{normalize_domain_name, short_zone_id};
use crate::traits::DnsProvider;
use crate::types::{
    ChangeAction, ChangeBatch, ChangeInfo, ChangeStatus, CreateHostedZoneRequest, HealthCheck,
    HealthCheckConfig, HostedZone, HostedZoneConfig, PaginatedResponse, ProviderLimits,
    RecordSetCursor, ResourceRecord, ResourceRecordSet, Tag, TagResourceType,
};
use crate::utils::log_sanitizer::truncate_for_log;

const PROVIDER_ID: &str = "memory";

/// Default page size for every listing call.
const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Default)]
struct MemoryState {
    zones: Vec<HostedZone>,
    /// Keyed by short zone id.
    record_sets: HashMap<String, Vec<ResourceRecordSet>>,
    health_checks: Vec<HealthCheck>,
    submitted: Vec<(String, ChangeBatch)>,
    deleted_health_checks: Vec<String>,
    batch_attempts: usize,
    fail_batch_at: Option<usize>,
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn zone_sets_mut(&mut self, zone_id: &str) -> Result<&mut Vec<ResourceRecordSet>> {
        self.record_sets
            .get_mut(short_zone_id(zone_id))
            .ok_or_else(|| ProviderError::HostedZoneNotFound {
                provider: PROVIDER_ID.to_string(),
                zone_id: zone_id.to_string(),
            })
    }
}

/// Provider backed by process memory.
pub struct MemoryProvider {
    state: RwLock<MemoryState>,
    page_size: usize,
    limits: ProviderLimits,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Listing calls return at most `page_size` items per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            page_size: page_size.max(1),
            limits: ProviderLimits::default(),
        }
    }

    // ===== Fixtures & inspection =====

    /// Register a zone without going through `create_hosted_zone`.
    /// The zone starts empty (no SOA/NS).
    pub async fn add_zone(&self, name: &str, private_zone: bool) -> HostedZone {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let zone = HostedZone {
            id: format!("/hostedzone/Z{id:08X}"),
            name: name.to_string(),
            caller_reference: format!("fixture-{id}"),
            config: Some(HostedZoneConfig {
                comment: None,
                private_zone,
            }),
            resource_record_set_count: None,
            delegation_set_id: None,
        };
        state
            .record_sets
            .insert(short_zone_id(&zone.id).to_string(), Vec::new());
        state.zones.push(zone.clone());
        zone
    }

    /// Store record sets directly, bypassing batch validation.
    pub async fn insert_record_sets(
        &self,
        zone_id: &str,
        rrsets: impl IntoIterator<Item = ResourceRecordSet>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let sets = state.zone_sets_mut(zone_id)?;
        for rrset in rrsets {
            sets.retain(|existing| existing.key() != rrset.key());
            sets.push(rrset);
        }
        Ok(())
    }

    /// Store a health check directly, bypassing reference checks.
    pub async fn insert_health_check(&self, health_check: HealthCheck) {
        self.state.write().await.health_checks.push(health_check);
    }

    /// Current record sets of a zone in listing order.
    pub async fn record_sets(&self, zone_id: &str) -> Vec<ResourceRecordSet> {
        let state = self.state.read().await;
        let mut sets = state
            .record_sets
            .get(short_zone_id(zone_id))
            .cloned()
            .unwrap_or_default();
        sort_record_sets(&mut sets);
        sets
    }

    pub async fn zones(&self) -> Vec<HostedZone> {
        self.state.read().await.zones.clone()
    }

    pub async fn health_checks(&self) -> Vec<HealthCheck> {
        self.state.read().await.health_checks.clone()
    }

    /// Ids passed to `delete_health_check`, in call order.
    pub async fn deleted_health_checks(&self) -> Vec<String> {
        self.state.read().await.deleted_health_checks.clone()
    }

    /// Applied batches with their zone id, in submission order.
    pub async fn submitted_batches(&self) -> Vec<(String, ChangeBatch)> {
        self.state.read().await.submitted.clone()
    }

    /// Reject the `n`-th (0-based) call to `change_resource_record_sets`.
    pub async fn fail_batch_at(&self, n: usize) {
        self.state.write().await.fail_batch_at = Some(n);
    }

    fn page<T: Clone>(&self, items: &[T], start: usize) -> (Vec<T>, Option<usize>) {
        let end = (start + self.page_size).min(items.len());
        let page = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
        let next = (end < items.len()).then_some(end);
        (page, next)
    }

    fn invalid_marker(marker: &str) -> ProviderError {
        ProviderError::InvalidParameter {
            provider: PROVIDER_ID.to_string(),
            param: "marker".to_string(),
            detail: format!("unknown marker '{marker}'"),
        }
    }
}

fn sort_record_sets(sets: &mut [ResourceRecordSet]) {
    sets.sort_by(|a, b| a.key().cmp(&b.key()));
}

fn describe(rrset: &ResourceRecordSet) -> String {
    match &rrset.set_identifier {
        Some(id) => format!(
            "[name='{}', type='{}', set-identifier='{id}']",
            rrset.name, rrset.record_type
        ),
        None => format!("[name='{}', type='{}']", rrset.name, rrset.record_type),
    }
}

/// Whether an in-zone alias has something to point at.
fn alias_target_exists(
    sets: &[ResourceRecordSet],
    rrset: &ResourceRecordSet,
    zone_short_id: &str,
) -> bool {
    match &rrset.alias_target {
        Some(target) if target.hosted_zone_id == zone_short_id => sets.iter().any(|s| {
            s.name.eq_ignore_ascii_case(&target.dns_name) && s.record_type == rrset.record_type
        }),
        _ => true,
    }
}

/// Apply `batch` to a copy of `current`, returning the new contents or every
/// problem found.
fn apply_batch(
    current: &[ResourceRecordSet],
    batch: &ChangeBatch,
    zone_short_id: &str,
) -> std::result::Result<Vec<ResourceRecordSet>, Vec<String>> {
    let mut working = current.to_vec();
    let mut errors = Vec::new();

    for change in &batch.changes {
        let rrset = &change.resource_record_set;
        let position = working.iter().position(|s| s.key() == rrset.key());

        match change.action {
            ChangeAction::Create => {
                if position.is_some() {
                    errors.push(format!(
                        "Tried to create resource record set {} but it already exists",
                        describe(rrset)
                    ));
                } else if !alias_target_exists(&working, rrset, zone_short_id) {
                    errors.push(format!(
                        "Tried to create an alias that targets a nonexistent record {}",
                        describe(rrset)
                    ));
                } else {
                    working.push(rrset.clone());
                }
            }
            ChangeAction::Upsert => {
                if alias_target_exists(&working, rrset, zone_short_id) {
                    if let Some(i) = position {
                        working[i] = rrset.clone();
                    } else {
                        working.push(rrset.clone());
                    }
                } else {
                    errors.push(format!(
                        "Tried to upsert an alias that targets a nonexistent record {}",
                        describe(rrset)
                    ));
                }
            }
            ChangeAction::Delete => {
                if let Some(i) = position {
                    working.remove(i);
                } else {
                    errors.push(format!(
                        "Tried to delete resource record set {} but it was not found",
                        describe(rrset)
                    ));
                }
            }
        }
    }

    for rrset in &working {
        if !alias_target_exists(&working, rrset, zone_short_id) {
            errors.push(format!(
                "Alias {} would be left without a target",
                describe(rrset)
            ));
        }
    }

    if errors.is_empty() {
        Ok(working)
    } else {
        Err(errors)
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn limits(&self) -> ProviderLimits {
        self.limits
    }

    async fn list_hosted_zones(
        &self,
        marker: Option<&str>,
        delegation_set_id: Option<&str>,
    ) -> Result<PaginatedResponse<HostedZone>> {
        let state = self.state.read().await;
        let zones: Vec<HostedZone> = state
            .zones
            .iter()
            .filter(|z| {
                delegation_set_id.is_none_or(|id| z.delegation_set_id.as_deref() == Some(id))
            })
            .cloned()
            .collect();
        let start = match marker {
            Some(m) => zones
                .iter()
                .position(|z| z.id == m)
                .ok_or_else(|| Self::invalid_marker(m))?,
            None => 0,
        };
        let (items, next) = self.page(&zones, start);
        let next = next.and_then(|i| zones.get(i)).map(|z| z.id.clone());
        log::debug!(
            "[{PROVIDER_ID}] list_hosted_zones: delegation_set={delegation_set_id:?}, {} items, more={}",
            items.len(),
            next.is_some()
        );
        Ok(PaginatedResponse::new(items, next))
    }

    async fn list_hosted_zones_by_name(&self, name: &str) -> Result<Vec<HostedZone>> {
        let state = self.state.read().await;
        let wanted = normalize_domain_name(name);
        let mut zones: Vec<HostedZone> = state
            .zones
            .iter()
            .filter(|z| normalize_domain_name(&z.name) >= wanted)
            .cloned()
            .collect();
        zones.sort_by_key(|z| normalize_domain_name(&z.name));
        zones.truncate(self.limits.max_page_size);
        log::debug!(
            "[{PROVIDER_ID}] list_hosted_zones_by_name: name={name}, {} items",
            zones.len()
        );
        Ok(zones)
    }

    async fn create_hosted_zone(&self, request: &CreateHostedZoneRequest) -> Result<HostedZone> {
        let mut state = self.state.write().await;
        if state
            .zones
            .iter()
            .any(|z| z.caller_reference == request.caller_reference)
        {
            return Err(ProviderError::InvalidParameter {
                provider: PROVIDER_ID.to_string(),
                param: "CallerReference".to_string(),
                detail: format!("'{}' was already used", request.caller_reference),
            });
        }

        let id = state.next_id();
        let zone = HostedZone {
            id: format!("/hostedzone/Z{id:08X}"),
            name: request.name.clone(),
            caller_reference: request.caller_reference.clone(),
            config: request.hosted_zone_config.clone(),
            resource_record_set_count: Some(2),
            delegation_set_id: request.delegation_set_id.clone(),
        };

        // New zones come with their own SOA and apex NS.
        let mut ns = ResourceRecordSet::new(&request.name, "NS");
        ns.ttl = Some(172_800);
        ns.resource_records = (1..=4)
            .map(|n| ResourceRecord::new(format!("ns-{n}.awsdns-{id:02}.example.")))
            .collect();
        let mut soa = ResourceRecordSet::new(&request.name, "SOA");
        soa.ttl = Some(900);
        soa.resource_records = vec![ResourceRecord::new(format!(
            "ns-1.awsdns-{id:02}.example. hostmaster.example. 1 7200 900 1209600 86400"
        ))];

        state
            .record_sets
            .insert(short_zone_id(&zone.id).to_string(), vec![ns, soa]);
        state.zones.push(zone.clone());
        log::info!(
            "[{PROVIDER_ID}] create_hosted_zone: name={}, id={}, delegation_set={:?}",
            zone.name,
            zone.id,
            request.delegation_set_id
        );
        Ok(zone)
    }

    async fn list_resource_record_sets(
        &self,
        zone_id: &str,
        start: Option<&RecordSetCursor>,
    ) -> Result<PaginatedResponse<ResourceRecordSet, RecordSetCursor>> {
        let state = self.state.read().await;
        let mut sets = state
            .record_sets
            .get(short_zone_id(zone_id))
            .cloned()
            .ok_or_else(|| ProviderError::HostedZoneNotFound {
                provider: PROVIDER_ID.to_string(),
                zone_id: zone_id.to_string(),
            })?;
        sort_record_sets(&mut sets);

        let begin = start.map_or(0, |cursor| {
            let key = (
                cursor.name.as_str(),
                cursor.record_type.as_str(),
                cursor.identifier.as_deref(),
            );
            sets.iter()
                .position(|s| s.key() >= key)
                .unwrap_or(sets.len())
        });
        let (items, next) = self.page(&sets, begin);
        let next = next.map(|i| RecordSetCursor {
            name: sets[i].name.clone(),
            record_type: sets[i].record_type.clone(),
            identifier: sets[i].set_identifier.clone(),
        });
        log::debug!(
            "[{PROVIDER_ID}] list_resource_record_sets: zone_id={zone_id}, {} items, more={}",
            items.len(),
            next.is_some()
        );
        Ok(PaginatedResponse::new(items, next))
    }

    async fn change_resource_record_sets(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<ChangeInfo> {
        let mut state = self.state.write().await;
        let attempt = state.batch_attempts;
        state.batch_attempts += 1;

        if state.fail_batch_at == Some(attempt) {
            log::warn!("[{PROVIDER_ID}] change_resource_record_sets: injected failure");
            return Err(ProviderError::InvalidChangeBatch {
                provider: PROVIDER_ID.to_string(),
                messages: vec![format!("batch {attempt} rejected")],
            });
        }

        let entries: usize = batch
            .changes
            .iter()
            .map(|c| c.resource_record_set.resource_record_count())
            .sum();
        if entries > self.limits.max_changes_per_batch {
            return Err(ProviderError::InvalidChangeBatch {
                provider: PROVIDER_ID.to_string(),
                messages: vec![format!(
                    "Number of records limit of {} exceeded: {entries}",
                    self.limits.max_changes_per_batch
                )],
            });
        }

        let zone_short_id = short_zone_id(zone_id).to_string();
        let current = state.zone_sets_mut(zone_id)?;
        let updated = apply_batch(current, batch, &zone_short_id).map_err(|messages| {
            ProviderError::InvalidChangeBatch {
                provider: PROVIDER_ID.to_string(),
                messages,
            }
        })?;
        *current = updated;

        let id = state.next_id();
        state.submitted.push((zone_id.to_string(), batch.clone()));
        log::debug!(
            "[{PROVIDER_ID}] change_resource_record_sets: zone_id={zone_id}, {} changes, comment={}",
            batch.changes.len(),
            truncate_for_log(batch.comment.as_deref().unwrap_or_default())
        );

        Ok(ChangeInfo {
            id: format!("/change/C{id:08X}"),
            status: ChangeStatus::Pending,
            submitted_at: Some(chrono::Utc::now()),
            comment: batch.comment.clone(),
        })
    }

    async fn list_health_checks(
        &self,
        marker: Option<&str>,
    ) -> Result<PaginatedResponse<HealthCheck>> {
        let state = self.state.read().await;
        let start = match marker {
            Some(m) => state
                .health_checks
                .iter()
                .position(|hc| hc.id == m)
                .ok_or_else(|| Self::invalid_marker(m))?,
            None => 0,
        };
        let (items, next) = self.page(&state.health_checks, start);
        let next = next.map(|i| state.health_checks[i].id.clone());
        Ok(PaginatedResponse::new(items, next))
    }

    async fn create_health_check(
        &self,
        caller_reference: &str,
        config: &HealthCheckConfig,
    ) -> Result<HealthCheck> {
        if caller_reference.len() > self.limits.max_caller_reference_len {
            return Err(ProviderError::InvalidParameter {
                provider: PROVIDER_ID.to_string(),
                param: "CallerReference".to_string(),
                detail: format!(
                    "longer than {} characters",
                    self.limits.max_caller_reference_len
                ),
            });
        }

        let mut state = self.state.write().await;
        if state
            .health_checks
            .iter()
            .any(|hc| hc.caller_reference == caller_reference)
        {
            return Err(ProviderError::HealthCheckAlreadyExists {
                provider: PROVIDER_ID.to_string(),
                caller_reference: caller_reference.to_string(),
            });
        }

        let health_check = HealthCheck {
            id: uuid::Uuid::new_v4().to_string(),
            caller_reference: caller_reference.to_string(),
            health_check_config: config.clone(),
            health_check_version: 1,
            tags: std::collections::BTreeMap::new(),
        };
        state.health_checks.push(health_check.clone());
        log::debug!(
            "[{PROVIDER_ID}] create_health_check: id={}, ref={caller_reference}",
            health_check.id
        );
        Ok(health_check)
    }

    async fn delete_health_check(&self, health_check_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.health_checks.len();
        state.health_checks.retain(|hc| hc.id != health_check_id);
        if state.health_checks.len() == before {
            return Err(ProviderError::HealthCheckNotFound {
                provider: PROVIDER_ID.to_string(),
                health_check_id: health_check_id.to_string(),
            });
        }
        state
            .deleted_health_checks
            .push(health_check_id.to_string());
        log::debug!("[{PROVIDER_ID}] delete_health_check: id={health_check_id}");
        Ok(())
    }

    async fn change_tags_for_resource(
        &self,
        resource_type: TagResourceType,
        resource_id: &str,
        tags: &[Tag],
    ) -> Result<()> {
        let mut state = self.state.write().await;
        match resource_type {
            TagResourceType::Healthcheck => {
                let health_check = state
                    .health_checks
                    .iter_mut()
                    .find(|hc| hc.id == resource_id)
                    .ok_or_else(|| ProviderError::HealthCheckNotFound {
                        provider: PROVIDER_ID.to_string(),
                        health_check_id: resource_id.to_string(),
                    })?;
                for tag in tags {
                    health_check.tags.insert(tag.key.clone(), tag.value.clone());
                }
            }
            TagResourceType::Hostedzone => {
                if !state
                    .zones
                    .iter()
                    .any(|z| short_zone_id(&z.id) == short_zone_id(resource_id))
                {
                    return Err(ProviderError::HostedZoneNotFound {
                        provider: PROVIDER_ID.to_string(),
                        zone_id: resource_id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
