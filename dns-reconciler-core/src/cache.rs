//! Planning-cycle caches and paging

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use dns_reconciler_provider::{
    octal_replace, DnsProvider, HostedZone, PaginatedResponse, ProviderError, RecordSetCursor,
    ResourceRecordSet,
};
use futures::stream::{self, TryStreamExt};

use crate::error::{CoreError, CoreResult};
use crate::health::HealthCheckBinder;

/// Drain a paginated listing, requesting pages one at a time until the
/// provider stops returning a continuation token.
pub async fn collect_pages<T, C, F, Fut>(fetch: F) -> CoreResult<Vec<T>>
where
    F: Fn(Option<C>) -> Fut,
    Fut: Future<Output = Result<PaginatedResponse<T, C>, ProviderError>>,
{
    // state: None once the last page was seen, Some(cursor) otherwise
    let pages = stream::try_unfold(Some(None), |state: Option<Option<C>>| {
        let request = state.map(&fetch);
        async move {
            let Some(request) = request else {
                return Ok::<_, ProviderError>(None);
            };
            let page = request.await?;
            Ok(Some((page.items, page.next.map(Some))))
        }
    });
    let pages: Vec<Vec<T>> = pages.try_collect().await?;
    Ok(pages.into_iter().flatten().collect())
}

/// What a planning cycle has already fetched from the provider.
///
/// Reset at the start of every plan so state never leaks between cycles.
#[derive(Debug)]
pub struct PlanningCache {
    /// Zone name → zone id, `None` until listed.
    zone_ids: Option<BTreeMap<String, String>>,
    /// Zone id → every record set of the zone.
    record_sets: HashMap<String, Vec<ResourceRecordSet>>,
    pub health_checks: HealthCheckBinder,
}

impl PlanningCache {
    pub fn new(health_check_version: impl Into<String>) -> Self {
        Self {
            zone_ids: None,
            record_sets: HashMap::new(),
            health_checks: HealthCheckBinder::new(health_check_version),
        }
    }

    pub fn reset(&mut self) {
        self.zone_ids = None;
        self.record_sets.clear();
        self.health_checks.reset();
    }

    pub fn zone_ids(&self) -> Option<&BTreeMap<String, String>> {
        self.zone_ids.as_ref()
    }

    pub fn set_zone_ids(&mut self, zone_ids: BTreeMap<String, String>) {
        self.zone_ids = Some(zone_ids);
    }

    /// Remember one zone id, starting an empty map if nothing was listed yet.
    pub fn insert_zone_id(&mut self, name: &str, id: &str) {
        self.zone_ids
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), id.to_string());
    }

    /// Every record set of a zone, paging them in on first use.
    pub async fn record_sets(
        &mut self,
        provider: &dyn DnsProvider,
        zone_id: &str,
    ) -> CoreResult<&[ResourceRecordSet]> {
        if !self.record_sets.contains_key(zone_id) {
            let sets = collect_pages(move |start: Option<RecordSetCursor>| async move {
                provider
                    .list_resource_record_sets(zone_id, start.as_ref())
                    .await
            })
            .await?;
            log::debug!(
                "[{}] Loaded {} record sets of {zone_id}",
                provider.id(),
                sets.len()
            );
            self.record_sets.insert(zone_id.to_string(), sets);
        }
        Ok(self
            .record_sets
            .get(zone_id)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Drop a zone's record sets so the next access reloads them.
    pub fn invalidate_record_sets(&mut self, zone_id: &str) {
        self.record_sets.remove(zone_id);
    }
}

/// Every hosted zone, keyed by unescaped name, filtered by privacy and,
/// when given, by delegation set.
pub async fn list_zone_ids(
    provider: &dyn DnsProvider,
    private: Option<bool>,
    delegation_set_id: Option<&str>,
) -> CoreResult<BTreeMap<String, String>> {
    let zones: Vec<HostedZone> = collect_pages(move |marker: Option<String>| async move {
        provider
            .list_hosted_zones(marker.as_deref(), delegation_set_id)
            .await
    })
    .await?;

    let mut ids = BTreeMap::new();
    for zone in zones {
        if private.is_some_and(|want| want != zone.is_private()) {
            continue;
        }
        let name = octal_replace(&zone.name);
        if ids.insert(name.clone(), zone.id).is_some() {
            return Err(CoreError::DuplicateZone(name));
        }
    }
    Ok(ids)
}
