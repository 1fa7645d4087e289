//! Zone reconciliation service

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use dns_reconciler_provider::{
    ensure_trailing_dot, octal_replace, Change, ChangeBatch, CreateHostedZoneRequest,
    DnsProvider, HostedZoneConfig, ResourceRecordSet,
};

use crate::batch::{entry_count, plan_batches};
use crate::cache::{list_zone_ids, PlanningCache};
use crate::compiler::compile;
use crate::config::ReconcilerConfig;
use crate::diff::RecordSetDiff;
use crate::error::{CoreError, CoreResult};
use crate::geo::GeoCode;
use crate::ordering::order_changes;
use crate::populate::populate;
use crate::record::{Record, RecordType, Zone};
use crate::rrset::RecordSet;
use crate::types::{ApplyReport, Plan, RecordChange};
use crate::values::RecordData;

/// Mutations of one record-level change plus the health checks it keeps using.
struct ChangeMutations {
    changes: Vec<Change>,
    gc_record: Record,
    in_use: HashSet<String>,
}

const ACM_VALIDATION_SUFFIX: &str = ".acm-validations.aws.";

/// Certificate validation CNAMEs are managed by the certificate service.
fn is_acm_validation(record: &Record) -> bool {
    record.name.starts_with('_')
        && matches!(
            &record.data,
            RecordData::Cname(target) if target.ends_with(ACM_VALIDATION_SUFFIX)
        )
}

/// Plans and applies zones against one provider.
///
/// Holds the per-cycle caches, so methods take `&mut self`. Every
/// [`plan`](Self::plan) starts from a clean cache.
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
    config: ReconcilerConfig,
    cache: PlanningCache,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn DnsProvider>, config: ReconcilerConfig) -> CoreResult<Self> {
        config.validate()?;
        let cache = PlanningCache::new(config.health_check_version.clone());
        Ok(Self {
            provider,
            config,
            cache,
        })
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn DnsProvider> {
        &self.provider
    }

    /// Batch size limit: the configured one, capped by the provider's.
    fn max_changes(&self) -> usize {
        self.config
            .max_changes
            .min(self.provider.limits().max_changes_per_batch)
    }

    // ===== Zones =====

    async fn zone_ids(&mut self) -> CoreResult<&BTreeMap<String, String>> {
        if self.cache.zone_ids().is_none() {
            let ids = list_zone_ids(
                self.provider.as_ref(),
                self.config.private,
                self.config.delegation_set_id.as_deref(),
            )
            .await?;
            log::debug!(
                "[{}] Listed {} hosted zones",
                self.provider.id(),
                ids.len()
            );
            self.cache.set_zone_ids(ids);
        }
        self.cache
            .zone_ids()
            .ok_or_else(|| CoreError::Config("zone listing unavailable".to_string()))
    }

    /// Names of every managed zone, sorted.
    pub async fn list_zones(&mut self) -> CoreResult<Vec<String>> {
        Ok(self.zone_ids().await?.keys().cloned().collect())
    }

    /// Id of the zone called `name`, creating the zone when asked to.
    pub async fn zone_id(&mut self, name: &str, create: bool) -> CoreResult<Option<String>> {
        let name = ensure_trailing_dot(name);
        if let Some(id) = self.cache.zone_ids().and_then(|ids| ids.get(&name)) {
            return Ok(Some(id.clone()));
        }

        let found = if self.config.get_zones_by_name {
            self.find_zone_by_name(&name).await?
        } else {
            self.zone_ids().await?.get(&name).cloned()
        };
        match found {
            Some(id) => Ok(Some(id)),
            None if create => self.create_zone(&name).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_zone_by_name(&mut self, name: &str) -> CoreResult<Option<String>> {
        let zones = self.provider.list_hosted_zones_by_name(name).await?;
        let matching: Vec<_> = zones
            .into_iter()
            .filter(|zone| octal_replace(&zone.name) == name)
            .filter(|zone| self.config.accepts_zone(zone.is_private()))
            .collect();
        match matching.as_slice() {
            [] => Ok(None),
            [zone] => {
                self.cache.insert_zone_id(name, &zone.id);
                Ok(Some(zone.id.clone()))
            }
            _ => Err(CoreError::DuplicateZone(name.to_string())),
        }
    }

    async fn create_zone(&mut self, name: &str) -> CoreResult<String> {
        let request = CreateHostedZoneRequest {
            name: name.to_string(),
            caller_reference: uuid::Uuid::new_v4().to_string(),
            delegation_set_id: self.config.delegation_set_id.clone(),
            hosted_zone_config: self.config.private.map(|private_zone| HostedZoneConfig {
                comment: None,
                private_zone,
            }),
        };
        let zone = self.provider.create_hosted_zone(&request).await?;
        log::info!(
            "[{}] Created hosted zone {name} ({})",
            self.provider.id(),
            zone.id
        );
        self.cache.insert_zone_id(name, &zone.id);
        self.cache.invalidate_record_sets(&zone.id);
        Ok(zone.id)
    }

    // ===== Plan =====

    /// The live contents of a zone, `None` when it does not exist.
    pub async fn populate(&mut self, zone_name: &str) -> CoreResult<Option<Zone>> {
        let name = ensure_trailing_dot(zone_name);
        let Some(zone_id) = self.zone_id(&name, false).await? else {
            log::debug!("populate: {name} does not exist");
            return Ok(None);
        };

        self.cache.health_checks.load(self.provider.as_ref()).await?;
        let rrsets = self
            .cache
            .record_sets(self.provider.as_ref(), &zone_id)
            .await?
            .to_vec();
        let zone = populate(&name, &rrsets, &self.cache.health_checks)?;
        log::info!("populate: {name} has {} records", zone.len());
        Ok(Some(zone))
    }

    /// Drop geo codes the provider cannot route on (Canadian provinces).
    ///
    /// With `strict_supports` any such code is an error. Otherwise offending
    /// codes are filtered from their rule with a warning, and a rule left
    /// without codes is dropped so it does not turn into a catch-all. A
    /// record left without rules loses its dynamic routing.
    ///
    /// Certificate validation records are skipped here too.
    pub fn process_desired_zone(&self, desired: Zone) -> CoreResult<Zone> {
        let mut processed = Zone::new(&desired.name);
        for mut record in desired.into_records() {
            let fqdn = record.fqdn();
            if self.config.ignore_acm_validations && is_acm_validation(&record) {
                log::info!("process: ignoring certificate validation record {fqdn}");
                continue;
            }
            if let Some(dynamic) = record.dynamic.as_mut() {
                dynamic.normalize();
                let mut rules = Vec::with_capacity(dynamic.rules.len());
                for (i, mut rule) in std::mem::take(&mut dynamic.rules).into_iter().enumerate() {
                    let before = rule.geos.len();
                    rule.geos.retain(|geo| {
                        GeoCode::parse(geo).map_or(true, |code| code.is_supported())
                    });
                    if rule.geos.len() == before {
                        rules.push(rule);
                        continue;
                    }

                    let message = format!("NA-CA-* not supported for {fqdn}");
                    if self.config.strict_supports {
                        return Err(CoreError::Unsupported(message));
                    }
                    if rule.geos.is_empty() {
                        log::warn!("{message}, skipping rule {i}");
                    } else {
                        log::warn!(
                            "{message}, filtering rule {i} to ({})",
                            rule.geos.join(", ")
                        );
                        rules.push(rule);
                    }
                }
                dynamic.rules = rules;
            }
            if record.dynamic.as_ref().is_some_and(|d| d.rules.is_empty()) {
                log::warn!(
                    "NA-CA-* not supported for {fqdn}, no rules left, serving its default values"
                );
                record.dynamic = None;
            }
            processed.add_record(record, false)?;
        }
        Ok(processed)
    }

    /// Hide live records this reconciler must neither update nor delete.
    fn process_existing_zone(&self, existing: Zone) -> CoreResult<Zone> {
        if !self.config.ignore_acm_validations {
            return Ok(existing);
        }
        let mut processed = Zone::new(&existing.name);
        for record in existing.into_records() {
            if is_acm_validation(&record) {
                log::debug!(
                    "process: leaving certificate validation record {} alone",
                    record.fqdn()
                );
                continue;
            }
            processed.add_record(record, false)?;
        }
        Ok(processed)
    }

    /// Compare `desired` with the live zone.
    pub async fn plan(&mut self, desired: Zone) -> CoreResult<Plan> {
        self.cache.reset();
        let desired = self.process_desired_zone(desired)?;
        for record in desired.records() {
            record.validate()?;
        }

        let existing = self.populate(&desired.name).await?;
        let exists = existing.is_some();
        let existing = match existing {
            Some(zone) => self.process_existing_zone(zone)?,
            None => Zone::new(&desired.name),
        };

        let mut changes = Vec::new();
        for record in desired.records() {
            let Some(current) = existing.get(&record.name, record.record_type()) else {
                changes.push(RecordChange::Create(record.clone()));
                continue;
            };
            if current.same_content(record) {
                continue;
            }
            // alias sets have no ttl, a ttl-only change can never converge
            if record.record_type() == RecordType::Alias && current.data == record.data {
                continue;
            }
            changes.push(RecordChange::Update {
                existing: current.clone(),
                new: record.clone(),
            });
        }

        for record in existing.records() {
            if desired.get(&record.name, record.record_type()).is_some() {
                continue;
            }
            // the apex NS comes with the zone
            if record.name.is_empty() && record.record_type() == RecordType::Ns {
                continue;
            }
            changes.push(RecordChange::Delete(record.clone()));
        }

        if exists {
            let extra = self.stale_health_check_updates(&desired, &changes).await?;
            changes.extend(extra);
        }
        changes.sort_by_cached_key(RecordChange::sort_key);

        log::info!(
            "plan: {} has {} changes, exists={exists}",
            desired.name,
            changes.len()
        );
        Ok(Plan {
            desired,
            changes,
            exists,
        })
    }

    /// Updates for unchanged dynamic records whose health checks are out of date.
    async fn stale_health_check_updates(
        &mut self,
        desired: &Zone,
        changes: &[RecordChange],
    ) -> CoreResult<Vec<RecordChange>> {
        let Some(zone_id) = self.zone_id(&desired.name, false).await? else {
            return Ok(Vec::new());
        };
        let rrsets = self
            .cache
            .record_sets(self.provider.as_ref(), &zone_id)
            .await?
            .to_vec();

        let changed: HashSet<_> = changes.iter().map(RecordChange::key).collect();
        let mut extra = Vec::new();
        for record in desired.records().filter(|r| r.is_dynamic()) {
            if changed.contains(&record.key()) {
                continue;
            }
            let stale = self.cache.health_checks.stale_value_sets(record, &rrsets);
            if stale.is_empty() {
                continue;
            }
            log::info!(
                "plan: health checks of {} {} are out of date ({} value sets)",
                record.fqdn(),
                record.record_type(),
                stale.len()
            );
            extra.push(RecordChange::Update {
                existing: record.clone(),
                new: record.clone(),
            });
        }
        Ok(extra)
    }

    // ===== Apply =====

    /// Submit a plan.
    ///
    /// Every mutation is computed and packed into batches before the first
    /// batch is sent, so a change too large for one batch fails without
    /// touching any record set. Batches are sent one at a time and the first
    /// rejected batch stops the rest; earlier batches stay applied.
    pub async fn apply(&mut self, plan: &Plan) -> CoreResult<ApplyReport> {
        let zone_name = plan.desired.name.clone();
        log::info!("apply: {zone_name}, {} changes", plan.changes.len());

        let zone_id = self
            .zone_id(&zone_name, true)
            .await?
            .ok_or_else(|| CoreError::ZoneNotFound(zone_name.clone()))?;
        let existing = self
            .cache
            .record_sets(self.provider.as_ref(), &zone_id)
            .await?
            .to_vec();

        let mut groups = Vec::with_capacity(plan.changes.len());
        let mut collect = Vec::with_capacity(plan.changes.len());
        for change in &plan.changes {
            let mutations = self.mutations(change, &zone_id, &existing).await?;
            groups.push(mutations.changes);
            collect.push((mutations.gc_record, mutations.in_use));
        }
        let mutation_count = groups.iter().map(Vec::len).sum();

        let batches = plan_batches(groups, self.max_changes())?;
        let total = batches.len();
        let mut receipts = Vec::with_capacity(total);
        for (i, changes) in batches.into_iter().enumerate() {
            let batch = ChangeBatch {
                comment: Some(format!("Change: {}", uuid::Uuid::new_v4().simple())),
                changes,
            };
            log::info!(
                "[{}] apply: sending batch {}/{total}, {} mutations, {} resource records",
                self.provider.id(),
                i + 1,
                batch.changes.len(),
                entry_count(&batch.changes)
            );
            match self
                .provider
                .change_resource_record_sets(&zone_id, &batch)
                .await
            {
                Ok(info) => {
                    log::debug!("apply: batch {} accepted as {}", i + 1, info.id);
                    receipts.push(info);
                }
                Err(e) => {
                    self.cache.invalidate_record_sets(&zone_id);
                    if e.is_expected() {
                        log::warn!("apply: batch {} of {zone_name} rejected: {e}", i + 1);
                    } else {
                        log::error!("apply: batch {} of {zone_name} failed: {e}", i + 1);
                    }
                    return Err(e.into());
                }
            }
        }
        self.cache.invalidate_record_sets(&zone_id);

        let mut deleted_health_checks = Vec::new();
        for (record, in_use) in &collect {
            let deleted = self
                .cache
                .health_checks
                .gc(self.provider.as_ref(), record, in_use)
                .await?;
            deleted_health_checks.extend(deleted);
        }

        Ok(ApplyReport {
            zone_id,
            changes: plan.changes.len(),
            mutations: mutation_count,
            batches: receipts,
            deleted_health_checks,
        })
    }

    /// Provider mutations of one record-level change, ordered.
    ///
    /// Health checks for the new side are provisioned first so it compiles
    /// with every check bound.
    async fn mutations(
        &mut self,
        change: &RecordChange,
        zone_id: &str,
        existing: &[ResourceRecordSet],
    ) -> CoreResult<ChangeMutations> {
        let (old, new) = match change {
            // the apex NS comes with the zone, creating it means overwriting it
            RecordChange::Create(new)
                if new.name.is_empty() && new.record_type() == RecordType::Ns =>
            {
                (Some(new), Some(new))
            }
            RecordChange::Create(new) => (None, Some(new)),
            RecordChange::Update { existing, new } => (Some(existing), Some(new)),
            RecordChange::Delete(existing) => (Some(existing), None),
        };

        if let Some(new) = new {
            self.cache
                .health_checks
                .provision(self.provider.as_ref(), new)
                .await?;
        }
        let binder = &self.cache.health_checks;
        let old_sets = match old {
            Some(record) => compile(record, zone_id, false, binder)?,
            None => HashSet::new(),
        };
        let new_sets = match new {
            Some(record) => compile(record, zone_id, true, binder)?,
            None => HashSet::new(),
        };

        let mut changes = RecordSetDiff::new(&old_sets, &new_sets).to_changes(existing);
        order_changes(&mut changes);

        let in_use = new_sets
            .iter()
            .filter_map(RecordSet::health_check_id)
            .map(str::to_string)
            .collect();
        let gc_record = change.record().clone();
        Ok(ChangeMutations {
            changes,
            gc_record,
            in_use,
        })
    }
}
