//! Provider record sets → records
//!
//! The reverse of [`compile`](crate::compiler::compile). Every record set whose
//! name or alias target is synthetic belongs to a dynamic record and is
//! regrouped by the record it was compiled from.

use std::collections::BTreeMap;

use dns_reconciler_provider::log_sanitizer::preview_values;
use dns_reconciler_provider::{full_name_to_relative, octal_replace, Failover, ResourceRecordSet};

use crate::error::CoreResult;
use crate::geo::GeoCode;
use crate::health::HealthCheckBinder;
use crate::record::{Dynamic, Pool, PoolValue, Record, RecordType, Rule, Status, Zone, DEFAULT_POOL};
use crate::rrset::{SyntheticKind, SyntheticName};
use crate::values::{is_service_target, AliasValue, RecordData};

/// Providers keep no ttl on alias record sets, so populated aliases carry this one.
pub const ALIAS_TTL: u32 = 942_942_942;

type RecordKey = (String, RecordType);

/// Build the zone described by `rrsets`.
///
/// `health` must already hold the health check inventory, it decides the
/// status of dynamic pool values.
pub fn populate(
    zone_name: &str,
    rrsets: &[ResourceRecordSet],
    health: &HealthCheckBinder,
) -> CoreResult<Zone> {
    let mut zone = Zone::new(zone_name);
    let mut simple: BTreeMap<RecordKey, &ResourceRecordSet> = BTreeMap::new();
    let mut aliases: BTreeMap<String, Vec<&ResourceRecordSet>> = BTreeMap::new();
    let mut dynamic: BTreeMap<RecordKey, Vec<&ResourceRecordSet>> = BTreeMap::new();

    for rrset in rrsets {
        let Some(record_type) = RecordType::from_wire(&rrset.record_type) else {
            continue;
        };
        let fqdn = octal_replace(&rrset.name);

        if let Some(synthetic) = SyntheticName::decode(&fqdn) {
            let name = full_name_to_relative(&synthetic.fqdn, &zone.name);
            dynamic.entry((name, record_type)).or_default().push(rrset);
            continue;
        }

        let name = full_name_to_relative(&fqdn, &zone.name);
        if let Some(target) = &rrset.alias_target {
            if SyntheticName::decode(&target.dns_name).is_some() {
                dynamic.entry((name, record_type)).or_default().push(rrset);
            } else {
                aliases.entry(name).or_default().push(rrset);
            }
            continue;
        }
        if rrset.traffic_policy_instance_id.is_some() {
            log::warn!("populate: traffic policies are not supported, skipping {fqdn}");
            continue;
        }

        if simple.contains_key(&(name.clone(), record_type)) {
            log::debug!(
                "populate: ignoring additional {record_type} record set {fqdn} {}",
                preview_values(rrset.values())
            );
            continue;
        }
        simple.insert((name, record_type), rrset);
    }

    for ((name, record_type), sets) in dynamic {
        if let Some(record) = dynamic_record(&zone.name, &name, record_type, &sets, health)? {
            zone.add_record(record, false)?;
        }
    }

    for ((name, record_type), rrset) in simple {
        let data = RecordData::parse_wire_values(record_type, rrset.values())?;
        let record = Record::new(&zone.name, name, rrset.ttl.unwrap_or_default(), data);
        zone.add_record(record, false)?;
    }

    for (name, sets) in aliases {
        let record = alias_record(&zone.name, name, &sets);
        zone.add_record(record, false)?;
    }

    log::debug!("populate: {} found {} records", zone.name, zone.len());
    Ok(zone)
}

fn alias_record(zone_name: &str, name: String, rrsets: &[&ResourceRecordSet]) -> Record {
    let values = rrsets
        .iter()
        .filter_map(|rrset| {
            let target = rrset.alias_target.as_ref()?;
            let service = is_service_target(&target.dns_name);
            Some(AliasValue {
                name: if service {
                    target.dns_name.clone()
                } else {
                    full_name_to_relative(&target.dns_name, zone_name)
                },
                record_type: Some(rrset.record_type.clone()),
                evaluate_target_health: target.evaluate_target_health,
                hosted_zone_id: service.then(|| target.hosted_zone_id.clone()),
            })
        })
        .collect();
    Record::new(zone_name, name, ALIAS_TTL, RecordData::Alias(values))
}

/// Rebuild one dynamic record. `None` when its default pool is gone.
fn dynamic_record(
    zone_name: &str,
    name: &str,
    record_type: RecordType,
    rrsets: &[&ResourceRecordSet],
    health: &HealthCheckBinder,
) -> CoreResult<Option<Record>> {
    let mut base = None;
    let mut pools: BTreeMap<String, Pool> = BTreeMap::new();
    let mut values: BTreeMap<String, Vec<(usize, PoolValue)>> = BTreeMap::new();
    let mut rules: BTreeMap<usize, Rule> = BTreeMap::new();

    for rrset in rrsets {
        match SyntheticName::decode(&octal_replace(&rrset.name)) {
            Some(synthetic) if synthetic.is_default_pool() => base = Some(*rrset),
            Some(synthetic) if synthetic.kind == SyntheticKind::Pool => {
                // the primary only points at the pool's own values
                if rrset.failover != Some(Failover::Secondary) {
                    continue;
                }
                let fallback = rrset
                    .alias_target
                    .as_ref()
                    .and_then(|target| SyntheticName::decode(&target.dns_name))
                    .map(|target| target.pool)
                    .filter(|pool| pool != DEFAULT_POOL);
                pools.entry(synthetic.pool).or_default().fallback = fallback;
            }
            Some(synthetic) => {
                let Some(value) = rrset.values().next() else {
                    continue;
                };
                let ordinal = rrset
                    .set_identifier
                    .as_deref()
                    .and_then(|id| id.rsplit_once('-'))
                    .and_then(|(_, n)| n.parse().ok())
                    .unwrap_or_default();
                let pool_value = PoolValue::new(value)
                    .with_weight(rrset.weight.unwrap_or(1))
                    .with_status(value_status(rrset, health));
                values
                    .entry(synthetic.pool)
                    .or_default()
                    .push((ordinal, pool_value));
            }
            None => {
                let Some(target) = rrset
                    .alias_target
                    .as_ref()
                    .and_then(|target| SyntheticName::decode(&target.dns_name))
                else {
                    continue;
                };
                let Some(index) = rrset
                    .set_identifier
                    .as_deref()
                    .and_then(|id| id.split_once('-'))
                    .and_then(|(index, _)| index.parse::<usize>().ok())
                else {
                    log::warn!(
                        "populate: rule record set {} has no rule index, skipping",
                        rrset.name
                    );
                    continue;
                };
                let rule = rules.entry(index).or_insert_with(|| Rule {
                    pool: target.pool,
                    geos: Vec::new(),
                });
                if let Some(location) = &rrset.geo_location {
                    if let Some(geo) = GeoCode::from_location(location)? {
                        rule.geos.push(geo.to_string());
                    }
                }
            }
        }
    }

    let Some(base) = base else {
        log::warn!("populate: {name} {record_type} has no default pool, skipping");
        return Ok(None);
    };

    for (pool, mut pool_values) in values {
        pool_values.sort_by_key(|(ordinal, _)| *ordinal);
        pools.entry(pool).or_default().values =
            pool_values.into_iter().map(|(_, value)| value).collect();
    }

    let data = RecordData::parse_wire_values(record_type, base.values())?;
    let record = Record::new(zone_name, name, base.ttl.unwrap_or_default(), data).with_dynamic(
        Dynamic {
            pools,
            rules: rules.into_values().collect(),
        },
    );
    Ok(Some(record))
}

/// No check means up, a disabled and inverted check means down.
fn value_status(rrset: &ResourceRecordSet, health: &HealthCheckBinder) -> Status {
    match rrset.health_check_id.as_deref().and_then(|id| health.get(id)) {
        None => Status::Up,
        Some(check)
            if check.health_check_config.disabled && check.health_check_config.inverted =>
        {
            Status::Down
        }
        Some(_) => Status::Obey,
    }
}
