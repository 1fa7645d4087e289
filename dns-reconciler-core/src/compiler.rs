//! Record → record set compilation

use std::collections::HashSet;

use dns_reconciler_provider::short_zone_id;

use crate::error::{CoreError, CoreResult};
use crate::geo::GeoCode;
use crate::record::{validate_alias_value, Dynamic, Record, Status, DEFAULT_POOL};
use crate::rrset::{
    AliasSet, DefaultPoolSet, FailoverMode, FailoverSet, GeoRuleSet, PoolValueSet, RecordSet,
    SimpleSet,
};
use crate::values::{AliasValue, RecordData};

/// Finds the health check bound to a pool value.
pub trait HealthCheckLookup {
    fn health_check_id(
        &self,
        record: &Record,
        value: &str,
        status: Status,
    ) -> CoreResult<Option<String>>;
}

impl<F> HealthCheckLookup for F
where
    F: Fn(&Record, &str, Status) -> Option<String>,
{
    fn health_check_id(
        &self,
        record: &Record,
        value: &str,
        status: Status,
    ) -> CoreResult<Option<String>> {
        Ok(self(record, value, status))
    }
}

/// Compile a record into the record sets that represent it.
///
/// `creating` marks the side of a change that will be written. Health checks
/// for that side must already exist, so a pool value needing one that the
/// lookup cannot find is an error; on the other side it compiles without one.
pub fn compile(
    record: &Record,
    zone_id: &str,
    creating: bool,
    lookup: &impl HealthCheckLookup,
) -> CoreResult<HashSet<RecordSet>> {
    let zone_id = short_zone_id(zone_id);

    if let Some(dynamic) = &record.dynamic {
        return compile_dynamic(record, dynamic, zone_id, creating, lookup);
    }

    let fqdn = record.fqdn();
    match &record.data {
        RecordData::Alias(values) => values
            .iter()
            .map(|value| compile_alias(record, value, zone_id).map(RecordSet::Alias))
            .collect(),
        data => Ok(HashSet::from([RecordSet::Simple(SimpleSet {
            fqdn,
            record_type: record.record_type().to_string(),
            ttl: record.ttl,
            values: data.to_wire_values(),
        })])),
    }
}

fn compile_alias(record: &Record, value: &AliasValue, zone_id: &str) -> CoreResult<AliasSet> {
    validate_alias_value(value).map_err(|reason| CoreError::validation(record.fqdn(), reason))?;

    let target_name = if value.is_service() {
        value.name.clone()
    } else if value.name.is_empty() {
        record.zone.clone()
    } else {
        format!("{}.{}", value.name, record.zone)
    };

    Ok(AliasSet {
        fqdn: record.fqdn(),
        target_type: value.record_type.clone().unwrap_or_default(),
        target_name,
        hosted_zone_id: value
            .hosted_zone_id
            .clone()
            .unwrap_or_else(|| zone_id.to_string()),
        evaluate_target_health: value.evaluate_target_health,
    })
}

fn compile_dynamic(
    record: &Record,
    dynamic: &Dynamic,
    zone_id: &str,
    creating: bool,
    lookup: &impl HealthCheckLookup,
) -> CoreResult<HashSet<RecordSet>> {
    let fqdn = record.fqdn();
    let record_type = record.record_type().to_string();
    let mut sets = HashSet::new();

    sets.insert(RecordSet::DefaultPool(DefaultPoolSet {
        fqdn: fqdn.clone(),
        record_type: record_type.clone(),
        ttl: record.ttl,
        values: record.data.to_wire_values(),
    }));

    for (pool_name, pool) in &dynamic.pools {
        sets.insert(RecordSet::PoolFailover(FailoverSet {
            fqdn: fqdn.clone(),
            record_type: record_type.clone(),
            pool: pool_name.clone(),
            mode: FailoverMode::Primary,
            fallback: None,
            hosted_zone_id: zone_id.to_string(),
        }));
        sets.insert(RecordSet::PoolFailover(FailoverSet {
            fqdn: fqdn.clone(),
            record_type: record_type.clone(),
            pool: pool_name.clone(),
            mode: FailoverMode::Secondary,
            fallback: Some(
                pool.fallback
                    .clone()
                    .unwrap_or_else(|| DEFAULT_POOL.to_string()),
            ),
            hosted_zone_id: zone_id.to_string(),
        }));

        for (ordinal, value) in pool.values.iter().enumerate() {
            let health_check_id = if value.status == Status::Up {
                None
            } else {
                let id = lookup.health_check_id(record, &value.value, value.status)?;
                if creating && id.is_none() {
                    return Err(CoreError::validation(
                        fqdn,
                        format!("no health check provisioned for {}", value.value),
                    ));
                }
                id
            };
            sets.insert(RecordSet::PoolValue(PoolValueSet {
                fqdn: fqdn.clone(),
                record_type: record_type.clone(),
                pool: pool_name.clone(),
                ordinal,
                ttl: record.ttl,
                value: value.value.clone(),
                weight: value.weight,
                status: value.status,
                health_check_id,
            }));
        }
    }

    for (index, rule) in dynamic.rules.iter().enumerate() {
        let geos = if rule.geos.is_empty() {
            vec![None]
        } else {
            rule.geos
                .iter()
                .map(|geo| GeoCode::parse(geo).map(Some))
                .collect::<CoreResult<Vec<_>>>()?
        };
        for geo in geos {
            sets.insert(RecordSet::GeoRule(GeoRuleSet {
                fqdn: fqdn.clone(),
                record_type: record_type.clone(),
                index,
                pool: rule.pool.clone(),
                geo,
                hosted_zone_id: zone_id.to_string(),
            }));
        }
    }

    Ok(sets)
}
