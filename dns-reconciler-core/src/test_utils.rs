//! Shared test fixtures.

use std::collections::BTreeMap;

use dns_reconciler_provider::{HealthCheck, HealthCheckConfig, HealthCheckType};

use crate::health::{new_reference, reference_prefix};
use crate::record::{Dynamic, Pool, PoolValue, Record, Rule, Status};
use crate::values::RecordData;

pub const ZONE: &str = "unit.tests.";
pub const ZONE_ID: &str = "Z2";

/// Apex A record with three pools:
///
/// - `one`: 1.1.1.1 (obey), 2.2.2.2 (up), falls back to `two`
/// - `two`: 3.3.3.3 (obey), falls back to `three`
/// - `three`: 5.5.5.5 (down)
///
/// Rule 0 sends AF, EU-GB and NA-US-CA to `one`, rule 1 sends the rest to `three`.
pub fn dynamic_a_record() -> Record {
    let pools = BTreeMap::from([
        (
            "one".to_string(),
            Pool {
                values: vec![
                    PoolValue::new("1.1.1.1").with_weight(2),
                    PoolValue::new("2.2.2.2").with_status(Status::Up),
                ],
                fallback: Some("two".to_string()),
            },
        ),
        (
            "two".to_string(),
            Pool {
                values: vec![PoolValue::new("3.3.3.3")],
                fallback: Some("three".to_string()),
            },
        ),
        (
            "three".to_string(),
            Pool {
                values: vec![PoolValue::new("5.5.5.5").with_status(Status::Down)],
                fallback: None,
            },
        ),
    ]);
    let dynamic = Dynamic {
        pools,
        rules: vec![
            Rule::new("one", &["NA-US-CA", "EU-GB", "AF"]),
            Rule::new("three", &[]),
        ],
    };

    Record::new(
        ZONE,
        "",
        60,
        RecordData::A(vec!["9.9.9.9".to_string(), "8.8.8.8".to_string()]),
    )
    .with_dynamic(dynamic)
}

/// `cname.unit.tests.` routing between two hostnames.
pub fn dynamic_cname_record() -> Record {
    let pools = BTreeMap::from([(
        "targets".to_string(),
        Pool {
            values: vec![
                PoolValue::new("target-1.unit.tests."),
                PoolValue::new("target-2.unit.tests."),
            ],
            fallback: None,
        },
    )]);
    Record::new(
        ZONE,
        "cname",
        300,
        RecordData::Cname("fallback.unit.tests.".to_string()),
    )
    .with_dynamic(Dynamic {
        pools,
        rules: vec![Rule::new("targets", &[])],
    })
}

/// Every non-up value has a check named after it.
pub fn fixed_lookup(_: &Record, value: &str, _: Status) -> Option<String> {
    Some(format!("hc-{value}"))
}

pub fn no_lookup(_: &Record, _: &str, _: Status) -> Option<String> {
    None
}

/// A live check owned by `record` under `version`, configured the way an
/// obeyed IP value of the record needs.
pub fn live_check(record: &Record, version: &str, value: &str, id: &str) -> HealthCheck {
    let fqdn = record.fqdn();
    let reference = new_reference(&reference_prefix(
        version,
        record.record_type().as_str(),
        &fqdn,
    ));
    HealthCheck {
        id: id.to_string(),
        caller_reference: reference,
        health_check_config: HealthCheckConfig {
            ip_address: Some(value.to_string()),
            port: Some(record.healthcheck.port),
            check_type: HealthCheckType::Https,
            resource_path: record.healthcheck_path(),
            fully_qualified_domain_name: record.healthcheck_host(),
            request_interval: 10,
            failure_threshold: 6,
            measure_latency: true,
            inverted: false,
            disabled: false,
            enable_sni: true,
        },
        health_check_version: 1,
        tags: BTreeMap::new(),
    }
}
