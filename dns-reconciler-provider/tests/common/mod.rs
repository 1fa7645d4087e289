//! Shared fixtures and helpers for the integration tests.

#![allow(dead_code)]

use dns_reconciler_provider::{
    AliasTarget, Change, ChangeAction, ChangeBatch, DnsProvider, HealthCheckConfig,
    HealthCheckType, HostedZone, MemoryProvider, RecordSetCursor, ResourceRecord,
    ResourceRecordSet, short_zone_id,
};

/// Assert that an `Option` is `Some` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// Assert that a `Result` is `Ok` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

pub const ZONE: &str = "unit.tests.";

/// Unique relative name for a throwaway record.
pub fn generate_test_record_name() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("_test-{}", &uuid.to_string()[..8])
}

pub fn simple(name: &str, record_type: &str, ttl: u32, values: &[&str]) -> ResourceRecordSet {
    let mut rrset = ResourceRecordSet::new(name, record_type);
    rrset.ttl = Some(ttl);
    rrset.resource_records = values.iter().map(|v| ResourceRecord::new(*v)).collect();
    rrset
}

pub fn alias(name: &str, record_type: &str, target: &str, zone_id: &str) -> ResourceRecordSet {
    let mut rrset = ResourceRecordSet::new(name, record_type);
    rrset.alias_target = Some(AliasTarget {
        dns_name: target.to_string(),
        evaluate_target_health: false,
        hosted_zone_id: short_zone_id(zone_id).to_string(),
    });
    rrset
}

pub fn batch(changes: Vec<(ChangeAction, ResourceRecordSet)>) -> ChangeBatch {
    ChangeBatch {
        comment: Some(format!("Change: {}", uuid::Uuid::new_v4().simple())),
        changes: changes
            .into_iter()
            .map(|(action, rrset)| Change::new(action, rrset))
            .collect(),
    }
}

pub fn https_check(ip: &str) -> HealthCheckConfig {
    HealthCheckConfig {
        ip_address: Some(ip.to_string()),
        port: Some(443),
        check_type: HealthCheckType::Https,
        resource_path: Some("/_dns".to_string()),
        fully_qualified_domain_name: Some("unit.tests".to_string()),
        request_interval: 10,
        failure_threshold: 6,
        measure_latency: true,
        inverted: false,
        disabled: false,
        enable_sni: true,
    }
}

/// Test context: a provider with one public zone.
pub struct TestContext {
    pub provider: MemoryProvider,
    pub zone: HostedZone,
}

impl TestContext {
    pub async fn new(page_size: usize) -> Self {
        let provider = MemoryProvider::with_page_size(page_size);
        let zone = provider.add_zone(ZONE, false).await;
        Self { provider, zone }
    }

    /// Page through every record set of the zone.
    pub async fn all_record_sets(&self) -> Vec<ResourceRecordSet> {
        let mut out = Vec::new();
        let mut cursor: Option<RecordSetCursor> = None;
        loop {
            let Ok(page) = self
                .provider
                .list_resource_record_sets(&self.zone.id, cursor.as_ref())
                .await
            else {
                return out;
            };
            out.extend(page.items);
            match page.next {
                Some(next) => cursor = Some(next),
                None => return out,
            }
        }
    }
}
