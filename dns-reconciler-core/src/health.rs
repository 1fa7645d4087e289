//! Health check binding
//!
//! Pool values that follow their health (`obey`) or are forced out of
//! service (`down`) need a health check. Checks are matched, never updated:
//! when the live configuration differs from what a value needs, a new check is
//! created and the stale one is garbage collected later.
//!
//! Ownership is recorded in the caller reference,
//! `<version>:<type>:<fqdn>:<uniquifier>`, which the provider keeps forever.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use dns_reconciler_provider::{
    DnsProvider, HealthCheck, HealthCheckConfig, HealthCheckType, ResourceRecordSet, Tag,
    TagResourceType,
};
use regex::Regex;
use sha2::{Digest, Sha512};

use crate::cache::collect_pages;
use crate::compiler::HealthCheckLookup;
use crate::error::{CoreError, CoreResult};
use crate::record::{Record, RecordType, Status};
use crate::rrset::{SyntheticKind, SyntheticName};

/// Longest caller reference the provider accepts.
pub const MAX_CALLER_REFERENCE_LEN: usize = 64;

/// Length of `:` plus the random uniquifier appended to a prefix.
const UNIQUIFIER_LEN: usize = 13;

/// Hex characters of the fqdn digest used when the plain prefix is too long.
const HASHED_FQDN_LEN: usize = 20;

/// Legacy version tag whose checks are always cleaned up.
const LEGACY_VERSION: &str = "0000";

/// `<version>:<type>:<fqdn>`, hashing the fqdn when the full reference would not fit.
pub fn reference_prefix(version: &str, record_type: &str, fqdn: &str) -> String {
    let prefix = format!("{version}:{record_type}:{fqdn}");
    if prefix.len() + UNIQUIFIER_LEN > MAX_CALLER_REFERENCE_LEN {
        format!("{version}:{record_type}:{}", hashed_fqdn(fqdn))
    } else {
        prefix
    }
}

fn hashed_fqdn(fqdn: &str) -> String {
    let digest = hex::encode(Sha512::digest(fqdn.as_bytes()));
    digest[..HASHED_FQDN_LEN].to_string()
}

/// A fresh caller reference under `prefix`.
pub fn new_reference(prefix: &str) -> String {
    let uniquifier = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}:{}", &uniquifier[..UNIQUIFIER_LEN - 1])
}

/// What a value's health check has to look like.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CheckSpec {
    host: Option<String>,
    path: Option<String>,
    protocol: HealthCheckType,
    port: u16,
    measure_latency: bool,
    request_interval: u32,
    failure_threshold: u32,
    ip: Option<IpAddr>,
    disabled: bool,
    inverted: bool,
}

impl CheckSpec {
    fn for_value(record: &Record, value: &str, status: Status) -> Self {
        let ip = value.parse::<IpAddr>().ok();
        let host = if ip.is_some() {
            record.healthcheck_host()
        } else {
            Some(value.to_string())
        };
        let down = status == Status::Down;
        Self {
            host,
            path: record.healthcheck_path(),
            protocol: record.healthcheck.protocol,
            port: record.healthcheck.port,
            measure_latency: record.health_check_options.measure_latency,
            request_interval: record.health_check_options.request_interval,
            failure_threshold: record.health_check_options.failure_threshold,
            ip,
            disabled: down,
            inverted: down,
        }
    }

    /// Whether a live check satisfies this spec. `strict` also compares the
    /// probed IP and the forced-down flags.
    fn matches(&self, live: &HealthCheckConfig, strict: bool) -> bool {
        let same_probe = self.host == live.fully_qualified_domain_name
            && self.path == live.resource_path
            && self.protocol == live.check_type
            && Some(self.port) == live.port
            && self.measure_latency == live.measure_latency
            && self.request_interval == live.request_interval
            && self.failure_threshold == live.failure_threshold;
        if !same_probe || !strict {
            return same_probe;
        }

        // the provider may reformat addresses, compare them parsed
        let live_ip = live
            .ip_address
            .as_deref()
            .and_then(|ip| ip.parse::<IpAddr>().ok());
        self.ip == live_ip && self.disabled == live.disabled && self.inverted == live.inverted
    }

    fn to_config(&self) -> HealthCheckConfig {
        let mut config = HealthCheckConfig {
            ip_address: None,
            port: Some(self.port),
            check_type: self.protocol,
            resource_path: None,
            fully_qualified_domain_name: None,
            request_interval: self.request_interval,
            failure_threshold: self.failure_threshold,
            measure_latency: self.measure_latency,
            inverted: self.inverted,
            disabled: self.disabled,
            enable_sni: self.protocol == HealthCheckType::Https,
        };
        if self.protocol != HealthCheckType::Tcp {
            config.fully_qualified_domain_name.clone_from(&self.host);
            config.resource_path.clone_from(&self.path);
        }
        match self.ip {
            Some(ip) => config.ip_address = Some(ip.to_string()),
            None => config.fully_qualified_domain_name.clone_from(&self.host),
        }
        config
    }
}

/// Matches, creates and garbage collects the health checks of pool values.
///
/// The inventory is loaded once per planning cycle and kept current as
/// checks are created or deleted.
#[derive(Debug)]
pub struct HealthCheckBinder {
    version: String,
    checks: Option<Vec<HealthCheck>>,
}

impl HealthCheckBinder {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            checks: None,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Forget the inventory.
    pub fn reset(&mut self) {
        self.checks = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.checks.is_some()
    }

    /// Every check whose caller reference looks like `dddd:...`, paging the
    /// inventory in on first use.
    pub async fn load(&mut self, provider: &dyn DnsProvider) -> CoreResult<&[HealthCheck]> {
        if self.checks.is_none() {
            let checks: Vec<HealthCheck> = collect_pages(move |marker: Option<String>| async move {
                provider.list_health_checks(marker.as_deref()).await
            })
            .await?;
            let managed: Vec<_> = checks
                .into_iter()
                .filter(|c| c.caller_reference.as_bytes().get(4) == Some(&b':'))
                .collect();
            log::debug!(
                "[{}] Loaded {} managed health checks",
                provider.id(),
                managed.len()
            );
            self.checks = Some(managed);
        }
        Ok(self.checks.as_deref().unwrap_or_default())
    }

    /// Loaded checks, empty before [`load`](Self::load).
    pub fn checks(&self) -> &[HealthCheck] {
        self.checks.as_deref().unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<&HealthCheck> {
        self.checks().iter().find(|c| c.id == id)
    }

    /// An existing check serving `value`, without touching the provider.
    pub fn find(&self, record: &Record, value: &str, status: Status) -> Option<&HealthCheck> {
        if status == Status::Up {
            return None;
        }
        let prefix = self.prefix(record);
        let spec = CheckSpec::for_value(record, value, status);
        self.checks().iter().find(|check| {
            check.caller_reference.starts_with(&prefix)
                && spec.matches(&check.health_check_config, true)
        })
    }

    /// The check serving `value`, creating one when allowed and none matches.
    pub async fn resolve(
        &mut self,
        provider: &dyn DnsProvider,
        record: &Record,
        value: &str,
        status: Status,
        allow_create: bool,
    ) -> CoreResult<Option<String>> {
        self.load(provider).await?;
        if status == Status::Up {
            return Ok(None);
        }
        if let Some(existing) = self.find(record, value, status) {
            return Ok(Some(existing.id.clone()));
        }
        if !allow_create {
            return Ok(None);
        }

        let spec = CheckSpec::for_value(record, value, status);
        let config = spec.to_config();
        let reference = new_reference(&self.prefix(record));
        let mut check = provider.create_health_check(&reference, &config).await?;

        // the value is either the probed address or the probed host
        let fqdn = record.fqdn();
        let name = format!("{fqdn}:{} - {value}", record.record_type());
        provider
            .change_tags_for_resource(
                TagResourceType::Healthcheck,
                &check.id,
                &[Tag::new("Name", name.as_str())],
            )
            .await?;
        check.tags.insert("Name".to_string(), name);

        log::info!(
            "[{}] Created health check {} for {fqdn} {value} ({reference})",
            provider.id(),
            check.id
        );
        let id = check.id.clone();
        if let Some(checks) = self.checks.as_mut() {
            checks.push(check);
        }
        Ok(Some(id))
    }

    /// Resolve, creating as needed, the check of every pool value of a dynamic record.
    pub async fn provision(&mut self, provider: &dyn DnsProvider, record: &Record) -> CoreResult<()> {
        let Some(dynamic) = &record.dynamic else {
            return Ok(());
        };
        for pool in dynamic.pools.values() {
            for value in &pool.values {
                self.resolve(provider, record, &value.value, value.status, true)
                    .await?;
            }
        }
        Ok(())
    }

    /// Delete this version's checks of `record` that are not in `in_use`, and
    /// any legacy checks of the same host.
    pub async fn gc(
        &mut self,
        provider: &dyn DnsProvider,
        record: &Record,
        in_use: &HashSet<String>,
    ) -> CoreResult<Vec<String>> {
        let record_type = record.record_type();
        if !matches!(record_type, RecordType::A | RecordType::Aaaa | RecordType::Cname) {
            return Ok(Vec::new());
        }
        self.load(provider).await?;

        let fqdn = record.fqdn();
        let pattern = format!(
            r"^\d{{4}}:{}:({}|{}):",
            regex::escape(record_type.as_str()),
            regex::escape(&fqdn),
            hashed_fqdn(&fqdn)
        );
        let owned = Regex::new(&pattern)
            .map_err(|e| CoreError::Config(format!("health check pattern: {e}")))?;
        let legacy_prefix = format!("{LEGACY_VERSION}:{record_type}:");
        let host = fqdn.trim_end_matches('.');

        let stale: Vec<String> = self
            .checks()
            .iter()
            .filter(|check| {
                let reference = check.caller_reference.as_str();
                if owned.is_match(reference) {
                    !in_use.contains(&check.id)
                } else {
                    reference.starts_with(&legacy_prefix)
                        && check.health_check_config.fully_qualified_domain_name.as_deref()
                            == Some(host)
                }
            })
            .map(|check| check.id.clone())
            .collect();

        for id in &stale {
            log::info!("[{}] Deleting health check {id} of {fqdn}", provider.id());
            provider.delete_health_check(id).await?;
            if let Some(checks) = self.checks.as_mut() {
                checks.retain(|c| &c.id != id);
            }
        }
        Ok(stale)
    }

    /// Whether a value record set of `record` has to be rewritten because its
    /// health check is missing, stale or should not be there.
    pub fn update_needed(
        &self,
        record: &Record,
        rrset: &ResourceRecordSet,
        statuses: &HashMap<String, Status>,
    ) -> bool {
        let Some(value) = rrset.values().next() else {
            return false;
        };
        let status = statuses.get(value).copied().unwrap_or_default();
        if status == Status::Up {
            return rrset.health_check_id.is_some();
        }

        let Some(check) = rrset.health_check_id.as_deref().and_then(|id| self.get(id)) else {
            return true;
        };
        let mut spec = CheckSpec::for_value(record, value, status);
        if record.record_type() != RecordType::Cname {
            spec.host = record.healthcheck_host();
        }
        !(check.caller_reference.starts_with(&self.version)
            && spec.matches(&check.health_check_config, false))
    }

    /// Value record sets of `record` among `rrsets` that need rewriting.
    pub fn stale_value_sets<'a>(
        &self,
        record: &Record,
        rrsets: &'a [ResourceRecordSet],
    ) -> Vec<&'a ResourceRecordSet> {
        let Some(dynamic) = &record.dynamic else {
            return Vec::new();
        };
        let statuses: HashMap<String, Status> = dynamic
            .pools
            .values()
            .flat_map(|pool| pool.values.iter())
            .map(|v| (v.value.clone(), v.status))
            .collect();
        let fqdn = record.fqdn();
        let record_type = record.record_type();

        rrsets
            .iter()
            .filter(|rrset| {
                rrset.record_type == record_type.as_str()
                    && SyntheticName::decode(&rrset.name).is_some_and(|name| {
                        name.kind == SyntheticKind::Value && name.fqdn == fqdn
                    })
            })
            .filter(|rrset| self.update_needed(record, rrset, &statuses))
            .collect()
    }

    fn prefix(&self, record: &Record) -> String {
        reference_prefix(&self.version, record.record_type().as_str(), &record.fqdn())
    }
}

impl HealthCheckLookup for HealthCheckBinder {
    fn health_check_id(
        &self,
        record: &Record,
        value: &str,
        status: Status,
    ) -> CoreResult<Option<String>> {
        Ok(self.find(record, value, status).map(|c| c.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Healthcheck;
    use crate::test_utils::{dynamic_a_record, dynamic_cname_record, live_check, ZONE};
    use dns_reconciler_provider::MemoryProvider;

    #[test]
    fn prefix_plain_and_hashed() {
        assert_eq!(
            reference_prefix("0001", "A", "unit.tests."),
            "0001:A:unit.tests."
        );

        let long = format!("{}.unit.tests.", "x".repeat(50));
        let prefix = reference_prefix("0001", "AAAA", &long);
        assert_eq!(prefix.len(), "0001:AAAA:".len() + 20);
        assert!(prefix.len() <= 51);
        assert!(prefix[10..].bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn references_fit() {
        let reference = new_reference(&reference_prefix("0001", "CNAME", &"y".repeat(60)));
        assert!(reference.len() <= MAX_CALLER_REFERENCE_LEN);
        let uniquifier = reference.rsplit(':').next().unwrap();
        assert_eq!(uniquifier.len(), 12);
    }

    #[test]
    fn desired_config_for_ip_values() {
        let record = dynamic_a_record();
        let config = CheckSpec::for_value(&record, "1.1.1.1", Status::Obey).to_config();
        assert_eq!(config.ip_address.as_deref(), Some("1.1.1.1"));
        assert_eq!(config.fully_qualified_domain_name.as_deref(), Some("unit.tests"));
        assert_eq!(config.resource_path.as_deref(), Some("/_dns"));
        assert_eq!(config.port, Some(443));
        assert!(config.enable_sni);
        assert!(!config.disabled && !config.inverted);

        let down = CheckSpec::for_value(&record, "1.1.1.1", Status::Down).to_config();
        assert!(down.disabled && down.inverted);
    }

    #[test]
    fn desired_config_for_hostnames() {
        let record = dynamic_cname_record();
        let config = CheckSpec::for_value(&record, "target-1.unit.tests.", Status::Obey).to_config();
        assert!(config.ip_address.is_none());
        assert_eq!(
            config.fully_qualified_domain_name.as_deref(),
            Some("target-1.unit.tests.")
        );
    }

    #[test]
    fn desired_config_for_tcp() {
        let record = dynamic_a_record().with_healthcheck(Healthcheck {
            protocol: HealthCheckType::Tcp,
            port: 8080,
            ..Healthcheck::default()
        });
        let config = CheckSpec::for_value(&record, "1.1.1.1", Status::Obey).to_config();
        assert!(config.fully_qualified_domain_name.is_none());
        assert!(config.resource_path.is_none());
        assert!(!config.enable_sni);
        assert_eq!(config.port, Some(8080));
    }

    #[test]
    fn ipv6_matches_in_any_form() {
        let record = Record {
            data: crate::values::RecordData::Aaaa(vec!["::1".to_string()]),
            ..dynamic_a_record()
        };
        let spec = CheckSpec::for_value(&record, "2001:0db8:0000:0000:0000:0000:0000:0001", Status::Obey);
        let mut live = spec.to_config();
        live.ip_address = Some("2001:db8::1".to_string());
        assert!(spec.matches(&live, true));
    }

    #[test]
    fn find_requires_version_prefix() {
        let record = dynamic_a_record();
        let mut binder = HealthCheckBinder::new("0002");
        binder.checks = Some(vec![live_check(&record, "0001", "1.1.1.1", "hc-old")]);
        assert!(binder.find(&record, "1.1.1.1", Status::Obey).is_none());

        let mut binder = HealthCheckBinder::new("0001");
        binder.checks = Some(vec![live_check(&record, "0001", "1.1.1.1", "hc-1")]);
        assert_eq!(
            binder.health_check_id(&record, "1.1.1.1", Status::Obey).unwrap(),
            Some("hc-1".to_string())
        );
        assert!(binder.find(&record, "1.1.1.1", Status::Down).is_none());
        assert!(binder.find(&record, "1.1.1.1", Status::Up).is_none());
    }

    #[tokio::test]
    async fn resolve_creates_once() {
        let provider = MemoryProvider::new();
        let record = dynamic_a_record();
        let mut binder = HealthCheckBinder::new("0001");

        let first = binder
            .resolve(&provider, &record, "1.1.1.1", Status::Obey, true)
            .await
            .unwrap()
            .unwrap();
        let second = binder
            .resolve(&provider, &record, "1.1.1.1", Status::Obey, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, second);

        let checks = provider.health_checks().await;
        assert_eq!(checks.len(), 1);
        assert!(checks[0].caller_reference.starts_with("0001:A:unit.tests.:"));
        assert_eq!(
            checks[0].tags.get("Name").map(String::as_str),
            Some("unit.tests.:A - 1.1.1.1")
        );
    }

    #[tokio::test]
    async fn resolve_without_create() {
        let provider = MemoryProvider::new();
        let record = dynamic_a_record();
        let mut binder = HealthCheckBinder::new("0001");
        let id = binder
            .resolve(&provider, &record, "1.1.1.1", Status::Obey, false)
            .await
            .unwrap();
        assert!(id.is_none());
        assert!(provider.health_checks().await.is_empty());

        let up = binder
            .resolve(&provider, &record, "1.1.1.1", Status::Up, true)
            .await
            .unwrap();
        assert!(up.is_none());
    }

    #[tokio::test]
    async fn load_skips_foreign_references() {
        let provider = MemoryProvider::new();
        let record = dynamic_a_record();
        for (reference, id) in [("0001:A:unit.tests.:abc", "a"), ("console-made", "b"), ("abc", "c")] {
            let mut check = live_check(&record, "0001", "1.1.1.1", id);
            check.caller_reference = reference.to_string();
            provider.insert_health_check(check).await;
        }
        let mut binder = HealthCheckBinder::new("0001");
        let checks = binder.load(&provider).await.unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].id, "a");
    }

    #[tokio::test]
    async fn gc_deletes_stale_and_legacy() {
        let provider = MemoryProvider::new();
        let record = dynamic_a_record();

        let keep = live_check(&record, "0001", "1.1.1.1", "keep");
        let stale = live_check(&record, "0001", "2.2.2.2", "stale");
        let old_version = live_check(&record, "0000", "3.3.3.3", "old-version");
        let mut legacy = live_check(&record, "0000", "3.3.3.3", "legacy");
        legacy.caller_reference = "0000:A:something-else".to_string();
        let mut other_host = legacy.clone();
        other_host.id = "other-host".to_string();
        other_host.health_check_config.fully_qualified_domain_name = Some("www.unit.tests".to_string());
        let mut other_record = live_check(&record, "0001", "1.1.1.1", "other-record");
        other_record.caller_reference = "0001:A:www.unit.tests.:aaaaaaaaaaaa".to_string();

        for check in [keep, stale, old_version, legacy, other_host, other_record] {
            provider.insert_health_check(check).await;
        }

        let mut binder = HealthCheckBinder::new("0001");
        let in_use = HashSet::from(["keep".to_string()]);
        let mut deleted = binder.gc(&provider, &record, &in_use).await.unwrap();
        deleted.sort();
        assert_eq!(deleted, vec!["legacy", "old-version", "stale"]);

        let remaining: Vec<_> = binder.checks().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(remaining, vec!["keep", "other-host", "other-record"]);
        assert_eq!(provider.deleted_health_checks().await.len(), 3);
    }

    #[tokio::test]
    async fn gc_ignores_other_types() {
        let provider = MemoryProvider::new();
        let record = Record::new(
            ZONE,
            "txt",
            60,
            crate::values::RecordData::Txt(vec![crate::values::TxtValue::new("x")]),
        );
        let mut binder = HealthCheckBinder::new("0001");
        assert!(binder.gc(&provider, &record, &HashSet::new()).await.unwrap().is_empty());
        assert!(!binder.is_loaded());
    }

    #[test]
    fn update_needed_cases() {
        let record = dynamic_a_record();
        let statuses = HashMap::from([
            ("1.1.1.1".to_string(), Status::Obey),
            ("2.2.2.2".to_string(), Status::Up),
        ]);
        let mut binder = HealthCheckBinder::new("0001");
        binder.checks = Some(vec![
            live_check(&record, "0001", "1.1.1.1", "current"),
            live_check(&record, "0000", "1.1.1.1", "previous"),
        ]);

        let value_set = |value: &str, hc: Option<&str>| {
            let mut rrset = ResourceRecordSet::new("_internal-one-value.unit.tests.", "A");
            rrset.resource_records = vec![dns_reconciler_provider::ResourceRecord::new(value)];
            rrset.health_check_id = hc.map(str::to_string);
            rrset
        };

        assert!(!binder.update_needed(&record, &value_set("1.1.1.1", Some("current")), &statuses));
        assert!(binder.update_needed(&record, &value_set("1.1.1.1", Some("previous")), &statuses));
        assert!(binder.update_needed(&record, &value_set("1.1.1.1", Some("missing")), &statuses));
        assert!(binder.update_needed(&record, &value_set("1.1.1.1", None), &statuses));
        assert!(binder.update_needed(&record, &value_set("2.2.2.2", Some("current")), &statuses));
        assert!(!binder.update_needed(&record, &value_set("2.2.2.2", None), &statuses));

        let changed = dynamic_a_record().with_health_check_options(crate::record::HealthCheckOptions {
            failure_threshold: 3,
            ..crate::record::HealthCheckOptions::default()
        });
        assert!(binder.update_needed(&changed, &value_set("1.1.1.1", Some("current")), &statuses));
    }

    #[test]
    fn stale_value_sets_only_look_at_own_values() {
        let record = dynamic_a_record();
        let binder = HealthCheckBinder::new("0001");

        let mut own = ResourceRecordSet::new("_internal-one-value.unit.tests.", "A");
        own.resource_records = vec![dns_reconciler_provider::ResourceRecord::new("1.1.1.1")];
        let mut other = own.clone();
        other.name = "_internal-one-value.www.unit.tests.".to_string();
        let mut pool = own.clone();
        pool.name = "_internal-one-pool.unit.tests.".to_string();

        let rrsets = [own, other, pool];
        let stale = binder.stale_value_sets(&record, &rrsets);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].name, "_internal-one-value.unit.tests.");
    }
}
