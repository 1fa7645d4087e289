//! High-level records and zones

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use dns_reconciler_provider::{ensure_trailing_dot, relative_to_full_name, HealthCheckType};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::geo::GeoCode;
use crate::values::RecordData;

/// Pool name reserved for the record's own values.
pub const DEFAULT_POOL: &str = "default";

/// Record types the reconciler manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    #[serde(rename = "CAA")]
    Caa,
    #[serde(rename = "CNAME")]
    Cname,
    #[serde(rename = "DS")]
    Ds,
    #[serde(rename = "MX")]
    Mx,
    #[serde(rename = "NAPTR")]
    Naptr,
    #[serde(rename = "NS")]
    Ns,
    #[serde(rename = "PTR")]
    Ptr,
    #[serde(rename = "SPF")]
    Spf,
    #[serde(rename = "SRV")]
    Srv,
    #[serde(rename = "TXT")]
    Txt,
    /// Provider-side alias to another record set.
    #[serde(rename = "ALIAS")]
    Alias,
}

impl RecordType {
    /// Types stored as resource record values on the wire.
    pub const WIRE_TYPES: [Self; 12] = [
        Self::A,
        Self::Aaaa,
        Self::Caa,
        Self::Cname,
        Self::Ds,
        Self::Mx,
        Self::Naptr,
        Self::Ns,
        Self::Ptr,
        Self::Spf,
        Self::Srv,
        Self::Txt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Caa => "CAA",
            Self::Cname => "CNAME",
            Self::Ds => "DS",
            Self::Mx => "MX",
            Self::Naptr => "NAPTR",
            Self::Ns => "NS",
            Self::Ptr => "PTR",
            Self::Spf => "SPF",
            Self::Srv => "SRV",
            Self::Txt => "TXT",
            Self::Alias => "ALIAS",
        }
    }

    /// Map a wire type (`"A"`, `"MX"`, ...). Types the reconciler does not manage yield `None`.
    pub fn from_wire(record_type: &str) -> Option<Self> {
        Self::WIRE_TYPES
            .into_iter()
            .find(|t| t.as_str() == record_type)
    }

    /// Only address and canonical-name records can be dynamic.
    pub fn supports_dynamic(self) -> bool {
        matches!(self, Self::A | Self::Aaaa | Self::Cname)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::Alias.as_str() {
            return Ok(Self::Alias);
        }
        Self::from_wire(s).ok_or_else(|| CoreError::Unsupported(format!("record type {s}")))
    }
}

// ============ Dynamic ============

/// Health override of a pool value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Always in service, no health check.
    Up,
    /// Always out of service.
    Down,
    /// Follow the health check.
    #[default]
    Obey,
}

fn default_weight() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolValue {
    pub value: String,
    #[serde(default = "default_weight")]
    pub weight: u64,
    #[serde(default)]
    pub status: Status,
}

impl PoolValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            weight: default_weight(),
            status: Status::default(),
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: u64) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub values: Vec<PoolValue>,
    /// Pool to serve when every value of this one is unhealthy. `None` means the default pool.
    #[serde(default)]
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub pool: String,
    /// Geo codes matched by the rule. Empty matches everything.
    #[serde(default)]
    pub geos: Vec<String>,
}

impl Rule {
    pub fn new(pool: impl Into<String>, geos: &[&str]) -> Self {
        Self {
            pool: pool.into(),
            geos: geos.iter().map(|g| (*g).to_string()).collect(),
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.geos.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dynamic {
    pub pools: BTreeMap<String, Pool>,
    pub rules: Vec<Rule>,
}

impl Dynamic {
    /// Sort pool values by value and geos inside each rule.
    ///
    /// Value ordinals come from this order, so it must not depend on input order.
    pub fn normalize(&mut self) {
        for pool in self.pools.values_mut() {
            pool.values.sort_by(|a, b| a.value.cmp(&b.value));
        }
        for rule in &mut self.rules {
            rule.geos.sort();
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("dynamic record without pools".to_string());
        }
        for (name, pool) in &self.pools {
            if name.is_empty() || name.contains('.') || name == DEFAULT_POOL {
                return Err(format!("invalid pool name \"{name}\""));
            }
            if pool.values.is_empty() {
                return Err(format!("pool \"{name}\" has no values"));
            }
            if let Some(value) = pool.values.iter().find(|v| v.weight > 255) {
                return Err(format!(
                    "pool \"{name}\" value {} has weight {} above 255",
                    value.value, value.weight
                ));
            }
            if let Some(fallback) = &pool.fallback {
                if !self.pools.contains_key(fallback) {
                    return Err(format!(
                        "pool \"{name}\" falls back to unknown pool \"{fallback}\""
                    ));
                }
            }
        }

        // every fallback chain ends
        for start in self.pools.keys() {
            let mut seen = BTreeSet::from([start.as_str()]);
            let mut current = start.as_str();
            while let Some(next) = self
                .pools
                .get(current)
                .and_then(|p| p.fallback.as_deref())
            {
                if !seen.insert(next) {
                    return Err(format!("pool \"{start}\" has a circular fallback"));
                }
                current = next;
            }
        }

        if self.rules.is_empty() {
            return Err("dynamic record without rules".to_string());
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if !self.pools.contains_key(&rule.pool) {
                return Err(format!("rule {i} uses unknown pool \"{}\"", rule.pool));
            }
            if rule.is_catch_all() && i + 1 != self.rules.len() {
                return Err(format!("rule {i} matches everything but is not last"));
            }
            for geo in &rule.geos {
                GeoCode::parse(geo).map_err(|e| format!("rule {i}: {e}"))?;
            }
        }
        Ok(())
    }
}

// ============ Health checks ============

pub const DEFAULT_HEALTHCHECK_PATH: &str = "/_dns";
pub const DEFAULT_HEALTHCHECK_PORT: u16 = 443;

/// What the health checks of a dynamic record probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Healthcheck {
    /// Host header. Defaults to the record's fqdn.
    pub host: Option<String>,
    pub path: String,
    pub protocol: HealthCheckType,
    pub port: u16,
}

impl Default for Healthcheck {
    fn default() -> Self {
        Self {
            host: None,
            path: DEFAULT_HEALTHCHECK_PATH.to_string(),
            protocol: HealthCheckType::Https,
            port: DEFAULT_HEALTHCHECK_PORT,
        }
    }
}

/// Provider-specific health check tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckOptions {
    pub measure_latency: bool,
    /// Seconds between probes, 10 or 30.
    pub request_interval: u32,
    /// Failures before unhealthy, 1 to 10.
    pub failure_threshold: u32,
}

impl Default for HealthCheckOptions {
    fn default() -> Self {
        Self {
            measure_latency: true,
            request_interval: 10,
            failure_threshold: 6,
        }
    }
}

impl HealthCheckOptions {
    pub fn validate(&self) -> CoreResult<()> {
        if !matches!(self.request_interval, 10 | 30) {
            return Err(CoreError::Config(format!(
                "healthcheck request_interval must be 10 or 30, got {}",
                self.request_interval
            )));
        }
        if !(1..=10).contains(&self.failure_threshold) {
            return Err(CoreError::Config(format!(
                "healthcheck failure_threshold must be between 1 and 10, got {}",
                self.failure_threshold
            )));
        }
        Ok(())
    }
}

// ============ Record ============

/// A record as the user describes it, before compilation into record sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Name relative to the zone, empty for the apex.
    pub name: String,
    /// Zone name with a trailing dot.
    pub zone: String,
    pub ttl: u32,
    #[serde(flatten)]
    pub data: RecordData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<Dynamic>,
    #[serde(default)]
    pub healthcheck: Healthcheck,
    #[serde(default)]
    pub health_check_options: HealthCheckOptions,
}

impl Record {
    pub fn new(zone: &str, name: impl Into<String>, ttl: u32, mut data: RecordData) -> Self {
        data.sort_values();
        Self {
            name: name.into(),
            zone: ensure_trailing_dot(zone),
            ttl,
            data,
            dynamic: None,
            healthcheck: Healthcheck::default(),
            health_check_options: HealthCheckOptions::default(),
        }
    }

    #[must_use]
    pub fn with_dynamic(mut self, mut dynamic: Dynamic) -> Self {
        dynamic.normalize();
        self.dynamic = Some(dynamic);
        self
    }

    #[must_use]
    pub fn with_healthcheck(mut self, healthcheck: Healthcheck) -> Self {
        self.healthcheck = healthcheck;
        self
    }

    #[must_use]
    pub fn with_health_check_options(mut self, options: HealthCheckOptions) -> Self {
        self.health_check_options = options;
        self
    }

    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }

    pub fn fqdn(&self) -> String {
        relative_to_full_name(&self.name, &self.zone)
    }

    /// `(name, type)`, unique within a zone.
    pub fn key(&self) -> (&str, RecordType) {
        (&self.name, self.record_type())
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic.is_some()
    }

    /// Host header for health checks. TCP checks have none.
    pub fn healthcheck_host(&self) -> Option<String> {
        if self.healthcheck.protocol == HealthCheckType::Tcp {
            return None;
        }
        Some(self.healthcheck.host.clone().unwrap_or_else(|| {
            let fqdn = self.fqdn();
            fqdn.trim_end_matches('.').to_string()
        }))
    }

    /// Request path for health checks. TCP checks have none.
    pub fn healthcheck_path(&self) -> Option<String> {
        (self.healthcheck.protocol != HealthCheckType::Tcp).then(|| self.healthcheck.path.clone())
    }

    /// Whether `other` describes the same DNS content (values, ttl, routing).
    pub fn same_content(&self, other: &Self) -> bool {
        self.ttl == other.ttl && self.data == other.data && self.dynamic == other.dynamic
    }

    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |reason: String| CoreError::validation(self.fqdn(), reason);

        if self.name.ends_with('.') {
            return Err(invalid("name must be relative to the zone".to_string()));
        }
        if self.data.is_empty() {
            return Err(invalid("record has no values".to_string()));
        }
        match &self.data {
            RecordData::A(values) => {
                if let Some(bad) = values.iter().find(|v| v.parse::<Ipv4Addr>().is_err()) {
                    return Err(invalid(format!("\"{bad}\" is not an IPv4 address")));
                }
            }
            RecordData::Aaaa(values) => {
                if let Some(bad) = values.iter().find(|v| v.parse::<Ipv6Addr>().is_err()) {
                    return Err(invalid(format!("\"{bad}\" is not an IPv6 address")));
                }
            }
            RecordData::Alias(values) => {
                for value in values {
                    validate_alias_value(value).map_err(|reason| invalid(reason.to_string()))?;
                }
            }
            _ => {}
        }

        if let Some(dynamic) = &self.dynamic {
            if !self.record_type().supports_dynamic() {
                return Err(invalid(format!(
                    "{} records cannot be dynamic",
                    self.record_type()
                )));
            }
            dynamic.validate().map_err(invalid)?;
            self.health_check_options.validate()?;
        }
        Ok(())
    }
}

/// Shape checks shared by validation and compilation.
pub(crate) fn validate_alias_value(value: &crate::values::AliasValue) -> Result<(), &'static str> {
    if value.record_type.as_deref().map_or(true, str::is_empty) {
        return Err("missing type");
    }
    match (value.is_service(), value.hosted_zone_id.is_some()) {
        (true, false) => Err("service alias without hosted-zone-id"),
        (false, true) => Err("hosted-zone-id on a non-service value"),
        _ => Ok(()),
    }
}

// ============ Zone ============

/// A named set of records, at most one per `(name, type)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub name: String,
    records: BTreeMap<(String, RecordType), Record>,
}

impl Zone {
    pub fn new(name: &str) -> Self {
        Self {
            name: ensure_trailing_dot(name),
            records: BTreeMap::new(),
        }
    }

    /// Add a record. A second record with the same name and type is rejected
    /// unless `replace` is set.
    pub fn add_record(&mut self, record: Record, replace: bool) -> CoreResult<()> {
        if record.zone != self.name {
            return Err(CoreError::validation(
                record.fqdn(),
                format!("record belongs to {}, not {}", record.zone, self.name),
            ));
        }
        let key = (record.name.clone(), record.record_type());
        if !replace && self.records.contains_key(&key) {
            return Err(CoreError::validation(
                record.fqdn(),
                format!("duplicate {} record", key.1),
            ));
        }
        self.records.insert(key, record);
        Ok(())
    }

    pub fn get(&self, name: &str, record_type: RecordType) -> Option<&Record> {
        self.records.get(&(name.to_string(), record_type))
    }

    /// Records ordered by `(name, type)`.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn into_records(self) -> impl Iterator<Item = Record> {
        self.records.into_values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{dynamic_a_record, ZONE};
    use crate::values::AliasValue;

    #[test]
    fn record_type_wire_names() {
        assert_eq!(RecordType::from_wire("AAAA"), Some(RecordType::Aaaa));
        assert_eq!(RecordType::from_wire("SOA"), None);
        assert_eq!(RecordType::from_wire("ALIAS"), None);
        assert_eq!("ALIAS".parse::<RecordType>().unwrap(), RecordType::Alias);
        assert!("SOA".parse::<RecordType>().is_err());
    }

    #[test]
    fn fqdn_and_apex() {
        let apex = Record::new(ZONE, "", 60, RecordData::A(vec!["1.2.3.4".into()]));
        assert_eq!(apex.fqdn(), "unit.tests.");
        let www = Record::new(ZONE, "www", 60, RecordData::A(vec!["1.2.3.4".into()]));
        assert_eq!(www.fqdn(), "www.unit.tests.");
    }

    #[test]
    fn healthcheck_defaults() {
        let record = dynamic_a_record();
        assert_eq!(record.healthcheck_host().as_deref(), Some("unit.tests"));
        assert_eq!(record.healthcheck_path().as_deref(), Some("/_dns"));

        let tcp = record.with_healthcheck(Healthcheck {
            protocol: HealthCheckType::Tcp,
            ..Healthcheck::default()
        });
        assert!(tcp.healthcheck_host().is_none());
        assert!(tcp.healthcheck_path().is_none());
    }

    #[test]
    fn pool_value_order_is_canonical() {
        let mut reversed = dynamic_a_record().dynamic.unwrap();
        for pool in reversed.pools.values_mut() {
            pool.values.reverse();
        }
        let record = Record::new(ZONE, "", 60, RecordData::A(vec!["9.9.9.9".into()]))
            .with_dynamic(reversed);
        let values: Vec<_> = record.dynamic.unwrap().pools["one"]
            .values
            .iter()
            .map(|v| v.value.clone())
            .collect();
        assert_eq!(values, vec!["1.1.1.1", "2.2.2.2"]);
    }

    #[test]
    fn valid_dynamic_record() {
        assert!(dynamic_a_record().validate().is_ok());
    }

    #[test]
    fn dynamic_rejects_unknown_rule_pool() {
        let mut record = dynamic_a_record();
        if let Some(dynamic) = record.dynamic.as_mut() {
            dynamic.rules.push(Rule::new("nope", &[]));
        }
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("unknown pool"), "{err}");
    }

    #[test]
    fn dynamic_rejects_catch_all_not_last() {
        let mut record = dynamic_a_record();
        if let Some(dynamic) = record.dynamic.as_mut() {
            dynamic.rules.insert(0, Rule::new("one", &[]));
        }
        assert!(record.validate().is_err());
    }

    #[test]
    fn dynamic_rejects_fallback_cycle() {
        let mut record = dynamic_a_record();
        if let Some(dynamic) = record.dynamic.as_mut() {
            if let Some(pool) = dynamic.pools.get_mut("three") {
                pool.fallback = Some("two".to_string());
            }
        }
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("circular"), "{err}");
    }

    #[test]
    fn dynamic_rejects_reserved_pool_name() {
        let mut record = dynamic_a_record();
        if let Some(dynamic) = record.dynamic.as_mut() {
            let pool = dynamic.pools["one"].clone();
            dynamic.pools.insert(DEFAULT_POOL.to_string(), pool);
        }
        assert!(record.validate().is_err());
    }

    #[test]
    fn dynamic_only_for_address_types() {
        let record = Record::new(
            ZONE,
            "txt",
            60,
            RecordData::Txt(vec![crate::values::TxtValue::new("x")]),
        )
        .with_dynamic(dynamic_a_record().dynamic.unwrap_or_default());
        assert!(record.validate().is_err());
    }

    #[test]
    fn bad_health_check_options_are_config_errors() {
        let record = dynamic_a_record().with_health_check_options(HealthCheckOptions {
            request_interval: 20,
            ..HealthCheckOptions::default()
        });
        assert!(matches!(record.validate(), Err(CoreError::Config(_))));

        let record = dynamic_a_record().with_health_check_options(HealthCheckOptions {
            failure_threshold: 11,
            ..HealthCheckOptions::default()
        });
        assert!(matches!(record.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn address_values_are_checked() {
        let record = Record::new(ZONE, "www", 60, RecordData::A(vec!["::1".into()]));
        assert!(record.validate().is_err());
        let record = Record::new(ZONE, "www", 60, RecordData::Aaaa(vec!["::1".into()]));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn alias_value_shapes() {
        let service = AliasValue {
            name: "d1.cloudfront.net.".to_string(),
            record_type: Some("A".to_string()),
            evaluate_target_health: false,
            hosted_zone_id: None,
        };
        assert_eq!(
            validate_alias_value(&service),
            Err("service alias without hosted-zone-id")
        );

        let mut local = AliasValue::new("www", "A");
        local.hosted_zone_id = Some("Z2".to_string());
        assert_eq!(
            validate_alias_value(&local),
            Err("hosted-zone-id on a non-service value")
        );

        let untyped = AliasValue {
            record_type: None,
            ..AliasValue::new("www", "A")
        };
        assert_eq!(validate_alias_value(&untyped), Err("missing type"));
    }

    #[test]
    fn zone_rejects_duplicates() {
        let mut zone = Zone::new(ZONE);
        let record = Record::new(ZONE, "www", 60, RecordData::A(vec!["1.2.3.4".into()]));
        zone.add_record(record.clone(), false).unwrap();
        assert!(zone.add_record(record.clone(), false).is_err());
        zone.add_record(record, true).unwrap();
        assert_eq!(zone.len(), 1);
        assert!(zone.get("www", RecordType::A).is_some());
    }

    #[test]
    fn zone_rejects_foreign_records() {
        let mut zone = Zone::new("other.tests.");
        let record = Record::new(ZONE, "www", 60, RecordData::A(vec!["1.2.3.4".into()]));
        assert!(zone.add_record(record, false).is_err());
    }

    #[test]
    fn values_are_sorted_on_construction() {
        let a = Record::new(
            ZONE,
            "www",
            60,
            RecordData::A(vec!["2.2.2.2".into(), "1.1.1.1".into()]),
        );
        let b = Record::new(
            ZONE,
            "www",
            60,
            RecordData::A(vec!["1.1.1.1".into(), "2.2.2.2".into()]),
        );
        assert!(a.same_content(&b));
    }
}
