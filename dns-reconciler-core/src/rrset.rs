//! Primitive record sets
//!
//! A high-level record compiles into one or more [`RecordSet`]s, each mapping
//! to exactly one provider record set. Two record sets are equal when their
//! [`Identity`] is, so a diff matches old and new sets by what they address
//! and leaves payload differences to UPSERTs.

use std::fmt;
use std::hash::{Hash, Hasher};

use dns_reconciler_provider::{
    AliasTarget, Change, ChangeAction, Failover, GeoLocation, ResourceRecord, ResourceRecordSet,
};

use crate::geo::GeoCode;
use crate::record::{Status, DEFAULT_POOL};

/// Label prefix of every record set name the reconciler synthesizes.
pub const SYNTHETIC_PREFIX: &str = "_internal-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyntheticKind {
    /// `_internal-<pool>-pool.<fqdn>`: failover pair of a pool, or the default pool.
    Pool,
    /// `_internal-<pool>-value.<fqdn>`: weighted values of a pool.
    Value,
}

impl SyntheticKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Pool => "-pool",
            Self::Value => "-value",
        }
    }
}

/// A synthesized record set name, encoded as `_internal-<pool>-<kind>.<fqdn>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntheticName {
    pub pool: String,
    pub kind: SyntheticKind,
    /// Fqdn of the record the name belongs to.
    pub fqdn: String,
}

impl SyntheticName {
    pub fn pool(pool: impl Into<String>, fqdn: impl Into<String>) -> Self {
        Self {
            pool: pool.into(),
            kind: SyntheticKind::Pool,
            fqdn: fqdn.into(),
        }
    }

    pub fn value(pool: impl Into<String>, fqdn: impl Into<String>) -> Self {
        Self {
            pool: pool.into(),
            kind: SyntheticKind::Value,
            fqdn: fqdn.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{SYNTHETIC_PREFIX}{}{}.{}",
            self.pool,
            self.kind.suffix(),
            self.fqdn
        )
    }

    /// Parse a name produced by [`encode`](Self::encode). Anything else yields `None`.
    pub fn decode(name: &str) -> Option<Self> {
        let (label, fqdn) = name.split_once('.')?;
        let label = label.strip_prefix(SYNTHETIC_PREFIX)?;
        let (pool, kind) = if let Some(pool) = label.strip_suffix(SyntheticKind::Pool.suffix()) {
            (pool, SyntheticKind::Pool)
        } else {
            (label.strip_suffix(SyntheticKind::Value.suffix())?, SyntheticKind::Value)
        };
        if pool.is_empty() || fqdn.is_empty() {
            return None;
        }
        Some(Self {
            pool: pool.to_string(),
            kind,
            fqdn: fqdn.to_string(),
        })
    }

    pub fn is_default_pool(&self) -> bool {
        self.kind == SyntheticKind::Pool && self.pool == DEFAULT_POOL
    }
}

impl fmt::Display for SyntheticName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Role of a failover record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailoverMode {
    Primary,
    Secondary,
}

impl From<FailoverMode> for Failover {
    fn from(mode: FailoverMode) -> Self {
        match mode {
            FailoverMode::Primary => Self::Primary,
            FailoverMode::Secondary => Self::Secondary,
        }
    }
}

// ============ Variants ============

/// A plain record set with values.
#[derive(Debug, Clone)]
pub struct SimpleSet {
    pub fqdn: String,
    pub record_type: String,
    pub ttl: u32,
    pub values: Vec<String>,
}

/// An alias to another record set.
#[derive(Debug, Clone)]
pub struct AliasSet {
    pub fqdn: String,
    pub target_type: String,
    pub target_name: String,
    pub hosted_zone_id: String,
    pub evaluate_target_health: bool,
}

/// The record's own values at `_internal-default-pool.<fqdn>`.
#[derive(Debug, Clone)]
pub struct DefaultPoolSet {
    /// Fqdn of the record.
    pub fqdn: String,
    pub record_type: String,
    pub ttl: u32,
    pub values: Vec<String>,
}

/// One side of the failover pair at `_internal-<pool>-pool.<fqdn>`.
///
/// The primary aliases the pool's values; the secondary aliases the fallback
/// pool (or the default pool).
#[derive(Debug, Clone)]
pub struct FailoverSet {
    /// Fqdn of the record.
    pub fqdn: String,
    pub record_type: String,
    pub pool: String,
    pub mode: FailoverMode,
    /// Pool the secondary falls back to. `None` for primaries.
    pub fallback: Option<String>,
    pub hosted_zone_id: String,
}

/// A geolocation alias at the record's fqdn pointing at a pool.
#[derive(Debug, Clone)]
pub struct GeoRuleSet {
    pub fqdn: String,
    pub record_type: String,
    pub index: usize,
    pub pool: String,
    /// `None` is the catch-all location.
    pub geo: Option<GeoCode>,
    pub hosted_zone_id: String,
}

/// A weighted value of a pool at `_internal-<pool>-value.<fqdn>`.
#[derive(Debug, Clone)]
pub struct PoolValueSet {
    /// Fqdn of the record.
    pub fqdn: String,
    pub record_type: String,
    pub pool: String,
    pub ordinal: usize,
    pub ttl: u32,
    pub value: String,
    pub weight: u64,
    pub status: Status,
    pub health_check_id: Option<String>,
}

/// Every kind of record set a record compiles into.
#[derive(Debug, Clone)]
pub enum RecordSet {
    Simple(SimpleSet),
    Alias(AliasSet),
    DefaultPool(DefaultPoolSet),
    PoolFailover(FailoverSet),
    GeoRule(GeoRuleSet),
    PoolValue(PoolValueSet),
}

/// The fields that decide whether two record sets address the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    Simple {
        fqdn: String,
        record_type: String,
    },
    Alias {
        fqdn: String,
        target_type: String,
        target_name: String,
    },
    DefaultPool {
        fqdn: String,
        record_type: String,
    },
    PoolFailover {
        fqdn: String,
        record_type: String,
        pool: String,
        mode: FailoverMode,
        fallback: Option<String>,
    },
    GeoRule {
        fqdn: String,
        record_type: String,
        index: usize,
        pool: String,
        geo: Option<String>,
    },
    PoolValue {
        fqdn: String,
        record_type: String,
        pool: String,
        ordinal: usize,
    },
}

impl RecordSet {
    pub fn identity(&self) -> Identity {
        match self {
            Self::Simple(s) => Identity::Simple {
                fqdn: s.fqdn.clone(),
                record_type: s.record_type.clone(),
            },
            Self::Alias(s) => Identity::Alias {
                fqdn: s.fqdn.clone(),
                target_type: s.target_type.clone(),
                target_name: s.target_name.clone(),
            },
            Self::DefaultPool(s) => Identity::DefaultPool {
                fqdn: self.name(),
                record_type: s.record_type.clone(),
            },
            Self::PoolFailover(s) => Identity::PoolFailover {
                fqdn: self.name(),
                record_type: s.record_type.clone(),
                pool: s.pool.clone(),
                mode: s.mode,
                fallback: s.fallback.clone(),
            },
            Self::GeoRule(s) => Identity::GeoRule {
                fqdn: s.fqdn.clone(),
                record_type: s.record_type.clone(),
                index: s.index,
                pool: s.pool.clone(),
                geo: s.geo.as_ref().map(ToString::to_string),
            },
            Self::PoolValue(s) => Identity::PoolValue {
                fqdn: self.name(),
                record_type: s.record_type.clone(),
                pool: s.pool.clone(),
                ordinal: s.ordinal,
            },
        }
    }

    /// Name of the provider record set.
    pub fn name(&self) -> String {
        match self {
            Self::Simple(s) => s.fqdn.clone(),
            Self::Alias(s) => s.fqdn.clone(),
            Self::GeoRule(s) => s.fqdn.clone(),
            Self::DefaultPool(s) => SyntheticName::pool(DEFAULT_POOL, s.fqdn.as_str()).encode(),
            Self::PoolFailover(s) => SyntheticName::pool(s.pool.as_str(), s.fqdn.as_str()).encode(),
            Self::PoolValue(s) => SyntheticName::value(s.pool.as_str(), s.fqdn.as_str()).encode(),
        }
    }

    /// Wire type of the provider record set.
    pub fn record_type(&self) -> &str {
        match self {
            Self::Simple(s) => &s.record_type,
            Self::Alias(s) => &s.target_type,
            Self::DefaultPool(s) => &s.record_type,
            Self::PoolFailover(s) => &s.record_type,
            Self::GeoRule(s) => &s.record_type,
            Self::PoolValue(s) => &s.record_type,
        }
    }

    pub fn set_identifier(&self) -> Option<String> {
        match self {
            Self::Simple(_) | Self::Alias(_) | Self::DefaultPool(_) => None,
            Self::PoolFailover(s) => Some(match s.mode {
                FailoverMode::Primary => format!("{}-Primary", s.pool),
                FailoverMode::Secondary => format!(
                    "{}-Secondary-{}",
                    s.pool,
                    s.fallback.as_deref().unwrap_or(DEFAULT_POOL)
                ),
            }),
            Self::GeoRule(s) => Some(format!(
                "{}-{}-{}",
                s.index,
                s.pool,
                s.geo
                    .as_ref()
                    .map_or_else(|| "None".to_string(), ToString::to_string)
            )),
            Self::PoolValue(s) => Some(format!("{}-{:03}", s.pool, s.ordinal)),
        }
    }

    pub fn health_check_id(&self) -> Option<&str> {
        match self {
            Self::PoolValue(s) => s.health_check_id.as_deref(),
            _ => None,
        }
    }

    /// The provider record set this compiles to.
    pub fn to_wire(&self) -> ResourceRecordSet {
        let mut rrset = ResourceRecordSet::new(self.name(), self.record_type());
        rrset.set_identifier = self.set_identifier();

        match self {
            Self::Simple(SimpleSet { ttl, values, .. })
            | Self::DefaultPool(DefaultPoolSet { ttl, values, .. }) => {
                rrset.ttl = Some(*ttl);
                rrset.resource_records = values.iter().map(ResourceRecord::new).collect();
            }
            Self::Alias(s) => {
                rrset.alias_target = Some(AliasTarget {
                    dns_name: s.target_name.clone(),
                    evaluate_target_health: s.evaluate_target_health,
                    hosted_zone_id: s.hosted_zone_id.clone(),
                });
            }
            Self::PoolFailover(s) => {
                let target = match s.mode {
                    FailoverMode::Primary => SyntheticName::value(s.pool.as_str(), s.fqdn.as_str()),
                    FailoverMode::Secondary => SyntheticName::pool(
                        s.fallback.as_deref().unwrap_or(DEFAULT_POOL),
                        s.fqdn.as_str(),
                    ),
                };
                rrset.alias_target = Some(AliasTarget {
                    dns_name: target.encode(),
                    evaluate_target_health: true,
                    hosted_zone_id: s.hosted_zone_id.clone(),
                });
                rrset.failover = Some(s.mode.into());
            }
            Self::GeoRule(s) => {
                rrset.alias_target = Some(AliasTarget {
                    dns_name: SyntheticName::pool(s.pool.as_str(), s.fqdn.as_str()).encode(),
                    evaluate_target_health: true,
                    hosted_zone_id: s.hosted_zone_id.clone(),
                });
                rrset.geo_location = Some(
                    s.geo
                        .as_ref()
                        .map_or_else(GeoLocation::default_location, GeoCode::to_location),
                );
            }
            Self::PoolValue(s) => {
                rrset.ttl = Some(s.ttl);
                rrset.resource_records = vec![ResourceRecord::new(s.value.as_str())];
                rrset.weight = Some(s.weight);
                rrset.health_check_id = s.health_check_id.clone();
            }
        }
        rrset
    }

    /// A mutation of this record set.
    ///
    /// Deleting a pool value sends the provider's stored copy when one with the
    /// same name and set identifier exists, since its payload must match exactly.
    pub fn to_change(&self, action: ChangeAction, existing: &[ResourceRecordSet]) -> Change {
        let wire = self.to_wire();
        if action == ChangeAction::Delete && matches!(self, Self::PoolValue(_)) {
            if let Some(stored) = existing
                .iter()
                .find(|e| e.name == wire.name && e.set_identifier == wire.set_identifier)
            {
                return Change::new(action, stored.clone());
            }
        }
        Change::new(action, wire)
    }
}

impl PartialEq for RecordSet {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for RecordSet {}

impl Hash for RecordSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}
