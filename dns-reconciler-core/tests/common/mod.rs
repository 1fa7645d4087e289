//! Shared fixtures and helpers for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use dns_reconciler_core::dns_reconciler_provider::MemoryProvider;
use dns_reconciler_core::values::{AliasValue, MxValue};
use dns_reconciler_core::{
    Dynamic, Pool, PoolValue, Reconciler, ReconcilerConfig, Record, RecordData, Rule, Status,
    Zone,
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
}

pub const ZONE: &str = "unit.tests.";

pub struct TestContext {
    pub provider: Arc<MemoryProvider>,
    pub reconciler: Reconciler,
}

impl TestContext {
    pub fn new(config: ReconcilerConfig) -> Self {
        let provider = Arc::new(MemoryProvider::new());
        let reconciler = Self::reconciler_for(&provider, config);
        Self {
            provider,
            reconciler,
        }
    }

    /// A second reconciler sharing the provider, as a later run would.
    pub fn rerun(&self, config: ReconcilerConfig) -> Reconciler {
        Self::reconciler_for(&self.provider, config)
    }

    fn reconciler_for(provider: &Arc<MemoryProvider>, config: ReconcilerConfig) -> Reconciler {
        match Reconciler::new(provider.clone(), config) {
            Ok(reconciler) => reconciler,
            Err(e) => panic!("invalid test config: {e}"),
        }
    }

    pub async fn zone_id(&self) -> Option<String> {
        self.provider
            .zones()
            .await
            .into_iter()
            .find(|z| z.name == ZONE)
            .map(|z| z.id)
    }
}

pub fn zone_of(records: impl IntoIterator<Item = Record>) -> Zone {
    let mut zone = Zone::new(ZONE);
    for record in records {
        if let Err(e) = zone.add_record(record, false) {
            panic!("bad fixture: {e}");
        }
    }
    zone
}

pub fn a(name: &str, ttl: u32, values: &[&str]) -> Record {
    Record::new(
        ZONE,
        name,
        ttl,
        RecordData::A(values.iter().map(ToString::to_string).collect()),
    )
}

pub fn mx(name: &str) -> Record {
    Record::new(
        ZONE,
        name,
        300,
        RecordData::Mx(vec![
            MxValue {
                preference: 10,
                exchange: "mx1.unit.tests.".to_string(),
            },
            MxValue {
                preference: 20,
                exchange: "mx2.unit.tests.".to_string(),
            },
        ]),
    )
}

/// Apex alias to `www`'s A record.
pub fn apex_alias() -> Record {
    Record::new(
        ZONE,
        "",
        600,
        RecordData::Alias(vec![AliasValue::new("www", "A")]),
    )
}

/// `geo` A record: EU and NA-US-CA go to `eu`, everything else to `rest`.
pub fn dynamic_record() -> Record {
    let pools = BTreeMap::from([
        (
            "eu".to_string(),
            Pool {
                values: vec![
                    PoolValue::new("1.1.1.1").with_weight(3),
                    PoolValue::new("2.2.2.2"),
                ],
                fallback: Some("rest".to_string()),
            },
        ),
        (
            "rest".to_string(),
            Pool {
                values: vec![
                    PoolValue::new("3.3.3.3").with_status(Status::Up),
                    PoolValue::new("4.4.4.4").with_status(Status::Down),
                ],
                fallback: None,
            },
        ),
    ]);
    a("geo", 60, &["9.9.9.9"]).with_dynamic(Dynamic {
        pools,
        rules: vec![Rule::new("eu", &["EU", "NA-US-CA"]), Rule::new("rest", &[])],
    })
}

/// `spread` A record: three pools of two values each, two rules of two geos each.
pub fn three_pool_record() -> Record {
    let pool = |values: [&str; 2], fallback: Option<&str>| Pool {
        values: values.into_iter().map(PoolValue::new).collect(),
        fallback: fallback.map(ToString::to_string),
    };
    let pools = BTreeMap::from([
        ("a".to_string(), pool(["10.0.1.1", "10.0.1.2"], Some("b"))),
        ("b".to_string(), pool(["10.0.2.1", "10.0.2.2"], Some("c"))),
        ("c".to_string(), pool(["10.0.3.1", "10.0.3.2"], None)),
    ]);
    a("spread", 60, &["10.0.0.1"]).with_dynamic(Dynamic {
        pools,
        rules: vec![
            Rule::new("a", &["EU-FR", "EU-GB"]),
            Rule::new("b", &["AS-JP", "NA-US"]),
        ],
    })
}

/// Certificate validation CNAME, as the certificate service creates it.
pub fn acm_validation() -> Record {
    Record::new(
        ZONE,
        "_3639ac514e785e898d2646601fa951d5",
        300,
        RecordData::Cname("_98d2646601fa951d5.acm-validations.aws.".to_string()),
    )
}
