//! `SubmittedAt` of change receipts.
//!
//! The provider stamps accepted batches in UTC with millisecond precision,
//! e.g. `2017-01-29T01:02:03.456Z`. Offsets other than `Z` are accepted and
//! converted.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Render a receipt time the way the provider does.
pub fn format(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[allow(clippy::ref_option)]
pub fn serialize<S>(at: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match at {
        Some(at) => serializer.serialize_some(&format(at)),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| Some(at.with_timezone(&Utc)))
        .map_err(|e| serde::de::Error::custom(format!("invalid SubmittedAt \"{raw}\": {e}")))
}
