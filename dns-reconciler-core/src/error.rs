//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use dns_reconciler_provider::ProviderError;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Invalid configuration value (batch limit, health check options, version tag)
    #[error("Configuration error: {0}")]
    Config(String),

    /// More than one zone matched a name
    #[error("Multiple zones named \"{0}\" were found")]
    DuplicateZone(String),

    /// A record failed validation
    #[error("Invalid record {record}: {reason}")]
    Validation { record: String, reason: String },

    /// The provider has no equivalent for a requested feature
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A single logical change does not fit in one batch
    #[error("Too many modifications: {count} exceeds the limit of {max}")]
    TooManyChanges { count: usize, max: usize },

    /// Geo code could not be mapped
    #[error("Geo error: {0}")]
    Geo(String),

    /// A presentation value could not be parsed
    #[error("Unparseable {record_type} value \"{value}\": {reason}")]
    ValueParse {
        record_type: String,
        value: String,
        reason: String,
    },

    /// Zone does not exist and was not created
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// Provider error (converting from library)
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

impl CoreError {
    /// Whether it is expected behavior (bad input, missing zone, etc.), used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::DuplicateZone(_)
            | Self::Validation { .. }
            | Self::Unsupported(_)
            | Self::ValueParse { .. }
            | Self::ZoneNotFound(_) => true,
            Self::Provider(e) => e.is_expected(),
            Self::TooManyChanges { .. } | Self::Geo(_) => false,
        }
    }

    pub(crate) fn validation(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            record: record.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn value_parse(
        record_type: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ValueParse {
            record_type: record_type.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_too_many_changes() {
        let e = CoreError::TooManyChanges { count: 7, max: 5 };
        assert_eq!(
            e.to_string(),
            "Too many modifications: 7 exceeds the limit of 5"
        );
        assert!(!e.is_expected());
    }

    #[test]
    fn display_validation() {
        let e = CoreError::validation("alias.unit.tests.", "missing type");
        assert_eq!(e.to_string(), "Invalid record alias.unit.tests.: missing type");
        assert!(e.is_expected());
    }

    #[test]
    fn provider_errors_keep_their_level() {
        let rejected: CoreError = ProviderError::InvalidChangeBatch {
            provider: "memory".to_string(),
            messages: vec!["nope".to_string()],
        }
        .into();
        assert!(rejected.is_expected());
        assert_eq!(rejected.to_string(), "[memory] Invalid change batch: nope");

        let network: CoreError = ProviderError::NetworkError {
            provider: "memory".to_string(),
            detail: "reset".to_string(),
        }
        .into();
        assert!(!network.is_expected());
    }

    #[test]
    fn serializes_with_code() {
        let e = CoreError::DuplicateZone("unit.tests.".to_string());
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["code"], "DuplicateZone");
        assert_eq!(json["details"], "unit.tests.");
    }
}
