//! Reconciler configuration

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Default maximum number of resource records per change batch.
pub const DEFAULT_MAX_CHANGES: usize = 1000;

/// Default health check version tag.
pub const DEFAULT_HEALTH_CHECK_VERSION: &str = "0001";

/// Settings shared by every operation of a [`Reconciler`](crate::Reconciler).
///
/// Loadable from JSON; every field has a default, unknown fields are rejected.
///
/// ```
/// use dns_reconciler_core::ReconcilerConfig;
///
/// let config = ReconcilerConfig::from_json_str(r#"{"max_changes": 500}"#).unwrap();
/// assert_eq!(config.max_changes, 500);
/// assert_eq!(config.health_check_version, "0001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcilerConfig {
    /// Upper bound on resource records in one change batch.
    pub max_changes: usize,
    /// Four digit tag embedded in health check caller references. Bumping it
    /// replaces every managed health check.
    pub health_check_version: String,
    /// Raise on features the provider cannot express instead of degrading them.
    pub strict_supports: bool,
    /// Look zones up one by one instead of listing every zone.
    pub get_zones_by_name: bool,
    /// Only manage private (`Some(true)`) or public (`Some(false)`) zones.
    pub private: Option<bool>,
    /// Reusable delegation set assigned to created zones. Zone listings are
    /// limited to it as well.
    pub delegation_set_id: Option<String>,
    /// Leave certificate validation CNAMEs (`_x.<zone>` pointing into
    /// `acm-validations.aws.`) alone, whether desired or live.
    pub ignore_acm_validations: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_changes: DEFAULT_MAX_CHANGES,
            health_check_version: DEFAULT_HEALTH_CHECK_VERSION.to_string(),
            strict_supports: false,
            get_zones_by_name: false,
            private: None,
            delegation_set_id: None,
            ignore_acm_validations: true,
        }
    }
}

impl ReconcilerConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("invalid reconciler config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.max_changes == 0 {
            return Err(CoreError::Config(
                "max_changes must be at least 1".to_string(),
            ));
        }
        if self.health_check_version.len() != 4
            || !self
                .health_check_version
                .bytes()
                .all(|b| b.is_ascii_digit())
        {
            return Err(CoreError::Config(format!(
                "health_check_version must be four digits, got \"{}\"",
                self.health_check_version
            )));
        }
        Ok(())
    }

    /// Whether a zone with the given privacy passes the `private` filter.
    pub fn accepts_zone(&self, is_private: bool) -> bool {
        self.private.map_or(true, |want| want == is_private)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.max_changes, 1000);
        assert_eq!(config.health_check_version, "0001");
        assert!(!config.strict_supports);
        assert!(config.ignore_acm_validations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_json_overrides() {
        let config = ReconcilerConfig::from_json_str(
            r#"{"max_changes": 10, "strict_supports": true, "private": true}"#,
        )
        .unwrap();
        assert_eq!(config.max_changes, 10);
        assert!(config.strict_supports);
        assert!(config.accepts_zone(true));
        assert!(!config.accepts_zone(false));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = ReconcilerConfig::from_json_str(r#"{"max_change": 10}"#).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn rejects_zero_batch() {
        let err = ReconcilerConfig::from_json_str(r#"{"max_changes": 0}"#).unwrap_err();
        assert!(err.to_string().contains("max_changes"));
    }

    #[test]
    fn rejects_bad_version() {
        for version in ["1", "00a1", "00001"] {
            let config = ReconcilerConfig {
                health_check_version: version.to_string(),
                ..ReconcilerConfig::default()
            };
            assert!(config.validate().is_err(), "{version}");
        }
    }

    #[test]
    fn no_filter_accepts_everything() {
        let config = ReconcilerConfig::default();
        assert!(config.accepts_zone(true));
        assert!(config.accepts_zone(false));
    }
}
