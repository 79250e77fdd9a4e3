//! Surface configuration.

use std::time::Duration;

use serde::Deserialize;

/// Default row cap for collection fields requested without `page`.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Default upper bound for `page.limit` and `first`.
pub const DEFAULT_PAGE_LIMIT_CEILING: usize = 1000;

/// Default number of root rows resolved per wave group in subscriptions.
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 50;

/// Options fixed at compile time and shared by every execution against the
/// compiled surface.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Default of the collection `distinct` argument.
    pub use_distinct: bool,

    /// Default `optional` for to-many association fields.
    pub default_collection_optional: bool,

    /// Row cap for collection fields without `page`. `None` returns every row.
    pub default_max_results: Option<usize>,

    /// Largest accepted `page.limit` or `first`.
    pub page_limit_ceiling: usize,

    /// Emit the subscription root.
    pub enable_subscription: bool,

    /// Emit relay-style connection fields.
    pub enable_relay: bool,

    /// Emit `aggregate` on collection types.
    pub enable_aggregate: bool,

    /// Root rows per wave group for subscriptions.
    pub stream_chunk_size: usize,

    /// Deadline for one execution, checked at wave boundaries.
    pub query_timeout: Option<Duration>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            use_distinct: true,
            default_collection_optional: true,
            default_max_results: Some(DEFAULT_MAX_RESULTS),
            page_limit_ceiling: DEFAULT_PAGE_LIMIT_CEILING,
            enable_subscription: false,
            enable_relay: false,
            enable_aggregate: false,
            stream_chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
            query_timeout: None,
        }
    }
}

impl SurfaceConfig {
    /// Load a configuration from JSON; missing keys take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Enable subscriptions.
    pub fn with_subscription(mut self) -> Self {
        self.enable_subscription = true;
        self
    }

    /// Enable connection fields.
    pub fn with_relay(mut self) -> Self {
        self.enable_relay = true;
        self
    }

    /// Enable aggregate fields.
    pub fn with_aggregate(mut self) -> Self {
        self.enable_aggregate = true;
        self
    }

    /// Set the execution deadline.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Set the row cap for unpaged collections.
    pub fn with_default_max_results(mut self, max: Option<usize>) -> Self {
        self.default_max_results = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SurfaceConfig::default();
        assert!(config.use_distinct);
        assert!(config.default_collection_optional);
        assert_eq!(config.default_max_results, Some(DEFAULT_MAX_RESULTS));
        assert_eq!(config.page_limit_ceiling, DEFAULT_PAGE_LIMIT_CEILING);
        assert!(!config.enable_subscription);
        assert!(config.query_timeout.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            SurfaceConfig::from_json(r#"{"enable_relay": true, "page_limit_ceiling": 50}"#)
                .unwrap();
        assert!(config.enable_relay);
        assert_eq!(config.page_limit_ceiling, 50);
        assert_eq!(config.stream_chunk_size, DEFAULT_STREAM_CHUNK_SIZE);
    }

    #[test]
    fn test_builders() {
        let config = SurfaceConfig::default()
            .with_subscription()
            .with_aggregate()
            .with_query_timeout(Duration::from_millis(250))
            .with_default_max_results(None);
        assert!(config.enable_subscription);
        assert!(config.enable_aggregate);
        assert_eq!(config.query_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.default_max_results, None);
    }
}
