//! Configuration types for the SearchIndexGateway.

/// Configuration for the SearchIndexGateway.
///
/// Bounds the size of requests sent to the search index backend.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Maximum number of ids sent in a single multi-get request.
    ///
    /// Larger id sets are split into several requests. Defaults to 1000.
    pub max_batch_size: usize,

    /// Maximum page size accepted by `find_all`.
    ///
    /// Set to `None` to disable the limit. Defaults to 1000.
    pub max_page_size: Option<usize>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            max_page_size: Some(1000),
        }
    }
}

impl GatewayConfig {
    /// Create a config with a custom multi-get batch size.
    ///
    /// A size of zero is treated as one.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            ..Self::default()
        }
    }

    /// Remove the page size limit.
    pub fn unlimited_pages(mut self) -> Self {
        self.max_page_size = None;
        self
    }
}
