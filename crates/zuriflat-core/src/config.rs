//! Dashboard-wide configuration.

use std::time::Duration;

/// Tunables shared by the models, the query layer, and the HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Base URL of the listing service, without trailing slash.
    pub backend_url: String,
    pub request_timeout: Duration,
    /// Inactivity window before free-text numeric filter input is committed.
    pub debounce: Duration,
    /// How many recommendations feed stable color assignment.
    pub top_k: usize,
    /// Sliding-window size of the explicit selection.
    pub selection_capacity: usize,
    pub recommendations_limit: u32,
    pub listings_page_size: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            debounce: Duration::from_millis(500),
            top_k: 5,
            selection_capacity: 5,
            recommendations_limit: 20,
            listings_page_size: 50,
        }
    }
}

impl DashboardConfig {
    /// Override the backend URL, trimming any trailing slash.
    pub fn with_backend_url(mut self, url: &str) -> Self {
        self.backend_url = url.trim_end_matches('/').to_string();
        self
    }
}
