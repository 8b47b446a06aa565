use serde::{Deserialize, Serialize};

/// Configuration for the student_portal module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudentPortalConfig {
    /// Table holding one row per scrape of a student's portal data.
    #[serde(default = "default_table")]
    pub table: String,
    /// Rows fetched per request while scanning the whole table.
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: u32,
    /// Upper bound for a single store call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// JSON array of rows used to seed the in-memory store (`--mock`).
    #[serde(default)]
    pub fixture_path: Option<String>,
}

impl Default for StudentPortalConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            scan_page_size: default_scan_page_size(),
            request_timeout_ms: default_request_timeout_ms(),
            fixture_path: None,
        }
    }
}

fn default_table() -> String {
    "user_data".to_string()
}

fn default_scan_page_size() -> u32 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}
