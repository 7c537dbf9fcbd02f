use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str =
    "https://vahan.parivahan.gov.in/vahan4dashboard/vahan/view/reportview.xhtml";

/// Everything a scrape session needs to know about the environment.
///
/// Every field has a default so a config file only needs to name what it
/// changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub output_dir: PathBuf,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub page_delay_ms: u64,
    pub max_probe_pages: usize,
    pub max_bytes: u64,
    pub workers: usize,
    pub user_agent: String,
    pub layout: PortalLayout,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from("raw_responses"),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 40_000,
            max_attempts: 3,
            retry_backoff_ms: 1_200,
            page_delay_ms: 250,
            max_probe_pages: 500,
            max_bytes: 20 * 1024 * 1024,
            workers: 2,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
                .to_string(),
            layout: PortalLayout::default(),
        }
    }
}

impl ScrapeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

/// Linear backoff: the pause after failed attempt `n` is `backoff * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        ScrapeConfig::default().retry_policy()
    }
}

/// Component ids of the report page. These are generated by the server-side
/// framework and shift when the page is redeployed, hence configurable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortalLayout {
    pub y_axis: String,
    pub x_axis: String,
    pub year: String,
    /// Component repopulated by the year selection.
    pub year_render: String,
    /// Component repopulated by the x-axis selection.
    pub x_axis_render: String,
    pub refresh_button: String,
    pub table_panel: String,
    pub table: String,
    pub message_area: String,
    /// Fixed filters submitted with every exchange.
    pub seed_fields: Vec<(String, String)>,
}

impl Default for PortalLayout {
    fn default() -> Self {
        Self {
            y_axis: "yaxisVar".to_string(),
            x_axis: "xaxisVar".to_string(),
            year: "selectedYear".to_string(),
            year_render: "selectedYear".to_string(),
            x_axis_render: "multipleYear".to_string(),
            refresh_button: "j_idt66".to_string(),
            table_panel: "combTablePnl".to_string(),
            table: "groupingTable".to_string(),
            message_area: "msg".to_string(),
            seed_fields: vec![
                ("j_idt26_input".to_string(), "A".to_string()),
                ("j_idt34_input".to_string(), "-1".to_string()),
                ("selectedRto_input".to_string(), "-1".to_string()),
                ("selectedYearType_input".to_string(), "C".to_string()),
            ],
        }
    }
}

impl PortalLayout {
    /// Name of the hidden `<select>`/input backing a dropdown component.
    pub fn input_name(component: &str) -> String {
        format!("{component}_input")
    }

    pub fn cascade_inputs(&self) -> [String; 3] {
        [
            Self::input_name(&self.y_axis),
            Self::input_name(&self.x_axis),
            Self::input_name(&self.year),
        ]
    }
}
