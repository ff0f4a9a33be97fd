use chrono::NaiveDate;
use serde::Deserialize;

/// Main configuration structure for the harvester
///
/// Every section and key has a default, so an empty file (or no file at all)
/// yields a usable configuration once a query term is supplied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to search for
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Free-text search expression
    pub term: String,

    /// First publication date of the harvest (inclusive)
    #[serde(rename = "start-date")]
    pub start_date: Option<NaiveDate>,

    /// Last publication date of the harvest (inclusive)
    #[serde(rename = "end-date")]
    pub end_date: Option<NaiveDate>,

    /// Width of each date window in days
    #[serde(rename = "window-days")]
    pub window_days: u32,

    /// Result limit when no date range is given (single-window mode)
    #[serde(rename = "max-results")]
    pub max_results: u32,

    /// Bisect windows whose count exceeds the result cap instead of truncating
    #[serde(rename = "split-oversized-windows")]
    pub split_oversized_windows: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            term: String::new(),
            start_date: None,
            end_date: None,
            window_days: 30,
            max_results: 20_000,
            split_oversized_windows: false,
        }
    }
}

/// Remote E-utilities endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// esearch URL (identifier search, JSON)
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// efetch URL (record details, XML)
    #[serde(rename = "fetch-url")]
    pub fetch_url: String,

    /// Source database name
    pub database: String,

    /// Optional API key; relaxes the remote rate limit
    #[serde(rename = "api-key")]
    pub api_key: Option<String>,

    /// Maximum number of results a single query can page through
    #[serde(rename = "result-cap")]
    pub result_cap: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            search_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi".to_string(),
            fetch_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi".to_string(),
            database: "pubmed".to_string(),
            api_key: None,
            result_cap: 20_000,
            timeout_secs: 60,
        }
    }
}

/// Page and batch sizes plus the delays between requests
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Identifiers requested per search page
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Identifiers sent per detail request
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Delay after each search page and each count request (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Delay after each detail batch (milliseconds)
    #[serde(rename = "batch-delay-ms")]
    pub batch_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            batch_size: 100,
            page_delay_ms: 400,
            batch_delay_ms: 500,
        }
    }
}

/// Retry and backoff behavior for remote calls
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per remote call
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Backoff base (milliseconds)
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 5_000,
            max_delay_ms: 60_000,
        }
    }
}

/// Client identification sent with every request
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Tool name, also sent as the E-utilities `tool` parameter
    #[serde(rename = "client-name")]
    pub client_name: String,

    #[serde(rename = "client-version")]
    pub client_version: String,

    /// Contact address, sent as the E-utilities `email` parameter when set
    #[serde(rename = "contact-email")]
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            client_name: "PubMedDownloader".to_string(),
            client_version: "1.0".to_string(),
            contact_email: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the JSON record file (deliverable and checkpoint)
    #[serde(rename = "records-path")]
    pub records_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            records_path: "pubmed_articles.json".to_string(),
        }
    }
}
