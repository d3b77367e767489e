use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser pool is shut down")]
    PoolClosed,
}

impl ScanError {
    pub fn browser(message: impl Into<String>) -> Self {
        ScanError::Browser(message.into())
    }

    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        ScanError::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            ScanError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions (screenshot dir, history file).",
            ),
            ScanError::Network(e) => ErrorPayload::new(
                ErrorCategory::Network,
                e.to_string(),
                "Check connectivity/proxy/VPN and retry.",
            ),
            ScanError::Http(msg) => ErrorPayload::new(
                ErrorCategory::Network,
                msg.to_string(),
                "Check the site responds to plain HTTP requests from this machine.",
            ),
            ScanError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Verify URL/format (e.g., https://example.com).",
            ),
            ScanError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON/serialization inputs; run with --verbose for details.",
            ),
            ScanError::Config(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check flags, SEOSCAN_* environment variables and the config file.",
            ),
            ScanError::Browser(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("launch") || lower.contains("executable") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Ensure google-chrome or chromium is installed and on PATH, or set SEOSCAN_CHROME.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Retry the scan; lower SEOSCAN_MAX_CONTEXTS if the browser is overloaded.",
                    )
                }
            }
            ScanError::Navigation { url, message } => ErrorPayload::new(
                ErrorCategory::Navigation,
                format!("Navigation to {url} failed: {message}"),
                "Try increasing --timeout-ms, a lighter --wait-until (e.g. load), or check the site is reachable.",
            ),
            ScanError::PoolClosed => ErrorPayload::new(
                ErrorCategory::Browser,
                self.to_string(),
                "The browser pool was stopped; start a new scanner.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Non-fatal problems collected while assembling a scan.
///
/// None of these abort a scan; each one is rendered into the result's
/// `errors` or `notes` list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Degradation {
    #[error("{step} unavailable: {message}")]
    Extraction { step: &'static str, message: String },

    #[error("{step} failed: {message}")]
    Auxiliary { step: &'static str, message: String },

    #[error("WAF/CDN block page detected for {host}")]
    WafBlocked { host: String },
}

impl Degradation {
    pub fn extraction(step: &'static str, message: impl ToString) -> Self {
        Degradation::Extraction {
            step,
            message: message.to_string(),
        }
    }

    pub fn auxiliary(step: &'static str, message: impl ToString) -> Self {
        Degradation::Auxiliary {
            step,
            message: message.to_string(),
        }
    }

    /// Whether this belongs in `errors` rather than `notes`.
    pub fn is_error(&self) -> bool {
        !matches!(self, Degradation::WafBlocked { .. })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Browser,
    Navigation,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
