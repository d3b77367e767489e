use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceParseError {
    #[error("Empty URL. Hint: pass a page address such as https://example.com/")]
    Empty,
    #[error("Invalid URL '{value}': {message}. Hint: include http(s):// and ensure the URL is well-formed.")]
    InvalidUrl { value: String, message: String },
    #[error("Unsupported scheme '{scheme}' in '{value}'. Only http and https pages can be scanned.")]
    UnsupportedScheme { value: String, scheme: String },
}

/// Normalize user input into a scannable URL: add a scheme when missing,
/// lowercase the host, default the path to `/` and drop the fragment.
pub fn normalize_url(raw: &str) -> Result<Url, ResourceParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ResourceParseError::Empty);
    }

    let with_scheme = if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        let scheme = trimmed.split("://").next().unwrap_or_default();
        return Err(ResourceParseError::UnsupportedScheme {
            value: trimmed.to_string(),
            scheme: scheme.to_string(),
        });
    } else {
        format!("https://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| ResourceParseError::InvalidUrl {
        value: trimmed.to_string(),
        message: e.to_string(),
    })?;
    if url.host_str().is_none() {
        return Err(ResourceParseError::InvalidUrl {
            value: trimmed.to_string(),
            message: "missing host".to_string(),
        });
    }
    // `Url` already lowercases the host and defaults the path for http(s).
    url.set_fragment(None);
    Ok(url)
}

fn has_http_scheme(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Lowercased `host[:port]` of a URL, or an empty string when it has none.
pub fn host_key(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str().map(|h| match u.port() {
                Some(port) => format!("{}:{}", h.to_ascii_lowercase(), port),
                None => h.to_ascii_lowercase(),
            })
        })
        .unwrap_or_default()
}

/// `scheme://host[:port]/robots.txt` for the given page.
pub fn robots_url(page: &Url) -> Option<Url> {
    page.host_str()?;
    page.join("/robots.txt").ok()
}
