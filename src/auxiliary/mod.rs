//! Best-effort enrichment run after the primary render: robots.txt and
//! sitemaps, a sampled link-status check, and the optional PageSpeed lookup.
//!
//! Each step returns a `Result`; the scanner turns failures into
//! [`Degradation::Auxiliary`](crate::error::Degradation::Auxiliary) entries.

pub mod link_check;
pub mod pagespeed;
pub mod robots;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Response};
use url::Url;

use crate::config::Config;
use crate::{Result, ScanError};

pub use link_check::{check_links, check_url};
pub use pagespeed::{PageSpeedClient, Strategy, PAGESPEED_ENDPOINT};
pub use robots::{fetch_robots, parse_robots, RobotsRules};

pub const MAX_REDIRECTS: u32 = 10;

/// HTTP client shared by the auxiliary steps.
///
/// Redirects are not followed automatically so hops can be counted; see
/// [`send_following`].
pub fn http_client(config: &Config) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    if let Ok(lang) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, lang);
    }

    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .connect_timeout(Duration::from_secs(5));
    // Only the configured proxy is used; ambient proxy env vars are ignored.
    builder = match &config.proxy {
        Some(proxy) => builder.proxy(
            reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| ScanError::Config(format!("invalid proxy '{proxy}': {e}")))?,
        ),
        None => builder.no_proxy(),
    };
    builder.build().map_err(ScanError::Network)
}

/// Final response of a redirect chain.
#[derive(Debug)]
pub struct Followed {
    pub response: Response,
    pub final_url: Url,
    pub redirects: u32,
}

/// Send `method` to `url`, following up to [`MAX_REDIRECTS`] `Location` hops.
pub async fn send_following(
    client: &Client,
    method: Method,
    url: &Url,
    timeout: Duration,
) -> Result<Followed> {
    let mut current = url.clone();
    let mut redirects = 0;
    loop {
        let response = client
            .request(method.clone(), current.clone())
            .timeout(timeout)
            .send()
            .await?;
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|_| response.status().is_redirection())
            .map(str::to_string);
        let Some(location) = location else {
            return Ok(Followed {
                response,
                final_url: current,
                redirects,
            });
        };
        if redirects >= MAX_REDIRECTS {
            return Err(ScanError::Http(format!(
                "too many redirects (>{MAX_REDIRECTS}) starting at {url}"
            )));
        }
        current = current.join(&location)?;
        redirects += 1;
    }
}
