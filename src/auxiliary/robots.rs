use std::time::Duration;

use reqwest::{Client, Method};
use tracing::debug;
use url::Url;

use super::send_following;
use crate::report::{CrawlChecks, SitemapRef};
use crate::resource::robots_url;
use crate::{Result, ScanError};

/// The parts of a robots.txt file the scanner reports on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    pub sitemaps: Vec<String>,
    /// `Disallow` prefixes of every group addressed to `*`.
    pub wildcard_disallows: Vec<String>,
}

impl RobotsRules {
    /// Prefix match of `path` against the wildcard group's disallow rules.
    pub fn blocks(&self, path: &str) -> bool {
        self.wildcard_disallows
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Parse sitemap lines and the `User-agent: *` disallow rules.
///
/// Consecutive `User-agent` lines form one group. An empty `Disallow:`
/// allows everything and contributes no prefix.
pub fn parse_robots(body: &str) -> RobotsRules {
    let mut rules = RobotsRules::default();
    let mut wildcard_group = false;
    let mut in_agent_lines = false;

    for raw in body.lines() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let field = field.trim().to_ascii_lowercase();
        let value = value.trim();

        match field.as_str() {
            "sitemap" => {
                if !value.is_empty() {
                    rules.sitemaps.push(value.to_string());
                }
            }
            "user-agent" => {
                if !in_agent_lines {
                    wildcard_group = false;
                }
                in_agent_lines = true;
                wildcard_group |= value == "*";
            }
            other => {
                in_agent_lines = false;
                if other == "disallow" && wildcard_group && !value.is_empty() {
                    rules.wildcard_disallows.push(value.to_string());
                }
            }
        }
    }
    rules
}

/// Fetch robots.txt for `page` and summarize it.
///
/// Any non-2xx response is treated like an empty file, leaving
/// `blocked_by_robots` unknown. Transport failures are returned as errors.
pub async fn fetch_robots(client: &Client, page: &Url, timeout: Duration) -> Result<CrawlChecks> {
    let robots = robots_url(page)
        .ok_or_else(|| ScanError::Http(format!("no robots.txt location for {page}")))?;
    let followed = send_following(client, Method::GET, &robots, timeout).await?;
    let status = followed.response.status();
    let body = if status.is_success() {
        followed.response.text().await?
    } else {
        String::new()
    };
    debug!(robots = %robots, status = status.as_u16(), bytes = body.len(), "robots.txt fetched");

    let mut checks = CrawlChecks {
        robots_url: Some(robots.to_string()),
        blocked_by_robots: None,
        sitemaps: Vec::new(),
    };
    if body.trim().is_empty() {
        return Ok(checks);
    }
    let rules = parse_robots(&body);
    let path = match page.path() {
        "" => "/",
        path => path,
    };
    checks.blocked_by_robots = Some(rules.blocks(path));
    checks.sitemaps = rules
        .sitemaps
        .into_iter()
        .map(|url| SitemapRef { url })
        .collect();
    Ok(checks)
}
