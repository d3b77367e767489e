use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::{Client, Method, StatusCode};
use tracing::debug;
use url::Url;

use super::send_following;
use crate::report::LinkStatus;
use crate::Result;

const CONCURRENT_CHECKS: usize = 4;

/// Statuses that commonly mean "HEAD not supported" and warrant a GET.
fn retry_with_get(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST
    )
}

/// Check the first `limit` of `urls`, preserving their order.
pub async fn check_links(
    client: &Client,
    urls: &[String],
    limit: usize,
    timeout: Duration,
) -> Vec<LinkStatus> {
    stream::iter(urls.iter().take(limit).cloned())
        .map(|url| async move { check_url(client, &url, timeout).await })
        .buffered(CONCURRENT_CHECKS)
        .collect()
        .await
}

/// HEAD `url` (GET when HEAD is refused) and report the final hop. Failures
/// are reported in the returned record, never raised.
pub async fn check_url(client: &Client, url: &str, timeout: Duration) -> LinkStatus {
    match head_or_get(client, url, timeout).await {
        Ok(status) => status,
        Err(err) => {
            debug!(url, error = %err, "link check failed");
            LinkStatus {
                url: url.to_string(),
                final_url: url.to_string(),
                status: None,
                redirects: 0,
                error: Some(err.to_string()),
            }
        }
    }
}

async fn head_or_get(client: &Client, url: &str, timeout: Duration) -> Result<LinkStatus> {
    let target = Url::parse(url)?;
    let mut followed = send_following(client, Method::HEAD, &target, timeout).await?;
    if retry_with_get(followed.response.status()) {
        followed = send_following(client, Method::GET, &target, timeout).await?;
    }
    Ok(LinkStatus {
        url: url.to_string(),
        final_url: followed.final_url.to_string(),
        status: Some(followed.response.status().as_u16()),
        redirects: followed.redirects,
        error: None,
    })
}
