//! Per-host circuit breaker for WAF/CDN block pages.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(900);

/// How much of the rendered document is inspected for block phrases.
const SNIFF_BYTES: usize = 8000;

const BLOCK_PHRASES: &[&str] = &[
    "access denied",
    "request blocked",
    "you have been blocked",
    "the owner of this website",
    "reference #",
    "malicious or automated",
];

/// Heuristic block-page detector over the first ~8000 bytes of HTML.
pub fn looks_like_waf(html: &str) -> bool {
    if html.is_empty() {
        return false;
    }
    let mut end = html.len().min(SNIFF_BYTES);
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    let head = html[..end].to_lowercase();
    BLOCK_PHRASES.iter().any(|phrase| head.contains(phrase))
}

/// Host -> cooldown expiry. Expired entries stay in the table and are simply
/// treated as absent.
#[derive(Debug)]
pub struct WafCooldownTracker {
    window: Duration,
    until: Mutex<HashMap<String, Instant>>,
}

impl Default for WafCooldownTracker {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl WafCooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            until: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_blocked(&self, host: &str) -> bool {
        self.remaining(host).is_some()
    }

    /// Time left on the host's cooldown, if it is still active.
    pub fn remaining(&self, host: &str) -> Option<Duration> {
        let table = self.until.lock().unwrap_or_else(|e| e.into_inner());
        let expiry = *table.get(&host.to_ascii_lowercase())?;
        let now = Instant::now();
        (now < expiry).then(|| expiry - now)
    }

    pub fn enter_cooldown(&self, host: &str) {
        let expiry = Instant::now() + self.window;
        info!(host, cooldown_secs = self.window.as_secs(), "entering WAF cooldown");
        self.until
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(host.to_ascii_lowercase(), expiry);
    }
}
