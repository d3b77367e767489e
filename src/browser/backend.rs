//! The seam between the pool and a concrete browser engine.
//!
//! [`BrowserBackend`] launches and tears down the shared browser process and
//! opens isolated contexts; [`PageDriver`] drives the single page living in
//! one of those contexts. The chromiumoxide implementation lives in
//! [`super::cdp`]; tests substitute an in-memory fake.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::viewport::{DeviceProfile, Viewport};
use crate::wait_mode::WaitMode;
use crate::Result;

/// Per-context emulation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextProfile {
    pub user_agent: String,
    pub accept_language: String,
    pub viewport: Viewport,
    pub device: DeviceProfile,
}

impl ContextProfile {
    /// Derive a profile from configuration. An explicit viewport wins over the
    /// device default; the mobile profile always uses its own user agent.
    pub fn from_config(config: &Config, device: DeviceProfile, viewport: Option<Viewport>) -> Self {
        let viewport = viewport.unwrap_or(match device {
            DeviceProfile::Desktop => config.viewport,
            DeviceProfile::Mobile => device.default_viewport(),
        });
        Self {
            user_agent: device.user_agent(&config.user_agent).to_string(),
            accept_language: config.accept_language.clone(),
            viewport,
            device,
        }
    }
}

impl Default for ContextProfile {
    fn default() -> Self {
        Self::from_config(&Config::default(), DeviceProfile::Desktop, None)
    }
}

/// Append-only console line buffer shared by a context's event subscription
/// and the render that owns it.
#[derive(Debug, Clone, Default)]
pub struct ConsoleLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl ConsoleLog {
    pub fn push(&self, line: impl Into<String>) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a successful navigation reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigation {
    /// Status of the main document response, when one was observed.
    pub status: Option<u16>,
}

#[async_trait]
pub trait PageDriver: Send + Sync + 'static {
    /// Navigate and wait for `wait`. Timeouts are enforced by the caller.
    async fn navigate(&self, url: &str, wait: WaitMode) -> Result<Navigation>;

    /// Headers of the main document response. Key case is not normalized.
    async fn response_headers(&self) -> Result<HashMap<String, String>>;

    async fn scroll_by(&self, dy: i64) -> Result<()>;

    /// Resolves `true` once `selector` matches, `false` on timeout.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    async fn content(&self) -> Result<String>;

    async fn current_url(&self) -> Result<Option<String>>;

    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Close the page and dispose of its context.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait BrowserBackend: Send + Sync + 'static {
    type Browser: Send + Sync + 'static;
    type Page: PageDriver;

    async fn launch(&self) -> Result<Self::Browser>;

    /// Shut the browser process down. Callers treat failures as best-effort.
    async fn close(&self, browser: Arc<Self::Browser>) -> Result<()>;

    /// Open a fresh isolated context with one page configured for `profile`,
    /// routing its console output into `console`. A failed open must leave
    /// nothing behind.
    async fn open_page(
        &self,
        browser: &Arc<Self::Browser>,
        profile: &ContextProfile,
        console: ConsoleLog,
    ) -> Result<Self::Page>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_profile_uses_device_defaults() {
        let cfg = Config::default();
        let profile = ContextProfile::from_config(&cfg, DeviceProfile::Mobile, None);
        assert_eq!(profile.viewport, DeviceProfile::Mobile.default_viewport());
        assert!(profile.user_agent.contains("Mobile"));
    }

    #[test]
    fn explicit_viewport_wins() {
        let cfg = Config::default();
        let vp = Viewport {
            width: 800,
            height: 600,
        };
        let profile = ContextProfile::from_config(&cfg, DeviceProfile::Desktop, Some(vp));
        assert_eq!(profile.viewport, vp);
        assert_eq!(profile.user_agent, cfg.user_agent);
    }

    #[test]
    fn console_log_is_shared_between_clones() {
        let log = ConsoleLog::default();
        let writer = log.clone();
        writer.push("[log] hello");
        writer.push("[error] boom");
        assert_eq!(log.snapshot(), vec!["[log] hello", "[error] boom"]);
        assert_eq!(log.len(), 2);
    }
}
