//! Shared fixtures: an in-memory browser backend.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use seoscan_lib::browser::{ConsoleLog, Navigation};
use seoscan_lib::{BrowserBackend, ContextProfile, PageDriver, Result, ScanError, WaitMode};

/// What the fake browser returns for one URL.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub status: u16,
    pub html: String,
    pub headers: Vec<(String, String)>,
    /// Wait modes under which navigation errors.
    pub fail_waits: Vec<WaitMode>,
    /// Navigation never completes.
    pub hang: bool,
}

impl FakePage {
    pub fn ok(html: impl Into<String>) -> Self {
        Self {
            status: 200,
            html: html.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_waits: WaitMode::ALL.to_vec(),
            ..Self::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct Stats {
    pub launches: AtomicUsize,
    pub browser_closes: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub double_closes: AtomicUsize,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
    pub navigations: Mutex<Vec<(String, WaitMode)>>,
}

impl Stats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<(String, WaitMode)> {
        self.navigations.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    pages: Arc<Mutex<HashMap<String, FakePage>>>,
    pub stats: Arc<Stats>,
    pub nav_delay: Duration,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nav_delay(mut self, delay: Duration) -> Self {
        self.nav_delay = delay;
        self
    }

    pub fn page(self, url: &str, page: FakePage) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), page);
        self
    }

    fn lookup(&self, url: &str) -> Option<FakePage> {
        self.pages.lock().unwrap().get(url).cloned()
    }
}

pub struct FakeBrowser;

pub struct FakeDriver {
    backend: FakeBackend,
    console: ConsoleLog,
    current: Mutex<Option<(String, FakePage)>>,
    closed: AtomicBool,
}

#[async_trait]
impl BrowserBackend for FakeBackend {
    type Browser = FakeBrowser;
    type Page = FakeDriver;

    async fn launch(&self) -> Result<FakeBrowser> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(FakeBrowser)
    }

    async fn close(&self, _browser: Arc<FakeBrowser>) -> Result<()> {
        self.stats.browser_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn open_page(
        &self,
        _browser: &Arc<FakeBrowser>,
        _profile: &ContextProfile,
        console: ConsoleLog,
    ) -> Result<FakeDriver> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(active, Ordering::SeqCst);
        Ok(FakeDriver {
            backend: self.clone(),
            console,
            current: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&self, url: &str, wait: WaitMode) -> Result<Navigation> {
        self.backend
            .stats
            .navigations
            .lock()
            .unwrap()
            .push((url.to_string(), wait));
        if !self.backend.nav_delay.is_zero() {
            tokio::time::sleep(self.backend.nav_delay).await;
        }
        let page = self
            .backend
            .lookup(url)
            .ok_or_else(|| ScanError::navigation(url, "net::ERR_NAME_NOT_RESOLVED"))?;
        if page.hang {
            std::future::pending::<()>().await;
        }
        if page.fail_waits.contains(&wait) {
            return Err(ScanError::navigation(url, format!("{wait} never fired")));
        }
        self.console.push(format!("log: loaded {url}"));
        let status = Some(page.status);
        *self.current.lock().unwrap() = Some((url.to_string(), page));
        Ok(Navigation { status })
    }

    async fn response_headers(&self) -> Result<HashMap<String, String>> {
        let current = self.current.lock().unwrap();
        Ok(current
            .as_ref()
            .map(|(_, page)| page.headers.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn scroll_by(&self, _dy: i64) -> Result<()> {
        Ok(())
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }

    async fn content(&self) -> Result<String> {
        let current = self.current.lock().unwrap();
        current
            .as_ref()
            .map(|(_, page)| page.html.clone())
            .ok_or_else(|| ScanError::browser("no document"))
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.current.lock().unwrap().as_ref().map(|(url, _)| url.clone()))
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, b"\x89PNG").await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            self.backend.stats.double_closes.fetch_add(1, Ordering::SeqCst);
        }
        self.backend.stats.closed.fetch_add(1, Ordering::SeqCst);
        self.backend.stats.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
