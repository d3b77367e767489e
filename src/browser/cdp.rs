//! Chromium over the DevTools protocol, via chromiumoxide.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventResponseReceived, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, RemoteObject};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{BrowserBackend, ConsoleLog, ContextProfile, Navigation, PageDriver};
use crate::config::Config;
use crate::wait_mode::WaitMode;
use crate::{Result, ScanError};

const SELECTOR_POLL: Duration = Duration::from_millis(100);

/// Launch settings for [`CdpBackend`].
#[derive(Debug, Clone)]
pub struct CdpOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub window: (u32, u32),
    pub request_timeout: Duration,
}

impl CdpOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.headless,
            chrome_executable: config.chrome_executable.clone(),
            window: (config.viewport.width, config.viewport.height),
            request_timeout: config.effective_navigation_timeout() + Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CdpBackend {
    options: CdpOptions,
}

impl CdpBackend {
    pub fn new(options: CdpOptions) -> Self {
        Self { options }
    }
}

/// The launched process plus the task pumping its websocket.
pub struct CdpBrowser {
    inner: RwLock<Browser>,
    handler: JoinHandle<()>,
}

#[async_trait]
impl BrowserBackend for CdpBackend {
    type Browser = CdpBrowser;
    type Page = CdpPage;

    async fn launch(&self) -> Result<CdpBrowser> {
        let (width, height) = self.options.window;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .request_timeout(self.options.request_timeout)
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ScanError::browser(format!("invalid browser launch config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScanError::browser(format!("failed to launch browser: {e}")))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "cdp handler event");
                }
            }
        });
        info!("browser launched");
        Ok(CdpBrowser {
            inner: RwLock::new(browser),
            handler,
        })
    }

    async fn close(&self, browser: Arc<CdpBrowser>) -> Result<()> {
        let outcome = {
            let mut inner = browser.inner.write().await;
            inner
                .close()
                .await
                .map(|_| ())
                .map_err(|e| ScanError::browser(format!("browser close failed: {e}")))
        };
        browser.handler.abort();
        outcome
    }

    async fn open_page(
        &self,
        browser: &Arc<CdpBrowser>,
        profile: &ContextProfile,
        console: ConsoleLog,
    ) -> Result<CdpPage> {
        let context_id = {
            let inner = browser.inner.read().await;
            inner
                .execute(CreateBrowserContextParams::default())
                .await
                .map_err(|e| ScanError::browser(format!("context creation failed: {e}")))?
                .result
                .browser_context_id
        };

        let page = {
            let inner = browser.inner.read().await;
            let mut target = CreateTargetParams::new("about:blank");
            target.browser_context_id = Some(context_id.clone());
            inner.new_page(target).await
        };
        let page = match page {
            Ok(page) => page,
            Err(err) => {
                dispose_context(browser, context_id).await;
                return Err(ScanError::browser(format!("page creation failed: {err}")));
            }
        };

        let mut driver = CdpPage {
            page,
            browser: browser.clone(),
            context_id,
            document: Arc::new(Mutex::new(None)),
            listeners: Vec::new(),
        };
        if let Err(err) = driver.configure(profile, console).await {
            let _ = driver.close().await;
            return Err(err);
        }
        Ok(driver)
    }
}

async fn dispose_context(browser: &CdpBrowser, id: BrowserContextId) {
    let inner = browser.inner.read().await;
    if let Err(err) = inner.execute(DisposeBrowserContextParams::new(id)).await {
        debug!(error = %err, "context dispose failed");
    }
}

#[derive(Debug, Clone)]
struct DocumentResponse {
    status: u16,
    headers: HashMap<String, String>,
}

pub struct CdpPage {
    page: Page,
    browser: Arc<CdpBrowser>,
    context_id: BrowserContextId,
    document: Arc<Mutex<Option<DocumentResponse>>>,
    listeners: Vec<JoinHandle<()>>,
}

impl CdpPage {
    async fn configure(&mut self, profile: &ContextProfile, console: ConsoleLog) -> Result<()> {
        let agent = SetUserAgentOverrideParams::builder()
            .user_agent(profile.user_agent.clone())
            .accept_language(profile.accept_language.clone())
            .build()
            .map_err(ScanError::browser)?;
        self.page.execute(agent).await.map_err(cdp_error)?;

        let device = profile.device;
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(profile.viewport.width),
                i64::from(profile.viewport.height),
                device.device_scale_factor(),
                device.is_mobile(),
            ))
            .await
            .map_err(cdp_error)?;

        self.page
            .execute(NetworkEnableParams::default())
            .await
            .map_err(cdp_error)?;
        self.page
            .execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(cdp_error)?;

        let mut console_events = self
            .page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(cdp_error)?;
        self.listeners.push(tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                let text = event
                    .args
                    .iter()
                    .map(remote_object_text)
                    .collect::<Vec<_>>()
                    .join(" ");
                let kind = format!("{:?}", event.r#type).to_ascii_lowercase();
                console.push(format!("[{kind}] {text}"));
            }
        }));

        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(cdp_error)?;
        let document = self.document.clone();
        let main_frame = self.page.mainframe().await.ok().flatten();
        self.listeners.push(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                if event.r#type != ResourceType::Document {
                    continue;
                }
                if let (Some(main), Some(frame)) = (&main_frame, &event.frame_id) {
                    if main != frame {
                        continue;
                    }
                }
                let mut slot = document.lock().unwrap_or_else(|e| e.into_inner());
                if slot.is_none() {
                    *slot = Some(DocumentResponse {
                        status: u16::try_from(event.response.status).unwrap_or(0),
                        headers: header_map(&event.response.headers),
                    });
                }
            }
        }));
        Ok(())
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn navigate(&self, url: &str, wait: WaitMode) -> Result<Navigation> {
        *self.document.lock().unwrap_or_else(|e| e.into_inner()) = None;

        let mut lifecycle = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(cdp_error)?;
        let navigated = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| ScanError::navigation(url, e.to_string()))?;
        if let Some(error_text) = navigated.result.error_text.clone() {
            return Err(ScanError::navigation(url, error_text));
        }

        if wait != WaitMode::Commit {
            let loader = navigated.result.loader_id.clone();
            let target = wait.lifecycle_event();
            loop {
                match lifecycle.next().await {
                    Some(event) => {
                        let same_load = loader.as_ref().map_or(true, |id| *id == event.loader_id);
                        if same_load && event.name == target {
                            break;
                        }
                    }
                    None => {
                        return Err(ScanError::navigation(url, "page closed during navigation"))
                    }
                }
            }
        }

        let status = self
            .document
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|doc| doc.status)
            .filter(|status| *status > 0);
        Ok(Navigation { status })
    }

    async fn response_headers(&self) -> Result<HashMap<String, String>> {
        self.document
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|doc| doc.headers.clone())
            .ok_or_else(|| ScanError::browser("no document response observed"))
    }

    async fn scroll_by(&self, dy: i64) -> Result<()> {
        self.page
            .evaluate(format!("window.scrollBy(0, {dy})"))
            .await
            .map(|_| ())
            .map_err(cdp_error)
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn content(&self) -> Result<String> {
        self.page.content().await.map_err(cdp_error)
    }

    async fn current_url(&self) -> Result<Option<String>> {
        self.page.url().await.map_err(cdp_error)
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .map(|_| ())
            .map_err(cdp_error)
    }

    async fn close(&self) -> Result<()> {
        for listener in &self.listeners {
            listener.abort();
        }
        let closed = self.page.clone().close().await.map_err(cdp_error);
        dispose_context(&self.browser, self.context_id.clone()).await;
        closed
    }
}

fn cdp_error(err: chromiumoxide::error::CdpError) -> ScanError {
    ScanError::browser(err.to_string())
}

fn remote_object_text(arg: &RemoteObject) -> String {
    match (&arg.value, &arg.description) {
        (Some(serde_json::Value::String(s)), _) => s.clone(),
        (Some(value), _) => value.to_string(),
        (None, Some(description)) => description.clone(),
        (None, None) => String::new(),
    }
}

fn header_map<T: serde::Serialize>(headers: &T) -> HashMap<String, String> {
    let Ok(serde_json::Value::Object(map)) = serde_json::to_value(headers) else {
        return HashMap::new();
    };
    map.into_iter()
        .map(|(name, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (name, value)
        })
        .collect()
}
