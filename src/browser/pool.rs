//! Shared browser process with bounded, isolated rendering contexts.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use super::backend::{BrowserBackend, ConsoleLog, ContextProfile, PageDriver};
use crate::{Result, ScanError};

pub const DEFAULT_MAX_CONTEXTS: usize = 4;

/// A page handed to [`BrowserPool::with_page`] callers.
pub struct RenderSession<P> {
    pub page: Arc<P>,
    /// Live console buffer for this context.
    pub console: ConsoleLog,
}

/// Owns one browser process and gates context creation with a semaphore.
///
/// The process is launched lazily by the first [`with_page`](Self::with_page)
/// or explicitly via [`start`](Self::start). Launching happens under the
/// `browser` lock, so racing callers wait on the lock and then reuse the
/// handle the winner stored.
pub struct BrowserPool<B: BrowserBackend> {
    backend: B,
    browser: Mutex<Option<Arc<B::Browser>>>,
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl<B: BrowserBackend> BrowserPool<B> {
    pub fn new(backend: B, max_concurrent_contexts: usize) -> Self {
        let capacity = max_concurrent_contexts.max(1);
        Self {
            backend,
            browser: Mutex::new(None),
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free context slots right now.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub async fn is_running(&self) -> bool {
        self.browser.lock().await.is_some()
    }

    /// Launch the browser if it is not already running. Idempotent.
    pub async fn start(&self) -> Result<Arc<B::Browser>> {
        let mut slot = self.browser.lock().await;
        if let Some(browser) = slot.as_ref() {
            return Ok(browser.clone());
        }
        info!(max_contexts = self.capacity, "launching browser");
        let browser = Arc::new(self.backend.launch().await?);
        *slot = Some(browser.clone());
        Ok(browser)
    }

    /// Close the browser process. Idempotent; close errors are logged and
    /// swallowed, and a later [`start`](Self::start) relaunches.
    pub async fn stop(&self) {
        let taken = self.browser.lock().await.take();
        if let Some(browser) = taken {
            info!("stopping browser");
            if let Err(err) = self.backend.close(browser).await {
                warn!(error = %err, "browser close failed");
            }
        }
    }

    /// Run `f` against a fresh context.
    ///
    /// Suspends until a slot is free. The context is closed exactly once when
    /// `f` completes or fails, or when the returned future is dropped, and
    /// the slot is released only after that close.
    pub async fn with_page<F, Fut, T>(&self, profile: &ContextProfile, f: F) -> Result<T>
    where
        F: FnOnce(RenderSession<B::Page>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScanError::PoolClosed)?;
        let browser = self.start().await?;

        let console = ConsoleLog::default();
        let page = Arc::new(
            self.backend
                .open_page(&browser, profile, console.clone())
                .await?,
        );
        debug!(
            in_use = self.capacity - self.slots.available_permits(),
            "context opened"
        );

        let mut lease = ContextLease {
            page: Some(page.clone()),
            permit: Some(permit),
        };
        let outcome = f(RenderSession { page, console }).await;
        lease.release().await;
        outcome
    }
}

/// Holds an open page and its slot until the page has been closed.
struct ContextLease<P: PageDriver> {
    page: Option<Arc<P>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl<P: PageDriver> ContextLease<P> {
    async fn release(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(err) = page.close().await {
                warn!(error = %err, "context close failed");
            }
        }
        self.permit.take();
        debug!("context closed");
    }
}

impl<P: PageDriver> Drop for ContextLease<P> {
    fn drop(&mut self) {
        // Only reached with a live page when the render future was cancelled.
        let Some(page) = self.page.take() else {
            return;
        };
        let permit = self.permit.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = page.close().await {
                        warn!(error = %err, "context close after cancellation failed");
                    }
                    drop(permit);
                });
            }
            Err(_) => warn!("runtime gone; context left for browser shutdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::backend::Navigation;
    use crate::wait_mode::WaitMode;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counters {
        launches: AtomicUsize,
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    struct StubBackend(Arc<Counters>);

    struct StubPage(Arc<Counters>);

    #[async_trait]
    impl PageDriver for StubPage {
        async fn navigate(&self, _url: &str, _wait: WaitMode) -> Result<Navigation> {
            Ok(Navigation { status: Some(200) })
        }
        async fn response_headers(&self) -> Result<HashMap<String, String>> {
            Ok(HashMap::new())
        }
        async fn scroll_by(&self, _dy: i64) -> Result<()> {
            Ok(())
        }
        async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<bool> {
            Ok(true)
        }
        async fn content(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn current_url(&self) -> Result<Option<String>> {
            Ok(None)
        }
        async fn screenshot(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
        async fn close(&self) -> Result<()> {
            self.0.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserBackend for StubBackend {
        type Browser = ();
        type Page = StubPage;

        async fn launch(&self) -> Result<()> {
            self.0.launches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn close(&self, _browser: Arc<()>) -> Result<()> {
            Err(ScanError::browser("already gone"))
        }
        async fn open_page(
            &self,
            _browser: &Arc<()>,
            _profile: &ContextProfile,
            _console: ConsoleLog,
        ) -> Result<StubPage> {
            self.0.opened.fetch_add(1, Ordering::SeqCst);
            Ok(StubPage(self.0.clone()))
        }
    }

    fn pool(capacity: usize) -> (BrowserPool<StubBackend>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (BrowserPool::new(StubBackend(counters.clone()), capacity), counters)
    }

    #[test]
    fn capacity_is_never_zero() {
        let (pool, _) = pool(0);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.available_slots(), 1);
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_swallows_errors() {
        let (pool, counters) = pool(2);
        pool.start().await.unwrap();
        pool.start().await.unwrap();
        assert_eq!(counters.launches.load(Ordering::SeqCst), 1);

        pool.stop().await;
        pool.stop().await;
        assert!(!pool.is_running().await);

        pool.start().await.unwrap();
        assert_eq!(counters.launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_callback_still_closes_context() {
        let (pool, counters) = pool(1);
        let result: Result<()> = pool
            .with_page(&ContextProfile::default(), |_session| async {
                Err(ScanError::navigation("https://example.com", "boom"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(pool.available_slots(), 1);
    }
}
