//! seoscan Library
//!
//! Renders pages in a shared headless Chromium, extracts on-page SEO signals
//! from the rendered DOM and enriches them with robots.txt, link-status and
//! PageSpeed data.
//!
//! # Module Overview
//!
//! - [`browser`] - Browser pool, isolated contexts and the single-page renderer
//! - [`extract`] - Pure DOM signal extraction
//! - [`scanner`] - Scan orchestration, WAF/AMP fallback and auxiliary checks
//! - [`auxiliary`] - robots.txt, link status and PageSpeed Insights
//! - [`waf`] - Block-page heuristic and per-host cooldown
//! - [`compare`] - AMP vs canonical comparison
//! - [`persist`] - Outbound sink for finished scans
//! - [`config`] - Configuration file and environment support
//! - [`report`] - The scan result schema
//! - [`output`] - Versioned JSON output envelope
//!
//! # Example
//!
//! ```no_run
//! use seoscan_lib::{Config, ScanOptions, Scanner};
//!
//! # async fn example() -> seoscan_lib::Result<()> {
//! let scanner = Scanner::with_chromium(Config::load(None)?)?;
//! let result = scanner.scan("https://example.com/", &ScanOptions::default()).await?;
//! println!("{:?} -> {}", result.content().title, result.status_code);
//! scanner.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod auxiliary;
pub mod browser;
pub mod compare;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod persist;
pub mod report;
pub mod resource;
pub mod scanner;
pub mod viewport;
pub mod waf;
pub mod wait_mode;

pub use browser::{
    render, BrowserBackend, BrowserPool, ContextProfile, PageDriver, RenderRequest, RenderResult,
};
#[cfg(feature = "cdp")]
pub use browser::{CdpBackend, CdpOptions};
pub use compare::{AmpComparison, CompareCache, CompareRow};
pub use config::Config;
pub use error::{Degradation, ErrorCategory, ErrorPayload, Result, ScanError};
pub use extract::extract;
pub use output::{ScanOutput, SEOSCAN_OUTPUT_VERSION};
pub use persist::{JsonlSink, ScanRecord, ScanSink};
pub use report::{Checks, ContentSignals, PageSignals, ScanResult};
pub use resource::{host_key, normalize_url};
pub use scanner::{ScanOptions, Scanner};
pub use viewport::{DeviceProfile, Viewport};
pub use waf::{looks_like_waf, WafCooldownTracker};
pub use wait_mode::WaitMode;
