//! Headless page rendering.
//!
//! # Module Structure
//!
//! - [`backend`] - the engine seam: [`BrowserBackend`] and [`PageDriver`]
//! - [`pool`] - one shared browser process, bounded isolated contexts
//! - [`render`] - a single navigation with lazy-load nudge and settle delay
//! - `cdp` - chromiumoxide implementation (feature `cdp`, on by default)
//!
//! # Example
//!
//! ```no_run
//! use seoscan_lib::browser::{render, BrowserPool, CdpBackend, CdpOptions, RenderRequest};
//! use seoscan_lib::Config;
//!
//! # async fn example() -> seoscan_lib::Result<()> {
//! let config = Config::default();
//! let pool = BrowserPool::new(CdpBackend::new(CdpOptions::from_config(&config)), 4);
//! let page = render(&pool, &RenderRequest::new("https://example.com/")).await?;
//! println!("{} bytes from {}", page.html.len(), page.final_url);
//! pool.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod backend;
#[cfg(feature = "cdp")]
mod cdp;
pub mod pool;
pub mod render;

pub use backend::{BrowserBackend, ConsoleLog, ContextProfile, Navigation, PageDriver};
#[cfg(feature = "cdp")]
pub use cdp::{CdpBackend, CdpBrowser, CdpOptions, CdpPage};
pub use pool::{BrowserPool, RenderSession, DEFAULT_MAX_CONTEXTS};
pub use render::{render, screenshot_file_name, RenderRequest, RenderResult, MAIN_CONTENT_SELECTOR};
