use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::wait_mode::WaitMode;
use crate::{Result, ScanError, Viewport};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const FAST_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(12);
const FULL_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_concurrent_contexts: usize,
    pub wait_until: WaitMode,
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Falls back to the fast/full default when unset.
    #[serde(with = "humantime_serde")]
    pub navigation_timeout: Option<Duration>,
    pub user_agent: String,
    pub accept_language: String,
    pub viewport: Viewport,
    #[serde(with = "humantime_serde")]
    pub waf_cooldown: Duration,
    pub fast_mode: bool,
    pub proxy: Option<String>,
    pub pagespeed_api_key: Option<String>,
    pub screenshot_dir: Option<PathBuf>,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_contexts: 4,
            wait_until: WaitMode::NetworkIdle,
            settle_delay: Duration::from_millis(800),
            navigation_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            viewport: Viewport::default(),
            waf_cooldown: Duration::from_secs(900),
            fast_mode: true,
            proxy: None,
            pagespeed_api_key: None,
            screenshot_dir: None,
            headless: true,
            chrome_executable: None,
        }
    }
}

/// Timeouts and sample sizes that shrink in fast mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxiliaryLimits {
    pub robots_timeout: Duration,
    pub link_timeout: Duration,
    pub link_sample: usize,
    pub pagespeed_timeout: Duration,
}

impl Config {
    /// Load from an explicit file, the central config path, or defaults, then
    /// apply `SEOSCAN_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::central_config_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| ScanError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn central_config_path() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
            return Some(PathBuf::from(dir).join("seoscan").join("config.toml"));
        }
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("seoscan")
                .join("config.toml")
        })
    }

    /// Apply environment overrides through `lookup`; unparsable values are
    /// ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("SEOSCAN_MAX_CONTEXTS") {
            match v.parse::<usize>() {
                Ok(n) => self.max_concurrent_contexts = n,
                Err(_) => warn!(value = %v, "ignoring invalid SEOSCAN_MAX_CONTEXTS"),
            }
        }
        if let Some(v) = get("SEOSCAN_WAIT_UNTIL") {
            self.wait_until = WaitMode::normalize(&v, self.wait_until);
        }
        if let Some(v) = get("SEOSCAN_SETTLE_MS") {
            match v.parse::<u64>() {
                Ok(ms) => self.settle_delay = Duration::from_millis(ms),
                Err(_) => warn!(value = %v, "ignoring invalid SEOSCAN_SETTLE_MS"),
            }
        }
        if let Some(v) = get("SEOSCAN_NAV_TIMEOUT_MS") {
            match v.parse::<u64>() {
                Ok(ms) => self.navigation_timeout = Some(Duration::from_millis(ms)),
                Err(_) => warn!(value = %v, "ignoring invalid SEOSCAN_NAV_TIMEOUT_MS"),
            }
        }
        if let Some(v) = get("SEOSCAN_USER_AGENT") {
            self.user_agent = v;
        }
        if let Some(v) = get("SEOSCAN_ACCEPT_LANGUAGE") {
            self.accept_language = v;
        }
        if let Some(v) = get("SEOSCAN_WAF_COOLDOWN_SECS") {
            match v.parse::<u64>() {
                Ok(secs) => self.waf_cooldown = Duration::from_secs(secs),
                Err(_) => warn!(value = %v, "ignoring invalid SEOSCAN_WAF_COOLDOWN_SECS"),
            }
        }
        if let Some(v) = get("SEOSCAN_FAST") {
            self.fast_mode = !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off");
        }
        if let Some(v) = get("SEOSCAN_PROXY") {
            self.proxy = Some(v);
        }
        if let Some(v) = get("SEOSCAN_PSI_API_KEY")
            .or_else(|| get("GOOGLE_PSI_API_KEY"))
            .or_else(|| get("PAGESPEED_API_KEY"))
        {
            self.pagespeed_api_key = Some(v);
        }
        if let Some(v) = get("SEOSCAN_SCREENSHOT_DIR") {
            self.screenshot_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SEOSCAN_CHROME") {
            self.chrome_executable = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.settle_delay > Duration::from_secs(60) {
            return Err(ScanError::Config(
                "settle_delay must not exceed 60s".to_string(),
            ));
        }
        if self.effective_navigation_timeout().is_zero() {
            return Err(ScanError::Config(
                "navigation_timeout must be greater than zero".to_string(),
            ));
        }
        if self.waf_cooldown.is_zero() {
            return Err(ScanError::Config(
                "waf_cooldown must be greater than zero".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ScanError::Config("user_agent must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrent_contexts.max(1)
    }

    pub fn effective_navigation_timeout(&self) -> Duration {
        self.navigation_timeout.unwrap_or(if self.fast_mode {
            FAST_NAVIGATION_TIMEOUT
        } else {
            FULL_NAVIGATION_TIMEOUT
        })
    }

    pub fn auxiliary_limits(&self) -> AuxiliaryLimits {
        if self.fast_mode {
            AuxiliaryLimits {
                robots_timeout: Duration::from_secs(6),
                link_timeout: Duration::from_secs(5),
                link_sample: 4,
                pagespeed_timeout: Duration::from_secs(30),
            }
        } else {
            AuxiliaryLimits {
                robots_timeout: Duration::from_secs(10),
                link_timeout: Duration::from_secs(10),
                link_sample: 10,
                pagespeed_timeout: Duration::from_secs(30),
            }
        }
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.screenshot_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
