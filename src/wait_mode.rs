//! Navigation wait semantics.
//!
//! Callers hand us free-form tokens (config files, env vars, query strings);
//! [`WaitMode::normalize`] folds them into the four lifecycle points the
//! browser actually reports.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode {
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[default]
    #[serde(rename = "networkidle")]
    NetworkIdle,
    Commit,
}

const ALIASES: &[(&str, WaitMode)] = &[
    ("load", WaitMode::Load),
    ("onload", WaitMode::Load),
    ("loaded", WaitMode::Load),
    ("domcontentloaded", WaitMode::DomContentLoaded),
    ("dom_content_loaded", WaitMode::DomContentLoaded),
    ("dom-content-loaded", WaitMode::DomContentLoaded),
    ("domcontent", WaitMode::DomContentLoaded),
    ("domready", WaitMode::DomContentLoaded),
    ("dom", WaitMode::DomContentLoaded),
    ("networkidle", WaitMode::NetworkIdle),
    ("network_idle", WaitMode::NetworkIdle),
    ("network-idle", WaitMode::NetworkIdle),
    ("networkidle0", WaitMode::NetworkIdle),
    ("networkidle2", WaitMode::NetworkIdle),
    ("idle", WaitMode::NetworkIdle),
    ("commit", WaitMode::Commit),
    ("committed", WaitMode::Commit),
];

impl WaitMode {
    pub const ALL: [WaitMode; 4] = [
        WaitMode::Load,
        WaitMode::DomContentLoaded,
        WaitMode::NetworkIdle,
        WaitMode::Commit,
    ];

    /// Map an arbitrary token onto a canonical mode, falling back to `default`
    /// for empty or unrecognized input. Never fails.
    pub fn normalize(token: &str, default: WaitMode) -> WaitMode {
        Self::lookup(token).unwrap_or(default)
    }

    fn lookup(token: &str) -> Option<WaitMode> {
        let key = token.trim().to_ascii_lowercase();
        if key.is_empty() {
            return None;
        }
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, mode)| *mode)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitMode::Load => "load",
            WaitMode::DomContentLoaded => "domcontentloaded",
            WaitMode::NetworkIdle => "networkidle",
            WaitMode::Commit => "commit",
        }
    }

    /// Name of the CDP `Page.lifecycleEvent` that satisfies this mode.
    pub fn lifecycle_event(&self) -> &'static str {
        match self {
            WaitMode::Load => "load",
            WaitMode::DomContentLoaded => "DOMContentLoaded",
            WaitMode::NetworkIdle => "networkIdle",
            WaitMode::Commit => "commit",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown wait mode '{0}': expected load, domcontentloaded, networkidle or commit")]
pub struct WaitModeParseError(String);

impl FromStr for WaitMode {
    type Err = WaitModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| WaitModeParseError(s.to_string()))
    }
}

impl fmt::Display for WaitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Config files get the same leniency as env vars.
impl<'de> Deserialize<'de> for WaitMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(WaitMode::normalize(&raw, WaitMode::default()))
    }
}
