use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 768,
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewportParseError {
    #[error("Invalid viewport format: expected WIDTHxHEIGHT (e.g., 1366x768)")]
    InvalidFormat,
    #[error("Invalid width: {0}")]
    InvalidWidth(String),
    #[error("Invalid height: {0}")]
    InvalidHeight(String),
    #[error("Width must be positive")]
    ZeroWidth,
    #[error("Height must be positive")]
    ZeroHeight,
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or(ViewportParseError::InvalidFormat)?;
        if h.contains(['x', 'X']) {
            return Err(ViewportParseError::InvalidFormat);
        }

        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidWidth(w.to_string()))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidHeight(h.to_string()))?;

        if width == 0 {
            return Err(ViewportParseError::ZeroWidth);
        }
        if height == 0 {
            return Err(ViewportParseError::ZeroHeight);
        }

        Ok(Viewport { width, height })
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Emulated device class for a render context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    #[default]
    Desktop,
    Mobile,
}

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36";

impl DeviceProfile {
    pub fn default_viewport(&self) -> Viewport {
        match self {
            DeviceProfile::Desktop => Viewport::default(),
            DeviceProfile::Mobile => Viewport {
                width: 412,
                height: 915,
            },
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, DeviceProfile::Mobile)
    }

    pub fn device_scale_factor(&self) -> f64 {
        match self {
            DeviceProfile::Desktop => 1.0,
            DeviceProfile::Mobile => 2.625,
        }
    }

    /// The mobile profile swaps in a phone UA; desktop keeps the configured one.
    pub fn user_agent<'a>(&self, configured: &'a str) -> &'a str {
        match self {
            DeviceProfile::Desktop => configured,
            DeviceProfile::Mobile => MOBILE_USER_AGENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let vp: Viewport = "1366x768".parse().unwrap();
        assert_eq!(vp.width, 1366);
        assert_eq!(vp.height, 768);
    }

    #[test]
    fn test_parse_with_spaces() {
        let vp: Viewport = " 1920 x 1080 ".parse().unwrap();
        assert_eq!(vp.width, 1920);
        assert_eq!(vp.height, 1080);
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!("1440".parse::<Viewport>().is_err());
        assert!("1440x900x600".parse::<Viewport>().is_err());
        assert!("x900".parse::<Viewport>().is_err());
    }

    #[test]
    fn test_parse_zero_dimensions() {
        assert!("0x900".parse::<Viewport>().is_err());
        assert!("1440x0".parse::<Viewport>().is_err());
    }

    #[test]
    fn test_display() {
        let vp = Viewport {
            width: 412,
            height: 915,
        };
        assert_eq!(format!("{}", vp), "412x915");
    }

    #[test]
    fn mobile_profile_overrides_user_agent() {
        let ua = "custom-agent/1.0";
        assert_eq!(DeviceProfile::Desktop.user_agent(ua), ua);
        assert!(DeviceProfile::Mobile.user_agent(ua).contains("Mobile"));
        assert!(DeviceProfile::Mobile.is_mobile());
        assert_eq!(DeviceProfile::Mobile.default_viewport().width, 412);
    }
}
