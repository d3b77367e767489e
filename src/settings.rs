use std::path::Path;
use std::time::Duration;

use seoscan_lib::{Config, ScanError, ScanOptions};

use crate::cli::RenderArgs;

/// Load config from a TOML file, central config, or defaults, with
/// environment overrides applied.
/// Priority: explicit path > ~/.config/seoscan/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, ScanError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        ScanError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        ScanError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Fold CLI flags that change process-wide behavior into `config`.
pub fn apply_cli_overrides(config: &mut Config, args: &RenderArgs) {
    if args.full {
        config.fast_mode = false;
    }
}

/// Per-scan options from the render flags; anything unset falls back to
/// the scanner's config.
pub fn scan_options(args: &RenderArgs, screenshot: bool) -> ScanOptions {
    ScanOptions {
        wait_until: args.wait_until.clone(),
        settle_delay: args.settle_ms.map(Duration::from_millis),
        timeout: args.timeout_ms.map(Duration::from_millis),
        device: args.device.into(),
        viewport: args.viewport,
        screenshot,
    }
}

/// One-line summary of the settings a scan will run with.
pub fn format_effective_config(config: &Config, options: &ScanOptions, source: Option<&Path>) -> String {
    let source = source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let wait = options.wait_until.as_deref().unwrap_or(config.wait_until.as_str());
    let timeout = options
        .timeout
        .unwrap_or_else(|| config.effective_navigation_timeout());
    format!(
        "Effective config [{source}]: mode={}, wait_until={}, timeout={}ms, settle={}ms, contexts={}, device={:?}, pagespeed={}",
        if config.fast_mode { "fast" } else { "full" },
        wait,
        timeout.as_millis(),
        options.settle_delay.unwrap_or(config.settle_delay).as_millis(),
        config.effective_concurrency(),
        options.device,
        if config.pagespeed_api_key.is_some() && !config.fast_mode {
            "on"
        } else {
            "off"
        },
    )
}
