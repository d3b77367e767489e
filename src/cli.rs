use clap::{Parser, Subcommand, ValueEnum};
use seoscan_lib::{DeviceProfile, Viewport};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seoscan")]
#[command(
    version,
    about = "seoscan - Render a page in headless Chromium and report its on-page SEO signals",
    long_about = "seoscan\n\nModes:\n- scan: render one URL and report metadata, headings, links, structured data, keyword density, robots/sitemaps, link status and (with --full and an API key) PageSpeed scores.\n- amp-compare: scan a page and its rel=amphtml alternate and compare the headline signals.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose (debug) logging on stderr")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML); environment variables and CLI flags override it"
    )]
    pub config: Option<PathBuf>,
}

/// Render flags shared by both subcommands.
#[derive(clap::Args, Debug, Clone)]
pub struct RenderArgs {
    #[arg(long, help = "Page URL (scheme optional; https is assumed)")]
    pub url: String,

    #[arg(
        long,
        value_name = "TOKEN",
        help = "Navigation wait point (load, domcontentloaded, networkidle, commit; aliases accepted)"
    )]
    pub wait_until: Option<String>,

    #[arg(long, value_name = "MS", help = "Extra settle delay after navigation (milliseconds)")]
    pub settle_ms: Option<u64>,

    #[arg(long, value_name = "MS", help = "Navigation timeout (milliseconds)")]
    pub timeout_ms: Option<u64>,

    #[arg(long, value_enum, default_value = "desktop", help = "Emulated device")]
    pub device: DeviceArg,

    #[arg(long, help = "Viewport dimensions (WIDTHxHEIGHT); defaults per device")]
    pub viewport: Option<Viewport>,

    #[arg(
        long,
        help = "Full mode: longer timeouts, larger link sample and PageSpeed lookup when a key is configured"
    )]
    pub full: bool,

    #[arg(long, value_enum, default_value = "json", help = "Output format")]
    pub format: OutputFormat,

    #[arg(long, short, help = "Output file path (stdout if omitted)")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a URL and report its SEO signals
    Scan {
        #[command(flatten)]
        render: RenderArgs,

        #[arg(long, help = "Capture a full-page screenshot into the screenshot directory")]
        screenshot: bool,

        #[arg(
            long,
            value_name = "PATH",
            help = "Append the finished scan as one JSON line to this file"
        )]
        history: Option<PathBuf>,
    },

    /// Compare a page against its AMP alternate
    AmpCompare {
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    Desktop,
    Mobile,
}

impl From<DeviceArg> for DeviceProfile {
    fn from(value: DeviceArg) -> Self {
        match value {
            DeviceArg::Desktop => DeviceProfile::Desktop,
            DeviceArg::Mobile => DeviceProfile::Mobile,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
