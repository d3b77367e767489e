use std::path::PathBuf;
use std::process::ExitCode;

use seoscan_lib::{normalize_url, ScanError, ScanOutput, Scanner};
use tracing::debug;

use crate::cli::RenderArgs;
use crate::formatting::{render_error, write_output};
use crate::settings::{apply_cli_overrides, format_effective_config, load_config, scan_options};

/// Run the amp-compare command.
pub async fn run_amp_compare(config_path: Option<PathBuf>, render: RenderArgs) -> ExitCode {
    let format = render.format;
    let output = render.output.clone();

    let mut config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    apply_cli_overrides(&mut config, &render);

    let url = match normalize_url(&render.url) {
        Ok(url) => url.to_string(),
        Err(err) => return render_error(ScanError::Config(err.to_string()), format, output),
    };
    let options = scan_options(&render, false);
    debug!("{}", format_effective_config(&config, &options, config_path.as_deref()));

    let scanner = match Scanner::with_chromium(config) {
        Ok(scanner) => scanner,
        Err(err) => return render_error(err, format, output),
    };
    let outcome = scanner.amp_compare(&url, &options).await;
    scanner.shutdown().await;

    let comparison = match outcome {
        Ok(comparison) => comparison,
        Err(err) => return render_error(err, format, output),
    };
    if let Err(err) = write_output(&ScanOutput::amp_compare(comparison), format, output.clone()) {
        return render_error(ScanError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}
