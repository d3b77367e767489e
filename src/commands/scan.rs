use std::path::PathBuf;
use std::process::ExitCode;

use seoscan_lib::{normalize_url, JsonlSink, ScanError, ScanOutput, ScanRecord, ScanSink, Scanner};
use tracing::{debug, warn};

use crate::cli::RenderArgs;
use crate::formatting::{render_error, write_output};
use crate::settings::{apply_cli_overrides, format_effective_config, load_config, scan_options};

/// Run the scan command.
pub async fn run_scan(
    config_path: Option<PathBuf>,
    render: RenderArgs,
    screenshot: bool,
    history: Option<PathBuf>,
) -> ExitCode {
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
    let options = scan_options(&render, screenshot);
    debug!("{}", format_effective_config(&config, &options, config_path.as_deref()));

    let scanner = match Scanner::with_chromium(config) {
        Ok(scanner) => scanner,
        Err(err) => return render_error(err, format, output),
    };
    let outcome = scanner.scan(&url, &options).await;
    scanner.shutdown().await;

    let result = match outcome {
        Ok(result) => result,
        Err(err) => return render_error(err, format, output),
    };

    // Written inline rather than through the scanner's detached sink so the
    // line lands before the process exits.
    if let Some(path) = history {
        let sink = JsonlSink::new(path);
        if let Err(err) = sink.record(ScanRecord::from_result(&result)).await {
            warn!(path = %sink.path().display(), error = %err, "failed to append scan history");
        }
    }

    if let Err(err) = write_output(&ScanOutput::scan(result), format, output.clone()) {
        return render_error(ScanError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}
