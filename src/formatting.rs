use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use seoscan_lib::{ScanError, ScanOutput};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &ScanOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: ScanError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let payload = ScanOutput::error(err.to_payload());

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    ExitCode::from(2)
}

fn write_json_output(body: &ScanOutput, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

fn write_pretty_output(body: &ScanOutput, output: Option<&Path>) -> io::Result<()> {
    let use_human = output.is_none() && std::io::stdout().is_terminal();
    if use_human {
        println!("{}", format_pretty(body, true));
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &ScanOutput, colorize: bool) -> String {
    let mut buf = String::new();
    match body {
        ScanOutput::Scan(out) => {
            let result = &out.result;
            let content = result.content();
            let checks = result.checks();
            let status_code = match result.status_code {
                0 => "---".to_string(),
                code => code.to_string(),
            };
            let status = color(&status_code, status_color_code(result.status_code), colorize);
            writeln!(buf, "{} {}", status, result.url()).ok();
            if result.performance.final_url != result.url() {
                writeln!(buf, "Final URL: {}", result.performance.final_url).ok();
            }
            writeln!(buf, "Title: {}", content.title.as_deref().unwrap_or("-")).ok();
            writeln!(
                buf,
                "Description: {}",
                content.description.as_deref().unwrap_or("-")
            )
            .ok();
            writeln!(buf, "Canonical: {}", content.canonical.as_deref().unwrap_or("-")).ok();
            writeln!(
                buf,
                "Load: {}ms, {} bytes",
                result.load_time_ms, result.content_length
            )
            .ok();

            writeln!(buf, "Checks:").ok();
            let rows = [
                ("indexable", checks.indexable.ok, checks.indexable.value.clone()),
                ("canonical", checks.canonical.ok, String::new()),
                ("viewport meta", checks.viewport_meta.ok, checks.viewport_meta.value.clone()),
                ("h1 count", checks.h1_count.ok, checks.h1_count.count.to_string()),
                (
                    "alt coverage",
                    checks.alt_coverage.ok,
                    format!("{:.1}%", checks.alt_coverage.percent),
                ),
                ("lang", checks.lang.ok, checks.lang.value.clone()),
                ("charset", checks.charset.ok, checks.charset.value.clone()),
                ("compression", checks.compression.ok, checks.compression.value.clone()),
            ];
            for (label, ok, detail) in rows {
                let mark = if ok {
                    color("ok", "32", colorize)
                } else {
                    color("!!", "31", colorize)
                };
                writeln!(buf, "- {:14} {} {}", label, mark, detail).ok();
            }

            writeln!(
                buf,
                "Links: {} internal, {} external, {} nofollow",
                content.internal_links.len(),
                content.external_links.len(),
                content.nofollow_links.len()
            )
            .ok();
            if !content.sd_types.types.is_empty() {
                writeln!(buf, "Structured data: {}", content.sd_types.types.join(", ")).ok();
            }
            if !content.keyword_density_top.is_empty() {
                let words: Vec<String> = content
                    .keyword_density_top
                    .iter()
                    .take(5)
                    .map(|k| format!("{} ({:.2}%)", k.word, k.percent))
                    .collect();
                writeln!(buf, "Top keywords: {}", words.join(", ")).ok();
            }
            if let (Some(m), Some(d)) = (
                result.performance.mobile_score,
                result.performance.desktop_score,
            ) {
                writeln!(buf, "PageSpeed: mobile {m}, desktop {d}").ok();
            }
            for note in &result.notes {
                writeln!(buf, "{} {note}", color("note:", "36", colorize)).ok();
            }
            for error in &result.errors {
                writeln!(buf, "{} {error}", color("error:", "31", colorize)).ok();
            }
        }
        ScanOutput::AmpCompare(out) => {
            let cmp = &out.comparison;
            writeln!(buf, "{} {}", color("[AMP]", "36", colorize), cmp.url).ok();
            match (&cmp.amp_url, &cmp.error) {
                (_, Some(error)) => {
                    writeln!(buf, "{}", color(error, "33", colorize)).ok();
                }
                (Some(amp_url), None) => {
                    writeln!(buf, "AMP: {amp_url}").ok();
                    for row in &cmp.rows {
                        let marker = if row.changed {
                            color("*", "33", colorize)
                        } else {
                            " ".to_string()
                        };
                        writeln!(
                            buf,
                            "{marker} {:22} {} | {}",
                            row.label, row.non_amp, row.amp
                        )
                        .ok();
                    }
                }
                (None, None) => {}
            }
        }
        ScanOutput::Error(out) => {
            let header = color("[ERROR]", "31", colorize);
            writeln!(buf, "{} {:?}: {}", header, out.error.category, out.error.message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {remediation}").ok();
            }
        }
    }
    buf
}

fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Map an HTTP status to an ANSI color code.
fn status_color_code(status: u16) -> &'static str {
    match status {
        200..=299 => "32",
        300..=399 => "33",
        _ => "31",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seoscan_lib::{AmpComparison, CompareRow, ScanResult};

    #[test]
    fn pretty_scan_lists_notes_and_errors() {
        let mut result = ScanResult::empty("https://example.com/");
        result.status_code = 200;
        result.signals.content.title = Some("Example".into());
        result.notes.push("Canonical blocked by WAF; AMP analyzed instead.".into());
        result.errors.push("robots.txt failed: timeout".into());

        let text = format_pretty(&ScanOutput::scan(result), false);
        assert!(text.starts_with("200 https://example.com/"));
        assert!(text.contains("Title: Example"));
        assert!(text.contains("note: Canonical blocked by WAF"));
        assert!(text.contains("error: robots.txt failed"));
        assert!(!text.contains("\x1b["));
    }

    #[test]
    fn pretty_compare_marks_changed_rows() {
        let cmp = AmpComparison {
            url: "https://example.com/".into(),
            amp_url: Some("https://example.com/amp".into()),
            rows: vec![CompareRow {
                label: "Title".into(),
                non_amp: "A".into(),
                amp: "B".into(),
                changed: true,
            }],
            error: None,
        };
        let text = format_pretty(&ScanOutput::amp_compare(cmp), false);
        assert!(text.contains("AMP: https://example.com/amp"));
        assert!(text.contains("* Title"));
    }

    #[test]
    fn pretty_error_shows_hint() {
        let payload = ScanError::navigation("https://example.com/", "timed out").to_payload();
        let text = format_pretty(&ScanOutput::error(payload), false);
        assert!(text.contains("[ERROR] Navigation"));
        assert!(text.contains("Hint:"));
    }
}
