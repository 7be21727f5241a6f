//! Download progress display and summary formatting.

use console::style;
use fragnet_core::node::DownloadReport;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a download runs
pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    /// Start a spinner for `filename`
    #[must_use]
    pub fn new(filename: &str) -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(template) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(template);
        }

        bar.set_message(format!("Downloading: {filename}"));
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Finish with the download summary
    pub fn finish(&self, report: &DownloadReport) {
        self.bar.finish_and_clear();
        println!("{}", summary(report));
    }

    /// Abandon the spinner (for errors)
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

/// One-line download summary, styled by completeness
#[must_use]
pub fn summary(report: &DownloadReport) -> String {
    let size = format!(
        "{} in {} ({})",
        format_bytes(report.bytes_written),
        format_duration(report.elapsed),
        format_speed(report.throughput())
    );

    if report.is_complete() {
        format!(
            "{} {} -> {}: {}",
            style("Downloaded").green().bold(),
            report.file_name,
            report.destination.display(),
            size
        )
    } else {
        format!(
            "{} {} -> {}: {}, {} of {} fragments missing {:?}",
            style("Incomplete").yellow().bold(),
            report.file_name,
            report.destination.display(),
            size,
            report.missing.len(),
            report.fragment_count,
            report.missing
        )
    }
}

/// Format bytes in human-readable format
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{size:.2} {}", UNITS[unit_idx])
}

/// Format speed in human-readable format (bytes/sec)
#[must_use]
pub fn format_speed(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec as u64))
}

/// Format duration in human-readable format
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
