//! Report stream setup

use std::fmt;
use std::fs::File;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{format::Writer, layer, time::FormatTime, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Registry,
};

/// Wall-clock HH:MM:SS stamp
struct WallClock;

impl FormatTime for WallClock {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        write!(
            w,
            "{:02}:{:02}:{:02}",
            (secs / 3600) % 24,
            (secs / 60) % 60,
            secs % 60
        )
    }
}

/// Send the report stream to a file, or to stdout when no path is given.
/// Fails without installing a subscriber if the file cannot be created.
pub fn setup_output(output_path: Option<&str>, verbose: bool) -> io::Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let log = output_path.map(File::create).transpose()?;
    let to_file = log.is_some();
    let writer = match log {
        Some(file) => BoxMakeWriter::new(file),
        None => BoxMakeWriter::new(io::stdout),
    };

    let report = layer()
        .with_writer(writer)
        .with_timer(WallClock)
        .with_target(false)
        .with_ansi(!to_file);
    Registry::default().with(level).with(report).init();

    if let Some(path) = output_path {
        info!("Output will be written to: {}", path);
    }
    Ok(())
}
