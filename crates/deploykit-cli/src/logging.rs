//! Tracing setup for the controller.
//!
//! The console gets bare messages. Non-verbose runs additionally mirror
//! every message into the run log, prefixed with a local timestamp.

use std::fmt;
use std::fs::File;
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// `%X %x` in local time, e.g. `14:03:07 10/18/26`.
struct LocalTimestamp;

impl FormatTime for LocalTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Local::now().format("%X %x"))
    }
}

pub fn init(verbose: bool, run_log: Option<File>) -> anyhow::Result<()> {
    let default_filter = if verbose {
        "deploykit_core=debug,deploy=debug,info"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_level(false);

    let file = run_log.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_level(false)
            .with_timer(LocalTimestamp)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_uses_locale_time_and_date() {
        let mut out = String::new();
        LocalTimestamp.format_time(&mut Writer::new(&mut out)).unwrap();
        // "%X %x" renders as "HH:MM:SS mm/dd/yy"
        assert_eq!(out.len(), 17);
        assert_eq!(out.matches(':').count(), 2);
        assert_eq!(out.matches('/').count(), 2);
    }
}
