//! Console logging for Jiffy applications.
//!
//! The engine only emits `tracing` events. [`install_tracing`] installs a global
//! subscriber that writes them to stderr, filtered by `RUST_LOG` (default `info`)
//! and by a process-wide level that can be changed at runtime with
//! [`set_log_level`].

use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Mutex, Once, OnceLock};

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::fmt::{self, FormatEvent, FormatFields};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const TRACING_PREFIX: &str = "[jiffy]";
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

// ============================================================================
// Global State
// ============================================================================

static TRACING_INSTALLED: Once = Once::new();
static LOG_LEVEL: OnceLock<Mutex<LevelFilter>> = OnceLock::new();

fn log_level_handle() -> &'static Mutex<LevelFilter> {
    LOG_LEVEL.get_or_init(|| Mutex::new(LevelFilter::TRACE))
}

fn current_level() -> LevelFilter {
    log_level_handle()
        .lock()
        .map_or(DEFAULT_LOG_LEVEL, |guard| *guard)
}

/// Caps console output at `level` (`"off"`, `"error"` ... `"trace"`).
///
/// Unparsable values fall back to `info`. `RUST_LOG` still applies on top.
pub fn set_log_level(level: &str) {
    let parsed = LevelFilter::from_str(level).unwrap_or(DEFAULT_LOG_LEVEL);
    if let Ok(mut guard) = log_level_handle().lock() {
        *guard = parsed;
    }
}

/// The level set by [`set_log_level`]; `trace` (no cap) until it is called.
#[must_use]
pub fn log_level() -> LevelFilter {
    current_level()
}

// ============================================================================
// Installation
// ============================================================================

/// Installs the console subscriber (idempotent).
///
/// Does nothing if another global subscriber was installed first.
pub fn install_tracing() {
    TRACING_INSTALLED.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let console = fmt::layer()
            .event_format(JiffyFormatter)
            .with_writer(PrefixedWriter)
            .with_ansi(false)
            .with_filter(filter)
            .with_filter(filter_fn(|metadata| level_allows(current_level(), *metadata.level())));

        if tracing_subscriber::registry().with(console).try_init().is_err() {
            eprintln!("{TRACING_PREFIX} a global tracing subscriber is already installed");
        }
    });
}

const fn level_allows(filter: LevelFilter, level: Level) -> bool {
    match filter {
        LevelFilter::OFF => false,
        LevelFilter::ERROR => matches!(level, Level::ERROR),
        LevelFilter::WARN => matches!(level, Level::ERROR | Level::WARN),
        LevelFilter::INFO => matches!(level, Level::ERROR | Level::WARN | Level::INFO),
        LevelFilter::DEBUG => matches!(
            level,
            Level::ERROR | Level::WARN | Level::INFO | Level::DEBUG
        ),
        LevelFilter::TRACE => true,
    }
}

// ============================================================================
// Console Output
// ============================================================================

#[derive(Clone, Default)]
struct PrefixedWriter;

impl<'a> MakeWriter<'a> for PrefixedWriter {
    type Writer = PrefixedWriterInner<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        PrefixedWriterInner {
            inner: io::stderr(),
            wrote_prefix: false,
        }
    }
}

struct PrefixedWriterInner<W> {
    inner: W,
    wrote_prefix: bool,
}

impl<W: Write> Write for PrefixedWriterInner<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.wrote_prefix {
            self.inner.write_all(TRACING_PREFIX.as_bytes())?;
            self.inner.write_all(b" ")?;
            self.wrote_prefix = true;
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// `LEVEL target: message field=value ...`
#[derive(Clone, Default)]
struct JiffyFormatter;

impl<S, N> FormatEvent<S, N> for JiffyFormatter
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        write!(writer, "{} {}: ", metadata.level(), metadata.target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
