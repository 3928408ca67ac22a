use etl_config::Environment;
use std::io::Error;
use std::io::Write;
use std::sync::OnceLock;
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    panic::PanicHookInfo,
    sync::Once,
};
use thiserror::Error;
use tracing::field::display;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, InitError},
};
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber, Registry, fmt, layer::SubscriberExt};

/// JSON field name for pipeline identification in logs.
const PIPELINE_KEY_IN_LOG: &str = "pipeline";

/// Errors that can occur during tracing initialization.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to build rolling file appender: {0}")]
    InitAppender(#[from] InitError),

    #[error("failed to init log tracer: {0}")]
    InitLogTracer(#[from] SetLoggerError),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error("an io error occurred: {0}")]
    Io(#[from] Error),
}

/// Log flusher handle for ensuring logs are written before shutdown.
///
/// Production mode returns a [`WorkerGuard`] that must be kept alive to ensure
/// logs are flushed. Development mode doesn't require flushing.
#[must_use]
pub enum LogFlusher {
    /// Production flusher that ensures logs are written to files.
    Flusher(WorkerGuard),
    /// Development flusher that doesn't require explicit flushing.
    NullFlusher,
}

static INIT_TEST_TRACING: Once = Once::new();

/// Initializes tracing for test environments.
///
/// Call once at the beginning of tests. Set `ENABLE_TRACING=1` to view tracing output:
/// ```bash
/// ENABLE_TRACING=1 cargo test test_name
/// ```
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_ok() {
            // Tests always log to the terminal, whatever APP_ENVIRONMENT says.
            Environment::Dev.set();
            if let Err(err) = init_tracing("test") {
                eprintln!("failed to initialize tracing for tests: {err}");
            }
        }
    });
}

/// Global pipeline name storage.
static PIPELINE_NAME: OnceLock<String> = OnceLock::new();

/// Sets the global pipeline name for all tracing events.
///
/// The name is injected into every structured log entry as a top-level `pipeline` field.
/// Only the first call has an effect.
pub fn set_global_pipeline_name(pipeline_name: String) {
    let _ = PIPELINE_NAME.set(pipeline_name);
}

/// Returns the current global pipeline name, `None` if it was never set.
pub fn get_global_pipeline_name() -> Option<&'static str> {
    PIPELINE_NAME.get().map(|s| s.as_str())
}

/// Writer wrapper that injects a pipeline field into JSON log entries.
struct PipelineInjectingWriter<W> {
    inner: W,
    pipeline_name: Option<&'static str>,
}

impl<W> PipelineInjectingWriter<W> {
    fn new(inner: W, pipeline_name: Option<&'static str>) -> Self {
        Self {
            inner,
            pipeline_name,
        }
    }

    /// Returns `buf` with the pipeline field added, or `None` when it should be written as is.
    fn inject(&self, buf: &[u8]) -> Option<String> {
        let pipeline_name = self.pipeline_name?;
        let json_str = std::str::from_utf8(buf).ok()?;
        let json = serde_json::from_str::<serde_json::Value>(json_str).ok()?;
        let serde_json::Value::Object(mut map) = json else {
            return None;
        };

        if map.contains_key(PIPELINE_KEY_IN_LOG) {
            return None;
        }
        map.insert(
            PIPELINE_KEY_IN_LOG.to_string(),
            serde_json::Value::String(pipeline_name.to_string()),
        );

        let modified = serde_json::to_string(&map).ok()?;
        // Preserve trailing newline if present
        if json_str.ends_with('\n') {
            Some(format!("{modified}\n"))
        } else {
            Some(modified)
        }
    }
}

impl<W> Write for PipelineInjectingWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.inject(buf) {
            Some(output) => {
                // The caller handed over `buf`, so its length is what gets reported back.
                self.inner.write_all(output.as_bytes())?;
                Ok(buf.len())
            }
            None => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Initializes tracing for the application.
///
/// Sets up structured logging with environment-appropriate configuration.
/// Production environments log to rotating files, development to console.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    init_tracing_with_pipeline(app_name, None)
}

/// Initializes tracing and tags every JSON log entry with `pipeline_name`.
pub fn init_tracing_with_pipeline(
    app_name: &str,
    pipeline_name: Option<String>,
) -> Result<LogFlusher, TracingError> {
    if let Some(pipeline_name) = pipeline_name {
        set_global_pipeline_name(pipeline_name);
    }

    // Initialize the log tracer to capture logs from the `log` crate
    // and send them to the `tracing` subscriber.
    LogTracer::init()?;

    let is_prod = Environment::load()?.is_prod();

    // Set the default log level to `info` if not specified in the `RUST_LOG` environment variable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_flusher = if is_prod {
        configure_prod_tracing(filter, app_name)?
    } else {
        configure_dev_tracing(filter)?
    };

    set_tracing_panic_hook();

    // The returned flusher must outlive the application, otherwise buffered logs are lost.
    Ok(log_flusher)
}

/// Configures tracing for production environments.
///
/// Sets up structured JSON logging to rotating daily files with pipeline injection.
fn configure_prod_tracing(filter: EnvFilter, app_name: &str) -> Result<LogFlusher, TracingError> {
    let filename_suffix = "log";
    let log_dir = "logs";

    let file_appender = rolling::Builder::new()
        .filename_prefix(app_name)
        .filename_suffix(filename_suffix)
        // rotate the log file every day
        .rotation(rolling::Rotation::DAILY)
        // keep a maximum of 5 log files
        .max_log_files(5)
        .build(log_dir)?;

    let (file_appender, guard) = tracing_appender::non_blocking(file_appender);

    let format = fmt::format()
        .with_level(true)
        // ANSI colors are only for terminal output
        .with_ansi(false)
        .with_target(false);

    let pipeline_name = get_global_pipeline_name();
    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .event_format(format)
            .with_writer(move || {
                PipelineInjectingWriter::new(file_appender.make_writer(), pipeline_name)
            })
            .json()
            .with_current_span(true)
            .with_span_list(true),
    );

    set_global_default(subscriber)?;

    Ok(LogFlusher::Flusher(guard))
}

/// Configures tracing for development environments.
///
/// Sets up pretty-printed console logging with ANSI colors for readability.
fn configure_dev_tracing(filter: EnvFilter) -> Result<LogFlusher, TracingError> {
    let format = fmt::format()
        .with_level(true)
        .with_ansi(true)
        .pretty()
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let subscriber = FmtSubscriber::builder()
        .event_format(format)
        .with_env_filter(filter)
        .finish();

    set_global_default(subscriber)?;

    Ok(LogFlusher::NullFlusher)
}

/// Replaces the default panic hook so panics also reach the tracing subscriber, then calls the
/// previous hook.
fn set_tracing_panic_hook() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        panic_hook(info);
        prev_hook(info);
    }));
}

/// Logs panic payload, location and backtrace as a structured event.
fn panic_hook(panic_info: &PanicHookInfo) {
    let backtrace = Backtrace::capture();
    let (backtrace, note) = match backtrace.status() {
        BacktraceStatus::Captured => (Some(backtrace), None),
        BacktraceStatus::Disabled => (
            None,
            Some("run with RUST_BACKTRACE=1 to display backtraces"),
        ),
        BacktraceStatus::Unsupported => {
            (None, Some("backtraces are not supported on this platform"))
        }
        _ => (None, Some("backtrace status is unknown")),
    };

    let payload = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    };

    let location = panic_info.location().map(|location| location.to_string());

    tracing::error!(
        panic.payload = payload,
        payload.location = location,
        panic.backtrace = backtrace.map(display),
        panic.note = note,
        "a panic occurred",
    );
}
