//! src/logging.rs
//! ============================================================================
//! # Logger: sequenced file logging
//!
//! Installs a global `tracing` subscriber writing to a daily rolling file
//! (`<log_dir>/valkyrie.YYYY-MM-DD`). Every line carries a process-wide
//! sequence number: `000042 INFO  [src/fs/local_backend.rs:88 module] msg`.
//!
//! The terminal front-end owns stdout/stderr while a dialog is shown, so the
//! stderr layer is opt-in.

use crate::error::AppError;
use std::{
    fs,
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};
use tracing::Metadata;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::Directive,
    fmt::{
        self, FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "valkyrie";
const DEFAULT_DIRECTIVE: &str = "info";

static SEQ: AtomicUsize = AtomicUsize::new(1);

pub struct Logger;

impl Logger {
    /// Call **once** near the start of `main`.
    pub fn init_tracing(log_dir: &Path) -> Result<(), AppError> {
        Self::init_with(log_dir, false)
    }

    /// Like [`Logger::init_tracing`], additionally mirroring events to stderr.
    pub fn init_with(log_dir: &Path, with_stderr: bool) -> Result<(), AppError> {
        fs::create_dir_all(log_dir).map_err(|e| {
            AppError::Logging(format!("cannot create {}: {e}", log_dir.display()))
        })?;

        let file: RollingFileAppender = rolling::daily(log_dir, LOG_FILE_PREFIX);

        let file_layer = fmt::layer()
            .event_format(SeqFileMod)
            .with_writer(file)
            .with_ansi(false)
            .with_filter(env_filter()?);

        let stderr_layer = if with_stderr {
            Some(
                fmt::layer()
                    .event_format(SeqFileMod)
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_filter(env_filter()?),
            )
        } else {
            None
        };

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .try_init()
            .map_err(|e| AppError::Logging(e.to_string()))
    }
}

fn env_filter() -> Result<EnvFilter, AppError> {
    let directive: Directive = DEFAULT_DIRECTIVE
        .parse()
        .map_err(|e| AppError::Logging(format!("bad default directive: {e}")))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Custom formatter: `[SEQ] LEVEL [file:line mod::path] message`
struct SeqFileMod;

impl<S, N> FormatEvent<S, N> for SeqFileMod
where
    S: tracing::Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut w: Writer<'_>,
        ev: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let seq: usize = SEQ.fetch_add(1, Ordering::Relaxed);

        let meta: &'static Metadata<'static> = ev.metadata();
        write!(
            w,
            "{seq:06} {:5} [{}:{} {}] ",
            meta.level(),
            meta.file().unwrap_or("??"),
            meta.line().unwrap_or(0),
            meta.module_path().unwrap_or("???"),
        )?;

        ctx.field_format().format_fields(w.by_ref(), ev)?;
        writeln!(w)
    }
}
