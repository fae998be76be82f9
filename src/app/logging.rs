//! Logging setup: console output plus a per-session log file

use crate::app::config::AppConfig;
use crate::session::SessionId;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const SESSION_LOG_FILTER: &str = "tabflow=info";

/// Log file writer that can be pointed at another session's file
///
/// Until [`SessionLogWriter::switch_to`] succeeds, writes are discarded.
#[derive(Clone, Default)]
pub struct SessionLogWriter {
    inner: Arc<Mutex<Option<SessionLogFile>>>,
}

struct SessionLogFile {
    path: PathBuf,
    file: File,
}

impl SessionLogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append subsequent log lines to `<dir>/<session-id>.log`
    pub fn switch_to(&self, dir: &Path, session: &SessionId) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", session));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut guard = self.lock()?;
        if let Some(previous) = guard.as_mut() {
            let _ = previous.file.flush();
        }
        *guard = Some(SessionLogFile {
            path: path.clone(),
            file,
        });
        Ok(path)
    }

    /// File currently receiving log lines
    pub fn current_path(&self) -> Option<PathBuf> {
        self.lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|f| f.path.clone()))
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, Option<SessionLogFile>>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("session log lock poisoned"))
    }
}

pub struct SessionLogGuard {
    inner: Arc<Mutex<Option<SessionLogFile>>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SessionLogWriter {
    type Writer = SessionLogGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SessionLogGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SessionLogGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("session log lock poisoned"))?;
        match guard.as_mut() {
            Some(log) => log.file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("session log lock poisoned"))?;
        match guard.as_mut() {
            Some(log) => log.file.flush(),
            None => Ok(()),
        }
    }
}

/// Initialize tracing for the process
///
/// Console verbosity follows `-v`; `RUST_LOG` overrides the session file
/// filter. Returns the writer used for session files when enabled.
pub fn init_logging(config: &AppConfig) -> Result<Option<SessionLogWriter>> {
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.verbose >= 2)
        .with_thread_ids(config.verbose >= 3)
        .with_line_number(config.verbose >= 3)
        .with_filter(EnvFilter::new(config.log_level()));

    let writer = config.session_logs.then(SessionLogWriter::new);
    let file_layer = writer.clone().map(|writer| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(SESSION_LOG_FILTER));
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(filter)
    });

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    debug!("tabflow started with verbosity level: {}", config.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    Ok(writer)
}
