//! Operational logging for backup runs.
//!
//! Records go to stdout and, when `log.file` is set, to a size-rotated file.
//! Each line carries timestamp, level, target, source location and the span
//! of the component that emitted it. `RUST_LOG` overrides `log.level`.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::{DefaultFields, Format, Full};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::io::config::LogConfig;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Install the global subscriber. Call once, before any command runs.
///
/// # Example
/// ```bash
/// RUST_LOG=snapborg=debug snapborg --dry-run backup
/// ```
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("parse log level '{}'", config.level))?,
    };

    let stdout_layer = record_layer(io::stdout);
    let file_layer = match &config.file {
        Some(path) => Some(record_layer(RotatingFile::open(
            path,
            config.max_bytes,
            config.max_files,
        )?)),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;
    Ok(())
}

/// One line per record: timestamp, level, spans, target, file:line, message.
fn record_layer<S, W>(writer: W) -> fmt::Layer<S, DefaultFields, Format<Full, ChronoLocal>, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
}

/// Append-only log file that rolls over by size.
///
/// When a record would push the file past `max_bytes`, `<file>.N-1` becomes
/// `<file>.N` down to `<file>` becoming `<file>.1`, and a fresh file is
/// started. With `max_files == 0` the file grows without rotation.
#[derive(Debug)]
pub struct RotatingFile {
    state: Mutex<RotatingState>,
}

#[derive(Debug)]
struct RotatingState {
    path: PathBuf,
    max_bytes: u64,
    max_files: usize,
    file: File,
    size: u64,
}

impl RotatingFile {
    pub fn open(path: &Path, max_bytes: u64, max_files: usize) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log dir {}", parent.display()))?;
        }
        let file = open_append(path).with_context(|| format!("open log file {}", path.display()))?;
        let size = file
            .metadata()
            .with_context(|| format!("stat log file {}", path.display()))?
            .len();
        Ok(Self {
            state: Mutex::new(RotatingState {
                path: path.to_path_buf(),
                max_bytes,
                max_files,
                file,
                size,
            }),
        })
    }
}

impl RotatingState {
    fn write_record(&mut self, buf: &[u8]) -> io::Result<usize> {
        let incoming = buf.len() as u64;
        if self.max_files > 0 && self.size > 0 && self.size + incoming > self.max_bytes {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        for index in (1..self.max_files).rev() {
            let from = rotated_path(&self.path, index);
            if from.exists() {
                fs::rename(&from, rotated_path(&self.path, index + 1))?;
            }
        }
        fs::rename(&self.path, rotated_path(&self.path, 1))?;
        self.file = open_append(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn rotated_path(path: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Handle returned per record by [`RotatingFile`].
pub struct RotatingWriter<'a> {
    sink: &'a RotatingFile,
}

impl Write for RotatingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .sink
            .state
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        state.write_record(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .sink
            .state
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        state.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = RotatingWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingWriter { sink: self }
    }
}
