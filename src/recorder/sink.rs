//! Output sinks
//!
//! A sink owns the writable stream behind one recording. Two variants exist:
//! a direct filesystem path and a permission-scoped content URI. Which one is
//! used is decided once, at open time, by the storage collaborator.

use crate::capture::traits::{AnnounceFlags, OutputRequest, OutputTarget, StorageResolver};
use crate::utils::error::{LoggerError, LoggerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where a recording was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OutputLocator {
    Path { path: PathBuf },
    ScopedUri { uri: String, file: Option<PathBuf> },
}

impl OutputLocator {
    /// Concrete file behind this locator, when known
    pub fn file(&self) -> Option<&Path> {
        match self {
            OutputLocator::Path { path } => Some(path),
            OutputLocator::ScopedUri { file, .. } => file.as_deref(),
        }
    }
}

impl fmt::Display for OutputLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputLocator::Path { path } => write!(f, "{}", path.display()),
            OutputLocator::ScopedUri { uri, .. } => f.write_str(uri),
        }
    }
}

/// Writable destination for CSV lines
pub trait OutputSink: Send {
    /// Append one complete line
    fn append(&mut self, line: &str) -> LoggerResult<()>;

    /// Flush buffered data and close the stream. Later calls are no-ops.
    fn flush_and_close(&mut self) -> LoggerResult<()>;

    /// Close and discard a sink that never became part of a recording
    fn abandon(&mut self) {
        if let Err(e) = self.flush_and_close() {
            tracing::warn!("Failed to close abandoned output {}: {}", self.locator(), e);
        }
    }

    fn locator(&self) -> &OutputLocator;

    fn is_closed(&self) -> bool;
}

/// Buffered line writer that can be closed exactly once
struct LineWriter<W: Write> {
    inner: Option<BufWriter<W>>,
}

impl<W: Write> LineWriter<W> {
    fn new(writer: W, capacity: usize) -> Self {
        Self {
            inner: Some(BufWriter::with_capacity(capacity, writer)),
        }
    }

    fn append(&mut self, line: &str) -> LoggerResult<()> {
        let writer = self.inner.as_mut().ok_or_else(|| {
            LoggerError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "sink is closed"))
        })?;
        writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn close(&mut self) -> LoggerResult<()> {
        match self.inner.take() {
            Some(writer) => {
                let mut stream = writer.into_inner().map_err(|e| e.into_error())?;
                stream.flush()?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

/// Sink writing straight to a filesystem path
pub struct DirectPathSink {
    writer: LineWriter<File>,
    locator: OutputLocator,
}

impl DirectPathSink {
    /// Create (or truncate) the file at `path`
    pub fn create(path: PathBuf, capacity: usize) -> LoggerResult<Self> {
        let file = File::create(&path).map_err(|e| {
            LoggerError::OpenFailure(format!("{}: {}", path.display(), e))
        })?;
        tracing::debug!("Opened output file: {:?}", path);
        Ok(Self {
            writer: LineWriter::new(file, capacity),
            locator: OutputLocator::Path { path },
        })
    }
}

impl OutputSink for DirectPathSink {
    fn append(&mut self, line: &str) -> LoggerResult<()> {
        self.writer.append(line)
    }

    fn flush_and_close(&mut self) -> LoggerResult<()> {
        self.writer.close()
    }

    fn abandon(&mut self) {
        // Close the stream, then remove the half-written file
        self.writer.inner = None;
        if let OutputLocator::Path { path } = &self.locator {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("Failed to remove abandoned output {:?}: {}", path, e);
            }
        }
    }

    fn locator(&self) -> &OutputLocator {
        &self.locator
    }

    fn is_closed(&self) -> bool {
        self.writer.is_closed()
    }
}

/// Sink writing to a descriptor resolved from a scoped URI
pub struct ScopedUriSink {
    writer: LineWriter<Box<dyn Write + Send>>,
    locator: OutputLocator,
}

impl ScopedUriSink {
    /// Resolve `uri` to a writable descriptor
    pub fn open(storage: &dyn StorageResolver, uri: String, capacity: usize) -> LoggerResult<Self> {
        let stream = storage
            .open_uri_for_write(&uri)?
            .ok_or_else(|| LoggerError::ResolutionFailure(format!("no descriptor for {}", uri)))?;
        let file = storage.resolve_uri_to_file(&uri);
        tracing::debug!("Opened output uri: {} (file: {:?})", uri, file);
        Ok(Self {
            writer: LineWriter::new(stream, capacity),
            locator: OutputLocator::ScopedUri { uri, file },
        })
    }
}

impl OutputSink for ScopedUriSink {
    fn append(&mut self, line: &str) -> LoggerResult<()> {
        self.writer.append(line)
    }

    fn flush_and_close(&mut self) -> LoggerResult<()> {
        self.writer.close()
    }

    fn abandon(&mut self) {
        self.writer.inner = None;
        if let Some(file) = self.locator.file() {
            if let Err(e) = std::fs::remove_file(file) {
                tracing::warn!("Failed to remove abandoned output {:?}: {}", file, e);
            }
        }
    }

    fn locator(&self) -> &OutputLocator {
        &self.locator
    }

    fn is_closed(&self) -> bool {
        self.writer.is_closed()
    }
}

/// Ask the storage collaborator for a new output and open the matching sink.
///
/// The new file is announced to the media index once the sink is open. If
/// the output was created but cannot be opened, it is discarded again.
pub fn open_sink(
    storage: &dyn StorageResolver,
    request: &OutputRequest,
    capacity: usize,
) -> LoggerResult<Box<dyn OutputSink>> {
    let target = storage.create_output(request)?;
    let opened: LoggerResult<Box<dyn OutputSink>> = match &target {
        OutputTarget::File(path) => DirectPathSink::create(path.clone(), capacity).map(|sink| {
            storage.announce_new_file(path, AnnounceFlags::direct_raw_sensor());
            Box::new(sink) as Box<dyn OutputSink>
        }),
        OutputTarget::ScopedUri(uri) => {
            ScopedUriSink::open(storage, uri.clone(), capacity).map(|sink| {
                match sink.locator().file() {
                    Some(file) => {
                        storage.announce_new_file(file, AnnounceFlags::scoped_raw_sensor())
                    }
                    None => {
                        tracing::warn!("Could not resolve {} to a file to announce", sink.locator())
                    }
                }
                Box::new(sink) as Box<dyn OutputSink>
            })
        }
    };
    if opened.is_err() {
        storage.discard_output(&target);
    }
    opened
}
