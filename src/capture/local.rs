//! Filesystem storage backend
//!
//! Resolves capture output requests to files under a root directory, either
//! handing out plain paths or `content://` style scoped URIs that map back to
//! those files.

use super::traits::{AnnounceFlags, OutputRequest, OutputTarget, StorageResolver};
use crate::utils::error::{LoggerError, LoggerResult};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// How `LocalStorage` exposes new outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    Direct,
    Scoped { authority: String },
}

/// A new-file announcement recorded for the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub path: PathBuf,
    pub flags: AnnounceFlags,
}

/// Storage collaborator backed by a local directory
pub struct LocalStorage {
    root: PathBuf,
    prefix: String,
    mode: StorageMode,
    announcements: Mutex<Vec<Announcement>>,
}

impl LocalStorage {
    /// Hand out direct filesystem paths under `root`
    pub fn direct(root: impl Into<PathBuf>) -> Self {
        Self::new(root.into(), StorageMode::Direct)
    }

    /// Hand out scoped URIs under `authority` that map into `root`
    pub fn scoped(root: impl Into<PathBuf>, authority: impl Into<String>) -> Self {
        Self::new(
            root.into(),
            StorageMode::Scoped {
                authority: authority.into(),
            },
        )
    }

    fn new(root: PathBuf, mode: StorageMode) -> Self {
        Self {
            root,
            prefix: String::new(),
            mode,
            announcements: Mutex::new(Vec::new()),
        }
    }

    /// Prefix prepended to every file name (e.g. `"VID_"`).
    ///
    /// Outputs always live directly under the root, so path separators are
    /// rejected.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> LoggerResult<Self> {
        let prefix = prefix.into();
        if prefix.contains(['/', '\\']) {
            return Err(LoggerError::Config(format!(
                "file name prefix {:?} must not contain path separators",
                prefix
            )));
        }
        self.prefix = prefix;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> &StorageMode {
        &self.mode
    }

    /// Announcements made so far, oldest first
    pub fn announcements(&self) -> Vec<Announcement> {
        self.announcements.lock().clone()
    }

    fn stem_for(&self, request: &OutputRequest) -> String {
        format!(
            "{}{}_{}",
            self.prefix,
            request.session_time.format("%Y%m%d_%H%M%S"),
            request.sensor_name
        )
    }

    /// Deterministic file name for a request, without collision suffix
    pub fn file_name_for(&self, request: &OutputRequest) -> String {
        format!("{}.{}", self.stem_for(request), request.extension)
    }

    /// Create a new empty file for `request`, adding `_N` on name collisions
    fn reserve_file(&self, request: &OutputRequest) -> LoggerResult<PathBuf> {
        fs::create_dir_all(&self.root).map_err(|e| {
            LoggerError::OpenFailure(format!("{}: {}", self.root.display(), e))
        })?;

        let stem = self.stem_for(request);

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}.{}", stem, request.extension)
            } else {
                format!("{}_{}.{}", stem, attempt, request.extension)
            };
            let path = self.root.join(&name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(LoggerError::OpenFailure(format!("{}: {}", path.display(), e)))
                }
            }
        }
    }

    fn uri_prefix(authority: &str) -> String {
        format!("content://{}/document/", authority)
    }

    fn uri_for(&self, authority: &str, path: &Path) -> LoggerResult<String> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| LoggerError::OpenFailure(format!("{:?} is outside storage root", path)))?;
        let relative = relative.to_string_lossy();
        Ok(format!(
            "{}{}",
            Self::uri_prefix(authority),
            urlencoding::encode(&relative)
        ))
    }

    fn path_for_uri(&self, uri: &str) -> Option<PathBuf> {
        let StorageMode::Scoped { authority } = &self.mode else {
            return None;
        };
        let encoded = uri.strip_prefix(&Self::uri_prefix(authority))?;
        let name = urlencoding::decode(encoded).ok()?;
        // Only plain file names directly under the root are ever handed out
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return None;
        }
        Some(self.root.join(&*name))
    }
}

impl StorageResolver for LocalStorage {
    fn create_output(&self, request: &OutputRequest) -> LoggerResult<OutputTarget> {
        let path = self.reserve_file(request)?;
        tracing::debug!(
            "Created {} output: {:?}",
            request.category.as_str(),
            path
        );
        match &self.mode {
            StorageMode::Direct => Ok(OutputTarget::File(path)),
            StorageMode::Scoped { authority } => {
                Ok(OutputTarget::ScopedUri(self.uri_for(authority, &path)?))
            }
        }
    }

    fn open_uri_for_write(&self, uri: &str) -> LoggerResult<Option<Box<dyn Write + Send>>> {
        let Some(path) = self.path_for_uri(uri) else {
            return Ok(None);
        };
        match OpenOptions::new().write(true).truncate(true).open(&path) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LoggerError::ResolutionFailure(format!("{}: {}", uri, e))),
        }
    }

    fn resolve_uri_to_file(&self, uri: &str) -> Option<PathBuf> {
        self.path_for_uri(uri)
    }

    fn announce_new_file(&self, file: &Path, flags: AnnounceFlags) {
        tracing::debug!("Announcing new file {:?} ({:?})", file, flags);
        self.announcements.lock().push(Announcement {
            path: file.to_path_buf(),
            flags,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::traits::MediaCategory;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn request() -> OutputRequest {
        OutputRequest {
            category: MediaCategory::RawSensorInfo,
            sensor_name: "gps".to_string(),
            extension: "csv".to_string(),
            session_time: Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap(),
        }
    }

    #[test]
    fn test_deterministic_name() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::direct(dir.path()).with_prefix("VID_").unwrap();
        assert_eq!(storage.file_name_for(&request()), "VID_20240309_143005_gps.csv");

        match storage.create_output(&request()).unwrap() {
            OutputTarget::File(path) => {
                assert_eq!(path, dir.path().join("VID_20240309_143005_gps.csv"));
                assert!(path.exists());
            }
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[test]
    fn test_collisions_get_suffix() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::direct(dir.path());
        let first = storage.create_output(&request()).unwrap();
        let second = storage.create_output(&request()).unwrap();
        assert_ne!(first, second);
        assert_eq!(
            second,
            OutputTarget::File(dir.path().join("20240309_143005_gps_1.csv"))
        );
    }

    #[test]
    fn test_scoped_uri_round_trip() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::scoped(dir.path(), "org.example.docs")
            .with_prefix("IMG 1_")
            .unwrap();
        let OutputTarget::ScopedUri(uri) = storage.create_output(&request()).unwrap() else {
            panic!("expected scoped uri");
        };
        assert_eq!(
            uri,
            "content://org.example.docs/document/IMG%201_20240309_143005_gps.csv"
        );

        let file = storage.resolve_uri_to_file(&uri).unwrap();
        assert_eq!(file, dir.path().join("IMG 1_20240309_143005_gps.csv"));

        let mut stream = storage.open_uri_for_write(&uri).unwrap().unwrap();
        stream.write_all(b"hello\n").unwrap();
        drop(stream);
        assert_eq!(fs::read_to_string(file).unwrap(), "hello\n");
    }

    #[test]
    fn test_unknown_uri_has_no_descriptor() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::scoped(dir.path(), "org.example.docs");
        assert!(storage
            .open_uri_for_write("content://org.example.docs/document/missing.csv")
            .unwrap()
            .is_none());
        assert!(storage
            .open_uri_for_write("content://other/document/x.csv")
            .unwrap()
            .is_none());
        assert!(storage
            .resolve_uri_to_file("content://org.example.docs/document/..%2Fescape.csv")
            .is_none());
        assert!(storage
            .resolve_uri_to_file("content://org.example.docs/document/.")
            .is_none());
        assert!(storage
            .resolve_uri_to_file("content://org.example.docs/document/..")
            .is_none());
    }

    #[test]
    fn test_prefix_with_separator_is_rejected() {
        let dir = tempdir().unwrap();
        for prefix in ["sub/", "a\\b_"] {
            let err = LocalStorage::scoped(dir.path(), "org.example.docs")
                .with_prefix(prefix)
                .err()
                .unwrap();
            assert_eq!(err.code(), "CONFIG_ERROR");
        }
    }

    #[test]
    fn test_direct_storage_does_not_resolve_uris() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::direct(dir.path());
        assert!(storage
            .resolve_uri_to_file("content://any/document/x.csv")
            .is_none());
    }
}
