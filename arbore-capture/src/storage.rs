//! Scan directory lifecycle.
//!
//! ```text
//! {documents}/Scans/
//! └── 2026-10-17T09:41:07.123Z/
//!     ├── Images/   captured photos
//!     └── Models/   reconstruction output (model.glb)
//! ```
//!
//! Every capture attempt gets its own timestamped directory. Old directories
//! are never touched again.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{CaptureError, CaptureResult};

/// Folder under the documents root holding all scans.
pub const SCANS_DIR: &str = "Scans";
/// Photo folder inside a scan.
pub const IMAGES_DIR: &str = "Images";
/// Output folder inside a scan.
pub const MODELS_DIR: &str = "Models";
/// Reconstruction output file name.
pub const MODEL_FILE: &str = "model.glb";

/// Give up suffixing after this many same-millisecond collisions.
const MAX_SUFFIX: u32 = 1000;

/// One capture attempt's directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDirectory {
    /// `{documents}/Scans/{timestamp}`.
    pub root: PathBuf,
    /// Where the capture session writes photos.
    pub images: PathBuf,
    /// Where reconstruction writes its output.
    pub models: PathBuf,
}

impl ScanDirectory {
    /// Expected reconstruction output.
    #[must_use]
    pub fn model_output(&self) -> PathBuf {
        self.models.join(MODEL_FILE)
    }

    /// Directory name (the timestamp, possibly suffixed).
    #[must_use]
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Creates scan directories under a documents root.
#[derive(Debug, Clone)]
pub struct ScanStorage {
    scans_root: PathBuf,
}

impl ScanStorage {
    /// Storage rooted at `{documents}/Scans`.
    #[must_use]
    pub fn new(documents: impl AsRef<Path>) -> Self {
        Self {
            scans_root: documents.as_ref().join(SCANS_DIR),
        }
    }

    /// The `Scans` folder.
    #[must_use]
    pub fn scans_root(&self) -> &Path {
        &self.scans_root
    }

    /// Create a fresh directory named after the current time.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Storage`] if any directory cannot be created.
    pub fn create_session_dir(&self) -> CaptureResult<ScanDirectory> {
        self.create_session_dir_at(Utc::now())
    }

    /// Create a fresh directory named after `now`.
    ///
    /// If the name is taken, `-1`, `-2`, ... is appended.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Storage`] if any directory cannot be created.
    pub fn create_session_dir_at(&self, now: DateTime<Utc>) -> CaptureResult<ScanDirectory> {
        std::fs::create_dir_all(&self.scans_root).map_err(|source| CaptureError::Storage {
            path: self.scans_root.clone(),
            source,
        })?;

        let stamp = iso8601(now);
        let mut root = self.scans_root.join(&stamp);
        let mut suffix = 0;
        loop {
            match std::fs::create_dir(&root) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && suffix < MAX_SUFFIX => {
                    suffix += 1;
                    root = self.scans_root.join(format!("{stamp}-{suffix}"));
                }
                Err(source) => return Err(CaptureError::Storage { path: root, source }),
            }
        }

        let dir = ScanDirectory {
            images: root.join(IMAGES_DIR),
            models: root.join(MODELS_DIR),
            root,
        };
        for path in [&dir.images, &dir.models] {
            std::fs::create_dir_all(path).map_err(|source| CaptureError::Storage {
                path: path.clone(),
                source,
            })?;
        }
        tracing::info!("Created scan directory {}", dir.root.display());
        Ok(dir)
    }
}

/// UTC timestamp with milliseconds, e.g. `2026-10-17T09:41:07.123Z`.
#[must_use]
pub fn iso8601(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).expect("in range")
    }

    #[test]
    fn test_iso8601_known_instants() {
        assert_eq!(iso8601(at_millis(0)), "1970-01-01T00:00:00.000Z");
        assert_eq!(iso8601(at_millis(1_709_210_096_789)), "2024-02-29T12:34:56.789Z");
    }

    #[test]
    fn test_layout() {
        let docs = tempfile::tempdir().expect("tempdir");
        let storage = ScanStorage::new(docs.path());
        let dir = storage.create_session_dir().expect("create");
        assert!(dir.root.starts_with(docs.path().join("Scans")));
        assert!(dir.images.is_dir());
        assert!(dir.models.is_dir());
        assert_eq!(dir.model_output(), dir.models.join("model.glb"));
    }

    #[test]
    fn test_same_instant_gets_suffix() {
        let docs = tempfile::tempdir().expect("tempdir");
        let storage = ScanStorage::new(docs.path());
        let now = at_millis(1_000_000_000);
        let a = storage.create_session_dir_at(now).expect("first");
        let b = storage.create_session_dir_at(now).expect("second");
        assert_ne!(a.root, b.root);
        assert_eq!(b.name(), format!("{}-1", a.name()));
    }

    #[test]
    fn test_unwritable_root_is_storage_error() {
        let docs = tempfile::tempdir().expect("tempdir");
        let blocker = docs.path().join("file");
        std::fs::write(&blocker, b"x").expect("write");
        let storage = ScanStorage::new(&blocker);
        assert!(matches!(
            storage.create_session_dir(),
            Err(CaptureError::Storage { .. })
        ));
    }
}
