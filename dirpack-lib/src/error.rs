use std::io;
use std::path::{Path, PathBuf};

use async_zip::error::ZipError;
use thiserror::Error;

/// Everything that can abort an archive run. Nothing is retried; the first
/// error ends the run and any partially written archive stays on disk.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("source is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("permission denied: {}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("i/o error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write zip archive {}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("unknown {kind} '{value}' (expected one of: {expected})")]
    InvalidOption {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl ArchiveError {
    /// Classifies an I/O failure on `path` by its kind.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::Io { path, source },
        }
    }

    pub fn zip(path: impl AsRef<Path>, source: ZipError) -> Self {
        match source {
            ZipError::UpstreamReadError(e) => Self::io(path, e),
            source => Self::Zip {
                path: path.as_ref().to_path_buf(),
                source,
            },
        }
    }

    pub(crate) fn walk(err: walkdir::Error) -> Self {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
        match err.into_io_error() {
            Some(source) => Self::io(path, source),
            // only reachable through a filesystem loop
            None => Self::Io {
                path,
                source: io::Error::other("filesystem loop detected"),
            },
        }
    }
}
