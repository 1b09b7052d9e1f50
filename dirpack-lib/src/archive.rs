use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_zip::tokio::write::ZipFileWriter;
use futures::io::{AsyncReadExt as _, AsyncWriteExt as _};
use async_zip::{Compression, DeflateOption, ZipDateTime, ZipEntryBuilder};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Builder;
use tokio_util::compat::TokioAsyncReadCompatExt;

use crate::error::ArchiveError;
use crate::walk::{self, FileEntry};

/// Compression algorithm to use when creating the ZIP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compressor {
    #[default]
    Deflate,
    Stored,
}

impl FromStr for Compressor {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deflate" | "zip" => Ok(Self::Deflate),
            "stored" | "store" => Ok(Self::Stored),
            _ => Err(ArchiveError::InvalidOption {
                kind: "format",
                value: s.to_string(),
                expected: "deflate, stored",
            }),
        }
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deflate => "deflate",
            Self::Stored => "stored",
        })
    }
}

/// Deflate effort. Ignored for [`Compressor::Stored`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Fast,
    #[default]
    Normal,
    Maximum,
}

impl FromStr for Level {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "normal" => Ok(Self::Normal),
            "maximum" | "max" | "best" => Ok(Self::Maximum),
            _ => Err(ArchiveError::InvalidOption {
                kind: "level",
                value: s.to_string(),
                expected: "fast, normal, maximum",
            }),
        }
    }
}

impl From<Level> for DeflateOption {
    fn from(level: Level) -> Self {
        match level {
            Level::Fast => DeflateOption::Fast,
            Level::Normal => DeflateOption::Normal,
            Level::Maximum => DeflateOption::Maximum,
        }
    }
}

/// Receives progress while an archive is written.
pub trait Progress {
    /// Called after `name` has been written into the archive.
    fn entry(&mut self, name: &str);

    /// Called once the archive at `dest` is finalized.
    fn done(&mut self, dest: &Path);
}

/// Prints each entry name and a final `Done: <dest>` line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutProgress;

impl Progress for StdoutProgress {
    fn entry(&mut self, name: &str) {
        println!("{name}");
    }

    fn done(&mut self, dest: &Path) {
        println!("Done: {}", dest.display());
    }
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Progress for Silent {
    fn entry(&mut self, _name: &str) {}

    fn done(&mut self, _dest: &Path) {}
}

/// Collects progress lines, same text as [`StdoutProgress`] would print.
impl Progress for Vec<String> {
    fn entry(&mut self, name: &str) {
        self.push(name.to_string());
    }

    fn done(&mut self, dest: &Path) {
        self.push(format!("Done: {}", dest.display()));
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Number of entries written.
    pub entries: usize,
    /// Sum of the uncompressed sizes of all entries.
    pub bytes_in: u64,
    /// Size of the finalized archive file.
    pub archive_size: u64,
}

/// Packs one directory tree into one ZIP file.
#[derive(Debug, Clone)]
pub struct Archiver {
    source: PathBuf,
    dest: PathBuf,
    compressor: Compressor,
    level: Level,
}

impl Archiver {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            compressor: Compressor::default(),
            level: Level::default(),
        }
    }

    pub fn compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Runs the archiver to completion on a single-threaded runtime.
    ///
    /// This is the entrypoint for synchronous callers; use [`Archiver::run_async`]
    /// from inside an existing tokio runtime.
    pub fn run(&self, progress: &mut dyn Progress) -> Result<ArchiveSummary, ArchiveError> {
        let rt = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ArchiveError::io(&self.dest, e))?;

        rt.block_on(self.run_async(progress))
    }

    /// Walks the source tree and writes every file into a freshly created
    /// archive at the destination, one entry at a time.
    ///
    /// The source is checked before the destination is touched, so a missing
    /// source never creates or truncates the archive.
    pub async fn run_async(
        &self,
        progress: &mut dyn Progress,
    ) -> Result<ArchiveSummary, ArchiveError> {
        let files = self.files_to_archive()?;
        info!(
            "archiving {} files from {} into {} ({}, {:?})",
            files.len(),
            self.source.display(),
            self.dest.display(),
            self.compressor,
            self.level
        );

        let file = File::create(&self.dest)
            .await
            .map_err(|e| ArchiveError::io(&self.dest, e))?;
        let mut writer = ZipFileWriter::with_tokio(file);

        let mut bytes_in = 0;
        for fe in &files {
            bytes_in += self.write_entry(&mut writer, fe).await?;
            progress.entry(&fe.name_in_archive);
        }

        let mut file = writer
            .close()
            .await
            .map_err(|e| ArchiveError::zip(&self.dest, e))?
            .into_inner();
        file.flush()
            .await
            .map_err(|e| ArchiveError::io(&self.dest, e))?;
        let archive_size = file
            .metadata()
            .await
            .map_err(|e| ArchiveError::io(&self.dest, e))?
            .len();
        drop(file);

        info!(
            "wrote {} entries ({} bytes in, {} bytes out) to {}",
            files.len(),
            bytes_in,
            archive_size,
            self.dest.display()
        );
        progress.done(&self.dest);

        Ok(ArchiveSummary {
            entries: files.len(),
            bytes_in,
            archive_size,
        })
    }

    /// Lists the source tree, leaving out the destination itself when it
    /// already exists somewhere inside it.
    fn files_to_archive(&self) -> Result<Vec<FileEntry>, ArchiveError> {
        let mut files = walk::list_files(&self.source)?;
        if let Ok(dest) = self.dest.canonicalize() {
            files.retain(|fe| {
                let is_dest = fe.path.canonicalize().is_ok_and(|p| p == dest);
                if is_dest {
                    debug!("not archiving destination {}", fe.path.display());
                }
                !is_dest
            });
        }
        Ok(files)
    }

    /// Streams one file into the archive and returns its uncompressed size.
    async fn write_entry(
        &self,
        writer: &mut ZipFileWriter<File>,
        fe: &FileEntry,
    ) -> Result<u64, ArchiveError> {
        let source = File::open(&fe.path)
            .await
            .map_err(|e| ArchiveError::io(&fe.path, e))?;
        let meta = source
            .metadata()
            .await
            .map_err(|e| ArchiveError::io(&fe.path, e))?;

        let mut builder = ZipEntryBuilder::new(fe.name_in_archive.clone().into(), self.compression());
        if self.compressor == Compressor::Deflate {
            builder = builder.deflate_option(self.level.into());
        }
        if let Ok(modified) = meta.modified() {
            builder = builder.last_modification_date(ZipDateTime::from_chrono(
                &DateTime::<Utc>::from(modified),
            ));
        }

        let mut entry_writer = writer
            .write_entry_stream(builder)
            .await
            .map_err(|e| ArchiveError::zip(&self.dest, e))?;

        // read errors belong to the source file, write errors to the archive
        let mut reader = source.compat();
        let mut buf = vec![0u8; 64 * 1024];
        let mut copied = 0u64;
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ArchiveError::io(&fe.path, e)),
            };
            entry_writer
                .write_all(&buf[..n])
                .await
                .map_err(|e| ArchiveError::io(&self.dest, e))?;
            copied += n as u64;
        }
        entry_writer
            .close()
            .await
            .map_err(|e| ArchiveError::zip(&self.dest, e))?;

        debug!("{} -> {} ({copied} bytes)", fe.path.display(), fe.name_in_archive);
        Ok(copied)
    }

    fn compression(&self) -> Compression {
        match self.compressor {
            Compressor::Deflate => Compression::Deflate,
            Compressor::Stored => Compression::Stored,
        }
    }
}

/// Archives every file under `source_dir` into a new deflate ZIP at
/// `dest_path`, printing each entry name and a final `Done:` line to stdout.
pub fn archive(source_dir: &Path, dest_path: &Path) -> Result<ArchiveSummary, ArchiveError> {
    Archiver::new(source_dir, dest_path).run(&mut StdoutProgress)
}

/// Async form of [`archive`] for callers already inside a tokio runtime.
pub async fn archive_async(
    source_dir: &Path,
    dest_path: &Path,
) -> Result<ArchiveSummary, ArchiveError> {
    Archiver::new(source_dir, dest_path)
        .run_async(&mut StdoutProgress)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compressor_names() {
        assert_eq!("deflate".parse::<Compressor>().unwrap(), Compressor::Deflate);
        assert_eq!("Stored".parse::<Compressor>().unwrap(), Compressor::Stored);
        assert!("tar".parse::<Compressor>().is_err());
    }

    #[test]
    fn parses_levels() {
        assert_eq!("fast".parse::<Level>().unwrap(), Level::Fast);
        assert_eq!(" MAX ".parse::<Level>().unwrap(), Level::Maximum);
        assert!(matches!(
            "9".parse::<Level>(),
            Err(ArchiveError::InvalidOption { kind: "level", .. })
        ));
    }

    #[test]
    fn collected_progress_matches_stdout_text() {
        let mut lines = Vec::new();
        Progress::entry(&mut lines, "sub/b.txt");
        Progress::done(&mut lines, Path::new("/tmp/out.zip"));
        assert_eq!(lines, ["sub/b.txt", "Done: /tmp/out.zip"]);
    }
}
