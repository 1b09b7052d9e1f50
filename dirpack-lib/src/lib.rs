use serde::{Deserialize, Serialize};

pub mod archive;
pub mod error;
pub mod walk;

pub use archive::{
    ArchiveSummary, Archiver, Compressor, Level, Progress, Silent, StdoutProgress, archive,
    archive_async,
};
pub use error::ArchiveError;
pub use walk::{FileEntry, entry_name, list_files};

/// Settings shared by every configuration layer (env, file, CLI).
/// Every field is optional so layers can be merged field by field.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub source: Option<String>,
    pub output: Option<String>,
    pub config: Option<String>,
    pub format: Option<String>,
    pub level: Option<String>,
    pub dry: Option<bool>,
    pub quiet: Option<bool>,
}

impl Config {
    /// Merge configs by priority: env < file < cli
    pub fn merge(env: Config, file: Config, cli: Config) -> Config {
        fn pick<T>(env: Option<T>, file: Option<T>, cli: Option<T>) -> Option<T> {
            cli.or(file).or(env)
        }

        Config {
            source: pick(env.source, file.source, cli.source),
            output: pick(env.output, file.output, cli.output),
            config: pick(env.config, file.config, cli.config),
            format: pick(env.format, file.format, cli.format),
            level: pick(env.level, file.level, cli.level),
            dry: pick(env.dry, file.dry, cli.dry),
            quiet: pick(env.quiet, file.quiet, cli.quiet),
        }
    }

    /// Compression method, defaulting to deflate.
    pub fn compressor(&self) -> Result<Compressor, ArchiveError> {
        self.format.as_deref().map_or(Ok(Compressor::default()), str::parse)
    }

    /// Deflate level, defaulting to normal.
    pub fn level(&self) -> Result<Level, ArchiveError> {
        self.level.as_deref().map_or(Ok(Level::default()), str::parse)
    }
}
