use std::path::Path;

use anyhow::{Context, Result};
use dirpack_lib::{Archiver, Config, Progress, Silent, StdoutProgress, list_files};

use crate::fs_utils::{encode_size, total_size};

/// Runs the merged configuration: either a dry-run listing or a real archive.
pub fn run(config: &Config) -> Result<()> {
    let source = Path::new(config.source.as_deref().unwrap_or_default());
    let output = Path::new(config.output.as_deref().unwrap_or_default());

    if config.dry == Some(true) {
        return dry_run(config, source, output);
    }

    let archiver = Archiver::new(source, output)
        .compressor(config.compressor()?)
        .level(config.level()?);

    let mut progress: Box<dyn Progress> = if config.quiet == Some(true) {
        Box::new(Silent)
    } else {
        Box::new(StdoutProgress)
    };

    let summary = archiver
        .run(progress.as_mut())
        .with_context(|| format!("archiving {} into {}", source.display(), output.display()))?;
    log::info!(
        "{} entries, {} -> {}",
        summary.entries,
        encode_size(summary.bytes_in),
        encode_size(summary.archive_size)
    );

    Ok(())
}

fn dry_run(config: &Config, source: &Path, output: &Path) -> Result<()> {
    println!("--- DRY RUN ---");
    println!("{}", serde_yaml::to_string(config)?);

    let entries = list_files(source).with_context(|| format!("listing {}", source.display()))?;
    let total = total_size(&entries)?;
    println!(
        "Would create {} with {} files",
        output.display(),
        entries.len()
    );
    println!("Total size: {}", encode_size(total));
    for fe in &entries {
        println!("  {} -> {}", fe.path.display(), fe.name_in_archive);
    }
    Ok(())
}
