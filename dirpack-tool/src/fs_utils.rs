use anyhow::{Context, Result};
use dirpack_lib::FileEntry;
use std::fs;

/// Sum of the sizes of all listed files.
pub fn total_size(files: &[FileEntry]) -> Result<u64> {
    let mut total: u64 = 0;
    for fe in files {
        let meta = fs::metadata(&fe.path)
            .with_context(|| format!("reading metadata of {}", fe.path.display()))?;
        total += meta.len();
    }
    Ok(total)
}

/// Convert bytes into a human-friendly string using binary (KiB, MiB, GiB...) units.
pub fn encode_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    // 1.0 MiB prints as 1 MiB
    if (size * 10.0).round() % 10.0 == 0.0 {
        format!("{:.0} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
