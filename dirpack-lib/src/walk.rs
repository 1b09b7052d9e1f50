use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::ArchiveError;

/// Represents a file to include in the ZIP archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name_in_archive: String,
}

/// Recursively lists every file under `source_dir` together with the name it
/// gets inside the archive.
///
/// Siblings are visited in file-name order. Symlinks that resolve to a file
/// are listed (the archive stores the target's content); symlinked
/// directories are not descended into.
pub fn list_files(source_dir: &Path) -> Result<Vec<FileEntry>, ArchiveError> {
    check_source(source_dir)?;

    let mut result = Vec::new();
    for entry in WalkDir::new(source_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(ArchiveError::walk)?;

        if entry.file_type().is_dir() {
            debug!("visiting {}", entry.path().display());
            continue;
        }
        if !is_archivable(&entry) {
            debug!("skipping {}", entry.path().display());
            continue;
        }

        let name_in_archive = entry_name(source_dir, entry.path());
        result.push(FileEntry {
            path: entry.into_path(),
            name_in_archive,
        });
    }

    Ok(result)
}

/// Fails unless `source_dir` exists and is a directory.
pub(crate) fn check_source(source_dir: &Path) -> Result<(), ArchiveError> {
    let meta = fs::metadata(source_dir).map_err(|e| ArchiveError::io(source_dir, e))?;
    if !meta.is_dir() {
        return Err(ArchiveError::NotADirectory(source_dir.to_path_buf()));
    }
    Ok(())
}

fn is_archivable(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    file_type.is_symlink()
        && fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false)
}

/// Name of `path` inside an archive rooted at `root`: the path relative to
/// `root` with every component joined by `/`.
///
/// Only real separators are rewritten. On unix a `\` inside a file name is
/// an ordinary character and stays in the name.
pub fn entry_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn entry_name_uses_forward_slashes() {
        let root = Path::new("/srv/dist");
        let path = root.join("assets").join("js").join("app.js");
        assert_eq!(entry_name(root, &path), "assets/js/app.js");
    }

    #[test]
    fn entry_name_of_top_level_file() {
        let root = Path::new("dist");
        assert_eq!(entry_name(root, &root.join("index.html")), "index.html");
    }

    #[cfg(unix)]
    #[test]
    fn entry_name_keeps_backslash_inside_unix_file_name() {
        let root = Path::new("root");
        assert_eq!(entry_name(root, &root.join("a\\b.txt")), "a\\b.txt");
        assert_eq!(entry_name(root, &root.join("a").join("b.txt")), "a/b.txt");
    }

    #[cfg(windows)]
    #[test]
    fn entry_name_rewrites_windows_separators() {
        let root = Path::new(r"C:\dist");
        assert_eq!(entry_name(root, Path::new(r"C:\dist\a\b.txt")), "a/b.txt");
    }

    #[cfg(unix)]
    #[test]
    fn backslash_file_name_does_not_collide_with_nested_path() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/b.txt"), b"nested").unwrap();
        fs::write(dir.path().join("a\\b.txt"), b"flat").unwrap();

        let names: Vec<_> = list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name_in_archive)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a/b.txt".to_string()));
        assert!(names.contains(&"a\\b.txt".to_string()));
    }

    #[test]
    fn lists_nested_files_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"b").unwrap();
        fs::write(dir.path().join("sub/deeper/c.bin"), [0u8, 1, 2]).unwrap();

        let names: Vec<_> = list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name_in_archive)
            .collect();
        assert_eq!(names, ["a.txt", "sub/b.txt", "sub/deeper/c.bin"]);
    }

    #[test]
    fn missing_source_is_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(list_files(&missing), Err(ArchiveError::NotFound(p)) if p == missing));
    }

    #[test]
    fn file_as_source_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(list_files(&file), Err(ArchiveError::NotADirectory(_))));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_listed_and_dirs_are_not_descended() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("target.txt"), b"t").unwrap();
        fs::write(outside.path().join("inner.txt"), b"i").unwrap();
        symlink(outside.path().join("target.txt"), dir.path().join("link.txt")).unwrap();
        symlink(outside.path(), dir.path().join("linkdir")).unwrap();

        let names: Vec<_> = list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name_in_archive)
            .collect();
        assert_eq!(names, ["link.txt"]);
    }
}
