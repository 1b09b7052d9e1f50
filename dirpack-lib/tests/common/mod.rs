use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use async_zip::tokio::read::fs::ZipFileReader;

/// Reads every entry of the archive at `path` into a name -> bytes map.
pub fn read_archive(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    rt.block_on(async {
        let reader = ZipFileReader::new(path).await.unwrap();
        let mut out = BTreeMap::new();
        for index in 0..reader.file().entries().len() {
            let name = reader.file().entries()[index]
                .filename()
                .as_str()
                .unwrap()
                .to_string();
            let mut entry = reader.reader_with_entry(index).await.unwrap();
            let mut buf = Vec::new();
            entry.read_to_end_checked(&mut buf).await.unwrap();
            out.insert(name, buf);
        }
        out
    })
}

/// Raw entry names in central-directory order, duplicates included.
pub fn entry_names(path: &Path) -> Vec<String> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    rt.block_on(async {
        let reader = ZipFileReader::new(path).await.unwrap();
        reader
            .file()
            .entries()
            .iter()
            .map(|e| e.filename().as_str().unwrap().to_string())
            .collect()
    })
}

/// Creates each `(relative path, contents)` pair under `root`.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
}
