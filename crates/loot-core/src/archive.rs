//! Uniform read access to a root of namespaced data
//!
//! A datapack, mod jar or the vanilla game jar all expose the same
//! `data/<namespace>/...` layout. [`ArchiveView`] hides whether that layout is
//! backed by a real directory ([`DirView`]) or a zip archive ([`ZipView`]).
//! Views are opened, scanned and dropped within a single discovery step.
//!
//! Paths inside a view are relative and `/`-separated; `""` is the root.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::ZipArchive;

/// A child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File or directory name (no path separators)
    pub name: String,
    pub is_dir: bool,
}

/// Read-only view over a tree of files
pub trait ArchiveView {
    /// The directory or archive file backing this view
    fn container(&self) -> &Path;

    /// True when members live inside an archive rather than on disk
    fn is_archive(&self) -> bool;

    /// Children of `dir`, sorted by name
    fn list(&self, dir: &str) -> Result<Vec<ArchiveEntry>>;

    fn is_dir(&self, path: &str) -> bool;

    fn is_file(&self, path: &str) -> bool;

    /// Open a member for reading
    fn open(&mut self, path: &str) -> Result<Box<dyn Read + '_>>;

    fn exists(&self, path: &str) -> bool {
        self.is_dir(path) || self.is_file(path)
    }

    /// Every file below `dir`, recursively, sorted
    fn walk_files(&self, dir: &str) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut pending = vec![normalize(dir)];
        while let Some(current) = pending.pop() {
            for entry in self.list(&current)? {
                let child = join(&current, &entry.name);
                if entry.is_dir {
                    pending.push(child);
                } else {
                    files.push(child);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read a whole member into memory
    fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut reader = self.open(path)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Join a view-relative directory and a child name
pub fn join(dir: &str, name: &str) -> String {
    let dir = normalize(dir);
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Strip leading/trailing separators and convert `\` to `/`
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

/// A real directory on disk
#[derive(Debug, Clone)]
pub struct DirView {
    root: PathBuf,
}

impl DirView {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute on-disk location of a view-relative path
    pub fn resolve(&self, path: &str) -> PathBuf {
        normalize(path)
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

impl ArchiveView for DirView {
    fn container(&self) -> &Path {
        &self.root
    }

    fn is_archive(&self) -> bool {
        false
    }

    fn list(&self, dir: &str) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(dir))? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            entries.push(ArchiveEntry {
                name,
                is_dir: entry.path().is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.resolve(path).is_dir()
    }

    fn is_file(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn open(&mut self, path: &str) -> Result<Box<dyn Read + '_>> {
        let full = self.resolve(path);
        let file = File::open(&full).map_err(|e| Error::FileRead {
            path: full,
            source: e,
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn walk_files(&self, dir: &str) -> Result<Vec<String>> {
        let start = self.resolve(dir);
        let mut files = Vec::new();
        for entry in WalkDir::new(&start)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                files.push(normalize(&relative.to_string_lossy()));
            }
        }
        files.sort();
        Ok(files)
    }
}

/// A zip or jar archive
///
/// The directory structure is derived from member names, so archives that
/// omit explicit directory entries still list correctly.
pub struct ZipView {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    /// normalized member name -> raw name stored in the archive
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
}

impl ZipView {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| Error::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let archive = ZipArchive::new(BufReader::new(file))?;

        let mut files = BTreeMap::new();
        let mut dirs = BTreeSet::new();
        dirs.insert(String::new());
        for raw in archive.file_names() {
            let name = normalize(raw);
            if name.is_empty() {
                continue;
            }
            if raw.ends_with('/') {
                insert_with_ancestors(&mut dirs, &name);
            } else {
                if let Some((parent, _)) = name.rsplit_once('/') {
                    insert_with_ancestors(&mut dirs, parent);
                }
                files.insert(name, raw.to_string());
            }
        }

        Ok(Self {
            path,
            archive,
            files,
            dirs,
        })
    }
}

fn insert_with_ancestors(dirs: &mut BTreeSet<String>, dir: &str) {
    let mut current = dir;
    loop {
        if !dirs.insert(current.to_string()) {
            return;
        }
        match current.rsplit_once('/') {
            Some((parent, _)) => current = parent,
            None => return,
        }
    }
}

/// Name of `path` relative to `dir` when it is a direct child
fn direct_child<'a>(dir: &str, path: &'a str) -> Option<&'a str> {
    let rest = if dir.is_empty() {
        path
    } else {
        path.strip_prefix(dir)?.strip_prefix('/')?
    };
    (!rest.is_empty() && !rest.contains('/')).then_some(rest)
}

impl ArchiveView for ZipView {
    fn container(&self) -> &Path {
        &self.path
    }

    fn is_archive(&self) -> bool {
        true
    }

    fn list(&self, dir: &str) -> Result<Vec<ArchiveEntry>> {
        let dir = normalize(dir);
        let mut entries: Vec<ArchiveEntry> = self
            .dirs
            .iter()
            .filter_map(|d| direct_child(&dir, d))
            .map(|name| ArchiveEntry {
                name: name.to_string(),
                is_dir: true,
            })
            .chain(
                self.files
                    .keys()
                    .filter_map(|f| direct_child(&dir, f))
                    .map(|name| ArchiveEntry {
                        name: name.to_string(),
                        is_dir: false,
                    }),
            )
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains(&normalize(path))
    }

    fn is_file(&self, path: &str) -> bool {
        self.files.contains_key(&normalize(path))
    }

    fn open(&mut self, path: &str) -> Result<Box<dyn Read + '_>> {
        let missing = || Error::ArchiveEntryMissing {
            archive: self.path.clone(),
            member: path.to_string(),
        };
        let Some(raw) = self.files.get(&normalize(path)).cloned() else {
            return Err(missing());
        };
        match self.archive.by_name(&raw) {
            Ok(file) => Ok(Box::new(file)),
            Err(zip::result::ZipError::FileNotFound) => Err(missing()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Build a zip at `path` holding the given `(name, contents)` members
    pub(crate) fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, contents) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_dir_view_list_and_walk() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("data/ns/loot_table/chests");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("a.json"), "{}").unwrap();
        fs::write(tmp.path().join("data/ns/loot_table/b.json"), "{}").unwrap();

        let view = DirView::new(tmp.path());
        let names: Vec<String> = view.list("data").unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["ns"]);
        assert!(view.is_dir("data/ns/loot_table"));
        assert!(view.is_file("data/ns/loot_table/b.json"));

        let files = view.walk_files("data/ns/loot_table").unwrap();
        assert_eq!(
            files,
            vec![
                "data/ns/loot_table/b.json".to_string(),
                "data/ns/loot_table/chests/a.json".to_string()
            ]
        );
    }

    #[test]
    fn test_zip_view_without_directory_entries() {
        let tmp = TempDir::new().unwrap();
        let jar = tmp.path().join("mod.jar");
        write_zip(
            &jar,
            &[
                ("data/mymod/loot_tables/chests/vault.json", "{\"pools\":[]}"),
                ("data/mymod/recipes/x.json", "{}"),
                ("META-INF/MANIFEST.MF", ""),
            ],
        );

        let mut view = ZipView::open(&jar).unwrap();
        assert!(view.is_archive());
        assert!(view.is_dir("data"));
        assert!(view.is_dir("/data/mymod/loot_tables"));

        let root: Vec<ArchiveEntry> = view.list("").unwrap();
        assert_eq!(
            root.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["META-INF", "data"]
        );

        let files = view.walk_files("data/mymod/loot_tables").unwrap();
        assert_eq!(files, vec!["data/mymod/loot_tables/chests/vault.json".to_string()]);

        let bytes = view.read_bytes("data/mymod/loot_tables/chests/vault.json").unwrap();
        assert_eq!(bytes, b"{\"pools\":[]}");
    }

    #[test]
    fn test_zip_view_missing_member() {
        let tmp = TempDir::new().unwrap();
        let jar = tmp.path().join("mod.jar");
        write_zip(&jar, &[("data/a/loot_table/x.json", "{}")]);

        let mut view = ZipView::open(&jar).unwrap();
        match view.open("data/a/loot_table/missing.json") {
            Err(Error::ArchiveEntryMissing { member, .. }) => {
                assert_eq!(member, "data/a/loot_table/missing.json")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected missing entry"),
        };
    }

    #[test]
    fn test_zip_view_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.zip");
        fs::write(&path, b"not a zip").unwrap();
        assert!(ZipView::open(&path).is_err());
    }
}
