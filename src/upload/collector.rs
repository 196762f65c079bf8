//! Flattens dropped files and directory trees into upload descriptors.

use super::types::{FileDescriptor, FileHandle};
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Paginated child listing of a dropped directory.
///
/// A single call may return only part of the children; callers keep reading until
/// an empty batch comes back. Use [`ChildEntries`] instead of looping by hand.
pub trait DirectoryReader: Send {
    fn read_entries(&mut self) -> io::Result<Vec<DropEntry>>;
}

pub enum DropEntry {
    File {
        name: String,
        handle: FileHandle,
    },
    Directory {
        name: String,
        reader: Box<dyn DirectoryReader>,
    },
}

impl DropEntry {
    /// Entry for a path on the local filesystem.
    pub fn from_path(path: &Path, page_size: usize) -> io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        if fs::metadata(path)?.is_dir() {
            Ok(DropEntry::Directory {
                name,
                reader: Box::new(FsDirectoryReader::open(path, page_size)?),
            })
        } else {
            Ok(DropEntry::File {
                name,
                handle: FileHandle::Path(path.to_path_buf()),
            })
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DropEntry::File { name, .. } | DropEntry::Directory { name, .. } => name,
        }
    }
}

/// A file from a flat drop or picker list, with whatever hierarchical path came along.
pub struct DroppedItem {
    pub name: String,
    pub relative_path: Option<String>,
    pub handle: FileHandle,
}

impl DroppedItem {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            name,
            relative_path: None,
            handle: FileHandle::Path(path),
        }
    }

    pub fn from_bytes(name: String, bytes: Arc<[u8]>) -> Self {
        Self {
            name,
            relative_path: None,
            handle: FileHandle::Memory(bytes),
        }
    }
}

pub enum DropPayload {
    Files(Vec<DroppedItem>),
    Entries(Vec<DropEntry>),
}

impl DropPayload {
    /// Builds a payload from local paths: plain files form a flat list, any directory
    /// switches the whole drop to entry traversal.
    pub fn from_paths(paths: Vec<PathBuf>, page_size: usize) -> Self {
        if paths.iter().any(|p| p.is_dir()) {
            let entries = paths
                .iter()
                .filter_map(|path| match DropEntry::from_path(path, page_size) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        debug!("Skipping unreadable drop entry {}: {}", path.display(), e);
                        None
                    }
                })
                .collect();
            DropPayload::Entries(entries)
        } else {
            DropPayload::Files(paths.into_iter().map(DroppedItem::from_path).collect())
        }
    }
}

/// Children of a directory as a plain sequence; pulls pages until one comes back empty.
pub struct ChildEntries {
    reader: Box<dyn DirectoryReader>,
    pending: VecDeque<DropEntry>,
    exhausted: bool,
}

impl ChildEntries {
    pub fn new(reader: Box<dyn DirectoryReader>) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
            exhausted: false,
        }
    }
}

impl Iterator for ChildEntries {
    type Item = DropEntry;

    fn next(&mut self) -> Option<DropEntry> {
        while self.pending.is_empty() && !self.exhausted {
            match self.reader.read_entries() {
                Ok(batch) if batch.is_empty() => self.exhausted = true,
                Ok(batch) => self.pending.extend(batch),
                Err(e) => {
                    warn!("Directory listing stopped early: {}", e);
                    self.exhausted = true;
                }
            }
        }
        self.pending.pop_front()
    }
}

/// `DirectoryReader` over `std::fs::read_dir`, handing out at most `page_size` entries per call.
pub struct FsDirectoryReader {
    entries: Option<fs::ReadDir>,
    page_size: usize,
}

impl FsDirectoryReader {
    pub fn open(path: &Path, page_size: usize) -> io::Result<Self> {
        Ok(Self {
            entries: Some(fs::read_dir(path)?),
            page_size: page_size.max(1),
        })
    }
}

impl DirectoryReader for FsDirectoryReader {
    fn read_entries(&mut self) -> io::Result<Vec<DropEntry>> {
        let Some(entries) = self.entries.as_mut() else {
            return Ok(Vec::new());
        };

        let mut batch = Vec::new();
        while batch.len() < self.page_size {
            let Some(entry) = entries.next() else {
                self.entries = None;
                break;
            };
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            if file_type.is_dir() {
                match FsDirectoryReader::open(&path, self.page_size) {
                    Ok(reader) => batch.push(DropEntry::Directory {
                        name,
                        reader: Box::new(reader),
                    }),
                    Err(e) => debug!("Skipping unreadable directory {}: {}", path.display(), e),
                }
            } else if file_type.is_file() || path.is_file() {
                // symlinked files are followed, symlinked directories are not
                batch.push(DropEntry::File {
                    name,
                    handle: FileHandle::Path(path),
                });
            }
        }
        Ok(batch)
    }
}

fn size_of(handle: &FileHandle) -> io::Result<u64> {
    match handle {
        FileHandle::Path(path) => {
            let metadata = fs::metadata(path)?;
            if !metadata.is_file() {
                return Err(io::Error::new(io::ErrorKind::Other, "not a regular file"));
            }
            Ok(metadata.len())
        }
        FileHandle::Memory(bytes) => Ok(bytes.len() as u64),
    }
}

/// Flattens a drop into descriptors, depth-first, siblings in listing order.
/// Entries that cannot be read are skipped.
pub fn collect(payload: DropPayload) -> Vec<FileDescriptor> {
    let mut files = Vec::new();
    match payload {
        DropPayload::Files(items) => {
            for item in items {
                match size_of(&item.handle) {
                    Ok(size_bytes) => files.push(FileDescriptor {
                        name: item.name,
                        relative_path: item.relative_path.unwrap_or_default(),
                        size_bytes,
                        handle: item.handle,
                    }),
                    Err(e) => debug!("Skipping unreadable file {}: {}", item.name, e),
                }
            }
        }
        DropPayload::Entries(entries) => {
            for entry in entries {
                walk(entry, "", &mut files);
            }
        }
    }
    trace!("Collected {} files from drop", files.len());
    files
}

fn walk(entry: DropEntry, prefix: &str, files: &mut Vec<FileDescriptor>) {
    match entry {
        DropEntry::File { name, handle } => match size_of(&handle) {
            Ok(size_bytes) => {
                let relative_path = if prefix.is_empty() {
                    String::new()
                } else {
                    format!("{prefix}{name}")
                };
                files.push(FileDescriptor {
                    name,
                    relative_path,
                    size_bytes,
                    handle,
                });
            }
            Err(e) => debug!("Skipping unreadable file {}{}: {}", prefix, name, e),
        },
        DropEntry::Directory { name, reader } => {
            let prefix = format!("{prefix}{name}/");
            for child in ChildEntries::new(reader) {
                walk(child, &prefix, files);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Hands out one prepared page per call, then empty pages.
    struct PagedReader {
        pages: VecDeque<io::Result<Vec<DropEntry>>>,
        calls: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl PagedReader {
        fn boxed(pages: Vec<io::Result<Vec<DropEntry>>>) -> Box<dyn DirectoryReader> {
            Box::new(Self {
                pages: pages.into(),
                calls: Arc::default(),
            })
        }
    }

    impl DirectoryReader for PagedReader {
        fn read_entries(&mut self) -> io::Result<Vec<DropEntry>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.pages.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn file(name: &str, content: &[u8]) -> DropEntry {
        DropEntry::File {
            name: name.to_string(),
            handle: FileHandle::Memory(Arc::from(content)),
        }
    }

    fn dir(name: &str, pages: Vec<io::Result<Vec<DropEntry>>>) -> DropEntry {
        DropEntry::Directory {
            name: name.to_string(),
            reader: PagedReader::boxed(pages),
        }
    }

    fn paths(files: &[FileDescriptor]) -> Vec<&str> {
        files.iter().map(|f| f.relative_path.as_str()).collect()
    }

    #[test]
    fn keeps_reading_until_an_empty_page() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let reader = PagedReader {
            pages: vec![
                Ok(vec![file("a.jpg", b"aa")]),
                Ok(vec![file("b.jpg", b"bbb"), file("c.jpg", b"c")]),
            ]
            .into(),
            calls: calls.clone(),
        };
        let children: Vec<_> = ChildEntries::new(Box::new(reader))
            .map(|e| e.name().to_string())
            .collect();

        assert_eq!(children, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn nested_directories_are_depth_first_with_prefixes() {
        let drop = DropPayload::Entries(vec![
            file("top.png", b"1234"),
            dir(
                "trip",
                vec![
                    Ok(vec![file("a.jpg", b"a")]),
                    Ok(vec![dir("day1", vec![Ok(vec![file("c.jpg", b"cc")])])]),
                    Ok(vec![file("b.jpg", b"b")]),
                ],
            ),
        ]);

        let files = collect(drop);
        assert_eq!(
            paths(&files),
            vec!["", "trip/a.jpg", "trip/day1/c.jpg", "trip/b.jpg"]
        );
        assert_eq!(files[0].name, "top.png");
        assert_eq!(files[0].size_bytes, 4);
        assert_eq!(files[2].name, "c.jpg");
        assert_eq!(files[2].size_bytes, 2);
    }

    #[test]
    fn listing_errors_skip_the_rest_of_that_directory_only() {
        let drop = DropPayload::Entries(vec![
            dir(
                "broken",
                vec![
                    Ok(vec![file("kept.jpg", b"k")]),
                    Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
                    Ok(vec![file("never.jpg", b"n")]),
                ],
            ),
            file("after.jpg", b"x"),
        ]);

        let files = collect(drop);
        assert_eq!(paths(&files), vec!["broken/kept.jpg", ""]);
        assert_eq!(files[1].name, "after.jpg");
    }

    #[test]
    fn flat_list_keeps_supplied_paths_and_skips_missing_files() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("a.jpg");
        fs::write(&present, b"hello").unwrap();

        let mut items = vec![
            DroppedItem::from_path(present),
            DroppedItem::from_path(temp.path().join("missing.jpg")),
        ];
        items[0].relative_path = Some("album/a.jpg".to_string());

        let files = collect(DropPayload::Files(items));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.jpg");
        assert_eq!(files[0].relative_path, "album/a.jpg");
        assert_eq!(files[0].size_bytes, 5);
    }

    #[test]
    fn filesystem_directories_are_paged_through() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("shoot");
        fs::create_dir_all(root.join("raw")).unwrap();
        for name in ["1.jpg", "2.jpg", "3.jpg"] {
            fs::write(root.join(name), b"x").unwrap();
        }
        fs::write(root.join("raw").join("4.dng"), b"yy").unwrap();

        // page size 1 forces one read per entry
        let payload = DropPayload::from_paths(vec![root], 1);
        let mut files: Vec<String> = collect(payload)
            .into_iter()
            .map(|f| f.relative_path)
            .collect();
        files.sort();

        assert_eq!(
            files,
            vec!["shoot/1.jpg", "shoot/2.jpg", "shoot/3.jpg", "shoot/raw/4.dng"]
        );
    }

    #[test]
    fn plain_paths_make_a_flat_payload() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        fs::write(&a, b"a").unwrap();

        let payload = DropPayload::from_paths(vec![a], 10);
        assert!(matches!(payload, DropPayload::Files(_)));
        let files = collect(payload);
        assert_eq!(files[0].relative_path, "");
    }
}
