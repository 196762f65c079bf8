use crate::api::{AssetRecord, FolderId};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a descriptor's bytes come from.
#[derive(Clone)]
pub enum FileHandle {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

impl FileHandle {
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            FileHandle::Path(path) => tokio::fs::read(path).await,
            FileHandle::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileHandle::Path(path) => f.debug_tuple("Path").field(path).finish(),
            FileHandle::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

/// A file picked up from a drop or selection, ready to be uploaded once.
///
/// `relative_path` is empty for top-level files and `dir/.../name` for files found
/// inside a dropped directory.
#[derive(Debug)]
pub struct FileDescriptor {
    pub name: String,
    pub relative_path: String,
    pub size_bytes: u64,
    pub handle: FileHandle,
}

impl FileDescriptor {
    pub fn is_nested(&self) -> bool {
        self.relative_path.contains('/') || self.relative_path.contains('\\')
    }
}

/// Files going into one folder with one tag set.
#[derive(Debug)]
pub struct UploadBatch {
    pub files: Vec<FileDescriptor>,
    pub folder_id: FolderId,
    pub tags: Vec<String>,
}

impl UploadBatch {
    pub fn new(files: Vec<FileDescriptor>, folder_id: FolderId, tags: Vec<String>) -> Self {
        Self {
            files,
            folder_id,
            tags,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchProgress {
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
    pub percent: u8,
}

/// What is left of a batch once every file completed or failed.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub uploaded: Vec<AssetRecord>,
    pub errors: Vec<String>,
    pub total_bytes: u64,
    pub uploaded_bytes: u64,
}

impl BatchOutcome {
    /// A settled batch with files but no bytes counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 && self.settled_files() > 0 {
            return 100;
        }
        percent_of(self.uploaded_bytes, self.total_bytes)
    }

    pub fn settled_files(&self) -> usize {
        self.uploaded.len() + self.errors.len()
    }
}

pub(crate) fn percent_of(uploaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (uploaded.min(total) * 100 / total) as u8
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Uploading,
    Success,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileStatus {
    pub name: String,
    /// Empty for top-level files.
    pub relative_path: String,
    pub status: UploadStatus,
}

impl FileStatus {
    /// Identifies the file within its batch; nested files with equal names stay apart.
    pub fn key(&self) -> &str {
        if self.relative_path.is_empty() {
            &self.name
        } else {
            &self.relative_path
        }
    }
}
