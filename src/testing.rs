//! In-memory backend and observers shared by the unit tests.

use crate::api::{
    Annotation, AnnotationCount, AssetApi, AssetId, AssetQuery, AssetRecord, Folder, FolderId,
    ProgressFn, SmartFolder, TagCount, UploadTarget,
};
use crate::error::{IngestError, Result};
use crate::upload::{
    BatchObserver, BatchProgress, DuplicateChoice, DuplicatePrompt, DuplicateReport,
    FileDescriptor, FileHandle, FileStatus,
};
use crate::utils::color::Rgb;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn descriptor(name: &str, relative_path: &str, size: u64) -> FileDescriptor {
    FileDescriptor {
        name: name.to_string(),
        relative_path: relative_path.to_string(),
        size_bytes: size,
        handle: FileHandle::Memory(Arc::from(vec![0u8; size as usize])),
    }
}

#[derive(Default)]
struct State {
    assets: Vec<AssetRecord>,
    folders: Vec<Folder>,
    smart_folders: Vec<(SmartFolder, AssetQuery)>,
    annotations: Vec<Annotation>,
    next_id: i64,
    fail_listing: bool,
    fail_delete: HashSet<AssetId>,
    fail_upload: HashSet<String>,
    calls: Vec<String>,
    upload_attempts: Vec<String>,
    list_calls: usize,
    in_flight: usize,
    max_in_flight: usize,
}

/// Behaves like the library backend for filtering, and records what was asked of it.
pub struct FakeLibrary {
    state: Mutex<State>,
    chunk: u64,
    delay: Duration,
}

impl Default for FakeLibrary {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
            chunk: 64,
            delay: Duration::ZERO,
        }
    }
}

impl FakeLibrary {
    pub fn asset(id: AssetId, filename: &str, folder_id: FolderId) -> AssetRecord {
        AssetRecord {
            id,
            filename: filename.to_string(),
            folder_id: Some(folder_id),
            format: filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()),
            media_type: "image".to_string(),
            ..AssetRecord::default()
        }
    }

    pub fn with_assets(assets: Vec<AssetRecord>) -> Self {
        let library = Self::default();
        library.state.lock().unwrap().assets = assets;
        library
    }

    pub fn with_chunk(mut self, chunk: u64) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    pub fn fail_delete_of(&self, id: AssetId) {
        self.state.lock().unwrap().fail_delete.insert(id);
    }

    pub fn fail_upload_of(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_upload
            .insert(name.to_string());
    }

    pub fn assets(&self) -> Vec<AssetRecord> {
        self.state.lock().unwrap().assets.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn upload_attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().upload_attempts.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    fn matches(asset: &AssetRecord, query: &AssetQuery) -> bool {
        if !query.folder_ids.is_empty()
            && !asset
                .folder_id
                .is_some_and(|id| query.folder_ids.contains(&id))
        {
            return false;
        }
        if !query.formats.is_empty() {
            let format = asset.format.clone().unwrap_or_default().to_lowercase();
            if !query.formats.iter().any(|f| f.to_lowercase() == format) {
                return false;
            }
        }
        if let Some(q) = &query.q {
            if !asset.filename.to_lowercase().contains(&q.to_lowercase()) {
                return false;
            }
        }
        if !query.colors.is_empty() {
            let threshold = query.color_threshold.unwrap_or(60.0);
            let hit = query.colors.iter().filter_map(|c| Rgb::from_hex(c)).any(|target| {
                asset
                    .colors
                    .iter()
                    .filter_map(|c| Rgb::from_hex(c))
                    .any(|rgb| rgb.distance(target) <= threshold)
            });
            if !hit {
                return false;
            }
        }
        true
    }

    fn rejected(operation: &'static str, status: u16, message: &str) -> IngestError {
        IngestError::Rejected {
            operation,
            status,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl AssetApi for FakeLibrary {
    async fn list_assets(&self, query: &AssetQuery) -> Result<Vec<AssetRecord>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.fail_listing {
            return Err(Self::rejected("list assets", 503, "unavailable"));
        }
        Ok(state
            .assets
            .iter()
            .filter(|a| Self::matches(a, query))
            .cloned()
            .collect())
    }

    async fn upload_asset(
        &self,
        file: FileDescriptor,
        target: &UploadTarget,
        progress: ProgressFn,
    ) -> Result<AssetRecord> {
        {
            let mut state = self.state.lock().unwrap();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.upload_attempts.push(file.name.clone());
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut sent = 0;
        while sent < file.size_bytes {
            sent = (sent + self.chunk).min(file.size_bytes);
            progress(sent);
            tokio::task::yield_now().await;
        }

        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        if state.fail_upload.contains(&file.name) {
            return Err(Self::rejected("upload", 500, "disk full"));
        }
        state.calls.push(format!("upload:{}", file.name));
        state.next_id += 1;
        let mut asset = Self::asset(state.next_id, &file.name, target.folder_id);
        asset.size_bytes = file.size_bytes;
        asset.tags = target.tags.clone();
        state.assets.push(asset.clone());
        Ok(asset)
    }

    async fn delete_asset(&self, id: AssetId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete:{id}"));
        if state.fail_delete.contains(&id) {
            return Err(Self::rejected("delete asset", 500, "locked"));
        }
        let before = state.assets.len();
        state.assets.retain(|a| a.id != id);
        if state.assets.len() == before {
            return Err(Self::rejected("delete asset", 404, "asset not found"));
        }
        Ok(())
    }

    async fn list_folders(&self) -> Result<Vec<Folder>> {
        Ok(self.state.lock().unwrap().folders.clone())
    }

    async fn create_folder(&self, name: &str, parent_id: Option<FolderId>) -> Result<Folder> {
        let mut state = self.state.lock().unwrap();
        let path = match parent_id {
            Some(parent) => {
                let parent = state
                    .folders
                    .iter()
                    .find(|f| f.id == parent)
                    .ok_or_else(|| Self::rejected("create folder", 404, "parent not found"))?;
                format!("{}/{}", parent.path, name)
            }
            None => name.to_string(),
        };
        state.next_id += 1;
        let folder = Folder {
            id: state.next_id,
            name: name.to_string(),
            parent_id,
            path,
            created_at: String::new(),
        };
        state.folders.push(folder.clone());
        Ok(folder)
    }

    async fn delete_folder(&self, id: FolderId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.assets.iter().any(|a| a.folder_id == Some(id))
            || state.folders.iter().any(|f| f.parent_id == Some(id))
        {
            return Err(Self::rejected("delete folder", 400, "folder not empty"));
        }
        state.folders.retain(|f| f.id != id);
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<TagCount>> {
        let state = self.state.lock().unwrap();
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for tag in state.assets.iter().flat_map(|a| a.tags.iter()) {
            *counts.entry(tag.clone()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(name, count)| TagCount { name, count })
            .collect())
    }

    async fn list_smart_folders(&self) -> Result<Vec<SmartFolder>> {
        let state = self.state.lock().unwrap();
        Ok(state.smart_folders.iter().map(|(s, _)| s.clone()).collect())
    }

    async fn create_smart_folder(&self, name: &str, query: &AssetQuery) -> Result<SmartFolder> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let smart = SmartFolder {
            id: state.next_id,
            name: name.to_string(),
            query: query.to_json(),
            created_at: String::new(),
        };
        state.smart_folders.push((smart.clone(), query.clone()));
        Ok(smart)
    }

    async fn smart_folder_assets(&self, id: i64) -> Result<Vec<AssetRecord>> {
        let query = {
            let state = self.state.lock().unwrap();
            state
                .smart_folders
                .iter()
                .find(|(s, _)| s.id == id)
                .map(|(_, q)| q.clone())
                .ok_or_else(|| Self::rejected("smart folder assets", 404, "not found"))?
        };
        self.list_assets(&query).await
    }

    async fn list_annotations(&self, asset_id: AssetId) -> Result<Vec<Annotation>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .annotations
            .iter()
            .filter(|a| a.asset_id == asset_id)
            .cloned()
            .collect())
    }

    async fn create_annotation(&self, asset_id: AssetId, text: &str) -> Result<Annotation> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let annotation = Annotation {
            id: state.next_id,
            asset_id,
            kind: "text".to_string(),
            data: serde_json::json!({ "text": text }),
            created_at: String::new(),
        };
        state.annotations.push(annotation.clone());
        Ok(annotation)
    }

    async fn delete_annotation(&self, id: i64) -> Result<()> {
        self.state.lock().unwrap().annotations.retain(|a| a.id != id);
        Ok(())
    }

    async fn annotation_summary(&self) -> Result<Vec<AnnotationCount>> {
        let state = self.state.lock().unwrap();
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for text in state.annotations.iter().filter_map(|a| a.text()) {
            *counts.entry(text.trim().to_lowercase()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(text, count)| AnnotationCount { text, count })
            .collect())
    }
}

/// Answers every duplicate prompt the same way.
pub struct FixedPrompt {
    choice: DuplicateChoice,
    asked: AtomicUsize,
}

impl FixedPrompt {
    pub fn new(choice: DuplicateChoice) -> Self {
        Self {
            choice,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DuplicatePrompt for FixedPrompt {
    async fn choose(&self, _report: &DuplicateReport) -> DuplicateChoice {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.choice
    }
}

#[derive(Default)]
pub struct Recorder {
    progress: Mutex<Vec<BatchProgress>>,
    errors: Mutex<Vec<String>>,
    statuses: Mutex<Vec<FileStatus>>,
}

impl Recorder {
    pub fn bytes(&self) -> Vec<u64> {
        let progress = self.progress.lock().unwrap();
        progress.iter().map(|p| p.uploaded_bytes).collect()
    }

    pub fn percents(&self) -> Vec<u8> {
        let progress = self.progress.lock().unwrap();
        progress.iter().map(|p| p.percent).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<FileStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

impl BatchObserver for Recorder {
    fn on_progress(&self, progress: BatchProgress) {
        self.progress.lock().unwrap().push(progress);
    }

    fn on_file_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn on_file_status(&self, status: FileStatus) {
        self.statuses.lock().unwrap().push(status);
    }
}
