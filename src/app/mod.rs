mod state;
mod ui;

use async_trait::async_trait;
use eframe::{egui, App};
use meagle_uploader::api::{
    delete_assets, Annotation, AnnotationCount, AssetApi, AssetId, AssetQuery, Folder, FolderId,
    HttpApi, SmartFolder, TagCount,
};
use meagle_uploader::facets::{run_effect, Effect, LibraryStore, StoreEvent};
use meagle_uploader::upload::{
    BatchObserver, BatchProgress, DropPayload, DroppedItem, DuplicateChoice, DuplicatePrompt,
    DuplicateReport, FileStatus, IngestPipeline, IngestReport, IngestRequest,
};
use meagle_uploader::{ClientConfig, Result};
use state::{ActionProgress, LibraryMeta, PendingDuplicate, UploadState};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub enum AppEvent {
    Progress(BatchProgress),
    FileStatus(FileStatus),
    FileError(String),
    Duplicates(PendingDuplicate),
    IngestFinished(std::result::Result<IngestReport, String>),
    Store(StoreEvent),
    Meta {
        folders: Vec<Folder>,
        tags: Vec<TagCount>,
        notes: Vec<AnnotationCount>,
        smart_folders: Vec<SmartFolder>,
    },
    DeleteProgress {
        done: usize,
        total: usize,
    },
    DeleteFinished(std::result::Result<usize, String>),
    Notes {
        asset_id: AssetId,
        notes: Vec<Annotation>,
    },
    LibraryChanged,
    Alert(String),
}

/// Forwards batch updates to the UI thread.
struct ChannelObserver {
    sender: std_mpsc::Sender<AppEvent>,
    ctx: egui::Context,
}

impl ChannelObserver {
    fn send(&self, event: AppEvent) {
        let _ = self.sender.send(event);
        self.ctx.request_repaint();
    }
}

impl BatchObserver for ChannelObserver {
    fn on_progress(&self, progress: BatchProgress) {
        self.send(AppEvent::Progress(progress));
    }

    fn on_file_error(&self, message: &str) {
        self.send(AppEvent::FileError(message.to_string()));
    }

    fn on_file_status(&self, status: FileStatus) {
        self.send(AppEvent::FileStatus(status));
    }
}

/// Shows the duplicate dialog and waits for the user's pick.
struct ChannelPrompt {
    sender: std_mpsc::Sender<AppEvent>,
    ctx: egui::Context,
}

#[async_trait]
impl DuplicatePrompt for ChannelPrompt {
    async fn choose(&self, report: &DuplicateReport) -> DuplicateChoice {
        let (reply, answer) = oneshot::channel();
        let pending = PendingDuplicate {
            report: report.clone(),
            reply,
        };
        if self.sender.send(AppEvent::Duplicates(pending)).is_err() {
            return DuplicateChoice::KeepBoth;
        }
        self.ctx.request_repaint();
        // a closed window counts as the non-destructive answer
        answer.await.unwrap_or(DuplicateChoice::KeepBoth)
    }
}

pub struct MeagleUploader {
    config: ClientConfig,
    runtime: Runtime,
    api: Arc<dyn AssetApi>,
    pipeline: Arc<IngestPipeline>,
    sender: std_mpsc::Sender<AppEvent>,
    receiver: std_mpsc::Receiver<AppEvent>,
    state: UploadState,
    store: LibraryStore,
    meta: LibraryMeta,
    curl_text: String,
    tag_text: String,
    search_text: String,
    new_folder_name: String,
    smart_folder_name: String,
    note_text: String,
}

impl MeagleUploader {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: ClientConfig,
        api: Arc<dyn AssetApi>,
        runtime: Runtime,
    ) -> Self {
        info!("Initializing media library uploader against {}", config.api_base);
        let (sender, receiver) = std_mpsc::channel();
        let mut app = Self {
            pipeline: Arc::new(IngestPipeline::new(api.clone(), config.upload_concurrency)),
            store: LibraryStore::new(config.color_filter_threshold),
            config,
            runtime,
            api,
            sender,
            receiver,
            state: UploadState::default(),
            meta: LibraryMeta::default(),
            curl_text: String::new(),
            tag_text: String::new(),
            search_text: String::new(),
            new_folder_name: String::new(),
            smart_folder_name: String::new(),
            note_text: String::new(),
        };
        app.refresh(&cc.egui_ctx);
        app
    }

    /// Rebuilds the backend client from a pasted curl command.
    pub fn apply_connection(&mut self, ctx: &egui::Context) {
        let mut config = self.config.clone();
        let rebuilt = config
            .apply_curl(&self.curl_text)
            .and_then(|_| HttpApi::new(&config));
        match rebuilt {
            Ok(api) => {
                info!("Switched library connection to {}", config.api_base);
                let api: Arc<dyn AssetApi> = Arc::new(api);
                self.pipeline = Arc::new(IngestPipeline::new(api.clone(), config.upload_concurrency));
                self.api = api;
                self.config = config;
                self.refresh(ctx);
            }
            Err(e) => self.state.error_message = Some(format!("Connection: {e}")),
        }
    }

    pub fn refresh(&mut self, ctx: &egui::Context) {
        self.dispatch_store(StoreEvent::Refresh, ctx);
        self.refresh_meta(ctx);
    }

    fn refresh_meta(&self, ctx: &egui::Context) {
        let api = self.api.clone();
        let sender = self.sender.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let fetched = tokio::try_join!(
                api.list_folders(),
                api.list_tags(),
                api.annotation_summary(),
                api.list_smart_folders()
            );
            let event = match fetched {
                Ok((folders, tags, notes, smart_folders)) => AppEvent::Meta {
                    folders,
                    tags,
                    notes,
                    smart_folders,
                },
                Err(e) => {
                    warn!("Library metadata refresh failed: {}", e);
                    return;
                }
            };
            let _ = sender.send(event);
            ctx.request_repaint();
        });
    }

    pub fn dispatch_store(&mut self, event: StoreEvent, ctx: &egui::Context) {
        let effects = self.store.apply(event);
        self.run_effects(effects, ctx);
    }

    fn run_effects(&self, effects: Vec<Effect>, ctx: &egui::Context) {
        for effect in effects {
            let api = self.api.clone();
            let sender = self.sender.clone();
            let ctx = ctx.clone();
            let threshold = self.config.color_threshold;
            self.runtime.spawn(async move {
                let event = run_effect(api.as_ref(), effect, threshold).await;
                let _ = sender.send(AppEvent::Store(event));
                ctx.request_repaint();
            });
        }
    }

    pub fn start_upload(&mut self, payload: DropPayload, ctx: &egui::Context) {
        if self.state.is_uploading || self.state.is_deleting {
            self.state.error_message = Some("Upload: another operation is still running".into());
            return;
        }
        let Some(folder_id) = self.store.selected_folder() else {
            warn!("Upload attempted without a target folder");
            self.state.error_message = Some("Upload: no folder selected".to_string());
            return;
        };

        let tags: Vec<String> = self
            .tag_text
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self.state.begin_upload();

        let request = IngestRequest {
            payload,
            folder_id: Some(folder_id),
            tags,
        };
        let pipeline = self.pipeline.clone();
        let sender = self.sender.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let prompt = ChannelPrompt {
                sender: sender.clone(),
                ctx: ctx.clone(),
            };
            let observer = Arc::new(ChannelObserver {
                sender: sender.clone(),
                ctx: ctx.clone(),
            });
            let result = pipeline
                .ingest(request, &prompt, observer)
                .await
                .map_err(|e| e.to_string());
            let _ = sender.send(AppEvent::IngestFinished(result));
            ctx.request_repaint();
        });
    }

    pub fn upload_paths(&mut self, paths: Vec<PathBuf>, ctx: &egui::Context) {
        if paths.is_empty() {
            return;
        }
        let payload = DropPayload::from_paths(paths, self.config.read_page_size);
        self.start_upload(payload, ctx);
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped.is_empty() {
            return;
        }
        debug!("{} items dropped", dropped.len());

        if dropped.iter().all(|f| f.path.is_some()) {
            let paths = dropped.into_iter().filter_map(|f| f.path).collect();
            self.upload_paths(paths, ctx);
        } else {
            let items = dropped
                .into_iter()
                .filter_map(|f| match (f.path, f.bytes) {
                    (Some(path), _) => Some(DroppedItem::from_path(path)),
                    (None, Some(bytes)) => Some(DroppedItem::from_bytes(f.name, bytes)),
                    (None, None) => None,
                })
                .collect();
            self.start_upload(DropPayload::Files(items), ctx);
        }
    }

    pub fn answer_duplicates(&mut self, choice: DuplicateChoice) {
        if let Some(pending) = self.state.pending_duplicate.take() {
            info!("Duplicate decision: {:?}", choice);
            let _ = pending.reply.send(choice);
        }
    }

    pub fn delete_selected(&mut self, ctx: &egui::Context) {
        if self.state.is_uploading || self.state.is_deleting {
            return;
        }
        let mut ids: Vec<AssetId> = self.meta.selected_assets.drain().collect();
        if ids.is_empty() {
            self.state.error_message = Some("Delete: no assets selected".to_string());
            return;
        }
        ids.sort_unstable();
        self.state.begin_delete(ids.len());

        let api = self.api.clone();
        let sender = self.sender.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let progress_sender = sender.clone();
            let progress_ctx = ctx.clone();
            let result = delete_assets(api.as_ref(), &ids, move |done, total| {
                let _ = progress_sender.send(AppEvent::DeleteProgress { done, total });
                progress_ctx.request_repaint();
            })
            .await
            .map_err(|e| e.to_string());
            let _ = sender.send(AppEvent::DeleteFinished(result));
            ctx.request_repaint();
        });
    }

    pub fn create_folder(&mut self, ctx: &egui::Context) {
        let name = self.new_folder_name.trim().to_string();
        if name.is_empty() {
            return;
        }
        self.new_folder_name.clear();
        let parent = self.store.selected_folder();
        self.spawn_library_call(ctx, "Create folder", move |api| {
            Box::pin(async move { api.create_folder(&name, parent).await.map(|_| ()) })
        });
    }

    pub fn delete_folder(&mut self, folder_id: FolderId, ctx: &egui::Context) {
        if self.store.selected_folder() == Some(folder_id) {
            self.dispatch_store(StoreEvent::SelectFolder(None), ctx);
        }
        self.spawn_library_call(ctx, "Delete folder", move |api| {
            Box::pin(async move { api.delete_folder(folder_id).await })
        });
    }

    pub fn save_smart_folder(&mut self, ctx: &egui::Context) {
        let name = self.smart_folder_name.trim().to_string();
        if name.is_empty() {
            return;
        }
        self.smart_folder_name.clear();
        let query: AssetQuery = self.store.filters.clone();
        self.spawn_library_call(ctx, "Save smart folder", move |api| {
            Box::pin(async move { api.create_smart_folder(&name, &query).await.map(|_| ()) })
        });
    }

    pub fn toggle_notes(&mut self, asset_id: AssetId, ctx: &egui::Context) {
        if self.meta.note_asset == Some(asset_id) {
            self.meta.note_asset = None;
            self.meta.asset_notes.clear();
            return;
        }
        self.meta.note_asset = Some(asset_id);
        self.meta.asset_notes.clear();
        self.load_notes(asset_id, ctx);
    }

    fn load_notes(&self, asset_id: AssetId, ctx: &egui::Context) {
        let api = self.api.clone();
        let sender = self.sender.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let event = match api.list_annotations(asset_id).await {
                Ok(notes) => AppEvent::Notes { asset_id, notes },
                Err(e) => AppEvent::Alert(format!("Load notes: {e}")),
            };
            let _ = sender.send(event);
            ctx.request_repaint();
        });
    }

    pub fn add_note(&mut self, ctx: &egui::Context) {
        let text = self.note_text.trim().to_string();
        let Some(asset_id) = self.meta.note_asset else {
            return;
        };
        if text.is_empty() {
            return;
        }
        self.note_text.clear();
        self.spawn_library_call(ctx, "Add note", move |api| {
            Box::pin(async move { api.create_annotation(asset_id, &text).await.map(|_| ()) })
        });
    }

    pub fn delete_note(&mut self, annotation_id: i64, ctx: &egui::Context) {
        self.spawn_library_call(ctx, "Delete note", move |api| {
            Box::pin(async move { api.delete_annotation(annotation_id).await })
        });
    }

    /// Runs one metadata mutation, alerting with `operation` on failure and refreshing after.
    fn spawn_library_call<F>(&self, ctx: &egui::Context, operation: &'static str, call: F)
    where
        F: FnOnce(
                Arc<dyn AssetApi>,
            ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send>>
            + Send
            + 'static,
    {
        let api = self.api.clone();
        let sender = self.sender.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let event = match call(api).await {
                Ok(()) => AppEvent::LibraryChanged,
                Err(e) => {
                    warn!("{} failed: {}", operation, e);
                    AppEvent::Alert(format!("{operation}: {e}"))
                }
            };
            let _ = sender.send(event);
            ctx.request_repaint();
        });
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        self.handle_dropped_files(ctx);

        let mut refresh_needed = false;
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                AppEvent::Progress(progress) => self.state.record_progress(progress),
                AppEvent::FileStatus(status) => self.state.record_status(status),
                AppEvent::FileError(message) => self.state.record_file_error(message),
                AppEvent::Duplicates(pending) => self.state.pending_duplicate = Some(pending),
                AppEvent::IngestFinished(Ok(report)) => {
                    let failed = report.outcome.errors.len();
                    let successful = report.outcome.uploaded.len();
                    self.state.finish(successful + failed, successful, failed);
                    if report.cleanup_failures > 0 {
                        self.state.error_message = Some(format!(
                            "Replace: {} existing file(s) could not be removed",
                            report.cleanup_failures
                        ));
                    }
                    refresh_needed = true;
                }
                AppEvent::IngestFinished(Err(e)) => {
                    self.state.finish(0, 0, 0);
                    self.state.error_message = Some(format!("Upload: {e}"));
                }
                AppEvent::Store(event) => self.dispatch_store(event, ctx),
                AppEvent::Meta {
                    folders,
                    tags,
                    notes,
                    smart_folders,
                } => {
                    self.meta.folders = folders;
                    self.meta.tags = tags;
                    self.meta.notes = notes;
                    self.meta.smart_folders = smart_folders;
                }
                AppEvent::DeleteProgress { done, total } => {
                    self.state.progress = ActionProgress::Deleting {
                        total,
                        current: done,
                    };
                }
                AppEvent::DeleteFinished(result) => {
                    let (total, current) = match &self.state.progress {
                        ActionProgress::Deleting { total, current } => (*total, *current),
                        _ => (0, 0),
                    };
                    let deleted = result.as_ref().map_or(current, |n| *n);
                    self.state.finish(total, deleted, total - deleted);
                    self.state.error_message = result.err().map(|e| format!("Delete assets: {e}"));
                    refresh_needed = true;
                }
                AppEvent::Notes { asset_id, notes } => {
                    if self.meta.note_asset == Some(asset_id) {
                        self.meta.asset_notes = notes;
                    }
                }
                AppEvent::LibraryChanged => {
                    if let Some(asset_id) = self.meta.note_asset {
                        self.load_notes(asset_id, ctx);
                    }
                    refresh_needed = true;
                }
                AppEvent::Alert(message) => self.state.error_message = Some(message),
            }
        }

        if refresh_needed {
            self.refresh(ctx);
        }
    }
}

impl App for MeagleUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
