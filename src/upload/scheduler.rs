//! Bounded-parallel batch upload with byte-level progress.

use super::types::{
    percent_of, BatchOutcome, BatchProgress, FileDescriptor, FileStatus, UploadBatch, UploadStatus,
};
use crate::api::{AssetApi, AssetRecord, ProgressFn, UploadTarget};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Receives batch-level updates while an upload runs.
pub trait BatchObserver: Send + Sync {
    fn on_progress(&self, progress: BatchProgress);

    fn on_file_error(&self, message: &str);

    fn on_file_status(&self, _status: FileStatus) {}
}

#[derive(Default)]
struct Accounting {
    uploaded_bytes: u64,
    total_bytes: u64,
    uploaded: Vec<AssetRecord>,
    errors: Vec<String>,
}

struct Shared {
    cursor: Mutex<VecDeque<FileDescriptor>>,
    accounting: Mutex<Accounting>,
    target: UploadTarget,
    observer: Arc<dyn BatchObserver>,
}

impl Shared {
    fn claim(&self) -> Option<FileDescriptor> {
        self.cursor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn add_bytes(&self, delta: u64) {
        if delta == 0 {
            return;
        }
        let mut accounting = self
            .accounting
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        accounting.uploaded_bytes = (accounting.uploaded_bytes + delta).min(accounting.total_bytes);
        // reported under the lock so observers see percentages in order
        self.observer.on_progress(BatchProgress {
            uploaded_bytes: accounting.uploaded_bytes,
            total_bytes: accounting.total_bytes,
            percent: percent_of(accounting.uploaded_bytes, accounting.total_bytes),
        });
    }

    fn record_success(&self, asset: AssetRecord) {
        self.accounting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .uploaded
            .push(asset);
    }

    fn record_error(&self, message: String) {
        self.observer.on_file_error(&message);
        self.accounting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .errors
            .push(message);
    }
}

/// Tracks one file's cumulative transport progress and forwards only the growth.
struct FileMeter {
    size: u64,
    reported: AtomicU64,
}

impl FileMeter {
    fn advance(&self, shared: &Shared, sent: u64) {
        let sent = sent.min(self.size);
        let previous = self.reported.fetch_max(sent, Ordering::SeqCst);
        if sent > previous {
            shared.add_bytes(sent - previous);
        }
    }
}

pub struct UploadScheduler {
    api: Arc<dyn AssetApi>,
    concurrency: usize,
}

impl UploadScheduler {
    pub fn new(api: Arc<dyn AssetApi>, concurrency: usize) -> Self {
        Self {
            api,
            concurrency: concurrency.max(1),
        }
    }

    /// Uploads every file in `batch` with at most `concurrency` transfers in flight.
    /// Resolves once each file has either completed or failed; failures never stop siblings.
    pub async fn run(&self, batch: UploadBatch, observer: Arc<dyn BatchObserver>) -> BatchOutcome {
        let total_bytes = batch.total_bytes();
        let file_count = batch.files.len();
        if file_count == 0 {
            return BatchOutcome::default();
        }

        let workers = self.concurrency.min(file_count);
        info!(
            "Uploading {} files ({} bytes) into folder {} with {} workers",
            file_count, total_bytes, batch.folder_id, workers
        );

        let shared = Arc::new(Shared {
            cursor: Mutex::new(batch.files.into()),
            accounting: Mutex::new(Accounting {
                total_bytes,
                ..Accounting::default()
            }),
            target: UploadTarget {
                folder_id: batch.folder_id,
                tags: batch.tags,
            },
            observer,
        });

        let mut set = JoinSet::new();
        for worker in 0..workers {
            set.spawn(Self::worker(worker, shared.clone(), self.api.clone()));
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!("Upload worker ended abnormally: {}", e);
            }
        }

        let mut accounting = shared
            .accounting
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if accounting.total_bytes == 0 {
            // no byte ever moved, so nothing reported completion yet
            shared.observer.on_progress(BatchProgress {
                uploaded_bytes: 0,
                total_bytes: 0,
                percent: 100,
            });
        }
        let outcome = BatchOutcome {
            uploaded: std::mem::take(&mut accounting.uploaded),
            errors: std::mem::take(&mut accounting.errors),
            total_bytes: accounting.total_bytes,
            uploaded_bytes: accounting.uploaded_bytes,
        };
        info!(
            "Batch settled: {} uploaded, {} failed",
            outcome.uploaded.len(),
            outcome.errors.len()
        );
        outcome
    }

    async fn worker(index: usize, shared: Arc<Shared>, api: Arc<dyn AssetApi>) {
        while let Some(file) = shared.claim() {
            let name = file.name.clone();
            let relative_path = file.relative_path.clone();
            debug!("worker {} claimed {}", index, name);
            shared.observer.on_file_status(FileStatus {
                name: name.clone(),
                relative_path: relative_path.clone(),
                status: UploadStatus::Uploading,
            });

            let meter = Arc::new(FileMeter {
                size: file.size_bytes,
                reported: AtomicU64::new(0),
            });
            let progress: ProgressFn = {
                let shared = shared.clone();
                let meter = meter.clone();
                Arc::new(move |sent| meter.advance(&shared, sent))
            };

            let result = api.upload_asset(file, &shared.target, progress).await;

            // settled files count in full, failed ones included, so the total is reachable
            meter.advance(&shared, meter.size);

            match result {
                Ok(asset) => {
                    shared.observer.on_file_status(FileStatus {
                        name,
                        relative_path,
                        status: UploadStatus::Success,
                    });
                    shared.record_success(asset);
                }
                Err(e) => {
                    warn!("Upload of {} failed: {}", name, e);
                    let message = format!("{}: {}", name, e);
                    shared.observer.on_file_status(FileStatus {
                        name,
                        relative_path,
                        status: UploadStatus::Error(e.to_string()),
                    });
                    shared.record_error(message);
                }
            }
        }
    }
}
