//! Drop-to-library flow: collect, resolve duplicates, upload.

use super::collector::{collect, DropPayload};
use super::duplicates::{self, DuplicateDecision, DuplicatePrompt};
use super::scheduler::{BatchObserver, UploadScheduler};
use super::types::{BatchOutcome, UploadBatch};
use crate::api::{AssetApi, FolderId};
use crate::error::{IngestError, Result};
use std::sync::Arc;
use tracing::{info, warn};

pub struct IngestRequest {
    pub payload: DropPayload,
    pub folder_id: Option<FolderId>,
    pub tags: Vec<String>,
}

#[derive(Debug)]
pub struct IngestReport {
    pub decision: DuplicateDecision,
    /// Superseded duplicates that could not be removed.
    pub cleanup_failures: usize,
    pub outcome: BatchOutcome,
}

pub struct IngestPipeline {
    api: Arc<dyn AssetApi>,
    scheduler: UploadScheduler,
}

impl IngestPipeline {
    pub fn new(api: Arc<dyn AssetApi>, concurrency: usize) -> Self {
        Self {
            scheduler: UploadScheduler::new(api.clone(), concurrency),
            api,
        }
    }

    pub async fn ingest(
        &self,
        request: IngestRequest,
        prompt: &dyn DuplicatePrompt,
        observer: Arc<dyn BatchObserver>,
    ) -> Result<IngestReport> {
        let folder_id = request.folder_id.ok_or(IngestError::NoTargetFolder)?;

        let payload = request.payload;
        let files = tokio::task::spawn_blocking(move || collect(payload))
            .await
            .map_err(|e| IngestError::Io(std::io::Error::other(e)))?;
        info!("Ingesting {} files into folder {}", files.len(), folder_id);

        let decision = duplicates::check(self.api.as_ref(), folder_id, &files, prompt).await;
        let cleanup_failures = duplicates::apply(self.api.as_ref(), &decision).await;
        if cleanup_failures > 0 {
            warn!(
                "{} duplicates could not be removed, uploading anyway",
                cleanup_failures
            );
        }

        let batch = UploadBatch::new(files, folder_id, request.tags);
        let outcome = self.scheduler.run(batch, observer).await;

        Ok(IngestReport {
            decision,
            cleanup_failures,
            outcome,
        })
    }
}
