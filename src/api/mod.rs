mod batch;
mod http;
mod models;
mod query;

pub use batch::delete_assets;
pub use http::HttpApi;
pub use models::{
    Annotation, AnnotationCount, AssetId, AssetRecord, Folder, FolderId, SmartFolder, TagCount,
};
pub use query::AssetQuery;

use crate::error::Result;
use crate::upload::FileDescriptor;
use async_trait::async_trait;
use std::sync::Arc;

/// Receives the cumulative number of bytes sent for a single file.
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// Where an uploaded file lands and what it is tagged with.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTarget {
    pub folder_id: FolderId,
    pub tags: Vec<String>,
}

/// The media library backend as seen by the ingestion core.
#[async_trait]
pub trait AssetApi: Send + Sync {
    async fn list_assets(&self, query: &AssetQuery) -> Result<Vec<AssetRecord>>;

    async fn upload_asset(
        &self,
        file: FileDescriptor,
        target: &UploadTarget,
        progress: ProgressFn,
    ) -> Result<AssetRecord>;

    async fn delete_asset(&self, id: AssetId) -> Result<()>;

    async fn list_folders(&self) -> Result<Vec<Folder>>;

    async fn create_folder(&self, name: &str, parent_id: Option<FolderId>) -> Result<Folder>;

    async fn delete_folder(&self, id: FolderId) -> Result<()>;

    async fn list_tags(&self) -> Result<Vec<TagCount>>;

    async fn list_smart_folders(&self) -> Result<Vec<SmartFolder>>;

    async fn create_smart_folder(&self, name: &str, query: &AssetQuery) -> Result<SmartFolder>;

    async fn smart_folder_assets(&self, id: i64) -> Result<Vec<AssetRecord>>;

    async fn list_annotations(&self, asset_id: AssetId) -> Result<Vec<Annotation>>;

    async fn create_annotation(&self, asset_id: AssetId, text: &str) -> Result<Annotation>;

    async fn delete_annotation(&self, id: i64) -> Result<()>;

    /// Distinct annotation texts across the library with their usage counts.
    async fn annotation_summary(&self) -> Result<Vec<AnnotationCount>>;
}
