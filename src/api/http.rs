use super::{
    Annotation, AnnotationCount, AssetApi, AssetId, AssetQuery, AssetRecord, Folder, FolderId,
    ProgressFn, SmartFolder, TagCount, UploadTarget,
};
use crate::config::ClientConfig;
use crate::error::{IngestError, Result};
use crate::upload::FileDescriptor;
use crate::utils::paths::{sanitize_path, split_dir_file};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, trace};

const UPLOAD_CHUNK: usize = 64 * 1024;

/// `AssetApi` over the library's REST endpoints.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    api_base: String,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .default_headers(config.headers.clone())
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        operation: &'static str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // error bodies look like {"detail": "..."}
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
                .unwrap_or(body);
            debug!("{operation} rejected: {} {}", status.as_u16(), message);
            return Err(IngestError::Rejected {
                operation,
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn expect_ok(response: Response, operation: &'static str) -> Result<()> {
        Self::read_json::<serde_json::Value>(response, operation)
            .await
            .map(|_| ())
    }
}

/// Streams `content` in chunks, reporting the running byte count as the transport pulls them.
fn progress_body(content: Vec<u8>, progress: ProgressFn) -> Body {
    let chunks: Vec<Vec<u8>> = content.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
    let mut sent = 0u64;
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        progress(sent);
        Ok::<_, std::io::Error>(chunk)
    });
    Body::wrap_stream(stream)
}

#[async_trait]
impl AssetApi for HttpApi {
    async fn list_assets(&self, query: &AssetQuery) -> Result<Vec<AssetRecord>> {
        let response = self
            .client
            .get(self.url("/assets"))
            .query(&query.to_params())
            .send()
            .await?;
        Self::read_json(response, "list assets").await
    }

    async fn upload_asset(
        &self,
        file: FileDescriptor,
        target: &UploadTarget,
        progress: ProgressFn,
    ) -> Result<AssetRecord> {
        let content = file.handle.read().await?;
        let length = content.len() as u64;
        let relative_path = sanitize_path(&file.relative_path);
        let (_, file_name) = if relative_path.is_empty() {
            split_dir_file(&file.name)
        } else {
            split_dir_file(&relative_path)
        };
        trace!("uploading {} ({} bytes)", file_name, length);

        let part = Part::stream_with_length(progress_body(content, progress), length)
            .file_name(file_name);
        let mut form = Form::new()
            .part("file", part)
            .text("folder_id", target.folder_id.to_string());
        if !target.tags.is_empty() {
            form = form.text("tags", target.tags.join(","));
        }
        if !relative_path.is_empty() {
            form = form.text("relative_path", relative_path);
        }

        let response = self
            .client
            .post(self.url("/assets"))
            .multipart(form)
            .send()
            .await?;
        Self::read_json(response, "upload").await
    }

    async fn delete_asset(&self, id: AssetId) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/assets/{id}")))
            .send()
            .await?;
        Self::expect_ok(response, "delete asset").await
    }

    async fn list_folders(&self) -> Result<Vec<Folder>> {
        let response = self.client.get(self.url("/folders")).send().await?;
        Self::read_json(response, "list folders").await
    }

    async fn create_folder(&self, name: &str, parent_id: Option<FolderId>) -> Result<Folder> {
        let response = self
            .client
            .post(self.url("/folders"))
            .json(&json!({ "name": name, "parent_id": parent_id }))
            .send()
            .await?;
        Self::read_json(response, "create folder").await
    }

    async fn delete_folder(&self, id: FolderId) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/folders/{id}")))
            .send()
            .await?;
        Self::expect_ok(response, "delete folder").await
    }

    async fn list_tags(&self) -> Result<Vec<TagCount>> {
        let response = self.client.get(self.url("/tags")).send().await?;
        Self::read_json(response, "list tags").await
    }

    async fn list_smart_folders(&self) -> Result<Vec<SmartFolder>> {
        let response = self.client.get(self.url("/smart-folders")).send().await?;
        Self::read_json(response, "list smart folders").await
    }

    async fn create_smart_folder(&self, name: &str, query: &AssetQuery) -> Result<SmartFolder> {
        let response = self
            .client
            .post(self.url("/smart-folders"))
            .json(&json!({ "name": name, "query": query.to_json() }))
            .send()
            .await?;
        Self::read_json(response, "create smart folder").await
    }

    async fn smart_folder_assets(&self, id: i64) -> Result<Vec<AssetRecord>> {
        let response = self
            .client
            .get(self.url(&format!("/smart-folders/{id}/assets")))
            .send()
            .await?;
        Self::read_json(response, "smart folder assets").await
    }

    async fn list_annotations(&self, asset_id: AssetId) -> Result<Vec<Annotation>> {
        let response = self
            .client
            .get(self.url(&format!("/assets/{asset_id}/annotations")))
            .send()
            .await?;
        Self::read_json(response, "list annotations").await
    }

    async fn create_annotation(&self, asset_id: AssetId, text: &str) -> Result<Annotation> {
        let response = self
            .client
            .post(self.url(&format!("/assets/{asset_id}/annotations")))
            .json(&json!({ "kind": "text", "data": { "text": text } }))
            .send()
            .await?;
        Self::read_json(response, "create annotation").await
    }

    async fn delete_annotation(&self, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/annotations/{id}")))
            .send()
            .await?;
        Self::expect_ok(response, "delete annotation").await
    }

    async fn annotation_summary(&self) -> Result<Vec<AnnotationCount>> {
        let response = self.client.get(self.url("/annotations")).send().await?;
        Self::read_json(response, "annotation summary").await
    }
}
