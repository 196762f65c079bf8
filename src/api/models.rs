use serde::{Deserialize, Serialize};

pub type AssetId = i64;
pub type FolderId = i64;

/// One library asset as the backend reports it. Only read, never mutated here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRecord {
    pub id: AssetId,
    pub filename: String,
    pub stored_name: String,
    pub preview_name: Option<String>,
    pub media_type: String,
    pub mime: Option<String>,
    pub format: Option<String>,
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_ms: Option<u64>,
    pub folder_id: Option<FolderId>,
    pub note: Option<String>,
    pub colors: Vec<String>,
    pub created_at: String,
    pub tags: Vec<String>,
    pub url: String,
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub parent_id: Option<FolderId>,
    pub path: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCount {
    pub name: String,
    pub count: u64,
}

/// A saved filter set. The query is kept as the backend's raw parameter object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartFolder {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub query: serde_json::Value,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: i64,
    pub asset_id: AssetId,
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub created_at: String,
}

impl Annotation {
    pub fn text(&self) -> Option<&str> {
        self.data.get("text").and_then(|t| t.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationCount {
    pub text: String,
    pub count: u64,
}
