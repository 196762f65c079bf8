use super::models::FolderId;
use serde_json::{Map, Value};

/// Filter set understood by the asset listing endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetQuery {
    pub q: Option<String>,
    pub tags: Vec<String>,
    pub annotations: Vec<String>,
    pub folder_ids: Vec<FolderId>,
    pub formats: Vec<String>,
    pub media_type: Option<String>,
    pub min_w: Option<u32>,
    pub max_w: Option<u32>,
    pub min_h: Option<u32>,
    pub max_h: Option<u32>,
    pub colors: Vec<String>,
    pub color_threshold: Option<f64>,
}

const NUMERIC_PARAMS: [&str; 5] = ["min_w", "max_w", "min_h", "max_h", "color_threshold"];

fn join<T: ToString>(values: &[T]) -> Option<String> {
    let joined = values
        .iter()
        .map(|v| v.to_string())
        .filter(|v| !v.trim().is_empty())
        .collect::<Vec<_>>()
        .join(",");
    (!joined.is_empty()).then_some(joined)
}

impl AssetQuery {
    pub fn in_folder(folder_id: FolderId) -> Self {
        Self {
            folder_ids: vec![folder_id],
            ..Self::default()
        }
    }

    /// Query-string pairs; multi-valued filters are comma-joined.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(q) = self.q.as_ref().filter(|q| !q.trim().is_empty()) {
            params.push(("q", q.clone()));
        }
        if let Some(tags) = join(&self.tags) {
            params.push(("tags", tags));
        }
        if let Some(annotations) = join(&self.annotations) {
            params.push(("annotations", annotations));
        }
        if let Some(folders) = join(&self.folder_ids) {
            params.push(("folder_id", folders));
        }
        let formats: Vec<String> = self.formats.iter().map(|f| f.to_lowercase()).collect();
        if let Some(formats) = join(&formats) {
            params.push(("format", formats));
        }
        if let Some(media_type) = &self.media_type {
            params.push(("media_type", media_type.clone()));
        }
        for (key, value) in self.bounds() {
            if let Some(value) = value {
                params.push((key, value.to_string()));
            }
        }
        if let Some(colors) = join(&self.colors) {
            params.push(("color", colors));
            if let Some(threshold) = self.color_threshold {
                params.push(("color_threshold", threshold.to_string()));
            }
        }
        params
    }

    /// JSON object form stored with smart folders. The backend replays it as keyword
    /// arguments, so bounds and the color threshold stay numbers.
    pub fn to_json(&self) -> Value {
        let mut map: Map<String, Value> = self
            .to_params()
            .into_iter()
            .filter(|(k, _)| !NUMERIC_PARAMS.contains(k))
            .map(|(k, v)| (k.to_string(), Value::String(v)))
            .collect();
        for (key, value) in self.bounds() {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::from(value));
            }
        }
        if let (true, Some(threshold)) = (map.contains_key("color"), self.color_threshold) {
            map.insert("color_threshold".to_string(), Value::from(threshold));
        }
        Value::Object(map)
    }

    fn bounds(&self) -> [(&'static str, Option<u32>); 4] {
        [
            ("min_w", self.min_w),
            ("max_w", self.max_w),
            ("min_h", self.min_h),
            ("max_h", self.max_h),
        ]
    }
}
