use crate::error::{IngestError, Result};
use crate::utils::curl_parser::CurlParser;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 3;
pub const DEFAULT_COLOR_THRESHOLD: f64 = 28.0;
pub const DEFAULT_COLOR_FILTER_THRESHOLD: f64 = 60.0;
pub const DEFAULT_READ_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub headers: HeaderMap,
    pub upload_concurrency: usize,
    /// Merge distance used when clustering swatches into color facets.
    pub color_threshold: f64,
    /// Distance the backend uses when filtering by a selected color.
    pub color_filter_threshold: f64,
    /// Entries pulled per directory read when expanding dropped folders.
    pub read_page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            headers: HeaderMap::new(),
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            color_threshold: DEFAULT_COLOR_THRESHOLD,
            color_filter_threshold: DEFAULT_COLOR_FILTER_THRESHOLD,
            read_page_size: DEFAULT_READ_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    api_base: Option<String>,
    upload_concurrency: Option<usize>,
    color_threshold: Option<f64>,
    color_filter_threshold: Option<f64>,
    read_page_size: Option<usize>,
}

impl ClientConfig {
    /// Defaults, then the JSON file named by `MEAGLE_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("MEAGLE_CONFIG") {
            config.merge_file(Path::new(&path))?;
        }
        config.merge_env(|key| std::env::var(key).ok())?;
        Ok(config.normalized())
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let file: FileConfig = serde_json::from_str(&content)?;
        if let Some(api_base) = file.api_base {
            self.api_base = api_base;
        }
        if let Some(concurrency) = file.upload_concurrency {
            self.upload_concurrency = concurrency;
        }
        if let Some(threshold) = file.color_threshold {
            self.color_threshold = threshold;
        }
        if let Some(threshold) = file.color_filter_threshold {
            self.color_filter_threshold = threshold;
        }
        if let Some(page) = file.read_page_size {
            self.read_page_size = page;
        }
        Ok(())
    }

    fn merge_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("MEAGLE_API_URL") {
            self.api_base = url;
        }
        if let Some(value) = var("MEAGLE_UPLOAD_CONCURRENCY") {
            self.upload_concurrency = value.trim().parse().map_err(|_| {
                IngestError::Config(format!("MEAGLE_UPLOAD_CONCURRENCY is not a number: {value}"))
            })?;
        }
        Ok(())
    }

    /// Takes the API base and headers from a pasted curl command.
    pub fn apply_curl(&mut self, curl_text: &str) -> Result<()> {
        let mut parser = CurlParser::new();
        parser.parse(curl_text).map_err(IngestError::Config)?;
        if let Some(api_base) = parser.api_base {
            self.api_base = api_base;
        }
        if let Some(headers) = parser.headers {
            self.headers = headers;
        }
        Ok(())
    }

    pub fn normalized(mut self) -> Self {
        self.api_base = self.api_base.trim_end_matches('/').to_string();
        self.upload_concurrency = self.upload_concurrency.max(1);
        self.read_page_size = self.read_page_size.max(1);
        self
    }
}
