use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::str::FromStr;

/// Pulls the API base URL and request headers out of a `curl` command copied
/// from the browser's network tab while the library web UI is open.
#[derive(Clone, Default)]
pub struct CurlParser {
    pub headers: Option<HeaderMap>,
    pub api_base: Option<String>,
}

impl CurlParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, curl_text: &str) -> Result<(), String> {
        let url = curl_text
            .find("curl '")
            .map(|start_idx| &curl_text[start_idx + "curl '".len()..])
            .and_then(|remaining| remaining.find('\'').map(|end_idx| &remaining[..end_idx]))
            .ok_or("Could not find a quoted URL in curl command".to_string())?;

        let api_base = Self::api_base_of(url)
            .ok_or("Could not find the /api segment in curl URL".to_string())?;

        let mut headers = HeaderMap::new();
        for line in curl_text.lines() {
            let line = line.trim_start();
            if !line.starts_with("-H '") {
                continue;
            }

            let content = line
                .trim_start_matches("-H '")
                .trim_end_matches(['\\', ' '])
                .trim_end_matches('\'');

            let Some((key, value)) = content.split_once(": ") else {
                continue;
            };

            // multipart boundaries and lengths belong to the captured request only
            let key = key.to_lowercase();
            if key == "content-type" || key == "content-length" {
                continue;
            }

            if let (Ok(name), Ok(value)) =
                (HeaderName::from_str(&key), HeaderValue::from_str(value))
            {
                headers.insert(name, value);
            }
        }

        self.api_base = Some(api_base);
        self.headers = Some(headers);

        Ok(())
    }

    fn api_base_of(url: &str) -> Option<String> {
        let without_query = url.split(['?', '#']).next()?;
        let idx = without_query.find("/api")?;
        let end = idx + "/api".len();
        match without_query[end..].chars().next() {
            None | Some('/') => Some(without_query[..end].to_string()),
            Some(_) => None,
        }
    }
}
