//! Record sources: where tick and problem snapshots come from.
//!
//! Provides the `RecordSource` trait with a JSON file implementation and
//! a REST API implementation. Both hand back decoded records, so the
//! pipeline stays independent of where the data was fetched.

use std::future::Future;
use std::path::{Path, PathBuf};

use karst_model::wire::{
    decode_problems_value, decode_ticks_value, next_page, DecodeError, Decoded,
};
use karst_model::{AscentRecord, ProblemRecord};
use serde_json::Value;
use thiserror::Error;

/// Errors from fetching records.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed: HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Trait for record sources (REST API, exported JSON files).
pub trait RecordSource {
    /// Fetch the current user's ticks.
    fn fetch_ticks(
        &self,
    ) -> impl Future<Output = Result<Decoded<AscentRecord>, SourceError>> + Send;

    /// Fetch the problem listing.
    fn fetch_problems(
        &self,
    ) -> impl Future<Output = Result<Decoded<ProblemRecord>, SourceError>> + Send;

    /// Get the source name for logging.
    fn name(&self) -> &'static str;
}

/// A JSON document on disk, in any envelope the API produces.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Value, SourceError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_str(&text).map_err(|e| SourceError::Decode(e.into()))
    }
}

impl RecordSource for FileSource {
    async fn fetch_ticks(&self) -> Result<Decoded<AscentRecord>, SourceError> {
        let decoded = decode_ticks_value(self.read().await?)?;
        log_decoded(self.name(), "ticks", decoded.records.len(), decoded.skipped);
        Ok(decoded)
    }

    async fn fetch_problems(&self) -> Result<Decoded<ProblemRecord>, SourceError> {
        let decoded = decode_problems_value(self.read().await?)?;
        log_decoded(self.name(), "problems", decoded.records.len(), decoded.skipped);
        Ok(decoded)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the API server
    pub base_url: String,
    /// Bearer token for authenticated endpoints
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of paginated responses to follow
    pub max_pages: usize,
    pub ticks_path: String,
    pub problems_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            token: None,
            timeout_secs: 30,
            max_pages: 50,
            ticks_path: "/api/ticks/".to_string(),
            problems_path: "/api/problems/".to_string(),
        }
    }
}

/// The REST API of the climbing database.
pub struct ApiSource {
    config: ApiConfig,
    client: reqwest::Client,
}

impl ApiSource {
    pub fn new(config: ApiConfig) -> Result<Self, SourceError> {
        if config.max_pages == 0 {
            return Err(SourceError::Config("max_pages must be at least 1".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Absolute URL of an API path.
    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `next` links are usually absolute, but may be server-relative.
    fn resolve_next(&self, next: &str) -> String {
        if next.starts_with("http://") || next.starts_with("https://") {
            next.to_string()
        } else {
            self.endpoint(next)
        }
    }

    async fn get(&self, url: &str) -> Result<Value, SourceError> {
        tracing::debug!(url = %url, "Fetching page");

        let mut request = self.client.get(url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))
    }

    /// Fetch a listing, following `next` links up to `max_pages`.
    async fn fetch_all<T>(
        &self,
        path: &str,
        decode: fn(Value) -> Result<Decoded<T>, DecodeError>,
    ) -> Result<Decoded<T>, SourceError> {
        let mut decoded = Decoded::default();
        let mut url = Some(self.endpoint(path));
        let mut pages = 0;

        while let Some(current) = url.take() {
            if pages == self.config.max_pages {
                tracing::warn!(
                    path = %path,
                    max_pages = self.config.max_pages,
                    "Page limit reached, listing truncated"
                );
                break;
            }

            let document = self.get(&current).await?;
            url = next_page(&document).map(|next| self.resolve_next(&next));
            decoded.extend(decode(document)?);
            pages += 1;
        }

        Ok(decoded)
    }
}

impl RecordSource for ApiSource {
    async fn fetch_ticks(&self) -> Result<Decoded<AscentRecord>, SourceError> {
        let decoded = self
            .fetch_all(&self.config.ticks_path, decode_ticks_value)
            .await?;
        log_decoded(self.name(), "ticks", decoded.records.len(), decoded.skipped);
        Ok(decoded)
    }

    async fn fetch_problems(&self) -> Result<Decoded<ProblemRecord>, SourceError> {
        let decoded = self
            .fetch_all(&self.config.problems_path, decode_problems_value)
            .await?;
        log_decoded(self.name(), "problems", decoded.records.len(), decoded.skipped);
        Ok(decoded)
    }

    fn name(&self) -> &'static str {
        "api"
    }
}

fn log_decoded(source: &str, kind: &str, records: usize, skipped: usize) {
    if skipped > 0 {
        tracing::warn!(
            source = source,
            kind = kind,
            records = records,
            skipped = skipped,
            "Skipped malformed records"
        );
    } else {
        tracing::debug!(source = source, kind = kind, records = records, "Loaded records");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn api(base_url: &str) -> ApiSource {
        ApiSource::new(ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_slashes() {
        let source = api("http://climb.test/");
        assert_eq!(source.endpoint("/api/ticks/"), "http://climb.test/api/ticks/");
        assert_eq!(api("http://climb.test").endpoint("api/problems/"), "http://climb.test/api/problems/");
    }

    #[test]
    fn test_resolve_next() {
        let source = api("http://climb.test");
        assert_eq!(
            source.resolve_next("https://other.test/api/ticks/?page=2"),
            "https://other.test/api/ticks/?page=2"
        );
        assert_eq!(
            source.resolve_next("/api/ticks/?page=3"),
            "http://climb.test/api/ticks/?page=3"
        );
    }

    #[test]
    fn test_zero_page_limit_is_rejected() {
        let config = ApiConfig {
            max_pages: 0,
            ..Default::default()
        };
        assert!(matches!(ApiSource::new(config), Err(SourceError::Config(_))));
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("karst-source-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_file_source_reads_ticks() {
        let path = temp_file(
            "ticks.json",
            r#"{"results": [{"id": 1, "problem": {"id": 2, "name": "Roof", "grade": "7A"}}, {"bad": true}]}"#,
        );
        let decoded = FileSource::new(&path).fetch_ticks().await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.skipped, 1);
        assert_eq!(decoded.records[0].effective_grade(), Some("7A"));
    }

    #[tokio::test]
    async fn test_file_source_errors() {
        let missing = FileSource::new(std::env::temp_dir().join("karst-source-does-not-exist.json"));
        assert!(matches!(missing.fetch_ticks().await, Err(SourceError::Io { .. })));

        let path = temp_file("broken.json", "not json");
        let result = FileSource::new(&path).fetch_problems().await;
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(SourceError::Decode(DecodeError::Json(_)))));
    }
}
