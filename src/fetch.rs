//! Corpus fetching.
//!
//! The remote corpus is a paginated JSON read endpoint. [`CorpusFetcher`] is
//! the seam the sync algorithm depends on; [`HttpCorpusFetcher`] is the
//! reqwest-backed implementation. Both fetch variants return documents
//! ordered by `updated_at` descending, so the first document of a non-empty
//! result is the most recent one.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::document::Document;

/// Default number of documents requested per page.
const DEFAULT_PAGE_SIZE: usize = 100;

/// Retry configuration for HTTP requests.
const DEFAULT_MAX_RETRIES: u32 = 5;
const INITIAL_DELAY_MS: u64 = 125;

/// Read access to the remote corpus.
///
/// `fetch_since` must apply strictly-after semantics to the watermark: a
/// document whose `updated_at` equals the watermark was the anchor of the
/// previous sync and must not be returned again.
#[allow(async_fn_in_trait)]
pub trait CorpusFetcher {
    /// The migration tag currently advertised for the corpus shape.
    fn schema_version(&self) -> &str;

    /// Fetch every document, ordered by `updated_at` descending.
    async fn fetch_all(&self) -> Result<Vec<Document>, String>;

    /// Fetch documents with `updated_at` strictly greater than `watermark`,
    /// ordered by `updated_at` descending.
    async fn fetch_since(&self, watermark: &str) -> Result<Vec<Document>, String>;
}

/// Execute an async operation with exponential backoff retry.
///
/// Retries with delays of 125ms, 250ms, 500ms, ... between attempts.
async fn fetch_with_retry<T, F, Fut>(
    operation: F,
    operation_name: &str,
    max_retries: u32,
) -> Result<T, String>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, String>>,
{
    let mut last_error = String::new();
    for attempt in 0..max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                last_error = e;
                if attempt < max_retries - 1 {
                    let delay = INITIAL_DELAY_MS * (1 << attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries,
                        delay_ms = delay,
                        operation = operation_name,
                        error = %last_error,
                        "Corpus fetch failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }
    Err(format!(
        "{operation_name}: {last_error} (after {max_retries} attempts)"
    ))
}

/// One page of the remote corpus endpoint.
#[derive(Debug, Deserialize)]
struct WirePage {
    #[serde(default)]
    documents: Vec<WireDocument>,
    meta: Option<WireMeta>,
}

#[derive(Debug, Deserialize)]
struct WireMeta {
    pagination: Option<WirePagination>,
}

#[derive(Debug, Deserialize)]
struct WirePagination {
    #[serde(default)]
    pages: Option<u32>,
}

/// A document as the endpoint returns it. `id` and `updated_at` may be
/// missing on malformed entries; those are skipped individually rather than
/// aborting the whole batch.
#[derive(Debug, Deserialize)]
struct WireDocument {
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "plaintext")]
    body: String,
    #[serde(default)]
    url: String,
    updated_at: Option<String>,
    #[serde(default)]
    visibility: String,
}

impl WireDocument {
    fn into_document(self) -> Option<Document> {
        let (Some(id), Some(updated_at)) = (self.id, self.updated_at) else {
            warn!("Skipping corpus document without id or updated_at");
            return None;
        };
        Some(Document {
            id,
            title: self.title,
            body: self.body,
            url: self.url,
            updated_at,
            visibility: self.visibility,
        })
    }
}

/// Paginated HTTP corpus fetcher.
///
/// Requests `GET {base_url}/documents` with `order`, `limit` and `page`
/// query parameters, plus `updated_after` for incremental fetches and an
/// optional `key` for authenticated endpoints.
#[derive(Debug, Clone)]
pub struct HttpCorpusFetcher {
    client: reqwest::Client,
    base_url: String,
    schema_version: String,
    api_key: Option<String>,
    page_size: usize,
    max_retries: u32,
}

impl HttpCorpusFetcher {
    pub fn new(base_url: impl Into<String>, schema_version: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            schema_version: schema_version.into(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Send `key={api_key}` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    async fn fetch_page(&self, page: u32, updated_after: Option<&str>) -> Result<WirePage, String> {
        let url = format!("{}/documents", self.base_url.trim_end_matches('/'));
        let mut query: Vec<(&str, String)> = vec![
            ("order", "updated_at desc".to_string()),
            ("limit", self.page_size.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(watermark) = updated_after {
            query.push(("updated_after", watermark.to_string()));
        }
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }

        self.client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch {url}: {e}"))?
            .error_for_status()
            .map_err(|e| format!("Corpus endpoint {url} returned error: {e}"))?
            .json::<WirePage>()
            .await
            .map_err(|e| format!("Invalid JSON from corpus endpoint {url}: {e}"))
    }

    async fn fetch_documents(&self, updated_after: Option<&str>) -> Result<Vec<Document>, String> {
        let mut documents = Vec::new();
        let mut page = 1u32;
        loop {
            let fetched = fetch_with_retry(
                || self.fetch_page(page, updated_after),
                &format!("fetch corpus page {page}"),
                self.max_retries,
            )
            .await?;

            let total_pages = fetched
                .meta
                .as_ref()
                .and_then(|m| m.pagination.as_ref())
                .and_then(|p| p.pages)
                .unwrap_or(1);

            documents.extend(
                fetched
                    .documents
                    .into_iter()
                    .filter_map(WireDocument::into_document),
            );

            if page >= total_pages {
                break;
            }
            page += 1;
        }
        debug!(
            documents = documents.len(),
            incremental = updated_after.is_some(),
            "Fetched corpus documents"
        );
        Ok(documents)
    }
}

impl CorpusFetcher for HttpCorpusFetcher {
    fn schema_version(&self) -> &str {
        &self.schema_version
    }

    async fn fetch_all(&self) -> Result<Vec<Document>, String> {
        self.fetch_documents(None).await
    }

    async fn fetch_since(&self, watermark: &str) -> Result<Vec<Document>, String> {
        self.fetch_documents(Some(watermark)).await
    }
}
