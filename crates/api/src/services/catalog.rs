//! Catalog gateway.
//!
//! Read-only client for a Google-Books-shaped volumes API. Responses
//! are cached in-memory via `moka` (1 hour TTL); only catalog data is
//! ever cached, never per-user state.
//!
//! Volumes without a list price get the configured default price, so
//! pricing is deterministic for a given catalog response.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors from the catalog gateway.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP transport failure (connect, timeout, decode).
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("catalog upstream returned {0}")]
    Upstream(reqwest::StatusCode),

    /// Volume does not exist.
    #[error("book not found: {0}")]
    NotFound(String),
}

/// Catalog gateway configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Volumes API base URL, e.g. `https://www.googleapis.com/books/v1`.
    pub base_url: String,
    /// Optional API key appended to requests.
    pub api_key: Option<String>,
    /// Subject searched when a browse request carries no query; the
    /// volumes API rejects an empty `q`.
    pub default_subject: String,
    /// Price used when a volume carries no list price.
    pub default_price: Decimal,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/books/v1".to_owned(),
            api_key: None,
            default_subject: "fiction".to_owned(),
            default_price: Decimal::from(1500),
            timeout: Duration::from_secs(10),
        }
    }
}

/// A catalog book, normalized for the storefront.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    pub price: Decimal,
}

/// One page of search results.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Book>,
    pub total: i64,
}

// Wire shapes of the volumes API. Only the fields we read.

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default, rename = "totalItems")]
    total_items: i64,
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: String,
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
    #[serde(rename = "saleInfo")]
    sale_info: Option<SaleInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    description: Option<String>,
    #[serde(rename = "imageLinks")]
    image_links: Option<ImageLinks>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
    #[serde(rename = "smallThumbnail")]
    small_thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaleInfo {
    #[serde(rename = "listPrice")]
    list_price: Option<ListPrice>,
}

#[derive(Debug, Deserialize)]
struct ListPrice {
    amount: Option<Decimal>,
}

#[derive(Clone)]
enum CacheValue {
    Book(Box<Book>),
    Page(Page),
}

/// Client for the volumes API with a read-through cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    config: CatalogConfig,
    cache: Cache<String, CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Http` if the HTTP client cannot be built.
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(3600))
            .build();

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                config,
                cache,
            }),
        })
    }

    /// Search the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Upstream` or `CatalogError::Http` when
    /// the volumes API misbehaves.
    pub async fn search(
        &self,
        query: &str,
        start_index: u32,
        max_results: u32,
    ) -> Result<Page, CatalogError> {
        let cache_key = format!("search:{query}:{start_index}:{max_results}");
        if let Some(CacheValue::Page(page)) = self.inner.cache.get(&cache_key).await {
            debug!(query, "catalog cache hit");
            return Ok(page);
        }

        let response = self
            .volumes_request(
                "/volumes",
                &[
                    ("q", query.to_owned()),
                    ("startIndex", start_index.to_string()),
                    ("maxResults", max_results.to_string()),
                ],
            )
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CatalogError::Upstream(response.status()));
        }
        let body: VolumesResponse = response.json().await?;

        let page = Page {
            total: body.total_items,
            items: body
                .items
                .into_iter()
                .map(|v| convert(v, self.inner.config.default_price))
                .collect(),
        };
        self.inner
            .cache
            .insert(cache_key, CacheValue::Page(page.clone()))
            .await;
        Ok(page)
    }

    /// Fetch a single volume by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for unknown ids.
    pub async fn get_by_id(&self, id: &str) -> Result<Book, CatalogError> {
        let cache_key = format!("book:{id}");
        if let Some(CacheValue::Book(book)) = self.inner.cache.get(&cache_key).await {
            debug!(id, "catalog cache hit");
            return Ok(*book);
        }

        let response = self
            .volumes_request(&format!("/volumes/{id}"), &[])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(id.to_owned()));
        }
        if !response.status().is_success() {
            return Err(CatalogError::Upstream(response.status()));
        }
        let volume: Volume = response.json().await?;

        let book = convert(volume, self.inner.config.default_price);
        self.inner
            .cache
            .insert(cache_key, CacheValue::Book(Box::new(book.clone())))
            .await;
        Ok(book)
    }

    /// Build a request against the volumes API. `reqwest` percent-encodes
    /// the query pairs, including the API key.
    fn volumes_request(&self, path: &str, params: &[(&str, String)]) -> reqwest::RequestBuilder {
        let mut request = self
            .inner
            .client
            .get(format!("{}{path}", self.inner.config.base_url))
            .query(params);
        if let Some(key) = &self.inner.config.api_key {
            request = request.query(&[("key", key)]);
        }
        request
    }
}

/// Normalize a volumes API record into a [`Book`].
fn convert(volume: Volume, default_price: Decimal) -> Book {
    let info = volume.volume_info;
    let thumbnail = info
        .image_links
        .and_then(|l| l.thumbnail.or(l.small_thumbnail));
    let price = volume
        .sale_info
        .and_then(|s| s.list_price)
        .and_then(|p| p.amount)
        .unwrap_or(default_price);

    Book {
        id: volume.id,
        title: info.title,
        authors: info.authors,
        description: info.description,
        thumbnail,
        categories: info.categories,
        published_date: info.published_date,
        price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_price() -> Decimal {
        Decimal::from(1500)
    }

    #[test]
    fn converts_a_full_volume() {
        let volume: Volume = serde_json::from_value(serde_json::json!({
            "id": "abc123",
            "volumeInfo": {
                "title": "The Rust Programming Language",
                "authors": ["Steve Klabnik", "Carol Nichols"],
                "description": "A book about Rust.",
                "imageLinks": { "thumbnail": "http://img/t.jpg" },
                "categories": ["Computers"],
                "publishedDate": "2019-08-12"
            },
            "saleInfo": { "listPrice": { "amount": "2499.00", "currencyCode": "INR" } }
        }))
        .unwrap();

        let book = convert(volume, default_price());
        assert_eq!(book.id, "abc123");
        assert_eq!(book.authors.len(), 2);
        assert_eq!(book.thumbnail.as_deref(), Some("http://img/t.jpg"));
        assert_eq!(book.price, Decimal::new(249_900, 2));
    }

    #[test]
    fn missing_list_price_uses_the_default() {
        let volume: Volume = serde_json::from_value(serde_json::json!({
            "id": "x",
            "volumeInfo": { "title": "Bare" }
        }))
        .unwrap();

        let book = convert(volume, default_price());
        assert_eq!(book.price, default_price());
        assert!(book.authors.is_empty());
        assert!(book.thumbnail.is_none());
    }

    #[test]
    fn falls_back_to_small_thumbnail() {
        let volume: Volume = serde_json::from_value(serde_json::json!({
            "id": "x",
            "volumeInfo": {
                "title": "T",
                "imageLinks": { "smallThumbnail": "http://img/s.jpg" }
            }
        }))
        .unwrap();

        let book = convert(volume, default_price());
        assert_eq!(book.thumbnail.as_deref(), Some("http://img/s.jpg"));
    }

    #[test]
    fn requests_encode_query_and_api_key() {
        let client = CatalogClient::new(CatalogConfig {
            base_url: "https://books.test/v1".to_owned(),
            api_key: Some("k&y=1".to_owned()),
            ..CatalogConfig::default()
        })
        .unwrap();

        let request = client
            .volumes_request("/volumes", &[("q", "harry potter & me".to_owned())])
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://books.test/v1/volumes?q=harry+potter+%26+me&key=k%26y%3D1"
        );
    }

    #[test]
    fn requests_without_parameters_carry_no_query() {
        let client = CatalogClient::new(CatalogConfig {
            base_url: "https://books.test/v1".to_owned(),
            ..CatalogConfig::default()
        })
        .unwrap();

        let request = client.volumes_request("/volumes/abc123", &[]).build().unwrap();
        assert_eq!(request.url().as_str(), "https://books.test/v1/volumes/abc123");
    }
}
