//! Catalog route handlers (public, read-only).

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::error::Result;
use crate::services::catalog::{Book, Page};
use crate::state::AppState;

const MAX_PAGE_SIZE: u32 = 40;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub start_index: u32,
    #[serde(default = "default_page_size")]
    pub max_results: u32,
}

impl SearchParams {
    /// The query to search, falling back to the configured subject so a
    /// bare browse request still returns results.
    fn query_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let q = self.q.trim();
        if q.is_empty() { fallback } else { q }
    }
}

const fn default_page_size() -> u32 {
    20
}

/// GET /api/books
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page>> {
    let query = params.query_or(&state.config().catalog.default_subject);
    let max_results = params.max_results.min(MAX_PAGE_SIZE);
    let page = state
        .catalog()
        .search(query, params.start_index, max_results)
        .await?;
    Ok(Json(page))
}

/// GET /api/books/{id}
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Book>> {
    let book = state.catalog().get_by_id(&id).await?;
    Ok(Json(book))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(value: serde_json::Value) -> SearchParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn blank_queries_fall_back_to_the_default_subject() {
        assert_eq!(params(serde_json::json!({})).query_or("fiction"), "fiction");
        assert_eq!(
            params(serde_json::json!({ "q": "   " })).query_or("fiction"),
            "fiction"
        );
    }

    #[test]
    fn explicit_queries_are_passed_through() {
        assert_eq!(
            params(serde_json::json!({ "q": "rust" })).query_or("fiction"),
            "rust"
        );
    }
}
