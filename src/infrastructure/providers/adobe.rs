//! Adobe Stock site search adapter.

use async_trait::async_trait;
use reqwest::{Client, Request};
use tracing::debug;

use super::dto::AdobeResponse;
use super::execute_json;
use crate::domain::entities::SearchResult;
use crate::domain::errors::SearchError;
use crate::domain::ports::SearchBackend;

const SEARCH_ENDPOINT: &str = "https://stock.adobe.com/Ajax/Search";

/// Photos only, no editorial or enterprise content.
const FIXED_PARAMS: [(&str, &str); 12] = [
    ("filters[content_type:photo]", "1"),
    ("filters[content_type:illustration]", "0"),
    ("filters[content_type:zip_vector]", "0"),
    ("filters[content_type:video]", "0"),
    ("filters[content_type:template]", "0"),
    ("filters[content_type:3d]", "0"),
    ("filters[include_stock_enterprise]", "0"),
    ("filters[content_type:image]", "1"),
    ("filters[is_editorial]", "0"),
    ("order", "relevance"),
    ("safe_search", "1"),
    ("search_type", "usertyped"),
];

/// Searches Adobe Stock's site search endpoint. Tokens are page numbers.
pub struct AdobeBackend {
    client: Client,
    endpoint: String,
}

impl AdobeBackend {
    pub const IDENTIFIER: &'static str = "Adobe";

    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, SEARCH_ENDPOINT)
    }

    #[must_use]
    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn build_request(
        &self,
        query: &str,
        count: usize,
        after: Option<&str>,
    ) -> Result<Request, SearchError> {
        let mut params: Vec<(&str, String)> = FIXED_PARAMS
            .iter()
            .map(|(k, v)| (*k, (*v).to_string()))
            .collect();
        params.push(("k", query.to_string()));
        if let Some(page) = after {
            let page: u32 = page.parse().map_err(|_| {
                SearchError::invalid_request(format!("bad page token {page:?}"))
            })?;
            params.push(("search_page", page.to_string()));
        }
        params.push(("limit", count.to_string()));

        self.client
            .get(&self.endpoint)
            .query(&params)
            .build()
            .map_err(|e| SearchError::invalid_request(e.to_string()))
    }
}

#[async_trait]
impl SearchBackend for AdobeBackend {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn display_name(&self) -> &str {
        "Adobe Stock"
    }

    async fn search(
        &self,
        query: &str,
        count: usize,
        after: Option<&str>,
    ) -> Result<SearchResult, SearchError> {
        let request = self.build_request(query, count, after)?;
        debug!(url = %request.url(), "Searching Adobe Stock");

        let response: AdobeResponse =
            execute_json(&self.client, request, Self::IDENTIFIER).await?;
        Ok(response.into())
    }
}
