//! Shutterstock studio search adapter.

use async_trait::async_trait;
use reqwest::{Client, Request};
use tracing::debug;

use super::dto::ShutterstockResponse;
use super::execute_json;
use crate::domain::entities::SearchResult;
use crate::domain::errors::SearchError;
use crate::domain::ports::SearchBackend;

const SEARCH_ENDPOINT: &str = "https://www.shutterstock.com/studioapi/images/search";

const FIXED_PARAMS: [(&str, &str); 4] = [
    ("allow_inject", "true"),
    ("fields[images]", "displays"),
    ("fields[images]", "alt"),
    ("filter[image_type]", "photo"),
];

/// Searches Shutterstock's public studio API. Tokens are page numbers.
pub struct ShutterstockBackend {
    client: Client,
    endpoint: String,
}

impl ShutterstockBackend {
    pub const IDENTIFIER: &'static str = "Shutterstock";

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
        params.push(("q", query.to_string()));
        if let Some(page) = after {
            let page: u32 = page.parse().map_err(|_| {
                SearchError::invalid_request(format!("bad page token {page:?}"))
            })?;
            params.push(("page[number]", page.to_string()));
        }
        params.push(("page[size]", count.to_string()));

        self.client
            .get(&self.endpoint)
            .query(&params)
            .build()
            .map_err(|e| SearchError::invalid_request(e.to_string()))
    }
}

#[async_trait]
impl SearchBackend for ShutterstockBackend {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn display_name(&self) -> &str {
        "Shutterstock"
    }

    async fn search(
        &self,
        query: &str,
        count: usize,
        after: Option<&str>,
    ) -> Result<SearchResult, SearchError> {
        let request = self.build_request(query, count, after)?;
        debug!(url = %request.url(), "Searching Shutterstock");

        let response: ShutterstockResponse =
            execute_json(&self.client, request, Self::IDENTIFIER).await?;
        Ok(response.into())
    }
}
