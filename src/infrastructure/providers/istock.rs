//! iStock site search adapter.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::ACCEPT;
use reqwest::{Client, Request};
use tracing::debug;

use super::dto::IStockResponse;
use super::execute_json;
use crate::domain::entities::{Photo, SearchResult};
use crate::domain::errors::SearchError;
use crate::domain::ports::SearchBackend;

const SEARCH_ENDPOINT: &str = "https://www.istockphoto.com/us/search/2/image";

const FIXED_PARAMS: [(&str, &str); 4] = [
    ("excludenudity", "true"),
    ("assettype", "image"),
    ("mediatype", "photography"),
    ("sort", "best"),
];

/// Photos fetched beyond the requested count, served before the next fetch.
#[derive(Default)]
struct Withheld {
    query: Option<String>,
    photos: Vec<Photo>,
}

/// Searches iStock. Tokens are page numbers.
///
/// iStock ignores the requested page size, so surplus photos are withheld
/// and handed out first on the next continuation of the same query. A
/// request without a token, or for another query, drops the surplus.
pub struct IStockBackend {
    client: Client,
    endpoint: String,
    withheld: Mutex<Withheld>,
}

impl IStockBackend {
    pub const IDENTIFIER: &'static str = "iStock";

    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, SEARCH_ENDPOINT)
    }

    #[must_use]
    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            withheld: Mutex::new(Withheld::default()),
        }
    }

    fn build_request(&self, query: &str, after: Option<&str>) -> Result<Request, SearchError> {
        let mut params: Vec<(&str, String)> = FIXED_PARAMS
            .iter()
            .map(|(k, v)| (*k, (*v).to_string()))
            .collect();
        params.push(("phrase", query.to_string()));
        if let Some(page) = after {
            let page: u32 = page.parse().map_err(|_| {
                SearchError::invalid_request(format!("bad page token {page:?}"))
            })?;
            params.push(("page", page.to_string()));
        }

        self.client
            .get(&self.endpoint)
            .query(&params)
            .header(ACCEPT, "application/json")
            .build()
            .map_err(|e| SearchError::invalid_request(e.to_string()))
    }

    /// Serves a page from withheld photos when enough are held for `query`.
    fn take_withheld(&self, query: &str, count: usize, after: Option<&str>) -> Option<SearchResult> {
        let mut withheld = self.withheld.lock();
        if after.is_none() || withheld.query.as_deref() != Some(query) {
            withheld.query = Some(query.to_string());
            withheld.photos.clear();
            return None;
        }
        if withheld.photos.len() < count {
            return None;
        }
        let photos = withheld.photos.drain(..count).collect();
        Some(SearchResult::new(photos, after.map(str::to_string)))
    }

    /// Prepends withheld photos to a fetched page and keeps anything past
    /// `count` for later. The last page is returned whole.
    fn merge(&self, query: &str, count: usize, fetched: SearchResult) -> SearchResult {
        let mut withheld = self.withheld.lock();
        if withheld.query.as_deref() != Some(query) {
            withheld.query = Some(query.to_string());
            withheld.photos.clear();
        }
        let mut photos = std::mem::take(&mut withheld.photos);
        photos.extend(fetched.photos);
        if fetched.continuation_token.is_some() && photos.len() > count {
            withheld.photos = photos.split_off(count);
        }
        SearchResult::new(photos, fetched.continuation_token)
    }
}

#[async_trait]
impl SearchBackend for IStockBackend {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn display_name(&self) -> &str {
        "iStock"
    }

    async fn search(
        &self,
        query: &str,
        count: usize,
        after: Option<&str>,
    ) -> Result<SearchResult, SearchError> {
        if let Some(result) = self.take_withheld(query, count, after) {
            debug!(query, count, "Serving withheld iStock photos");
            return Ok(result);
        }

        let request = self.build_request(query, after)?;
        debug!(url = %request.url(), "Searching iStock");

        let response: IStockResponse =
            execute_json(&self.client, request, Self::IDENTIFIER).await?;
        Ok(self.merge(query, count, response.into()))
    }
}
