//! Bigstock search adapter.

use async_trait::async_trait;
use reqwest::{Client, Request, Url};
use tracing::debug;

use super::dto::BigstockResponse;
use super::execute_json;
use crate::domain::entities::SearchResult;
use crate::domain::errors::SearchError;
use crate::domain::ports::SearchBackend;

const SEARCH_BASE: &str = "https://www.bigstockphoto.com/search/";

/// Searches Bigstock's site search, which answers XHR requests with JSON.
/// Tokens are result offsets. Results carry no thumbnail.
pub struct BigstockBackend {
    client: Client,
    base: String,
}

impl BigstockBackend {
    pub const IDENTIFIER: &'static str = "BigstockPhoto";

    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_base(client, SEARCH_BASE)
    }

    #[must_use]
    pub fn with_base(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    fn build_request(
        &self,
        query: &str,
        count: usize,
        after: Option<&str>,
    ) -> Result<Request, SearchError> {
        let mut url =
            Url::parse(&self.base).map_err(|e| SearchError::invalid_request(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| SearchError::invalid_request("search base cannot hold a path"))?
            .pop_if_empty()
            .push(query)
            .push("");
        url.query_pairs_mut()
            .append_pair("start", after.unwrap_or_default())
            .append_pair("show", &count.to_string())
            .append_pair("photos", "y");

        self.client
            .get(url)
            .header("X-Requested-With", "XMLHttpRequest")
            .build()
            .map_err(|e| SearchError::invalid_request(e.to_string()))
    }
}

#[async_trait]
impl SearchBackend for BigstockBackend {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn display_name(&self) -> &str {
        "Bigstock"
    }

    async fn search(
        &self,
        query: &str,
        count: usize,
        after: Option<&str>,
    ) -> Result<SearchResult, SearchError> {
        let request = self.build_request(query, count, after)?;
        debug!(url = %request.url(), "Searching Bigstock");

        let response: BigstockResponse =
            execute_json(&self.client, request, Self::IDENTIFIER).await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_a_single_encoded_path_segment() {
        let backend = BigstockBackend::new(Client::new());
        let request = backend.build_request("cats/dogs & owls", 12, None).unwrap();

        assert_eq!(request.url().path(), "/search/cats%2Fdogs%20&%20owls/");
        assert_eq!(request.url().query(), Some("start=&show=12&photos=y"));
        assert_eq!(
            request.headers().get("X-Requested-With").map(|v| v.as_bytes()),
            Some(b"XMLHttpRequest".as_slice())
        );
    }

    #[test]
    fn test_continuation_sets_start_offset() {
        let backend = BigstockBackend::new(Client::new());
        let request = backend.build_request("cats", 12, Some("24")).unwrap();
        assert_eq!(request.url().query(), Some("start=24&show=12&photos=y"));
    }
}
