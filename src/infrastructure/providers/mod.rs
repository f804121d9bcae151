//! Built-in stock photo providers.

pub mod adobe;
pub mod bigstock;
pub mod dto;
pub mod istock;
pub mod shutterstock;

use std::sync::Arc;

use reqwest::{Client, Request};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::errors::SearchError;
use crate::domain::ports::SearchBackend;

pub use adobe::AdobeBackend;
pub use bigstock::BigstockBackend;
pub use istock::IStockBackend;
pub use shutterstock::ShutterstockBackend;

/// Every provider shipped with the crate, in registration order.
#[must_use]
pub fn built_in(client: &Client) -> Vec<Arc<dyn SearchBackend>> {
    vec![
        Arc::new(ShutterstockBackend::new(client.clone())),
        Arc::new(BigstockBackend::new(client.clone())),
        Arc::new(IStockBackend::new(client.clone())),
        Arc::new(AdobeBackend::new(client.clone())),
    ]
}

async fn execute_json<T: DeserializeOwned>(
    client: &Client,
    request: Request,
    provider: &str,
) -> Result<T, SearchError> {
    let response = client.execute(request).await.map_err(|e| {
        debug!(provider, error = %e, "Search request failed");
        if e.is_timeout() {
            SearchError::network("request timed out")
        } else {
            SearchError::network(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Http {
            status: status.as_u16(),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SearchError::decode(format!("failed to parse response: {e}")))
}
