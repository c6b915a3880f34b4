//! HTTP retrieval of published datasets.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use tracing::debug;

/// Issues a single GET for `url` and returns the body.
///
/// # Errors
///
/// Fails on transport errors and on any non-2xx status. There is no retry.
#[tracing::instrument(skip(client))]
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid URL '{url}'"))?,
    );

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("GET {url} failed"))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow!("GET {} returned status {}", url, status));
    }

    let body = resp.bytes().await?;
    debug!(bytes = body.len(), "Response body received");
    Ok(body)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::HttpClient;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies by URL; unknown URLs answer 404.
    #[derive(Default)]
    pub struct FakeClient {
        pub routes: HashMap<String, (u16, Vec<u8>)>,
        pub requested: Mutex<Vec<String>>,
    }

    impl FakeClient {
        pub fn with(mut self, url: &str, status: u16, body: &[u8]) -> Self {
            self.routes.insert(url.to_string(), (status, body.to_vec()));
            self
        }
    }

    #[async_trait]
    impl HttpClient for FakeClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let url = req.url().to_string();
            self.requested.lock().unwrap().push(url.clone());
            let (status, body) = self
                .routes
                .get(&url)
                .cloned()
                .unwrap_or((404, b"not found".to_vec()));
            let resp = http::Response::builder()
                .status(status)
                .body(body)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }
}
