use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam for outgoing requests, so downloads can run against a fake
/// in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
