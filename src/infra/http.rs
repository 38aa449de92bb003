//! `reqwest`-backed revalidation transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::HttpSettings;
use crate::revalidation::{RevalidationTransport, TransportError, TransportResponse};

use super::error::InfraError;

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|err| InfraError::http(format!("failed to build client: {err}")))?;
        Ok(Self { client })
    }

    pub fn from_settings(http: &HttpSettings) -> Result<Self, InfraError> {
        Self::new(http.timeout, &http.user_agent)
    }

    pub fn user_agent() -> &'static str {
        concat!("site-revalidator/", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl RevalidationTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_error)?;

        let status = response.status().as_u16();
        let body = body_or_empty(url, response.text().await);

        Ok(TransportResponse { status, body })
    }
}

/// The body is informational only; a failed read leaves it empty.
fn body_or_empty(url: &Url, body: Result<String, reqwest::Error>) -> String {
    body.unwrap_or_else(|err| {
        debug!(
            host = url.host_str().unwrap_or_default(),
            endpoint = url.path(),
            status = ?err.status(),
            error = %err,
            "Failed to read revalidation response body"
        );
        String::new()
    })
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;

    use super::*;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new(Duration::from_secs(5), ReqwestTransport::user_agent())
            .expect("client")
    }

    #[tokio::test]
    async fn reports_status_and_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/api/revalidate")
                .query_param("path", "/news")
                .header("user-agent", ReqwestTransport::user_agent());
            then.status(200).body("{\"revalidated\":true}");
        });

        let url = Url::parse(&server.url("/api/revalidate?path=%2Fnews")).expect("url");
        let response = transport().get(&url).await.expect("response");

        mock.assert();
        assert!(response.is_ok());
        assert_eq!(response.body, "{\"revalidated\":true}");
    }

    #[tokio::test]
    async fn non_200_is_a_response_not_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/api/revalidate");
            then.status(401);
        });

        let url = Url::parse(&server.url("/api/revalidate")).expect("url");
        let response = transport().get(&url).await.expect("response");

        assert_eq!(response.status, 401);
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn slow_site_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET");
            then.status(200).delay(Duration::from_millis(500));
        });

        let transport = ReqwestTransport::new(Duration::from_millis(50), "test").expect("client");
        let url = Url::parse(&server.url("/slow")).expect("url");
        let err = transport.get(&url).await.expect_err("timeout");

        assert!(matches!(err, TransportError::Timeout(_)));
    }

    #[tokio::test]
    async fn unreadable_body_becomes_empty() {
        let url = Url::parse("http://127.0.0.1:9/api/revalidate?secret=s3cr3t").expect("url");
        let err = Client::new()
            .get(url.clone())
            .send()
            .await
            .expect_err("nothing listens on the discard port");

        assert_eq!(body_or_empty(&url, Err(err)), "");
        assert_eq!(body_or_empty(&url, Ok("done".to_string())), "done");
    }

    #[tokio::test]
    async fn unreachable_site_is_a_transport_error() {
        // Port 9 (discard) is not expected to accept HTTP.
        let url = Url::parse("http://127.0.0.1:9/api/revalidate").expect("url");
        assert!(transport().get(&url).await.is_err());
    }
}
