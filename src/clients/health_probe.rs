//! HTTP client for the health endpoints exposed by the launched game.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use thiserror::Error;

const HEALTH_PATH: &str = "/q/health";
const HEALTH_STARTED_PATH: &str = "/q/health/started";
const HEALTH_READY_PATH: &str = "/q/health/ready";
const HEALTH_LIVE_PATH: &str = "/q/health/live";

/// Failures talking to the game's health endpoints.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build health probe client")]
    ClientBuilder {
        /// reqwest builder failure.
        #[source]
        source: reqwest::Error,
    },
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("health probe request to `{url}` failed")]
    Request {
        /// URL that was requested.
        url: String,
        /// reqwest transport failure.
        #[source]
        source: reqwest::Error,
    },
}

/// Something that can be asked for the game's current health status code.
pub trait HealthCheck: Send + Sync {
    /// Issue one health request and return the HTTP status code.
    fn check(&self) -> BoxFuture<'static, Result<u16, ProbeError>>;
}

/// reqwest-backed client for the `/q/health*` endpoints.
#[derive(Clone)]
pub struct HealthProbe {
    client: Client,
    base_url: Arc<str>,
}

impl HealthProbe {
    /// Build a probe against `base_url`, giving up on each request after `timeout`.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ProbeError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
        })
    }

    /// Aggregated health status.
    pub async fn health(&self) -> Result<u16, ProbeError> {
        self.get(HEALTH_PATH).await
    }

    /// Startup probe status.
    pub async fn started(&self) -> Result<u16, ProbeError> {
        self.get(HEALTH_STARTED_PATH).await
    }

    /// Readiness probe status.
    pub async fn ready(&self) -> Result<u16, ProbeError> {
        self.get(HEALTH_READY_PATH).await
    }

    /// Liveness probe status.
    pub async fn live(&self) -> Result<u16, ProbeError> {
        self.get(HEALTH_LIVE_PATH).await
    }

    async fn get(&self, path: &str) -> Result<u16, ProbeError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| ProbeError::Request { url, source })?;

        Ok(response.status().as_u16())
    }
}

impl HealthCheck for HealthProbe {
    fn check(&self) -> BoxFuture<'static, Result<u16, ProbeError>> {
        let probe = self.clone();
        Box::pin(async move { probe.health().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn returns_status_of_each_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/q/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/q/health/ready"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/q/health/started"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = HealthProbe::new(format!("{}/", server.uri()), Duration::from_secs(1)).unwrap();

        assert_eq!(probe.health().await.unwrap(), 200);
        assert_eq!(probe.ready().await.unwrap(), 503);
        assert_eq!(probe.started().await.unwrap(), 200);
        assert_eq!(probe.live().await.unwrap(), 404);
        assert_eq!(probe.check().await.unwrap(), 200);
    }

    #[tokio::test]
    async fn connection_refused_is_a_request_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = HealthProbe::new(format!("http://{addr}"), Duration::from_secs(1)).unwrap();
        let err = probe.health().await.unwrap_err();

        match err {
            ProbeError::Request { url, .. } => assert_eq!(url, format!("http://{addr}/q/health")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
