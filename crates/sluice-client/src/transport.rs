use reqwest::Client;
use sluice_core::config::FetchTimeout;
use sluice_core::error::AppError;
use sluice_core::models::TransportResponse;
use sluice_core::traits::Transport;

const USER_AGENT: &str = "sluice/0.1 (adaptive fetcher)";

/// HTTP transport using reqwest.
///
/// The connect and read phases are bounded by the [`FetchTimeout`] given at
/// construction. Each request additionally carries an overall deadline of
/// `connect + read` taken from the per-call timeout, which wins when shorter.
/// Redirects are followed and the final URL is reported. Any HTTP status comes
/// back as a response; deciding what a status means is left to the fetch worker.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(FetchTimeout::default())
    }

    pub fn with_timeout(timeout: FetchTimeout) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout.connect)
            .read_timeout(timeout.read)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self { client })
    }
}

fn classify(error: reqwest::Error, timeout: FetchTimeout) -> AppError {
    if error.is_timeout() {
        AppError::Timeout(timeout.total().as_secs_f64())
    } else if error.is_connect() {
        AppError::NetworkError(format!("Connection failed: {error}"))
    } else {
        AppError::HttpError(error.to_string())
    }
}

impl Transport for ReqwestTransport {
    async fn perform_request(
        &self,
        url: &str,
        timeout: FetchTimeout,
    ) -> Result<TransportResponse, AppError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout.total())
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| classify(e, timeout))?;

        Ok(TransportResponse {
            status,
            final_url,
            body,
        })
    }
}
