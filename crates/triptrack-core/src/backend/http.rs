//! HTTP/JSON backend client

use reqwest::{Client, Url};

use super::TelemetryBackend;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::telemetry::{LocationReport, SensorReport, StatusResponse};

const STATUS_PATH: &str = "api/status";
const LOCATION_PATH: &str = "api/location";
const RESET_PATH: &str = "api/reset";
const DATA_PATH: &str = "api/data";

/// Trip backend reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    /// HTTP client for API requests
    client: Client,
    /// Base URL, always ending in `/`
    base: Url,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`
    ///
    /// `accept_invalid_certs` turns off TLS certificate verification, for a
    /// backend serving a self-signed certificate on the LAN.
    pub fn new(
        base_url: &str,
        user_agent: &str,
        accept_invalid_certs: bool,
    ) -> Result<Self, ClientError> {
        let base = normalize_base(base_url)?;

        if accept_invalid_certs {
            tracing::warn!("TLS certificate verification disabled for {}", base);
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self { client, base })
    }

    /// Create a client from a [`ClientConfig`]
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.base_url,
            &config.user_agent,
            config.accept_invalid_certs,
        )
    }

    /// Backend base URL
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL of an endpoint
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{}{}: {}", self.base, path, e)))
    }

    async fn post_empty(&self, path: &'static str) -> Result<(), ClientError> {
        let response = self.client.post(self.endpoint(path)?).send().await?;
        check_status(path, response.status())
    }
}

fn normalize_base(base_url: &str) -> Result<Url, ClientError> {
    let trimmed = base_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Url::parse(&with_slash).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", trimmed, e)))
}

fn check_status(endpoint: &'static str, status: reqwest::StatusCode) -> Result<(), ClientError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ClientError::UnexpectedStatus {
            endpoint,
            status: status.as_u16(),
        })
    }
}

impl TelemetryBackend for HttpBackend {
    async fn fetch_status(&self) -> Result<StatusResponse, ClientError> {
        let response = self.client.get(self.endpoint(STATUS_PATH)?).send().await?;
        check_status(STATUS_PATH, response.status())?;

        let body = response.text().await?;
        let status: StatusResponse = serde_json::from_str(&body)?;
        Ok(status)
    }

    async fn push_location(&self, report: LocationReport) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.endpoint(LOCATION_PATH)?)
            .json(&report)
            .send()
            .await?;
        check_status(LOCATION_PATH, response.status())
    }

    async fn reset_trip(&self) -> Result<(), ClientError> {
        self.post_empty(RESET_PATH).await
    }

    async fn push_sensor_data(&self, report: SensorReport) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.endpoint(DATA_PATH)?)
            .json(&report)
            .send()
            .await?;
        check_status(DATA_PATH, response.status())
    }
}
