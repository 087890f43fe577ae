//! External distance-query capability
//!
//! One query asks for the driving distance between one origin and one
//! destination. Implementations issue exactly one attempt; retries are a
//! caller concern and the builder makes none.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};

use crate::core::config::MatrixConfig;
use crate::core::coords::Coordinate;
use crate::core::error::Result;

/// Top-level distance-matrix payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

/// One origin/destination cell of the payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixElement {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<Measure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Meters
    pub value: u64,
}

impl DistanceMatrixResponse {
    /// Single-element OK payload carrying `meters`
    pub fn with_distance(meters: u64) -> Self {
        Self {
            status: "OK".to_string(),
            rows: vec![MatrixRow {
                elements: vec![MatrixElement {
                    status: "OK".to_string(),
                    distance: Some(Measure { value: meters }),
                }],
            }],
        }
    }

    /// Single-element OK payload whose element carries `element_status`
    pub fn with_element_status(element_status: &str) -> Self {
        Self {
            status: "OK".to_string(),
            rows: vec![MatrixRow {
                elements: vec![MatrixElement {
                    status: element_status.to_string(),
                    distance: None,
                }],
            }],
        }
    }

    /// Payload with a non-OK top-level status
    pub fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            rows: Vec::new(),
        }
    }
}

/// Ways a query can fail before a payload is available
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// No response within the configured timeout
    Timeout,
    /// Connection or protocol failure
    Transport(String),
    /// Body was not a distance-matrix payload
    Decode(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Timeout => write!(f, "request timed out"),
            QueryError::Transport(msg) => write!(f, "transport failure: {}", msg),
            QueryError::Decode(msg) => write!(f, "unreadable response: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QueryError::Timeout
        } else if err.is_decode() {
            QueryError::Decode(err.to_string())
        } else {
            QueryError::Transport(err.to_string())
        }
    }
}

/// Anything that can answer a single distance query
pub trait DistanceQuery: Send + Sync {
    fn query(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = std::result::Result<DistanceMatrixResponse, QueryError>> + Send;
}

impl<T: DistanceQuery> DistanceQuery for Arc<T> {
    fn query(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = std::result::Result<DistanceMatrixResponse, QueryError>> + Send {
        (**self).query(origin, destination)
    }
}

/// Distance-matrix API over HTTP
pub struct HttpDistanceClient {
    client: Client,
    url: String,
    api_key: String,
    travel_mode: String,
}

impl HttpDistanceClient {
    /// Create a client from process configuration; requires an API key
    pub fn from_config(config: &MatrixConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = ClientBuilder::new()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .user_agent(format!("facility-matrix/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: config.api_url.clone(),
            api_key,
            travel_mode: config.travel_mode.clone(),
        })
    }
}

impl DistanceQuery for HttpDistanceClient {
    fn query(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = std::result::Result<DistanceMatrixResponse, QueryError>> + Send {
        async move {
            let response = self
                .client
                .get(&self.url)
                .query(&[
                    ("origins", origin.to_string()),
                    ("destinations", destination.to_string()),
                    ("mode", self.travel_mode.clone()),
                    ("key", self.api_key.clone()),
                ])
                .send()
                .await?;

            // Status codes are not inspected: the API reports failures in the body
            let payload = response.json::<DistanceMatrixResponse>().await?;
            Ok(payload)
        }
    }
}
