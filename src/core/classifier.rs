//! Response classification for distance queries
//!
//! Every way a single query can end is folded into a [`DistanceValue`]
//! here, so nothing past this point ever sees an API quirk or a transport
//! error. The three failure sentinels stay distinct: `ZERO_RESULTS` is a
//! permanent geographic answer, `API_ERR_*` and `NET_ERR` are worth
//! re-querying later.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::client::{DistanceMatrixResponse, QueryError};

const STATUS_OK: &str = "OK";
const ZERO_RESULTS: &str = "ZERO_RESULTS";
const NET_ERR: &str = "NET_ERR";
const API_ERR_PREFIX: &str = "API_ERR_";

/// Outcome of one (origin, destination) query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DistanceValue {
    /// Driving distance in meters
    Meters(u64),
    /// The API answered but found no route
    ZeroResults,
    /// Non-OK top-level status, kept verbatim
    ApiError(String),
    /// Transport failure, timeout, or unreadable response
    NetError,
}

impl DistanceValue {
    /// True for anything other than a measured distance
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, DistanceValue::Meters(_))
    }

    pub fn meters(&self) -> Option<u64> {
        match self {
            DistanceValue::Meters(m) => Some(*m),
            _ => None,
        }
    }
}

impl fmt::Display for DistanceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceValue::Meters(m) => write!(f, "{m}"),
            DistanceValue::ZeroResults => f.write_str(ZERO_RESULTS),
            DistanceValue::ApiError(status) => write!(f, "{API_ERR_PREFIX}{status}"),
            DistanceValue::NetError => f.write_str(NET_ERR),
        }
    }
}

/// Error returned when text is not a distance or a known sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseValueError(pub String);

impl fmt::Display for ParseValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is neither a distance nor a known sentinel", self.0)
    }
}

impl std::error::Error for ParseValueError {}

impl FromStr for DistanceValue {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            ZERO_RESULTS => Ok(DistanceValue::ZeroResults),
            NET_ERR => Ok(DistanceValue::NetError),
            _ => {
                if let Some(status) = s.strip_prefix(API_ERR_PREFIX) {
                    Ok(DistanceValue::ApiError(status.to_string()))
                } else {
                    s.parse::<u64>()
                        .map(DistanceValue::Meters)
                        .map_err(|_| ParseValueError(s.to_string()))
                }
            }
        }
    }
}

impl From<DistanceValue> for String {
    fn from(value: DistanceValue) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for DistanceValue {
    type Error = ParseValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Map one query outcome to a normalized value. Never fails.
pub fn classify(outcome: Result<DistanceMatrixResponse, QueryError>) -> DistanceValue {
    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            log::debug!("Query failed: {err}");
            return DistanceValue::NetError;
        }
    };

    if response.status != STATUS_OK {
        return DistanceValue::ApiError(response.status);
    }

    // A top-level OK without the single expected element is as good as unreadable
    let Some(element) = response.rows.first().and_then(|row| row.elements.first()) else {
        return DistanceValue::NetError;
    };

    if element.status != STATUS_OK {
        return DistanceValue::ZeroResults;
    }

    match &element.distance {
        Some(distance) => DistanceValue::Meters(distance.value),
        None => DistanceValue::NetError,
    }
}
