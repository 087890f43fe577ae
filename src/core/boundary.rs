//! State boundary lookup
//!
//! Boundaries come from a GeoJSON feature collection in which each feature
//! carries a `properties.name`. Positions are `[longitude, latitude]`, so
//! geometry `x` is longitude and `y` is latitude throughout.

use std::time::Duration;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use reqwest::ClientBuilder;
use serde_json::Value;

use crate::core::error::{Error, Result};

/// Download a feature collection and extract the named boundary
pub async fn fetch_boundary(url: &str, name: &str) -> Result<MultiPolygon<f64>> {
    log::info!("Downloading boundary data from {url}");

    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(format!("facility-matrix/{}", env!("CARGO_PKG_VERSION")))
        .build()?;

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        return Err(Error::HttpError(format!("Failed to fetch boundary: {status}")));
    }

    let json: Value = response.json().await?;
    parse_boundary(&json, name)
}

/// Find the feature named `name` and convert its geometry
pub fn parse_boundary(collection: &Value, name: &str) -> Result<MultiPolygon<f64>> {
    let features = collection["features"]
        .as_array()
        .ok_or_else(|| Error::InvalidInput("boundary data is not a feature collection".to_string()))?;

    let feature = features
        .iter()
        .find(|f| f["properties"]["name"].as_str() == Some(name))
        .ok_or_else(|| Error::BoundaryNotFound(name.to_string()))?;

    geometry_to_multipolygon(&feature["geometry"])
}

fn geometry_to_multipolygon(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coordinates = &geometry["coordinates"];
    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon::new(vec![polygon(coordinates)?])),
        Some("MultiPolygon") => {
            let polygons = as_array(coordinates, "MultiPolygon coordinates")?
                .iter()
                .map(polygon)
                .collect::<Result<Vec<_>>>()?;
            Ok(MultiPolygon::new(polygons))
        }
        other => Err(Error::InvalidInput(format!(
            "unsupported boundary geometry type: {}",
            other.unwrap_or("<missing>")
        ))),
    }
}

fn polygon(rings: &Value) -> Result<Polygon<f64>> {
    let mut rings = as_array(rings, "polygon")?
        .iter()
        .map(ring)
        .collect::<Result<Vec<_>>>()?
        .into_iter();

    let exterior = rings
        .next()
        .ok_or_else(|| Error::InvalidInput("polygon without exterior ring".to_string()))?;
    Ok(Polygon::new(exterior, rings.collect()))
}

fn ring(positions: &Value) -> Result<LineString<f64>> {
    as_array(positions, "ring")?
        .iter()
        .map(|position| {
            let x = position[0].as_f64();
            let y = position[1].as_f64();
            match (x, y) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(Error::InvalidInput(format!("invalid position: {position}"))),
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::InvalidInput(format!("{what} is not an array")))
}
