//! Overpass API client: the default [`RegionSource`]. Builds one Overpass QL
//! query per tile from the tile's bounding box and the caller's tag filter,
//! decodes the JSON response into [`RawFeature`]s.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use geo::{Coord, Rect};
use reqwest::{blocking::Client, StatusCode};
use serde::Deserialize;

use crate::query::{FeatureGeometry, FeatureId, QueryError, RawFeature, RegionSource};
use crate::tags::TagFilter;

/// The public Overpass endpoint. Heavily rate limited; keep the engine's
/// pacing delay in place when querying it.
pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Server-side evaluation budget baked into each query, seconds.
const QL_TIMEOUT_SECS: u64 = 25;

/// Blocking Overpass client with a per-request timeout.
pub struct OverpassClient {
    client: Client,
    endpoint: String,
}

impl OverpassClient {
    /// Build a client for `endpoint`. `timeout` bounds the whole request;
    /// expiry is reported as a transient failure, not a fatal one.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("trackside/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("build HTTP client")?;
        Ok(Self { client, endpoint: endpoint.into() })
    }

    /// Client for the public endpoint with a timeout matching the query's
    /// server-side budget.
    pub fn public() -> Result<Self> {
        Self::new(
            DEFAULT_OVERPASS_ENDPOINT,
            Some(Duration::from_secs(QL_TIMEOUT_SECS + 5)),
        )
    }

    /// Client for the public endpoint honoring the engine's per-query
    /// timeout knob.
    pub fn for_config(config: &crate::config::EngineConfig) -> Result<Self> {
        Self::new(DEFAULT_OVERPASS_ENDPOINT, config.query_timeout)
    }
}

impl RegionSource for OverpassClient {
    fn query_region(
        &self,
        bbox: &Rect<f64>,
        filter: &TagFilter,
    ) -> Result<Vec<RawFeature>, QueryError> {
        let query = build_query(bbox, filter);

        let resp = self
            .client
            .post(&self.endpoint)
            .body(query)
            .send()
            .map_err(classify_send_error)?;

        match resp.status() {
            status if status.is_success() => {}
            StatusCode::TOO_MANY_REQUESTS | StatusCode::GATEWAY_TIMEOUT => {
                return Err(QueryError::Transient(format!(
                    "service throttled the query ({})",
                    resp.status()
                )));
            }
            status => {
                return Err(QueryError::Fatal(anyhow!(
                    "query to {} failed with status {status}",
                    self.endpoint
                )));
            }
        }

        let body = resp
            .text()
            .map_err(|e| QueryError::Transient(format!("truncated response body: {e}")))?;
        let decoded: OverpassResponse = serde_json::from_str(&body)
            .map_err(|e| QueryError::Transient(format!("undecodable response body: {e}")))?;

        // Overpass reports its own timeouts and memory limits as a remark
        // alongside an empty element list.
        if decoded.elements.is_empty() {
            if let Some(remark) = decoded.remark {
                return Err(QueryError::Transient(format!("service remark: {remark}")));
            }
            return Ok(Vec::new()); // explicit no-data
        }

        Ok(decoded
            .elements
            .into_iter()
            .filter_map(OverpassElement::into_raw_feature)
            .collect())
    }
}

fn classify_send_error(err: reqwest::Error) -> QueryError {
    if err.is_timeout() {
        QueryError::Transient(format!("query timed out: {err}"))
    } else {
        QueryError::Fatal(anyhow!(err).context("map-data service unreachable"))
    }
}

/// Overpass QL for one tile: every (key, value) pair of the filter matches as
/// a logical OR, over both nodes and ways, restricted to the tile's box.
fn build_query(bbox: &Rect<f64>, filter: &TagFilter) -> String {
    // Overpass boxes are (south, west, north, east).
    let bounds = format!(
        "({:.7},{:.7},{:.7},{:.7})",
        bbox.min().y,
        bbox.min().x,
        bbox.max().y,
        bbox.max().x
    );

    let mut query = format!("[out:json][timeout:{QL_TIMEOUT_SECS}];(");
    for (key, values) in filter.iter() {
        if values.is_empty() {
            continue;
        }
        let alternation =
            values.iter().map(|v| regex_escape(v)).collect::<Vec<_>>().join("|");
        let pattern = ql_escape(&format!("^({alternation})$"));
        let key = ql_escape(key);
        for kind in ["node", "way"] {
            query.push_str(&format!("{kind}[\"{key}\"~\"{pattern}\"]{bounds};"));
        }
    }
    query.push_str(");out geom;");
    query
}

/// Prefix regex metacharacters so a tag value matches only itself inside the
/// alternation.
fn regex_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\.^$*+?()[]{}|".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a string for embedding between double quotes in Overpass QL.
fn ql_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lon: Option<f64>,
    lat: Option<f64>,
    #[serde(default)]
    geometry: Vec<OverpassVertex>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassVertex {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    /// Map one element to a feature; elements without usable geometry are
    /// skipped rather than failing the batch.
    fn into_raw_feature(self) -> Option<RawFeature> {
        let (id, geometry) = match self.kind.as_str() {
            "node" => {
                let (lon, lat) = (self.lon?, self.lat?);
                (FeatureId::Node(self.id), FeatureGeometry::Point(Coord { x: lon, y: lat }))
            }
            "way" => {
                if self.geometry.is_empty() {
                    return None;
                }
                let ring = self
                    .geometry
                    .iter()
                    .map(|v| Coord { x: v.lon, y: v.lat })
                    .collect();
                (FeatureId::Way(self.id), FeatureGeometry::Polygon(ring))
            }
            _ => return None,
        };
        Some(RawFeature { id: Some(id), geometry, tags: self.tags })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
