//! The seam between the engine and the external map-data service: one
//! feature query per tile over the tile's bounding box. The engine is generic
//! over [`RegionSource`] so runs can target the real Overpass client, a
//! mirror, or an in-process fake in tests.

use std::collections::BTreeMap;

use geo::{Coord, Rect};
use thiserror::Error;

use crate::tags::TagFilter;

/// Stable identity assigned by the external service, when it provides one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureId {
    Node(i64),
    Way(i64),
    Relation(i64),
}

/// Geometry of an external result: a point or a polygon ring, never a line.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureGeometry {
    Point(Coord<f64>),
    /// Exterior ring vertices in lon/lat degrees; closure is implicit.
    Polygon(Vec<Coord<f64>>),
}

/// An external-service result: geometry plus descriptive tags.
#[derive(Clone, Debug)]
pub struct RawFeature {
    pub id: Option<FeatureId>,
    pub geometry: FeatureGeometry,
    pub tags: BTreeMap<String, String>,
}

/// How a region query can fail.
///
/// The engine recovers from `Transient` locally (the tile yields an empty
/// result and the run continues) and aborts only on `Fatal`.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The service answered incompletely or too slowly; skip this tile.
    #[error("transient query failure: {0}")]
    Transient(String),
    /// The service is unreachable or rejected the query outright.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

/// A map-data backend exposing tag-filtered spatial queries over bounding
/// boxes. An explicit "nothing found" is `Ok(vec![])`, not an error.
pub trait RegionSource: Sync {
    fn query_region(
        &self,
        bbox: &Rect<f64>,
        filter: &TagFilter,
    ) -> Result<Vec<RawFeature>, QueryError>;
}
