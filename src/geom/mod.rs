//! Coordinate and geometry primitives shared by the tiler, the normalizer and
//! the aggregator. All geographic coordinates are lon/lat degrees (WGS84);
//! all configured distances are meters, converted to degrees per-latitude at
//! the point of use.

mod corridor;
mod proj;

pub use corridor::BufferedCorridor;
pub use proj::{PlanarCrs, UtmZone};

use anyhow::{bail, Result};
use geo::{Coord, LineString, Rect};

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Convert meters to degrees of latitude.
#[inline]
pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Convert meters to degrees of longitude at the given latitude.
#[inline]
pub fn meters_to_lon_degrees(meters: f64, lat: f64) -> f64 {
    meters / (METERS_PER_DEGREE * lat.to_radians().cos().max(1e-9))
}

/// Convert degrees of latitude to meters.
#[inline]
pub fn lat_degrees_to_meters(degrees: f64) -> f64 {
    degrees * METERS_PER_DEGREE
}

/// Convert degrees of longitude at the given latitude to meters.
#[inline]
pub fn lon_degrees_to_meters(degrees: f64, lat: f64) -> f64 {
    degrees * METERS_PER_DEGREE * lat.to_radians().cos().max(1e-9)
}

/// An ordered lon/lat route, read-only for the engine's lifetime.
///
/// Point order is the travel direction. Construction rejects routes with
/// fewer than 2 points before any tiling begins.
#[derive(Clone, Debug)]
pub struct Route(LineString<f64>);

impl Route {
    pub fn new(points: Vec<Coord<f64>>) -> Result<Self> {
        if points.len() < 2 {
            bail!("a route needs at least 2 points, got {}", points.len());
        }
        Ok(Self(LineString::from(points)))
    }

    pub fn points(&self) -> &[Coord<f64>] {
        &self.0 .0
    }

    pub fn line(&self) -> &LineString<f64> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0 .0.len()
    }

    pub fn is_empty(&self) -> bool {
        false // n >= 2 by construction
    }
}

/// Axis-aligned degree-space box around `points`, padded by the corridor
/// radius on every side. Used only to test the tiling size constraint and to
/// build the box-shaped query region, never as the final containment test.
pub fn corridor_bounding_box(points: &[Coord<f64>], radius_m: f64) -> Rect<f64> {
    debug_assert!(!points.is_empty());

    let mut min = points[0];
    let mut max = points[0];
    for p in &points[1..] {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }

    let mean_lat = (min.y + max.y) / 2.0;
    let dlat = meters_to_lat_degrees(radius_m);
    let dlon = meters_to_lon_degrees(radius_m, mean_lat);

    Rect::new(
        Coord { x: min.x - dlon, y: min.y - dlat },
        Coord { x: max.x + dlon, y: max.y + dlat },
    )
}

/// Width of a degree-space box in meters, measured at its mid latitude.
pub fn box_width_meters(rect: &Rect<f64>) -> f64 {
    let mid_lat = (rect.min().y + rect.max().y) / 2.0;
    lon_degrees_to_meters(rect.width(), mid_lat)
}

/// Height of a degree-space box in meters.
pub fn box_height_meters(rect: &Rect<f64>) -> f64 {
    lat_degrees_to_meters(rect.height())
}

/// Distance from `p` to the segment `a..b`, all in the same planar units.
pub(crate) fn point_segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return ((p.x - a.x).powi(2) + (p.y - a.y).powi(2)).sqrt();
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

/// Distance from `p` to the polyline `path` (minimum over segments).
pub(crate) fn point_path_distance(p: Coord<f64>, path: &[Coord<f64>]) -> f64 {
    debug_assert!(path.len() >= 2);
    path.windows(2)
        .map(|w| point_segment_distance(p, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
