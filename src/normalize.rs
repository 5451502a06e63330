//! Result normalizer: reduces every raw feature to a single representative
//! lon/lat point and keeps only the features truly inside the tile's
//! corridor. A centroid computed directly in geographic degrees is offset
//! from the true planar center (worse at higher latitudes), so polygon
//! centroids are computed in the feature's UTM zone and converted back.

use std::collections::BTreeMap;

use geo::{Centroid, Coord, LineString, Polygon};
use log::debug;

use crate::geom::{BufferedCorridor, PlanarCrs};
use crate::query::{FeatureGeometry, FeatureId, RawFeature};

/// A raw feature reduced to one representative point that passed the true
/// corridor containment test.
#[derive(Clone, Debug)]
pub struct NormalizedFeature {
    pub id: Option<FeatureId>,
    /// Representative lon/lat point: the feature's own coordinate for point
    /// geometry, otherwise the planar centroid of its polygon.
    pub point: Coord<f64>,
    pub tags: BTreeMap<String, String>,
}

/// Normalize one tile's raw results against that tile's corridor.
///
/// Malformed features (degenerate rings, uncomputable centroids, failed
/// transforms) are dropped; the loss of a single feature never fails the
/// batch. Point geometry passes through unchanged, so normalization is
/// idempotent on already-normalized features.
pub fn normalize(features: Vec<RawFeature>, corridor: &BufferedCorridor) -> Vec<NormalizedFeature> {
    features
        .into_iter()
        .filter_map(|feature| {
            let point = match representative_point(&feature.geometry) {
                Some(point) => point,
                None => {
                    debug!("dropping feature {:?}: no computable representative point", feature.id);
                    return None;
                }
            };
            // Strict corridor membership, not the box-shaped query region:
            // the box picks up false positives away from the path.
            if !corridor.contains(point) {
                return None;
            }
            Some(NormalizedFeature { id: feature.id, point, tags: feature.tags })
        })
        .collect()
}

/// The single point standing in for a possibly-polygonal feature.
fn representative_point(geometry: &FeatureGeometry) -> Option<Coord<f64>> {
    match geometry {
        FeatureGeometry::Point(coord) => Some(*coord),
        FeatureGeometry::Polygon(ring) => {
            if ring.len() < 3 {
                return None; // cannot form an exterior ring
            }
            let mean_lon = ring.iter().map(|c| c.x).sum::<f64>() / ring.len() as f64;
            let crs = PlanarCrs::for_longitude(mean_lon).ok()?;
            let planar = crs.path_to_planar(ring).ok()?;
            let polygon = Polygon::new(LineString::from(planar), vec![]);
            let centroid = polygon.centroid()?;
            crs.to_geographic(centroid.0).ok()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{meters_to_lat_degrees, meters_to_lon_degrees};

    fn corridor() -> BufferedCorridor {
        let path = LineString::from(vec![Coord { x: 9.0, y: 50.0 }, Coord { x: 9.1, y: 50.0 }]);
        BufferedCorridor::new(&path, 100.0).unwrap()
    }

    fn feature(geometry: FeatureGeometry) -> RawFeature {
        RawFeature { id: None, geometry, tags: BTreeMap::new() }
    }

    #[test]
    fn point_geometry_is_idempotent() {
        let on_path = Coord { x: 9.05, y: 50.0 };
        let kept = normalize(vec![feature(FeatureGeometry::Point(on_path))], &corridor());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].point, on_path);

        // Re-running on the already-point geometry returns the same point.
        let again = normalize(
            vec![feature(FeatureGeometry::Point(kept[0].point))],
            &corridor(),
        );
        assert_eq!(again[0].point, on_path);
    }

    #[test]
    fn symmetric_polygon_centroid_stays_centered() {
        // A square centered on the path; projection correction must not
        // introduce drift for the trivial symmetric case.
        let center = Coord { x: 9.05, y: 50.0 };
        let dx = meters_to_lon_degrees(40.0, 50.0);
        let dy = meters_to_lat_degrees(40.0);
        let ring = vec![
            Coord { x: center.x - dx, y: center.y - dy },
            Coord { x: center.x + dx, y: center.y - dy },
            Coord { x: center.x + dx, y: center.y + dy },
            Coord { x: center.x - dx, y: center.y + dy },
        ];
        let kept = normalize(vec![feature(FeatureGeometry::Polygon(ring))], &corridor());
        assert_eq!(kept.len(), 1);
        assert!((kept[0].point.x - center.x).abs() < 1e-5);
        assert!((kept[0].point.y - center.y).abs() < 1e-5);
    }

    #[test]
    fn degenerate_ring_is_dropped_not_an_error() {
        let kept = normalize(
            vec![feature(FeatureGeometry::Polygon(vec![
                Coord { x: 9.05, y: 50.0 },
                Coord { x: 9.051, y: 50.0 },
            ]))],
            &corridor(),
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn empty_ring_is_dropped() {
        let kept = normalize(
            vec![feature(FeatureGeometry::Polygon(Vec::new()))],
            &corridor(),
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn features_outside_the_corridor_are_filtered() {
        // Inside the padded bounding box is not enough; 300 m off the path
        // with a 100 m radius must be rejected.
        let off_path = Coord { x: 9.05, y: 50.0 + meters_to_lat_degrees(300.0) };
        let kept = normalize(vec![feature(FeatureGeometry::Point(off_path))], &corridor());
        assert!(kept.is_empty());
    }

    #[test]
    fn mixed_batch_keeps_only_the_valid_in_corridor_features() {
        let on_path = Coord { x: 9.02, y: 50.0 };
        let far = Coord { x: 9.02, y: 50.1 };
        let kept = normalize(
            vec![
                feature(FeatureGeometry::Point(on_path)),
                feature(FeatureGeometry::Point(far)),
                feature(FeatureGeometry::Polygon(vec![on_path])), // malformed
            ],
            &corridor(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].point, on_path);
    }
}
