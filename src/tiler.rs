//! Route tiler: decomposes an arbitrarily long route into a minimal sequence
//! of sub-paths ("tiles") whose buffered bounding boxes stay within a
//! width/height budget. Bounding the query footprint bounds the external
//! service's per-request cost and result volume; consecutive tiles share
//! exactly one boundary point so coverage has no gap and minimal overlap.

use anyhow::Result;
use geo::{Coord, LineString, Rect};

use crate::geom::{
    box_height_meters, box_width_meters, corridor_bounding_box, lat_degrees_to_meters,
    lon_degrees_to_meters, BufferedCorridor, Route,
};

/// A bounded-size contiguous run of route points, the unit of external query.
///
/// Always holds ≥2 points; a lone point is carried as a degenerate 2-point
/// path at the same location so every tile is bufferable. Tiles are produced
/// once by [`tile_route`] and consumed once by the query client.
#[derive(Clone, Debug)]
pub struct Tile {
    points: Vec<Coord<f64>>,
    bbox: Rect<f64>,
}

impl Tile {
    fn new(mut points: Vec<Coord<f64>>, radius_m: f64) -> Self {
        debug_assert!(!points.is_empty());
        if points.len() == 1 {
            let p = points[0];
            points.push(p);
        }
        let bbox = corridor_bounding_box(&points, radius_m);
        Self { points, bbox }
    }

    pub fn points(&self) -> &[Coord<f64>] {
        &self.points
    }

    /// The corridor's bounding box in degrees, padded by the corridor radius.
    pub fn bbox(&self) -> &Rect<f64> {
        &self.bbox
    }

    /// The buffered corridor of exactly this tile's points, not the whole
    /// route. Recomputed on demand; the normalizer holds it for one tile.
    pub fn corridor(&self, radius_m: f64) -> Result<BufferedCorridor> {
        BufferedCorridor::new(&LineString::from(self.points.clone()), radius_m)
    }
}

/// Walk the route and emit tiles whose corridor bounding boxes stay within
/// `max_width_m` × `max_height_m`. A route entirely within budget collapses
/// to a single tile. A single segment that alone exceeds the budget is
/// subdivided by linear interpolation into the fewest in-budget pieces; if
/// the budget is smaller than the corridor diameter the segment is emitted as
/// one oversize two-point tile (unavoidable minimum granularity).
pub fn tile_route(
    route: &Route,
    max_width_m: f64,
    max_height_m: f64,
    radius_m: f64,
) -> Vec<Tile> {
    let fits = |points: &[Coord<f64>]| {
        let bbox = corridor_bounding_box(points, radius_m);
        box_width_meters(&bbox) <= max_width_m && box_height_meters(&bbox) <= max_height_m
    };

    let pts = route.points();
    let mut tiles = Vec::new();
    let mut candidate: Vec<Coord<f64>> = vec![pts[0]];

    for &next in &pts[1..] {
        candidate.push(next);
        if fits(&candidate) {
            continue;
        }

        if candidate.len() > 2 {
            // Close before the point that blew the budget; the next candidate
            // starts from the closed tile's last point (single-point handoff).
            candidate.pop();
            let boundary = *candidate.last().expect("candidate keeps >= 2 points");
            tiles.push(Tile::new(std::mem::take(&mut candidate), radius_m));
            candidate = vec![boundary, next];
            // The handoff segment gets the same budget check as any other
            // candidate before it can grow or be flushed.
            if fits(&candidate) {
                continue;
            }
        }

        // A lone segment blows the budget on its own: split it up.
        let pieces = split_segment(candidate[0], next, max_width_m, max_height_m, radius_m);
        for pair in pieces.windows(2) {
            tiles.push(Tile::new(pair.to_vec(), radius_m));
        }
        candidate = vec![next];
    }

    // Flush the remainder. A leftover single point is the closing boundary of
    // the previous tile and is already covered.
    if candidate.len() >= 2 {
        tiles.push(Tile::new(candidate, radius_m));
    }

    tiles
}

/// Subdivide the segment `a..b` into the fewest equal pieces whose corridor
/// boxes fit the budget. Returns the piece boundaries, endpoints included.
fn split_segment(
    a: Coord<f64>,
    b: Coord<f64>,
    max_width_m: f64,
    max_height_m: f64,
    radius_m: f64,
) -> Vec<Coord<f64>> {
    let mean_lat = (a.y + b.y) / 2.0;
    let extent_w = lon_degrees_to_meters((b.x - a.x).abs(), mean_lat);
    let extent_h = lat_degrees_to_meters((b.y - a.y).abs());

    // Each piece's box is its extent plus the corridor pad on both sides.
    let usable_w = max_width_m - 2.0 * radius_m;
    let usable_h = max_height_m - 2.0 * radius_m;

    let pieces = if usable_w > 0.0 && usable_h > 0.0 {
        ((extent_w / usable_w).max(extent_h / usable_h).ceil() as usize).max(1)
    } else {
        1
    };

    (0..=pieces)
        .map(|i| {
            let t = i as f64 / pieces as f64;
            Coord { x: a.x + (b.x - a.x) * t, y: a.y + (b.y - a.y) * t }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::meters_to_lon_degrees;

    /// A route of evenly spaced points heading east at `lat`.
    fn eastward_route(lat: f64, step_m: f64, n: usize) -> Route {
        let step = meters_to_lon_degrees(step_m, lat);
        Route::new((0..n).map(|i| Coord { x: 9.0 + step * i as f64, y: lat }).collect()).unwrap()
    }

    /// Concatenate tile point runs, removing the single shared boundary point
    /// between consecutive tiles.
    fn reconstruct(tiles: &[Tile]) -> Vec<Coord<f64>> {
        let mut out: Vec<Coord<f64>> = Vec::new();
        for tile in tiles {
            let pts = tile.points();
            let skip = usize::from(!out.is_empty());
            out.extend_from_slice(&pts[skip..]);
        }
        out
    }

    #[test]
    fn route_within_budget_is_a_single_tile() {
        // Scenario B: everything inside 500 m with a 1 km budget.
        let route = eastward_route(50.0, 100.0, 5);
        let tiles = tile_route(&route, 1000.0, 1000.0, 25.0);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].points(), route.points());
    }

    #[test]
    fn long_two_point_route_is_split() {
        // Scenario A: straight 50 km, 2 points, 1 km budget, 25 m corridor.
        let lat = 50.0;
        let route = Route::new(vec![
            Coord { x: 9.0, y: lat },
            Coord { x: 9.0 + meters_to_lon_degrees(50_000.0, lat), y: lat },
        ])
        .unwrap();
        let tiles = tile_route(&route, 1000.0, 1000.0, 25.0);
        assert!(
            (45..=60).contains(&tiles.len()),
            "expected on the order of 50 tiles, got {}",
            tiles.len()
        );
        for tile in &tiles {
            assert!(box_width_meters(tile.bbox()) <= 1000.0 + 1e-6);
            assert!(box_height_meters(tile.bbox()) <= 1000.0 + 1e-6);
        }
    }

    #[test]
    fn oversize_segment_after_in_budget_prefix_is_split() {
        // A short in-budget hop followed by a 50 km jump: the trailing
        // segment must be subdivided even though it starts life as the
        // handoff candidate of a freshly closed tile.
        let lat = 50.0;
        let route = Route::new(vec![
            Coord { x: 9.0, y: lat },
            Coord { x: 9.0 + meters_to_lon_degrees(400.0, lat), y: lat },
            Coord { x: 9.0 + meters_to_lon_degrees(50_400.0, lat), y: lat },
        ])
        .unwrap();
        let tiles = tile_route(&route, 1000.0, 1000.0, 25.0);
        assert!(
            (45..=60).contains(&tiles.len()),
            "expected the 50 km segment split into ~50 pieces, got {} tiles",
            tiles.len()
        );
        for tile in &tiles {
            assert!(box_width_meters(tile.bbox()) <= 1000.0 + 1e-6);
            assert!(box_height_meters(tile.bbox()) <= 1000.0 + 1e-6);
        }
        assert_eq!(reconstruct(&tiles).first(), route.points().first());
        assert_eq!(reconstruct(&tiles).last(), route.points().last());
    }

    #[test]
    fn tiles_reconstruct_the_route_with_single_point_handoff() {
        let route = eastward_route(50.0, 400.0, 40); // ~15.6 km
        let tiles = tile_route(&route, 2000.0, 2000.0, 100.0);
        assert!(tiles.len() > 1);
        assert_eq!(reconstruct(&tiles), route.points());
    }

    #[test]
    fn consecutive_tiles_share_exactly_one_point() {
        let route = eastward_route(50.0, 400.0, 40);
        let tiles = tile_route(&route, 2000.0, 2000.0, 100.0);
        for pair in tiles.windows(2) {
            assert_eq!(pair[0].points().last(), pair[1].points().first());
        }
    }

    #[test]
    fn boxes_respect_the_budget_or_are_two_point_tiles() {
        let route = eastward_route(48.0, 700.0, 25);
        let (max_w, max_h) = (1500.0, 1500.0);
        for tile in tile_route(&route, max_w, max_h, 50.0) {
            let within = box_width_meters(tile.bbox()) <= max_w + 1e-6
                && box_height_meters(tile.bbox()) <= max_h + 1e-6;
            assert!(within || tile.points().len() == 2);
        }
    }

    #[test]
    fn budget_below_corridor_diameter_degrades_to_segment_tiles() {
        // Every pair exceeds a 150 m budget with a 100 m corridor: one tile
        // per segment, each necessarily oversize.
        let route = eastward_route(50.0, 500.0, 4);
        let tiles = tile_route(&route, 150.0, 150.0, 100.0);
        assert_eq!(tiles.len(), 3);
        for tile in &tiles {
            assert_eq!(tile.points().len(), 2);
        }
        assert_eq!(reconstruct(&tiles), route.points());
    }

    #[test]
    fn degenerate_tile_is_a_two_point_path() {
        let tile = Tile::new(vec![Coord { x: 9.0, y: 50.0 }], 25.0);
        assert_eq!(tile.points().len(), 2);
        assert_eq!(tile.points()[0], tile.points()[1]);
    }

    #[test]
    fn north_south_route_respects_the_height_budget() {
        let step = 400.0 / 111_320.0; // ~400 m of latitude
        let route =
            Route::new((0..30).map(|i| Coord { x: 9.0, y: 50.0 + step * i as f64 }).collect())
                .unwrap();
        let tiles = tile_route(&route, 2000.0, 2000.0, 100.0);
        assert!(tiles.len() > 1);
        for tile in &tiles {
            assert!(box_height_meters(tile.bbox()) <= 2000.0 + 1e-6);
        }
        assert_eq!(reconstruct(&tiles), route.points());
    }
}
