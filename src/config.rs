//! Engine configuration. Every knob is caller-supplied; there is no
//! environment or process-global state. All distances are meters (the degree
//! conversion happens per-latitude at the point of use, in both the tiler and
//! the containment filter).

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Max distance of a POI to the route, meters.
    pub corridor_radius_m: f64,
    /// Tile bounding-box budget, meters.
    pub max_tile_width_m: f64,
    pub max_tile_height_m: f64,
    /// Blocking wait before every query, including the first. Politeness
    /// toward the external service, not a correctness mechanism.
    pub pace: Duration,
    /// Tiles in flight at once; 1 = sequential. Public Overpass throttles per
    /// client, so anything above 1 rarely helps there.
    pub concurrency: usize,
    /// Upper bound on a single query's wait time. Expiry is a transient
    /// failure for that tile, not a fatal error.
    pub query_timeout: Option<Duration>,
    /// Feature count per tile above which a configuration warning is logged
    /// (suggests the box or radius is misconfigured); results are still used.
    pub sanity_threshold: usize,
    /// Abort the remaining tile queue after this many consecutive tiles with
    /// nothing to contribute. `None` disables the heuristic.
    pub max_consecutive_misses: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            corridor_radius_m: 100.0,
            max_tile_width_m: 10_000.0,
            max_tile_height_m: 10_000.0,
            pace: Duration::from_secs(1),
            concurrency: 1,
            query_timeout: Some(Duration::from_secs(30)),
            sanity_threshold: 5_000,
            max_consecutive_misses: None,
        }
    }
}
