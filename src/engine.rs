//! Run orchestration: tile the route, query each tile with pacing, normalize
//! and filter the results, and fold everything into one deduplicated POI set.
//!
//! Tiles are processed one at a time by default because the dominant cost is
//! external service throttling, not local compute. The optional
//! bounded-parallel mode runs at most K tiles in flight on a fixed worker
//! pool, each still individually paced; tile results are independent and the
//! aggregation fold is commutative, so ordering between tiles never affects
//! the output.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::aggregate::PoiSet;
use crate::config::EngineConfig;
use crate::geom::Route;
use crate::normalize::{normalize, NormalizedFeature};
use crate::query::{QueryError, RegionSource};
use crate::tags::TagFilter;
use crate::tiler::{tile_route, Tile};

/// Cloneable cancellation flag. Cancelling skips every tile that has not
/// started yet; results already gathered remain valid and are returned.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What a run produced: the POI set plus per-tile accounting, so a run that
/// hit transient failures still reports how many tiles failed or were empty.
#[derive(Debug)]
pub struct RunReport {
    pub pois: PoiSet,
    pub tiles_total: usize,
    /// Tiles that contributed at least one feature.
    pub tiles_matched: usize,
    /// Tiles the service explicitly answered with no data (or whose features
    /// all fell outside the corridor).
    pub tiles_empty: usize,
    /// Tiles lost to transient failures or timeouts.
    pub tiles_failed: usize,
    /// Tiles never queried because the run was cancelled.
    pub tiles_skipped: usize,
}

enum TileOutcome {
    Features(Vec<NormalizedFeature>),
    Empty,
    Failed,
    Skipped,
}

/// Query POIs along `route` and return the deduplicated set.
pub fn find_pois<S: RegionSource>(
    route: &Route,
    filter: &TagFilter,
    config: &EngineConfig,
    source: &S,
) -> Result<RunReport> {
    find_pois_with_cancel(route, filter, config, source, &CancelToken::new())
}

/// [`find_pois`] with a caller-held cancellation token.
pub fn find_pois_with_cancel<S: RegionSource>(
    route: &Route,
    filter: &TagFilter,
    config: &EngineConfig,
    source: &S,
    cancel: &CancelToken,
) -> Result<RunReport> {
    let tiles = tile_route(
        route,
        config.max_tile_width_m,
        config.max_tile_height_m,
        config.corridor_radius_m,
    );
    info!("tiled route of {} points into {} query regions", route.len(), tiles.len());

    let misses = AtomicUsize::new(0);
    let run = |tile: &Tile| process_tile(tile, filter, config, source, cancel, &misses);

    let outcomes: Vec<TileOutcome> = if config.concurrency <= 1 {
        tiles.iter().map(run).collect::<Result<_>>()?
    } else {
        // Independent gather phase on a fixed pool; merged below.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.concurrency)
            .build()
            .context("build query worker pool")?;
        pool.install(|| tiles.par_iter().map(run).collect::<Result<_>>())?
    };

    let mut report = RunReport {
        pois: PoiSet::new(),
        tiles_total: tiles.len(),
        tiles_matched: 0,
        tiles_empty: 0,
        tiles_failed: 0,
        tiles_skipped: 0,
    };
    for outcome in outcomes {
        match outcome {
            TileOutcome::Features(features) => {
                report.tiles_matched += 1;
                report.pois.extend(features);
            }
            TileOutcome::Empty => report.tiles_empty += 1,
            TileOutcome::Failed => report.tiles_failed += 1,
            TileOutcome::Skipped => report.tiles_skipped += 1,
        }
    }

    info!(
        "run complete: {} POIs from {} tiles ({} matched, {} empty, {} failed, {} skipped)",
        report.pois.len(),
        report.tiles_total,
        report.tiles_matched,
        report.tiles_empty,
        report.tiles_failed,
        report.tiles_skipped,
    );
    Ok(report)
}

fn process_tile<S: RegionSource>(
    tile: &Tile,
    filter: &TagFilter,
    config: &EngineConfig,
    source: &S,
    cancel: &CancelToken,
    misses: &AtomicUsize,
) -> Result<TileOutcome> {
    if cancel.is_cancelled() {
        return Ok(TileOutcome::Skipped);
    }

    // Pacing is a blocking wait before every call, the first one included.
    thread::sleep(config.pace);

    let raw = match source.query_region(tile.bbox(), filter) {
        Ok(raw) => raw,
        Err(QueryError::Transient(reason)) => {
            warn!("tile query failed, continuing with remaining tiles: {reason}");
            register_miss(config, cancel, misses);
            return Ok(TileOutcome::Failed);
        }
        Err(QueryError::Fatal(err)) => return Err(err),
    };

    if raw.len() > config.sanity_threshold {
        warn!(
            "tile returned {} features (sanity threshold {}); check the tile budget and corridor radius",
            raw.len(),
            config.sanity_threshold,
        );
    }

    if raw.is_empty() {
        debug!("tile answered with no data");
        register_miss(config, cancel, misses);
        return Ok(TileOutcome::Empty);
    }

    let corridor = tile
        .corridor(config.corridor_radius_m)
        .context("tile corridor")?;
    let kept = normalize(raw, &corridor);
    if kept.is_empty() {
        register_miss(config, cancel, misses);
        return Ok(TileOutcome::Empty);
    }

    misses.store(0, Ordering::Relaxed);
    Ok(TileOutcome::Features(kept))
}

/// Count a tile that contributed nothing; beyond the configured limit the
/// remaining queue is cancelled (results so far stay valid).
fn register_miss(config: &EngineConfig, cancel: &CancelToken, misses: &AtomicUsize) {
    let Some(limit) = config.max_consecutive_misses else {
        return;
    };
    let seen = misses.fetch_add(1, Ordering::Relaxed) + 1;
    if seen == limit {
        warn!("{seen} consecutive tiles without results, cancelling the remaining queue");
        cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        let clone = token.clone();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn cancelling_a_clone_cancels_the_original() {
        let token = CancelToken::new();
        token.clone().cancel();
        assert!(token.is_cancelled());
    }
}
