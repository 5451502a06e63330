//! The buffered polygonal neighborhood of a path: "close enough to the
//! route". Membership is evaluated as true planar distance to the path in the
//! path's UTM zone, so the configured radius is metric at any latitude. The
//! corridor's bounding box is wider than the corridor itself away from the
//! corners; the box is only ever a query region, never the membership test.

use anyhow::{Context, Result};
use geo::{Coord, LineString};

use super::{point_path_distance, PlanarCrs, UtmZone};

/// Everything within `radius_m` meters of a path.
pub struct BufferedCorridor {
    planar_path: Vec<Coord<f64>>,
    radius_m: f64,
    crs: PlanarCrs,
}

impl BufferedCorridor {
    /// Build the corridor of `path` with the given metric radius. The UTM
    /// zone is chosen by the path's mean longitude.
    pub fn new(path: &LineString<f64>, radius_m: f64) -> Result<Self> {
        let coords = &path.0;
        let mean_lon = coords.iter().map(|c| c.x).sum::<f64>() / coords.len() as f64;
        let crs = PlanarCrs::new(UtmZone::for_longitude(mean_lon))
            .context("corridor projection")?;
        let planar_path = crs.path_to_planar(coords).context("corridor path")?;
        Ok(Self { planar_path, radius_m, crs })
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// True corridor membership for a lon/lat coordinate: planar distance to
    /// the path, not the bounding box. A coordinate that fails to project is
    /// treated as outside.
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        match self.crs.to_planar(coord) {
            Ok(p) => point_path_distance(p, &self.planar_path) <= self.radius_m,
            Err(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
