//! Zone-based planar projection used to compute true centroids and metric
//! distances. Geographic degrees are neither equal-area nor conformal at POI
//! scale, so centroid and distance math happens in a locally accurate UTM
//! zone and results are converted back to lon/lat.

use anyhow::{anyhow, Context, Result};
use geo::Coord;
use proj4rs::{proj::Proj as Proj4, transform::transform};

/// PROJ.4 string for the source geographic CRS (degrees → radians handled in code).
const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// One of the 60 fixed 6°-wide UTM longitude bands, numbered 1..=60 from
/// 180°W eastward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UtmZone(u8);

impl UtmZone {
    /// Pick the zone covering `lon`. Deterministic, no hidden state.
    pub fn for_longitude(lon: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;
        Self(zone)
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    fn proj4(&self) -> String {
        format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs", self.0)
    }
}

/// A WGS84 ↔ UTM transform pair for one zone.
///
/// Forward maps lon/lat degrees to UTM meters; inverse maps back. Southern
/// latitudes come out with negative northings, which is fine for centroid and
/// distance math (no false northing needed).
pub struct PlanarCrs {
    zone: UtmZone,
    geographic: Proj4,
    planar: Proj4,
}

impl PlanarCrs {
    pub fn new(zone: UtmZone) -> Result<Self> {
        let geographic = Proj4::from_proj_string(WGS84_PROJ4)
            .map_err(|e| anyhow!("failed to build source PROJ.4: {e}"))?;
        let planar = Proj4::from_proj_string(&zone.proj4())
            .map_err(|e| anyhow!("failed to build UTM PROJ.4 for zone {}: {e}", zone.number()))?;
        Ok(Self { zone, geographic, planar })
    }

    /// Convenience: the CRS for the zone covering `lon`.
    pub fn for_longitude(lon: f64) -> Result<Self> {
        Self::new(UtmZone::for_longitude(lon))
            .with_context(|| format!("planar CRS for longitude {lon}"))
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    /// lon/lat degrees → UTM meters.
    pub fn to_planar(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
        transform(&self.geographic, &self.planar, &mut point)
            .map_err(|e| anyhow!("forward UTM transform failed: {e}"))?;
        Ok(Coord { x: point.0, y: point.1 })
    }

    /// UTM meters → lon/lat degrees.
    pub fn to_geographic(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = (coord.x, coord.y, 0.0);
        transform(&self.planar, &self.geographic, &mut point)
            .map_err(|e| anyhow!("inverse UTM transform failed: {e}"))?;
        Ok(Coord { x: point.0.to_degrees(), y: point.1.to_degrees() })
    }

    /// Project a whole path; fails if any vertex fails to transform.
    pub fn path_to_planar(&self, coords: &[Coord<f64>]) -> Result<Vec<Coord<f64>>> {
        coords.iter().map(|c| self.to_planar(*c)).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
