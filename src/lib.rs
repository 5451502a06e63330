#![doc = "Trackside public API"]
//! Finds points of interest (POIs) near a travel route by tiling the route
//! into bounded query regions, querying a tag-filtered map-data service per
//! tile, correcting polygon results to planar centroids, filtering by true
//! distance to the route, and merging everything into one deduplicated set.

mod aggregate;
mod config;
mod engine;
mod geom;
mod normalize;
#[cfg(feature = "overpass")]
mod overpass;
mod query;
mod tags;
mod tiler;

#[doc(inline)]
pub use aggregate::{aggregate, PoiSet};

#[doc(inline)]
pub use config::EngineConfig;

#[doc(inline)]
pub use engine::{find_pois, find_pois_with_cancel, CancelToken, RunReport};

#[doc(inline)]
pub use geom::{BufferedCorridor, PlanarCrs, Route, UtmZone};

#[doc(inline)]
pub use normalize::{normalize, NormalizedFeature};

#[cfg(feature = "overpass")]
#[doc(inline)]
pub use overpass::{OverpassClient, DEFAULT_OVERPASS_ENDPOINT};

#[doc(inline)]
pub use query::{FeatureGeometry, FeatureId, QueryError, RawFeature, RegionSource};

#[doc(inline)]
pub use tags::{poi_tags, PoiKind, TagFilter};

#[doc(inline)]
pub use tiler::{tile_route, Tile};
