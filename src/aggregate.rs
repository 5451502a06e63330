//! Aggregator: folds per-tile normalized results into one deduplicated POI
//! set. Adjacent tiles overlap by construction, so the same real-world
//! feature commonly arrives from two tiles; identity is the service's stable
//! id when present, otherwise the representative point plus the full tag
//! mapping. The fold is commutative, so tile ordering never matters.

use std::collections::BTreeMap;

use ahash::AHashMap;
use geo::Coord;

use crate::normalize::NormalizedFeature;
use crate::query::FeatureId;

/// Deduplication identity of a feature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum FeatureKey {
    Id(FeatureId),
    /// No service id: exact representative point (bit pattern) + tags.
    Anonymous {
        x_bits: u64,
        y_bits: u64,
        tags: BTreeMap<String, String>,
    },
}

impl FeatureKey {
    fn of(feature: &NormalizedFeature) -> Self {
        match feature.id {
            Some(id) => Self::Id(id),
            None => Self::Anonymous {
                x_bits: feature.point.x.to_bits(),
                y_bits: feature.point.y.to_bits(),
                tags: feature.tags.clone(),
            },
        }
    }
}

/// The final deduplicated POI collection. Append-only while a run
/// accumulates; no particular iteration order is guaranteed.
#[derive(Debug, Default)]
pub struct PoiSet {
    features: AHashMap<FeatureKey, NormalizedFeature>,
}

impl PoiSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one feature; a duplicate of an existing entry is discarded.
    /// (Duplicates are identical under the equality test, so which copy
    /// survives is irrelevant; the first one wins.)
    pub fn insert(&mut self, feature: NormalizedFeature) {
        self.features.entry(FeatureKey::of(&feature)).or_insert(feature);
    }

    pub fn extend(&mut self, features: impl IntoIterator<Item = NormalizedFeature>) {
        for feature in features {
            self.insert(feature);
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedFeature> {
        self.features.values()
    }

    /// Consume the set as (representative point, tag mapping) pairs for a
    /// downstream serializer. The engine itself performs no file I/O.
    pub fn into_entries(self) -> Vec<(Coord<f64>, BTreeMap<String, String>)> {
        self.features.into_values().map(|f| (f.point, f.tags)).collect()
    }
}

/// Fold per-tile result sequences into one deduplicated set.
pub fn aggregate(
    per_tile: impl IntoIterator<Item = Vec<NormalizedFeature>>,
) -> PoiSet {
    let mut set = PoiSet::new();
    for tile_results in per_tile {
        set.extend(tile_results);
    }
    set
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
