//! Tag filters: which kinds of features a run should ask the service for.
//! The filter is caller-supplied data passed through to the query client;
//! the engine never interprets it. [`poi_tags`] rebuilds the category lists
//! of the original command-line tool for callers that want its defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// Category key (e.g. "amenity", "shop") → allowed values. All pairs match
/// as one logical OR: a feature carrying any allowed value under any key is
/// requested.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagFilter {
    allowed: BTreeMap<String, BTreeSet<String>>,
}

impl TagFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `values` under `key`, merging with any previous values.
    pub fn allow<K, V, I>(mut self, key: K, values: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = V>,
    {
        self.allowed
            .entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.values().all(BTreeSet::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.allowed.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The POI categories the original tool exposed on its command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoiKind {
    Water,
    Food,
    Camp,
    Toilet,
}

impl FromStr for PoiKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "water" => Ok(Self::Water),
            "food" => Ok(Self::Food),
            "camp" => Ok(Self::Camp),
            "toilet" => Ok(Self::Toilet),
            other => bail!("unknown POI kind: {other}"),
        }
    }
}

impl fmt::Display for PoiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Water => "water",
            Self::Food => "food",
            Self::Camp => "camp",
            Self::Toilet => "toilet",
        };
        f.write_str(name)
    }
}

/// Tag filter covering the requested categories. Overlapping categories
/// merge; duplicates collapse.
pub fn poi_tags(kinds: &[PoiKind]) -> TagFilter {
    let mut filter = TagFilter::new();
    for kind in kinds {
        filter = match kind {
            PoiKind::Water => filter
                .allow(
                    "amenity",
                    [
                        "fuel", "cafe", "bar", "biergarten", "fast_food", "pub", "ice_cream",
                        "food_court", "bbq", "drinking_water", "water_point", "grave_yard",
                        "marketplace",
                    ],
                )
                .allow("landuse", ["cemetery"])
                .allow("shop", ["supermarket", "coffee", "convenience", "food", "ice_cream", "water"]),
            PoiKind::Food => filter
                .allow(
                    "amenity",
                    [
                        "fuel", "restaurant", "cafe", "biergarten", "fast_food", "ice_cream",
                        "food_court", "bbq", "marketplace",
                    ],
                )
                .allow(
                    "shop",
                    ["supermarket", "bakery", "coffee", "convenience", "food", "ice_cream", "pasta", "water"],
                ),
            PoiKind::Camp => filter
                .allow("amenity", ["shelter"])
                .allow("tourism", ["camp_site", "camp_pitch"]),
            PoiKind::Toilet => filter.allow("amenity", ["toilets"]),
        };
    }
    filter
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_merges_values_per_key() {
        let filter = TagFilter::new()
            .allow("amenity", ["cafe"])
            .allow("amenity", ["fuel", "cafe"]);
        let (key, values) = filter.iter().next().unwrap();
        assert_eq!(key, "amenity");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn empty_filter_reports_empty() {
        assert!(TagFilter::new().is_empty());
        assert!(TagFilter::new().allow("shop", Vec::<String>::new()).is_empty());
        assert!(!TagFilter::new().allow("shop", ["bakery"]).is_empty());
    }

    #[test]
    fn overlapping_categories_deduplicate() {
        let both = poi_tags(&[PoiKind::Water, PoiKind::Food]);
        let amenity: &BTreeSet<String> = both
            .iter()
            .find(|(k, _)| *k == "amenity")
            .map(|(_, v)| v)
            .unwrap();
        // "fuel" and "cafe" appear in both lists but only once in the set.
        assert_eq!(amenity.iter().filter(|v| *v == "fuel").count(), 1);
        assert!(amenity.contains("drinking_water")); // water-only
        assert!(amenity.contains("restaurant")); // food-only
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [PoiKind::Water, PoiKind::Food, PoiKind::Camp, PoiKind::Toilet] {
            assert_eq!(kind.to_string().parse::<PoiKind>().unwrap(), kind);
        }
        assert!("beer".parse::<PoiKind>().is_err());
    }
}
