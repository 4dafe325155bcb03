//! Feature selection predicates for each index kind.

use crate::feature::RawFeature;
use crate::whitelist::Whitelist;

/// Decides whether a raw feature enters the index.
///
/// Filters are evaluated concurrently by every covering worker.
pub trait FeatureFilter: Send + Sync {
    fn accept(&self, feature: &RawFeature) -> bool;
}

impl<F> FeatureFilter for F
where
    F: Fn(&RawFeature) -> bool + Send + Sync,
{
    fn accept(&self, feature: &RawFeature) -> bool {
        self(feature)
    }
}

const STREET_CLASSES: &[&str] = &[
    "motorway",
    "trunk",
    "primary",
    "secondary",
    "tertiary",
    "unclassified",
    "residential",
    "living_street",
    "service",
    "pedestrian",
    "footway",
    "road",
    "track",
];

const POI_CLASSES: &[&str] = &[
    "amenity",
    "shop",
    "tourism",
    "leisure",
    "craft",
    "office",
    "historic",
    "healthcare",
    "sport",
];

fn has_name(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

pub fn is_building(feature: &RawFeature) -> bool {
    feature
        .tags
        .types
        .iter()
        .any(|t| t == "building" || t.starts_with("building-"))
}

pub fn has_house(feature: &RawFeature) -> bool {
    has_name(&feature.tags.house_number)
}

pub fn is_street(feature: &RawFeature) -> bool {
    if feature.is_point() || !has_name(&feature.tags.name) {
        return false;
    }
    feature.tags.types.iter().any(|t| {
        t.strip_prefix("highway-")
            .is_some_and(|class| STREET_CLASSES.contains(&class))
    })
}

pub fn is_poi(feature: &RawFeature) -> bool {
    if !feature.is_point() {
        return false;
    }
    feature.tags.types.iter().any(|t| {
        if t == "railway-station" {
            return true;
        }
        let prefix = t.split('-').next().unwrap_or(t.as_str());
        POI_CLASSES.contains(&prefix)
    })
}

/// Accepts area features only.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegionsFilter;

impl FeatureFilter for RegionsFilter {
    fn accept(&self, feature: &RawFeature) -> bool {
        feature.is_area()
    }
}

/// Accepts buildings and addresses, plus streets and whitelisted POIs when
/// enabled.
#[derive(Debug, Clone)]
pub struct GeoObjectsFilter {
    whitelist: Whitelist,
    allow_streets: bool,
}

impl GeoObjectsFilter {
    pub fn new(whitelist: Whitelist, allow_streets: bool) -> Self {
        Self {
            whitelist,
            allow_streets,
        }
    }

    fn allow_poi(&self) -> bool {
        !self.whitelist.is_empty()
    }
}

impl FeatureFilter for GeoObjectsFilter {
    fn accept(&self, feature: &RawFeature) -> bool {
        if is_building(feature) || has_house(feature) {
            return true;
        }
        if self.allow_streets && is_street(feature) {
            return true;
        }
        self.allow_poi() && is_poi(feature) && self.whitelist.contains(feature.id)
    }
}
