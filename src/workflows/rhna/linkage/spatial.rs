use super::LinkedSite;
use crate::workflows::rhna::domain::ParcelRecord;
use geo::{BoundingRect, Geometry, Intersects, MultiPolygon, Polygon, Rect};
use std::collections::{BTreeMap, HashSet};

/// A dissolved parcel footprint carrying an attached value.
#[derive(Debug, Clone)]
pub struct SpatialFeature<T> {
    pub key: String,
    pub geometry: Geometry<f64>,
    pub value: T,
    bounds: Option<Rect<f64>>,
}

impl<T> SpatialFeature<T> {
    pub fn new(key: String, footprint: MultiPolygon<f64>, value: T) -> Self {
        let bounds = footprint.bounding_rect();
        Self {
            key,
            geometry: Geometry::MultiPolygon(footprint),
            value,
            bounds,
        }
    }

    pub fn intersects(&self, geometry: &Geometry<f64>) -> bool {
        let (Some(bounds), Some(other)) = (self.bounds, geometry.bounding_rect()) else {
            return false;
        };
        bounds.intersects(&other) && self.geometry.intersects(geometry)
    }
}

#[derive(Debug, Clone)]
pub struct SpatialLayer<T> {
    features: Vec<SpatialFeature<T>>,
}

impl<T> SpatialLayer<T> {
    pub fn new(features: Vec<SpatialFeature<T>>) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[SpatialFeature<T>] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// First feature, in layer order, that intersects `geometry`.
    pub fn first_intersecting(&self, geometry: &Geometry<f64>) -> Option<&SpatialFeature<T>> {
        self.features
            .iter()
            .find(|feature| feature.intersects(geometry))
    }
}

/// Merges every parcel polygon that shares a `mapblklot` into one footprint,
/// ordered by `mapblklot`. Parcels without polygon geometry contribute
/// nothing; identifiers with no polygons at all are left out.
pub fn dissolve_by_mapblklot(parcels: &[ParcelRecord]) -> Vec<(String, MultiPolygon<f64>)> {
    let mut footprints: BTreeMap<&str, Vec<Polygon<f64>>> = BTreeMap::new();
    for parcel in parcels {
        let polygons = footprints.entry(parcel.mapblklot.as_str()).or_default();
        if let Some(geometry) = &parcel.geometry {
            collect_polygons(geometry, polygons);
        }
    }

    footprints
        .into_iter()
        .filter(|(_, polygons)| !polygons.is_empty())
        .map(|(mapblklot, polygons)| (mapblklot.to_string(), MultiPolygon::new(polygons)))
        .collect()
}

fn collect_polygons(geometry: &Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(polygon) => out.push(polygon.clone()),
        Geometry::MultiPolygon(multi) => out.extend(multi.0.iter().cloned()),
        Geometry::Rect(rect) => out.push(rect.to_polygon()),
        Geometry::Triangle(triangle) => out.push(triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => {
            for member in collection.iter() {
                collect_polygons(member, out);
            }
        }
        _ => {}
    }
}

/// Matches each site row to at most one feature by geometry intersection,
/// returning the index of the matched row in `rows`.
///
/// Rows without geometry are skipped, and a master identifier that already
/// matched is not matched again.
pub fn spatial_fallback<'a, T>(
    rows: &[&'a LinkedSite],
    layer: &'a SpatialLayer<T>,
) -> Vec<(usize, &'a SpatialFeature<T>)> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut matched = Vec::new();

    for (index, &row) in rows.iter().enumerate() {
        let Some(geometry) = row.geometry.as_ref() else {
            continue;
        };
        let master_id = row.master_id();
        if !master_id.is_empty() && seen.contains(master_id) {
            continue;
        }
        if let Some(feature) = layer.first_intersecting(geometry) {
            seen.insert(master_id);
            matched.push((index, feature));
        }
    }

    matched
}
