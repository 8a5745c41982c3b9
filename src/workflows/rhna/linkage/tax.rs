use super::spatial::{dissolve_by_mapblklot, spatial_fallback, SpatialFeature, SpatialLayer};
use super::{LinkageError, LinkedSite};
use crate::workflows::rhna::domain::{ParcelRecord, TaxRecord};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxLinkMethod {
    Identifier,
    Spatial,
    Unmatched,
}

impl TaxLinkMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Spatial => "spatial",
            Self::Unmatched => "unmatched",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxLinkedSite {
    pub site: LinkedSite,
    pub tax: Option<TaxRecord>,
    pub method: TaxLinkMethod,
}

/// Attaches tax-roll rows to linked sites.
///
/// Sites whose master identifier appears in the tax roll join directly.
/// The rest are intersected against the parcel footprints of tax-roll
/// parcels, and keep their own master identifier when a footprint matches.
/// Output order is identifier matches, then spatial matches, then sites
/// matched by neither.
pub fn link_tax_roll(
    sites: &[LinkedSite],
    tax_roll: &[TaxRecord],
    parcels: &[ParcelRecord],
) -> Result<Vec<TaxLinkedSite>, LinkageError> {
    let mut tax_by_id: HashMap<&str, &TaxRecord> = HashMap::with_capacity(tax_roll.len());
    for record in tax_roll {
        if tax_by_id.insert(record.master_id.as_str(), record).is_some() {
            return Err(LinkageError::DuplicateTaxIdentifier(record.master_id.clone()));
        }
    }

    let mut linked = Vec::with_capacity(sites.len());
    let mut unresolved: Vec<&LinkedSite> = Vec::new();
    for site in sites {
        match tax_by_id.get(site.master_id()) {
            Some(record) => linked.push(TaxLinkedSite {
                site: site.clone(),
                tax: Some((*record).clone()),
                method: TaxLinkMethod::Identifier,
            }),
            None => unresolved.push(site),
        }
    }
    let by_identifier = linked.len();

    let layer = tax_layer(parcels, &tax_by_id);
    debug!(features = layer.len(), "built tax-roll footprint layer");

    let spatial = spatial_fallback(&unresolved, &layer);
    let mut spatially_matched = vec![false; unresolved.len()];
    for &(index, feature) in &spatial {
        spatially_matched[index] = true;
        linked.push(TaxLinkedSite {
            site: unresolved[index].clone(),
            tax: Some(feature.value.clone()),
            method: TaxLinkMethod::Spatial,
        });
    }

    for (site, matched) in unresolved.iter().zip(spatially_matched) {
        if !matched {
            linked.push(TaxLinkedSite {
                site: (*site).clone(),
                tax: None,
                method: TaxLinkMethod::Unmatched,
            });
        }
    }

    info!(
        sites = sites.len(),
        by_identifier,
        by_geometry = spatial.len(),
        unmatched = linked.len() - by_identifier - spatial.len(),
        "linked sites to tax roll"
    );
    Ok(linked)
}

fn tax_layer(parcels: &[ParcelRecord], tax_by_id: &HashMap<&str, &TaxRecord>) -> SpatialLayer<TaxRecord> {
    let features = dissolve_by_mapblklot(parcels)
        .into_iter()
        .filter_map(|(mapblklot, footprint)| {
            let record = tax_by_id.get(mapblklot.as_str())?;
            Some(SpatialFeature::new(mapblklot, footprint, (*record).clone()))
        })
        .collect();
    SpatialLayer::new(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::rhna::domain::SiteRecord;
    use geo::{point, polygon, Geometry};
    use std::collections::BTreeMap;

    fn parcel(mapblklot: &str, x: f64) -> ParcelRecord {
        ParcelRecord {
            mapblklot: mapblklot.to_string(),
            blklot: mapblklot.to_string(),
            map_added: None,
            map_deleted: None,
            record_added: None,
            record_deleted: None,
            geometry: Some(Geometry::Polygon(polygon![
                (x: x, y: 0.0),
                (x: x + 1.0, y: 0.0),
                (x: x + 1.0, y: 1.0),
                (x: x, y: 1.0),
                (x: x, y: 0.0),
            ])),
        }
    }

    fn tax(master_id: &str, value: &str) -> TaxRecord {
        TaxRecord {
            parcel_id: master_id.to_string(),
            master_id: master_id.to_string(),
            fields: BTreeMap::from([("assessed_value".to_string(), value.to_string())]),
        }
    }

    fn site(master_id: &str, at: Option<(f64, f64)>) -> LinkedSite {
        let mut site = LinkedSite::unmatched(SiteRecord {
            master_id: master_id.to_string(),
            ..SiteRecord::default()
        });
        site.geometry = at.map(|(x, y)| Geometry::Point(point!(x: x, y: y)));
        site
    }

    #[test]
    fn identifier_matches_come_first_then_spatial_then_unmatched() {
        let parcels = vec![parcel("1000001", 0.0), parcel("2000002", 5.0)];
        let tax_roll = vec![tax("1000001", "100"), tax("2000002", "200")];
        let sites = vec![
            site("9999999", None),
            site("8888888", Some((5.5, 0.5))),
            site("1000001", Some((0.5, 0.5))),
        ];

        let linked = link_tax_roll(&sites, &tax_roll, &parcels).expect("links");
        assert_eq!(linked.len(), 3);

        assert_eq!(linked[0].method, TaxLinkMethod::Identifier);
        assert_eq!(linked[0].site.master_id(), "1000001");

        assert_eq!(linked[1].method, TaxLinkMethod::Spatial);
        assert_eq!(linked[1].site.master_id(), "8888888");
        let spatial_tax = linked[1].tax.as_ref().expect("tax attached");
        assert_eq!(spatial_tax.master_id, "2000002");
        assert_eq!(
            spatial_tax.fields.get("assessed_value").map(String::as_str),
            Some("200")
        );

        assert_eq!(linked[2].method, TaxLinkMethod::Unmatched);
        assert!(linked[2].tax.is_none());
    }

    #[test]
    fn unmatched_rows_are_the_ones_no_footprint_claimed() {
        let parcels = vec![parcel("1000001", 0.0), parcel("2000002", 5.0)];
        let tax_roll = vec![tax("1000001", "100"), tax("2000002", "200")];
        let sites = vec![
            site("7000001", None),
            site("7000002", Some((0.5, 0.5))),
            site("7000003", Some((50.0, 50.0))),
            site("7000004", Some((5.5, 0.5))),
            site("7000002", Some((5.5, 0.5))),
        ];

        let linked = link_tax_roll(&sites, &tax_roll, &parcels).expect("links");
        let summary: Vec<(&str, TaxLinkMethod)> = linked
            .iter()
            .map(|row| (row.site.master_id(), row.method))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("7000002", TaxLinkMethod::Spatial),
                ("7000004", TaxLinkMethod::Spatial),
                ("7000001", TaxLinkMethod::Unmatched),
                ("7000003", TaxLinkMethod::Unmatched),
                ("7000002", TaxLinkMethod::Unmatched),
            ]
        );
        assert_eq!(
            linked[1].tax.as_ref().map(|tax| tax.master_id.as_str()),
            Some("2000002")
        );
    }

    #[test]
    fn footprints_without_tax_rows_are_not_spatial_candidates() {
        let parcels = vec![parcel("1000001", 0.0)];
        let sites = vec![site("8888888", Some((0.5, 0.5)))];

        let linked = link_tax_roll(&sites, &[tax("3000003", "1")], &parcels).expect("links");
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].method, TaxLinkMethod::Unmatched);
    }

    #[test]
    fn duplicate_tax_identifiers_are_rejected() {
        let error = link_tax_roll(&[], &[tax("1000001", "1"), tax("1000001", "2")], &[])
            .expect_err("duplicate rejected");
        assert_eq!(
            error,
            LinkageError::DuplicateTaxIdentifier("1000001".to_string())
        );
    }
}
