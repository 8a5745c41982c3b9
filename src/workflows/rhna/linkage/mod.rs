//! Attaching parcel geometry to externally supplied site rows.
//!
//! Linkage runs in two phases: an exact join on the normalized master
//! identifier ([`join_by_identifier`] followed by [`resolve_most_recent`]),
//! and, for tax-roll rows, a spatial intersection fallback
//! ([`SpatialLayer::first_intersecting`]). Rows that match nothing are kept
//! with a null geometry.

mod identifier;
mod spatial;
mod tax;

pub use identifier::{join_by_identifier, resolve_most_recent, SiteCandidates};
pub use spatial::{dissolve_by_mapblklot, spatial_fallback, SpatialFeature, SpatialLayer};
pub use tax::{link_tax_roll, TaxLinkMethod, TaxLinkedSite};

use super::domain::{ParcelRecord, RhnaCycle, SiteRecord};
use super::window::active_parcels;
use geo::Geometry;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkageOptions {
    /// Keep the full set of matched parcels when a master identifier is
    /// ambiguous.
    pub record_backups: bool,
}

impl Default for LinkageOptions {
    fn default() -> Self {
        Self {
            record_backups: true,
        }
    }
}

/// A site row with its best-effort parcel geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedSite {
    pub site: SiteRecord,
    pub mapblklot: Option<String>,
    pub blklot: Option<String>,
    pub geometry: Option<Geometry<f64>>,
    pub blklot_backup: Option<Vec<String>>,
    pub geometry_backup: Option<Vec<Option<Geometry<f64>>>>,
    pub in_inventory: bool,
}

impl LinkedSite {
    pub fn unmatched(site: SiteRecord) -> Self {
        Self {
            site,
            mapblklot: None,
            blklot: None,
            geometry: None,
            blklot_backup: None,
            geometry_backup: None,
            in_inventory: false,
        }
    }

    pub fn master_id(&self) -> &str {
        &self.site.master_id
    }

    pub fn is_matched(&self) -> bool {
        self.mapblklot.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkageError {
    DuplicateTaxIdentifier(String),
}

impl fmt::Display for LinkageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkageError::DuplicateTaxIdentifier(id) => write!(
                f,
                "tax roll lists parcel {} more than once; expected one row per parcel",
                id
            ),
        }
    }
}

impl std::error::Error for LinkageError {}

/// Joins site rows to parcels for a cycle, one output row per master
/// identifier. Parcels are restricted to the cycle window for cycles 4 and
/// 5; any other cycle number links against the full parcel table.
pub fn link_sites_to_parcels(
    parcels: &[ParcelRecord],
    sites: &[SiteRecord],
    cycle: u8,
    options: LinkageOptions,
) -> Vec<LinkedSite> {
    let filtered;
    let candidates_pool = match RhnaCycle::from_number(cycle) {
        Some(cycle @ (RhnaCycle::Cycle4 | RhnaCycle::Cycle5)) => {
            filtered = active_parcels(parcels, &cycle.window());
            filtered.as_slice()
        }
        _ => parcels,
    };

    let linked: Vec<LinkedSite> = join_by_identifier(candidates_pool, sites)
        .into_iter()
        .map(|candidates| resolve_most_recent(candidates, options))
        .collect();

    let unmatched = linked.iter().filter(|site| !site.is_matched()).count();
    if unmatched > 0 {
        warn!(unmatched, "site rows without a parcel geometry");
    }
    info!(
        cycle,
        sites = sites.len(),
        linked = linked.len() - unmatched,
        "linked sites to parcels"
    );
    linked
}
