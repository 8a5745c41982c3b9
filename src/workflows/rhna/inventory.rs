use super::domain::InventorySite;
use super::identifiers::normalize_site_identifier;
use super::linkage::LinkedSite;
use std::collections::HashSet;
use tracing::info;

pub const DEFAULT_JURISDICTION: &str = "San Francisco";

/// Normalized APNs listed in the site inventory for one cycle and
/// jurisdiction, from both the `locapn` and `apn` columns.
///
/// Rows are selected by their `RHNA<cycle>` label, so a cycle number with
/// no inventory rows selects nothing.
pub fn inventory_identifiers(
    inventory: &[InventorySite],
    cycle: u8,
    jurisdiction: &str,
) -> HashSet<String> {
    let label = format!("RHNA{cycle}");
    inventory
        .iter()
        .filter(|site| site.cycle_label == label && site.jurisdiction == jurisdiction)
        .flat_map(|site| [site.locapn.as_deref(), site.apn.as_deref()])
        .flatten()
        .map(normalize_site_identifier)
        .filter(|id| !id.is_empty())
        .collect()
}

/// Sets `in_inventory` on every linked site listed in the inventory and
/// returns how many were flagged.
pub fn mark_inventory_sites(
    sites: &mut [LinkedSite],
    inventory: &[InventorySite],
    cycle: u8,
    jurisdiction: &str,
) -> usize {
    let listed = inventory_identifiers(inventory, cycle, jurisdiction);
    let mut flagged = 0;
    for site in sites.iter_mut() {
        site.in_inventory = listed.contains(site.master_id());
        if site.in_inventory {
            flagged += 1;
        }
    }

    info!(
        cycle,
        jurisdiction,
        listed = listed.len(),
        flagged,
        "flagged inventory sites"
    );
    flagged
}
