use super::domain::{CycleWindow, PermitRecord};
use super::window::permits_in_window;
use tracing::info;

/// Proposed-use labels that describe housing. Matched exactly, case included.
pub const RESIDENTIAL_USES: [&str; 16] = [
    "apartments",
    "1 family dwelling",
    "2 family dwelling",
    "residential hotel",
    "misc group residns.",
    "artist live/work",
    "convalescent home",
    "accessory cottage",
    "nursing home non amb",
    "orphanage",
    "r-3(dwg) nursing",
    "nursing home gt 6",
    "day care home gt 12",
    "day care home lt 7",
    "day care home 7 - 12",
    "nursing home lte 6",
];

/// New construction, additions and alterations that may add units.
pub const COUNTED_PERMIT_TYPES: [i64; 4] = [1, 2, 3, 8];

/// Whether a permit adds residential units that count toward RHNA totals.
pub fn counts_toward_rhna(permit: &PermitRecord) -> bool {
    permit.units() > 0.0
        && permit
            .proposed_use
            .as_deref()
            .is_some_and(|proposed_use| RESIDENTIAL_USES.contains(&proposed_use))
        && COUNTED_PERMIT_TYPES.contains(&permit.permit_type)
}

/// Every permit touching the window, regardless of use or type.
pub fn pipeline_permits(permits: &[PermitRecord], window: &CycleWindow) -> Vec<PermitRecord> {
    let selected = permits_in_window(permits, window);
    info!(%window, permits = selected.len(), "selected pipeline permits");
    selected
}

/// Permits in the window, optionally restricted to those that count toward
/// RHNA unit totals.
pub fn rhna_permits(
    permits: &[PermitRecord],
    window: &CycleWindow,
    filter_for_construction: bool,
) -> Vec<PermitRecord> {
    let selected = if filter_for_construction {
        permits_in_window(permits.iter().filter(|permit| counts_toward_rhna(permit)), window)
    } else {
        permits_in_window(permits, window)
    };

    info!(
        %window,
        filter_for_construction,
        permits = selected.len(),
        "selected RHNA permits"
    );
    selected
}
