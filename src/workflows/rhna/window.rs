use super::domain::{CycleWindow, ParcelRecord, PermitRecord};
use chrono::{Datelike, NaiveDate};
use tracing::debug;

fn year_before(date: Option<NaiveDate>, year: i32) -> bool {
    date.is_some_and(|date| date.year() < year)
}

fn year_at_or_after(date: Option<NaiveDate>, year: i32) -> bool {
    date.is_some_and(|date| date.year() >= year)
}

/// A parcel is excluded when it was deleted before the window opened or
/// added after it closed. Null dates never exclude.
pub fn parcel_in_window(parcel: &ParcelRecord, window: &CycleWindow) -> bool {
    let deleted_before = year_before(parcel.map_deleted, window.start)
        || year_before(parcel.record_deleted, window.start);
    let added_after = year_at_or_after(parcel.record_added, window.end)
        || year_at_or_after(parcel.map_added, window.end);

    !(deleted_before || added_after)
}

/// A permit belongs to a window when any of its five dates falls inside it.
pub fn permit_in_window(permit: &PermitRecord, window: &CycleWindow) -> bool {
    permit
        .dates
        .all()
        .into_iter()
        .any(|date| window.contains(date))
}

pub fn active_parcels(parcels: &[ParcelRecord], window: &CycleWindow) -> Vec<ParcelRecord> {
    let active: Vec<ParcelRecord> = parcels
        .iter()
        .filter(|parcel| parcel_in_window(parcel, window))
        .cloned()
        .collect();

    debug!(
        %window,
        total = parcels.len(),
        active = active.len(),
        "filtered parcels to cycle window"
    );
    active
}

pub fn permits_in_window<'a, I>(permits: I, window: &CycleWindow) -> Vec<PermitRecord>
where
    I: IntoIterator<Item = &'a PermitRecord>,
{
    let mut scanned = 0usize;
    let kept: Vec<PermitRecord> = permits
        .into_iter()
        .inspect(|_| scanned += 1)
        .filter(|permit| permit_in_window(permit, window))
        .cloned()
        .collect();

    debug!(%window, scanned, kept = kept.len(), "filtered permits to cycle window");
    kept
}
