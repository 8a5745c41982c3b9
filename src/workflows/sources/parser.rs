use super::SourceError;
use crate::workflows::rhna::domain::{
    InventorySite, ParcelRecord, PermitDates, PermitRecord, SiteRecord, TaxRecord,
};
use crate::workflows::rhna::identifiers::normalize_tax_identifier;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use geo::Geometry;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::io::Read;
use tracing::debug;
use wkt::TryFromWkt;

pub const SITE_MASTER_COLUMN: &str = "MapBlkLot_Master";
pub const TAX_PARCEL_COLUMN: &str = "RP1PRCLID";

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

// Header is line 1.
fn line_of(index: usize) -> usize {
    index + 2
}

pub fn parse_parcels<R: Read>(reader: R) -> Result<Vec<ParcelRecord>, SourceError> {
    let mut csv_reader = csv_reader(reader);
    let mut parcels = Vec::new();

    for (index, record) in csv_reader.deserialize::<ParcelRow>().enumerate() {
        let row = record?;
        let geometry = parse_geometry(row.geometry.as_deref(), line_of(index))?;
        parcels.push(ParcelRecord {
            mapblklot: row.mapblklot,
            blklot: row.blklot,
            map_added: coerce_date(row.date_map_a.as_deref()),
            map_deleted: coerce_date(row.date_map_d.as_deref()),
            record_added: coerce_date(row.date_rec_a.as_deref()),
            record_deleted: coerce_date(row.date_rec_d.as_deref()),
            geometry,
        });
    }

    Ok(parcels)
}

pub fn parse_permits<R: Read>(reader: R) -> Result<Vec<PermitRecord>, SourceError> {
    let mut csv_reader = csv_reader(reader);
    let mut permits = Vec::new();

    for (index, record) in csv_reader.deserialize::<PermitRow>().enumerate() {
        let row = record?;
        let line = line_of(index);
        let permit_number = row
            .permit_number
            .unwrap_or_else(|| format!("line {line}"));
        let permit_type = parse_permit_type(row.permit_type.as_deref(), &permit_number)?;
        let geometry = parse_geometry(row.location.as_deref(), line)?;

        permits.push(PermitRecord {
            proposed_units: coerce_number(row.proposed_units.as_deref()),
            existing_units: coerce_number(row.existing_units.as_deref()),
            estimated_cost: coerce_number(row.estimated_cost.as_deref()),
            proposed_use: row.proposed_use,
            dates: PermitDates {
                status: coerce_date(row.status_date.as_deref()),
                creation: coerce_date(row.permit_creation_date.as_deref()),
                issued: coerce_date(row.issued_date.as_deref()),
                filed: coerce_date(row.filed_date.as_deref()),
                completed: coerce_date(row.completed_date.as_deref()),
            },
            permit_number,
            block: row.block,
            lot: row.lot,
            permit_type,
            geometry,
        });
    }

    Ok(permits)
}

pub fn parse_sites<R: Read>(reader: R) -> Result<Vec<SiteRecord>, SourceError> {
    parse_keyed_rows(reader, SITE_MASTER_COLUMN, |master_id, fields| SiteRecord {
        master_id: master_id.to_string(),
        fields,
    })
}

pub fn parse_tax_roll<R: Read>(reader: R) -> Result<Vec<TaxRecord>, SourceError> {
    parse_keyed_rows(reader, TAX_PARCEL_COLUMN, |parcel_id, fields| TaxRecord {
        parcel_id: parcel_id.to_string(),
        master_id: normalize_tax_identifier(parcel_id),
        fields,
    })
}

pub fn parse_inventory<R: Read>(reader: R) -> Result<Vec<InventorySite>, SourceError> {
    let mut csv_reader = csv_reader(reader);
    let mut sites = Vec::new();
    for record in csv_reader.deserialize::<InventorySite>() {
        sites.push(record?);
    }
    Ok(sites)
}

/// Reads a table with one required key column; every other column is kept
/// as text.
fn parse_keyed_rows<R, T, F>(reader: R, key_column: &'static str, build: F) -> Result<Vec<T>, SourceError>
where
    R: Read,
    F: Fn(&str, BTreeMap<String, String>) -> T,
{
    let mut csv_reader = csv_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let key_index = headers
        .iter()
        .position(|header| header.trim_start_matches('\u{feff}') == key_column)
        .ok_or(SourceError::MissingColumn { column: key_column })?;

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let key = record.get(key_index).unwrap_or_default();
        let fields = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(index, _)| *index != key_index)
            .map(|(_, (header, value))| (header.to_string(), value.to_string()))
            .collect();
        rows.push(build(key, fields));
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct ParcelRow {
    mapblklot: String,
    blklot: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date_map_a: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date_map_d: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date_rec_a: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date_rec_d: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    geometry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PermitRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    permit_number: Option<String>,
    block: String,
    lot: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    permit_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposed_units: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    existing_units: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposed_use: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    estimated_cost: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    permit_creation_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    issued_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    filed_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    completed_date: Option<String>,
    #[serde(
        rename = "Location",
        alias = "geometry",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    location: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Permit type codes must be integers; anything else aborts the load.
fn parse_permit_type(value: Option<&str>, permit_number: &str) -> Result<i64, SourceError> {
    let raw = value.unwrap_or_default();
    raw.trim()
        .parse::<i64>()
        .map_err(|_| SourceError::InvalidPermitType {
            permit: permit_number.to_string(),
            value: raw.to_string(),
        })
}

fn coerce_number(value: Option<&str>) -> Option<f64> {
    let raw = value?.trim();
    match raw.replace(',', "").parse::<f64>() {
        Ok(number) if number.is_finite() => Some(number),
        _ => {
            debug!(value = raw, "coercing non-numeric value to null");
            None
        }
    }
}

fn parse_geometry(value: Option<&str>, line: usize) -> Result<Option<Geometry<f64>>, SourceError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    Geometry::<f64>::try_from_wkt_str(raw)
        .map(Some)
        .map_err(|err| SourceError::InvalidGeometry {
            line,
            reason: err.to_string(),
        })
}

/// Parses the date formats seen in assessor and permit exports. Anything
/// unparseable becomes `None`.
pub fn coerce_date(value: Option<&str>) -> Option<NaiveDate> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc().date());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    debug!(value = trimmed, "coercing unparseable date to null");
    None
}
