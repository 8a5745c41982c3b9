use super::domain::PermitRecord;
use super::linkage::{LinkedSite, TaxLinkedSite};
use super::summary::PermitSummaryTable;
use chrono::NaiveDate;
use geo::Geometry;
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use wkt::ToWkt;

pub const BLKLOT_BACKUP_COLUMN: &str = "CANTID_blklot_backup";
pub const GEOMETRY_BACKUP_COLUMN: &str = "CANTID_geometry_backup";
const LIST_SEPARATOR: &str = ";";

#[derive(Debug)]
pub enum ReportError {
    Csv(csv::Error),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Csv(err) => write!(f, "failed to write CSV report: {}", err),
            ReportError::Json(err) => write!(f, "failed to write JSON report: {}", err),
            ReportError::Io(err) => write!(f, "failed to flush report: {}", err),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Csv(err) => Some(err),
            ReportError::Json(err) => Some(err),
            ReportError::Io(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

pub fn write_summary_csv<W: Write>(table: &PermitSummaryTable, writer: W) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.headers())?;
    for row in &table.rows {
        csv_writer.write_record(table.record(row))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_summary_json<W: Write>(table: &PermitSummaryTable, writer: W) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(writer, table)?;
    Ok(())
}

const PERMIT_HEADERS: [&str; 17] = [
    "permit_number",
    "blocklot",
    "block",
    "lot",
    "permit_type",
    "proposed_units",
    "existing_units",
    "units",
    "na_existing_units",
    "proposed_use",
    "estimated_cost",
    "status_date",
    "permit_creation_date",
    "issued_date",
    "filed_date",
    "completed_date",
    "geometry",
];

pub fn write_permits_csv<W: Write>(permits: &[PermitRecord], writer: W) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(PERMIT_HEADERS)?;

    for permit in permits {
        let dates = permit.dates.all().map(date_cell);
        let mut record = vec![
            permit.permit_number.clone(),
            permit.blocklot(),
            permit.block.clone(),
            permit.lot.clone(),
            permit.permit_type.to_string(),
            number_cell(permit.proposed_units),
            number_cell(permit.existing_units),
            permit.units().to_string(),
            permit.existing_units_missing().to_string(),
            permit.proposed_use.clone().unwrap_or_default(),
            number_cell(permit.estimated_cost),
        ];
        record.extend(dates);
        record.push(geometry_cell(permit.geometry.as_ref()));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes linked sites with their original columns after the linkage
/// columns. Backup lists are `;`-separated.
pub fn write_linked_sites_csv<W: Write>(sites: &[LinkedSite], writer: W) -> Result<(), ReportError> {
    let extra = extra_columns(sites.iter());
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut headers = linked_headers();
    headers.extend(extra.iter().cloned());
    csv_writer.write_record(&headers)?;

    for site in sites {
        let mut record = linked_cells(site);
        record.extend(site_field_cells(site, &extra));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_tax_linked_csv<W: Write>(rows: &[TaxLinkedSite], writer: W) -> Result<(), ReportError> {
    let extra = extra_columns(rows.iter().map(|row| &row.site));
    let tax_columns: Vec<String> = rows
        .iter()
        .filter_map(|row| row.tax.as_ref())
        .flat_map(|tax| tax.fields.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut headers = linked_headers();
    headers.extend(extra.iter().cloned());
    headers.push("tax_link".to_string());
    headers.push("RP1PRCLID".to_string());
    headers.extend(tax_columns.iter().map(|column| format!("tax_{column}")));
    csv_writer.write_record(&headers)?;

    for row in rows {
        let mut record = linked_cells(&row.site);
        record.extend(site_field_cells(&row.site, &extra));
        record.push(row.method.label().to_string());
        match &row.tax {
            Some(tax) => {
                record.push(tax.parcel_id.clone());
                record.extend(
                    tax_columns
                        .iter()
                        .map(|column| tax.fields.get(column).cloned().unwrap_or_default()),
                );
            }
            None => record.extend(std::iter::repeat(String::new()).take(tax_columns.len() + 1)),
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn linked_headers() -> Vec<String> {
    [
        "MapBlkLot_Master",
        "mapblklot",
        "blklot",
        "geometry",
        BLKLOT_BACKUP_COLUMN,
        GEOMETRY_BACKUP_COLUMN,
        "inInventory",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn linked_cells(site: &LinkedSite) -> Vec<String> {
    vec![
        site.master_id().to_string(),
        site.mapblklot.clone().unwrap_or_default(),
        site.blklot.clone().unwrap_or_default(),
        geometry_cell(site.geometry.as_ref()),
        site.blklot_backup
            .as_ref()
            .map(|codes| codes.join(LIST_SEPARATOR))
            .unwrap_or_default(),
        site.geometry_backup
            .as_ref()
            .map(|geometries| {
                geometries
                    .iter()
                    .map(|geometry| geometry_cell(geometry.as_ref()))
                    .collect::<Vec<_>>()
                    .join(LIST_SEPARATOR)
            })
            .unwrap_or_default(),
        site.in_inventory.to_string(),
    ]
}

fn extra_columns<'a>(sites: impl Iterator<Item = &'a LinkedSite>) -> Vec<String> {
    sites
        .flat_map(|site| site.site.fields.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn site_field_cells<'a>(site: &'a LinkedSite, columns: &'a [String]) -> impl Iterator<Item = String> + 'a {
    columns
        .iter()
        .map(|column| site.site.fields.get(column).cloned().unwrap_or_default())
}

fn geometry_cell(geometry: Option<&Geometry<f64>>) -> String {
    geometry
        .map(|geometry| geometry.wkt_string())
        .unwrap_or_default()
}

fn number_cell(value: Option<f64>) -> String {
    value.map(|number| number.to_string()).unwrap_or_default()
}

fn date_cell(value: Option<NaiveDate>) -> String {
    value.map(|date| date.to_string()).unwrap_or_default()
}
