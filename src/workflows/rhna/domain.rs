use chrono::{Datelike, NaiveDate};
use geo::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Regional Housing Needs Allocation cycles with a known start year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RhnaCycle {
    Cycle3,
    Cycle4,
    Cycle5,
}

impl RhnaCycle {
    pub const WINDOW_YEARS: i32 = 8;

    pub const fn ordered() -> [Self; 3] {
        [Self::Cycle3, Self::Cycle4, Self::Cycle5]
    }

    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            3 => Some(Self::Cycle3),
            4 => Some(Self::Cycle4),
            5 => Some(Self::Cycle5),
            _ => None,
        }
    }

    pub const fn number(self) -> u8 {
        match self {
            Self::Cycle3 => 3,
            Self::Cycle4 => 4,
            Self::Cycle5 => 5,
        }
    }

    pub const fn start_year(self) -> i32 {
        match self {
            Self::Cycle3 => 1999,
            Self::Cycle4 => 2007,
            Self::Cycle5 => 2015,
        }
    }

    /// Label used by the site-inventory table, e.g. `RHNA4`.
    pub fn label(self) -> String {
        format!("RHNA{}", self.number())
    }

    pub const fn window(self) -> CycleWindow {
        CycleWindow::starting(self.start_year())
    }
}

impl fmt::Display for RhnaCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RHNA cycle {}", self.number())
    }
}

/// Half-open range of calendar years `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleWindow {
    pub start: i32,
    pub end: i32,
}

impl CycleWindow {
    pub const fn starting(start: i32) -> Self {
        Self {
            start,
            end: start + RhnaCycle::WINDOW_YEARS,
        }
    }

    /// Resolves a raw cycle number, falling back to `fallback` when the
    /// number is not a known cycle.
    pub fn for_cycle_number(number: u8, fallback: RhnaCycle) -> Self {
        match RhnaCycle::from_number(number) {
            Some(cycle) => cycle.window(),
            None => {
                tracing::warn!(
                    cycle = number,
                    fallback = fallback.number(),
                    "unrecognized RHNA cycle; using fallback window"
                );
                fallback.window()
            }
        }
    }

    pub fn contains_year(&self, year: i32) -> bool {
        year >= self.start && year < self.end
    }

    /// Null dates are never inside a window.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        date.is_some_and(|date| self.contains_year(date.year()))
    }
}

impl fmt::Display for CycleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A parcel polygon from the assessor's active-and-retired layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRecord {
    pub mapblklot: String,
    pub blklot: String,
    pub map_added: Option<NaiveDate>,
    pub map_deleted: Option<NaiveDate>,
    pub record_added: Option<NaiveDate>,
    pub record_deleted: Option<NaiveDate>,
    pub geometry: Option<Geometry<f64>>,
}

/// A building permit as issued by the building inspection department.
#[derive(Debug, Clone, PartialEq)]
pub struct PermitRecord {
    pub permit_number: String,
    pub block: String,
    pub lot: String,
    pub permit_type: i64,
    pub proposed_units: Option<f64>,
    pub existing_units: Option<f64>,
    pub proposed_use: Option<String>,
    pub estimated_cost: Option<f64>,
    pub dates: PermitDates,
    pub geometry: Option<Geometry<f64>>,
}

impl PermitRecord {
    /// Net unit gain; missing counts are treated as zero.
    pub fn units(&self) -> f64 {
        self.proposed_units.unwrap_or(0.0) - self.existing_units.unwrap_or(0.0)
    }

    pub fn blocklot(&self) -> String {
        format!("{}{}", self.block, self.lot)
    }

    pub fn existing_units_missing(&self) -> bool {
        self.existing_units.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermitDates {
    pub status: Option<NaiveDate>,
    pub creation: Option<NaiveDate>,
    pub issued: Option<NaiveDate>,
    pub filed: Option<NaiveDate>,
    pub completed: Option<NaiveDate>,
}

impl PermitDates {
    pub fn all(&self) -> [Option<NaiveDate>; 5] {
        [
            self.status,
            self.creation,
            self.issued,
            self.filed,
            self.completed,
        ]
    }
}

/// A candidate-site ("bluesky") row. Columns other than the master
/// identifier are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteRecord {
    pub master_id: String,
    pub fields: BTreeMap<String, String>,
}

/// A row of the regional site-inventory table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InventorySite {
    #[serde(rename = "rhnacyc")]
    pub cycle_label: String,
    #[serde(rename = "jurisdict")]
    pub jurisdiction: String,
    #[serde(default)]
    pub locapn: Option<String>,
    #[serde(default)]
    pub apn: Option<String>,
}

/// A tax-roll row keyed by its normalized parcel identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaxRecord {
    pub parcel_id: String,
    pub master_id: String,
    pub fields: BTreeMap<String, String>,
}
