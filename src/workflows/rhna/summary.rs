use super::domain::PermitRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Column naming for summary tables. The pipeline and permit reports name
/// the same aggregates differently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPrefix {
    #[default]
    Pipeline,
    Permit,
}

impl ColumnPrefix {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pipeline => "pipeline",
            Self::Permit => "permit",
        }
    }

    pub fn cost_column(self) -> String {
        format!("{}_costs", self.as_str())
    }

    pub fn type_column(self, permit_type: i64) -> String {
        format!("{}{}", self.as_str(), permit_type)
    }
}

impl fmt::Display for ColumnPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnPrefix {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pipeline" => Ok(Self::Pipeline),
            "permit" => Ok(Self::Permit),
            other => Err(format!("unknown column prefix '{other}' (expected pipeline or permit)")),
        }
    }
}

/// Aggregates for one block-lot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParcelPermitSummary {
    pub blocklot: String,
    pub estimated_cost: f64,
    pub counts_by_type: BTreeMap<i64, usize>,
}

impl ParcelPermitSummary {
    pub fn count_for(&self, permit_type: i64) -> usize {
        self.counts_by_type.get(&permit_type).copied().unwrap_or(0)
    }
}

/// Per-parcel cost totals and per-type permit counts, one row per
/// block-lot, with one count column for every permit type observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermitSummaryTable {
    pub prefix: ColumnPrefix,
    pub permit_types: BTreeSet<i64>,
    pub rows: Vec<ParcelPermitSummary>,
}

impl PermitSummaryTable {
    /// Missing costs are skipped in the sum.
    pub fn build(permits: &[PermitRecord], prefix: ColumnPrefix) -> Self {
        let mut permit_types = BTreeSet::new();
        let mut groups: BTreeMap<String, ParcelPermitSummary> = BTreeMap::new();

        for permit in permits {
            let blocklot = permit.blocklot();
            let entry = groups
                .entry(blocklot.clone())
                .or_insert_with(|| ParcelPermitSummary {
                    blocklot,
                    estimated_cost: 0.0,
                    counts_by_type: BTreeMap::new(),
                });
            if let Some(cost) = permit.estimated_cost {
                entry.estimated_cost += cost;
            }
            *entry.counts_by_type.entry(permit.permit_type).or_insert(0) += 1;
            permit_types.insert(permit.permit_type);
        }

        Self {
            prefix,
            permit_types,
            rows: groups.into_values().collect(),
        }
    }

    pub fn get(&self, blocklot: &str) -> Option<&ParcelPermitSummary> {
        self.rows
            .binary_search_by(|row| row.blocklot.as_str().cmp(blocklot))
            .ok()
            .map(|index| &self.rows[index])
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec!["blocklot".to_string(), self.prefix.cost_column()];
        headers.extend(
            self.permit_types
                .iter()
                .map(|permit_type| self.prefix.type_column(*permit_type)),
        );
        headers
    }

    /// Row cells aligned with [`Self::headers`]; unobserved types are zero.
    pub fn record(&self, row: &ParcelPermitSummary) -> Vec<String> {
        let mut record = vec![row.blocklot.clone(), row.estimated_cost.to_string()];
        record.extend(
            self.permit_types
                .iter()
                .map(|permit_type| row.count_for(*permit_type).to_string()),
        );
        record
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
