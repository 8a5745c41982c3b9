mod parser;

pub use parser::{
    coerce_date, parse_inventory, parse_parcels, parse_permits, parse_sites, parse_tax_roll,
    SITE_MASTER_COLUMN, TAX_PARCEL_COLUMN,
};

use crate::config::SourceConfig;
use crate::workflows::rhna::domain::{
    InventorySite, ParcelRecord, PermitRecord, SiteRecord, TaxRecord,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column '{column}'")]
    MissingColumn { column: &'static str },
    #[error("line {line}: invalid WKT geometry ({reason})")]
    InvalidGeometry { line: usize, reason: String },
    #[error("permit {permit}: permit_type '{value}' is not an integer code")]
    InvalidPermitType { permit: String, value: String },
}

fn open(path: &Path) -> Result<File, SourceError> {
    File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_sites<P: AsRef<Path>>(path: P) -> Result<Vec<SiteRecord>, SourceError> {
    parse_sites(open(path.as_ref())?)
}

pub fn load_tax_roll<P: AsRef<Path>>(path: P) -> Result<Vec<TaxRecord>, SourceError> {
    parse_tax_roll(open(path.as_ref())?)
}

pub fn load_inventory<P: AsRef<Path>>(path: P) -> Result<Vec<InventorySite>, SourceError> {
    parse_inventory(open(path.as_ref())?)
}

/// Supplies the two large source tables.
pub trait SourceLoader {
    fn load_parcels(&self) -> Result<Vec<ParcelRecord>, SourceError>;
    fn load_permits(&self) -> Result<Vec<PermitRecord>, SourceError>;
}

/// Reads parcels and permits from CSV exports with WKT geometry columns.
#[derive(Debug, Clone)]
pub struct CsvSources {
    parcels_path: PathBuf,
    permits_path: PathBuf,
}

impl CsvSources {
    pub fn new(parcels_path: impl Into<PathBuf>, permits_path: impl Into<PathBuf>) -> Self {
        Self {
            parcels_path: parcels_path.into(),
            permits_path: permits_path.into(),
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.parcels_path.clone(), config.permits_path.clone())
    }
}

impl SourceLoader for CsvSources {
    fn load_parcels(&self) -> Result<Vec<ParcelRecord>, SourceError> {
        parse_parcels(open(&self.parcels_path)?)
    }

    fn load_permits(&self) -> Result<Vec<PermitRecord>, SourceError> {
        parse_permits(open(&self.permits_path)?)
    }
}

/// Caller-owned cache of the parcel and permit tables. Each table is loaded
/// on first access and reused afterwards.
#[derive(Debug)]
pub struct SourceCache<L> {
    loader: L,
    parcels: Option<Vec<ParcelRecord>>,
    permits: Option<Vec<PermitRecord>>,
}

impl<L: SourceLoader> SourceCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            parcels: None,
            permits: None,
        }
    }

    pub fn parcels(&mut self) -> Result<&[ParcelRecord], SourceError> {
        let parcels = match self.parcels.take() {
            Some(parcels) => parcels,
            None => {
                let loaded = self.loader.load_parcels()?;
                info!(rows = loaded.len(), "loaded parcel table");
                loaded
            }
        };
        Ok(self.parcels.insert(parcels).as_slice())
    }

    pub fn permits(&mut self) -> Result<&[PermitRecord], SourceError> {
        let permits = match self.permits.take() {
            Some(permits) => permits,
            None => {
                let loaded = self.loader.load_permits()?;
                info!(rows = loaded.len(), "loaded permit table");
                loaded
            }
        };
        Ok(self.permits.insert(permits).as_slice())
    }

    pub fn is_parcels_loaded(&self) -> bool {
        self.parcels.is_some()
    }

    pub fn is_permits_loaded(&self) -> bool {
        self.permits.is_some()
    }

    /// Drops both cached tables so the next access reloads them.
    pub fn clear(&mut self) {
        self.parcels = None;
        self.permits = None;
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingLoader {
        parcel_loads: Cell<usize>,
        permit_loads: Cell<usize>,
    }

    impl SourceLoader for CountingLoader {
        fn load_parcels(&self) -> Result<Vec<ParcelRecord>, SourceError> {
            self.parcel_loads.set(self.parcel_loads.get() + 1);
            Ok(vec![ParcelRecord {
                mapblklot: "3512001".to_string(),
                blklot: "3512001".to_string(),
                map_added: None,
                map_deleted: None,
                record_added: None,
                record_deleted: None,
                geometry: None,
            }])
        }

        fn load_permits(&self) -> Result<Vec<PermitRecord>, SourceError> {
            self.permit_loads.set(self.permit_loads.get() + 1);
            Err(SourceError::MissingColumn { column: "block" })
        }
    }

    #[test]
    fn parcels_load_once() {
        let mut cache = SourceCache::new(CountingLoader::default());
        assert!(!cache.is_parcels_loaded());

        assert_eq!(cache.parcels().expect("first load").len(), 1);
        assert_eq!(cache.parcels().expect("cached").len(), 1);
        assert_eq!(cache.loader().parcel_loads.get(), 1);
        assert!(cache.is_parcels_loaded());

        cache.clear();
        cache.parcels().expect("reload");
        assert_eq!(cache.loader().parcel_loads.get(), 2);
    }

    #[test]
    fn failed_loads_are_retried_on_next_access() {
        let mut cache = SourceCache::new(CountingLoader::default());
        assert!(cache.permits().is_err());
        assert!(cache.permits().is_err());
        assert_eq!(cache.loader().permit_loads.get(), 2);
        assert!(!cache.is_permits_loaded());
    }

    #[test]
    fn csv_sources_report_missing_files() {
        let sources = CsvSources::new("./does-not-exist/parcels.csv", "./does-not-exist/permits.csv");
        match sources.load_parcels() {
            Err(SourceError::Io { path, .. }) => {
                assert!(path.ends_with("parcels.csv"));
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
