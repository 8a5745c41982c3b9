pub mod domain;
pub mod identifiers;
pub mod inventory;
pub mod linkage;
pub mod permits;
pub mod report;
pub mod summary;
pub mod window;

pub use domain::{
    CycleWindow, InventorySite, ParcelRecord, PermitDates, PermitRecord, RhnaCycle, SiteRecord,
    TaxRecord,
};
pub use linkage::{link_sites_to_parcels, link_tax_roll, LinkageError, LinkageOptions, LinkedSite};
pub use summary::{ColumnPrefix, PermitSummaryTable};
