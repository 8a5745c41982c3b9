/// Canonical key for tax-roll parcel identifiers: embedded whitespace removed.
pub fn normalize_tax_identifier(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Canonical key for site-inventory APNs, which are written `3512/001`.
pub fn normalize_site_identifier(value: &str) -> String {
    value.replace('/', "")
}
