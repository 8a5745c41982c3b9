use super::{LinkageOptions, LinkedSite};
use crate::workflows::rhna::domain::{ParcelRecord, SiteRecord};
use geo::Geometry;
use std::collections::{BTreeMap, HashMap};

/// One site row and every parcel sharing its master identifier.
#[derive(Debug, Clone)]
pub struct SiteCandidates<'a> {
    pub site: SiteRecord,
    pub matches: Vec<&'a ParcelRecord>,
}

/// Right-outer join of parcels onto site rows by `mapblklot`.
///
/// Produces one entry per distinct master identifier, ordered by identifier,
/// keeping the first site row seen for it. The kept row carries the trimmed
/// identifier. Rows with a blank identifier cannot join and are appended
/// individually with no matches.
pub fn join_by_identifier<'a>(
    parcels: &'a [ParcelRecord],
    sites: &[SiteRecord],
) -> Vec<SiteCandidates<'a>> {
    let mut parcels_by_id: HashMap<&str, Vec<&'a ParcelRecord>> = HashMap::new();
    for parcel in parcels {
        parcels_by_id
            .entry(parcel.mapblklot.as_str())
            .or_default()
            .push(parcel);
    }

    let mut grouped: BTreeMap<&str, SiteCandidates<'a>> = BTreeMap::new();
    let mut keyless = Vec::new();

    for site in sites {
        let master_id = site.master_id.trim();
        if master_id.is_empty() {
            keyless.push(SiteCandidates {
                site: with_master_id(site, ""),
                matches: Vec::new(),
            });
            continue;
        }

        grouped.entry(master_id).or_insert_with(|| SiteCandidates {
            site: with_master_id(site, master_id),
            matches: parcels_by_id.get(master_id).cloned().unwrap_or_default(),
        });
    }

    grouped.into_values().chain(keyless).collect()
}

fn with_master_id(site: &SiteRecord, master_id: &str) -> SiteRecord {
    SiteRecord {
        master_id: master_id.to_string(),
        fields: site.fields.clone(),
    }
}

/// Picks the parcel most recently added to the map as the primary geometry.
///
/// Null `map_added` dates rank below any real date and ties keep the earlier
/// parcel. Backup sets hold the unique `blklot` codes and geometries across
/// all matches, and are only present when they contain more than one member.
/// A parcel without geometry counts as one distinct geometry member.
pub fn resolve_most_recent(candidates: SiteCandidates<'_>, options: LinkageOptions) -> LinkedSite {
    let SiteCandidates { site, matches } = candidates;

    let primary = matches.iter().copied().fold(None, |best: Option<&ParcelRecord>, parcel| {
        match best {
            Some(current) if parcel.map_added <= current.map_added => Some(current),
            _ => Some(parcel),
        }
    });

    let Some(primary) = primary else {
        return LinkedSite::unmatched(site);
    };

    let (blklot_backup, geometry_backup) = if options.record_backups {
        (unique_blklots(&matches), unique_geometries(&matches))
    } else {
        (None, None)
    };

    LinkedSite {
        site,
        mapblklot: Some(primary.mapblklot.clone()),
        blklot: Some(primary.blklot.clone()),
        geometry: primary.geometry.clone(),
        blklot_backup,
        geometry_backup,
        in_inventory: false,
    }
}

fn unique_blklots(matches: &[&ParcelRecord]) -> Option<Vec<String>> {
    let mut unique: Vec<String> = Vec::new();
    for parcel in matches {
        if !unique.contains(&parcel.blklot) {
            unique.push(parcel.blklot.clone());
        }
    }
    (unique.len() > 1).then_some(unique)
}

fn unique_geometries(matches: &[&ParcelRecord]) -> Option<Vec<Option<Geometry<f64>>>> {
    let mut unique: Vec<Option<Geometry<f64>>> = Vec::new();
    for parcel in matches {
        if !unique.contains(&parcel.geometry) {
            unique.push(parcel.geometry.clone());
        }
    }
    (unique.len() > 1).then_some(unique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use geo::{point, Geometry};

    fn parcel(blklot: &str, map_added: Option<(i32, u32, u32)>, x: f64) -> ParcelRecord {
        ParcelRecord {
            mapblklot: "3512001".to_string(),
            blklot: blklot.to_string(),
            map_added: map_added.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            map_deleted: None,
            record_added: None,
            record_deleted: None,
            geometry: Some(Geometry::Point(point!(x: x, y: 0.0))),
        }
    }

    fn site(master_id: &str) -> SiteRecord {
        SiteRecord {
            master_id: master_id.to_string(),
            ..SiteRecord::default()
        }
    }

    #[test]
    fn join_groups_parcels_under_each_master_identifier() {
        let parcels = vec![
            parcel("3512001", Some((2001, 1, 1)), 0.0),
            parcel("3512002", Some((2002, 1, 1)), 1.0),
        ];
        let sites = vec![site("3512001"), site("0001001"), site("3512001")];

        let joined = join_by_identifier(&parcels, &sites);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].site.master_id, "0001001");
        assert!(joined[0].matches.is_empty());
        assert_eq!(joined[1].site.master_id, "3512001");
        assert_eq!(joined[1].matches.len(), 2);
    }

    #[test]
    fn blank_identifiers_are_kept_without_matches() {
        let parcels = vec![parcel("3512001", None, 0.0)];
        let joined = join_by_identifier(&parcels, &[site("  "), site("")]);
        assert_eq!(joined.len(), 2);
        assert!(joined.iter().all(|entry| entry.matches.is_empty()));
    }

    #[test]
    fn single_match_has_no_backup() {
        let parcels = vec![parcel("3512001", Some((2001, 1, 1)), 0.0)];
        let candidates = join_by_identifier(&parcels, &[site("3512001")])
            .pop()
            .expect("candidates");
        let linked = resolve_most_recent(candidates, LinkageOptions::default());

        assert_eq!(linked.blklot.as_deref(), Some("3512001"));
        assert!(linked.blklot_backup.is_none());
        assert!(linked.geometry_backup.is_none());
    }

    #[test]
    fn most_recent_map_addition_wins_and_backups_hold_every_match() {
        let parcels = vec![
            parcel("3512001", Some((1998, 5, 1)), 0.0),
            parcel("3512002", Some((2010, 2, 1)), 1.0),
            parcel("3512003", None, 2.0),
        ];
        let candidates = join_by_identifier(&parcels, &[site("3512001")])
            .pop()
            .expect("candidates");
        let linked = resolve_most_recent(candidates, LinkageOptions::default());

        assert_eq!(linked.blklot.as_deref(), Some("3512002"));
        assert_eq!(
            linked.geometry,
            Some(Geometry::Point(point!(x: 1.0, y: 0.0)))
        );
        assert_eq!(
            linked.blklot_backup,
            Some(vec![
                "3512001".to_string(),
                "3512002".to_string(),
                "3512003".to_string()
            ])
        );
        assert_eq!(linked.geometry_backup.map(|g| g.len()), Some(3));
    }

    #[test]
    fn ties_keep_the_first_parcel() {
        let parcels = vec![
            parcel("3512001", Some((2010, 1, 1)), 0.0),
            parcel("3512002", Some((2010, 1, 1)), 1.0),
        ];
        let candidates = join_by_identifier(&parcels, &[site("3512001")])
            .pop()
            .expect("candidates");
        let linked = resolve_most_recent(candidates, LinkageOptions::default());
        assert_eq!(linked.blklot.as_deref(), Some("3512001"));
    }

    #[test]
    fn duplicate_geometries_collapse_in_backup() {
        let mut renamed = parcel("3512002", Some((2004, 1, 1)), 0.0);
        renamed.geometry = parcel("3512001", None, 0.0).geometry;
        let parcels = vec![parcel("3512001", Some((2001, 1, 1)), 0.0), renamed];
        let candidates = join_by_identifier(&parcels, &[site("3512001")])
            .pop()
            .expect("candidates");
        let linked = resolve_most_recent(candidates, LinkageOptions::default());

        assert_eq!(linked.blklot_backup.map(|b| b.len()), Some(2));
        assert!(linked.geometry_backup.is_none());
    }

    #[test]
    fn joined_rows_carry_the_trimmed_identifier() {
        let parcels = vec![parcel("3512001", Some((2001, 1, 1)), 0.0)];
        let joined = join_by_identifier(&parcels, &[site(" 3512001 "), site("   ")]);

        assert_eq!(joined[0].site.master_id, "3512001");
        assert_eq!(joined[0].matches.len(), 1);
        assert_eq!(joined[1].site.master_id, "");
    }

    #[test]
    fn missing_geometry_is_a_backup_member() {
        let mut outline_missing = parcel("3512002", Some((2010, 1, 1)), 1.0);
        outline_missing.geometry = None;
        let parcels = vec![parcel("3512001", Some((2001, 1, 1)), 0.0), outline_missing];
        let candidates = join_by_identifier(&parcels, &[site("3512001")])
            .pop()
            .expect("candidates");
        let linked = resolve_most_recent(candidates, LinkageOptions::default());

        assert_eq!(linked.blklot.as_deref(), Some("3512002"));
        assert!(linked.geometry.is_none());
        assert_eq!(linked.blklot_backup.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            linked.geometry_backup,
            Some(vec![Some(Geometry::Point(point!(x: 0.0, y: 0.0))), None])
        );
    }
}
