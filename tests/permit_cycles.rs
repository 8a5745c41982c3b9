use rhna_ledger::workflows::rhna::permits::{pipeline_permits, rhna_permits};
use rhna_ledger::workflows::rhna::report::write_summary_csv;
use rhna_ledger::workflows::rhna::{
    ColumnPrefix, CycleWindow, ParcelRecord, PermitRecord, PermitSummaryTable, RhnaCycle,
};
use rhna_ledger::workflows::sources::{parse_permits, SourceCache, SourceError, SourceLoader};

const PERMITS: &str = "permit_number,block,lot,permit_type,proposed_units,existing_units,proposed_use,estimated_cost,status_date,permit_creation_date,issued_date,filed_date,completed_date,Location\n\
A1,0001,001,1,4,1,apartments,100000,,,,2008-01-01,,POINT(1 1)\n\
A2,0001,001,8,1,1,apartments,2500,,,,2009-05-05,,POINT(1 1)\n\
A3,0002,010,3,2,,1 family dwelling,40000,2016-02-02,,,,,\n\
A4,0003,100,6,10,,office,900000,,2010-10-10,,,,\n\
A5,0001,001,2,3,,apartments,5000,2001-01-01,,,2002-02-02,,\n";

struct FixtureLoader;

impl SourceLoader for FixtureLoader {
    fn load_parcels(&self) -> Result<Vec<ParcelRecord>, SourceError> {
        Ok(Vec::new())
    }

    fn load_permits(&self) -> Result<Vec<PermitRecord>, SourceError> {
        parse_permits(PERMITS.as_bytes())
    }
}

fn single_permit() -> Vec<PermitRecord> {
    let csv = "permit_number,block,lot,permit_type,proposed_units,existing_units,proposed_use,estimated_cost,filed_date\n\
E1,0001,001,1,4,1,apartments,100000,2008-01-01\n";
    parse_permits(csv.as_bytes()).expect("permit parses")
}

#[test]
fn construction_permit_counts_in_cycle_four_only() {
    let permits = single_permit();
    assert_eq!(permits[0].blocklot(), "0001001");
    assert_eq!(permits[0].units(), 3.0);

    let cycle4 = rhna_permits(&permits, &RhnaCycle::Cycle4.window(), true);
    assert_eq!(cycle4.len(), 1);

    let cycle3 = rhna_permits(&permits, &RhnaCycle::Cycle3.window(), true);
    assert!(cycle3.is_empty());
}

#[test]
fn counted_view_is_a_subset_of_pipeline_view() {
    let mut cache = SourceCache::new(FixtureLoader);
    let window = RhnaCycle::Cycle4.window();

    let pipeline = pipeline_permits(cache.permits().expect("permits load"), &window);
    let counted = rhna_permits(cache.permits().expect("cached permits"), &window, true);

    let pipeline_ids: Vec<&str> = pipeline.iter().map(|p| p.permit_number.as_str()).collect();
    let counted_ids: Vec<&str> = counted.iter().map(|p| p.permit_number.as_str()).collect();
    assert_eq!(pipeline_ids, vec!["A1", "A2", "A4"]);
    assert_eq!(counted_ids, vec!["A1"]);
}

#[test]
fn pipeline_summary_reports_costs_and_type_counts() {
    let mut cache = SourceCache::new(FixtureLoader);
    let window = RhnaCycle::Cycle4.window();
    let pipeline = pipeline_permits(cache.permits().expect("permits load"), &window);

    let table = PermitSummaryTable::build(&pipeline, ColumnPrefix::Pipeline);
    let parcel = table.get("0001001").expect("parcel summarized");
    assert_eq!(parcel.estimated_cost, 102_500.0);
    assert_eq!(parcel.count_for(1), 1);
    assert_eq!(parcel.count_for(8), 1);
    assert_eq!(parcel.count_for(2), 0);

    let mut out = Vec::new();
    write_summary_csv(&table, &mut out).expect("csv written");
    let text = String::from_utf8(out).expect("utf8");
    assert_eq!(
        text,
        "blocklot,pipeline_costs,pipeline1,pipeline6,pipeline8\n\
0001001,102500,1,0,1\n\
0003100,900000,0,1,0\n"
    );
}

#[test]
fn unknown_cycle_uses_the_requested_fallback() {
    let permits = single_permit();

    let pipeline_window = CycleWindow::for_cycle_number(9, RhnaCycle::Cycle3);
    assert_eq!(pipeline_window, RhnaCycle::Cycle3.window());
    assert!(pipeline_permits(&permits, &pipeline_window).is_empty());

    let counted_window = CycleWindow::for_cycle_number(9, RhnaCycle::Cycle4);
    assert_eq!(counted_window.start, 2007);
    assert_eq!(counted_window.end, 2015);
    assert_eq!(rhna_permits(&permits, &counted_window, true).len(), 1);
}

#[test]
fn cycle_windows_match_housing_element_periods() {
    let windows: Vec<(i32, i32)> = RhnaCycle::ordered()
        .into_iter()
        .map(|cycle| (cycle.window().start, cycle.window().end))
        .collect();
    assert_eq!(windows, vec![(1999, 2007), (2007, 2015), (2015, 2023)]);
    assert_eq!(RhnaCycle::Cycle5.label(), "RHNA5");
}
