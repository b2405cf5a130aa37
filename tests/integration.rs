use std::path::PathBuf;

use snapshot_diff::{
    load_dataset, run_job, write_report_csvs, Dataset, JobConfig, JobReport, SchemaError, Side,
    Value,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_pair() -> (Dataset, Dataset) {
    let dir = fixtures_dir();
    let old = load_dataset(dir.join("old.csv")).unwrap();
    let new = load_dataset(dir.join("new.csv")).unwrap();
    (old, new)
}

fn run_default() -> JobReport {
    let (old, new) = load_pair();
    run_job(&JobConfig::default(), &old, &new).unwrap()
}

fn keys(report: &JobReport, name: &str) -> Vec<String> {
    report
        .get(name)
        .unwrap()
        .result
        .records()
        .iter()
        .map(|r| r.key.to_string())
        .collect()
}

// -------------------------------------------------------------------------
// Default job
// -------------------------------------------------------------------------

#[test]
fn delivery_dates_report() {
    let report = run_default();
    let delivery = &report.get("delivery_dates").unwrap().result;

    // Old-side order; R-2 kept its date, R-5/R-4 exist on one side only
    assert_eq!(keys(&report, "delivery_dates"), vec!["R-1", "R-3"]);
    assert_eq!(
        delivery.columns(),
        vec![
            "ASN",
            "Nupco PO No",
            "Shipped to Location",
            "Old Delivery Date",
            "New Delivery Date",
            "Reason"
        ]
    );

    // Duplicate R-1 in the old snapshot collapsed to its first row
    assert_eq!(delivery.cell(0, "Old Delivery Date"), Some(Value::from("2024-01-01")));
    assert_eq!(delivery.cell(0, "New Delivery Date"), Some(Value::from("2024-01-10")));
    assert_eq!(delivery.cell(0, "Nupco PO No"), Some(Value::from("1000")));
    assert_eq!(delivery.cell(0, "Reason"), Some(Value::Empty));
    assert_eq!(delivery.cell(1, "Reason"), Some(Value::from("supplier delay")));

    let stats = delivery.stats();
    assert_eq!(stats.old_rows, 4);
    assert_eq!(stats.new_rows, 4);
    assert_eq!(stats.matched, 3);
    assert_eq!(stats.old_only, 1);
    assert_eq!(stats.new_only, 1);
}

#[test]
fn request_status_report() {
    let report = run_default();
    let status = &report.get("request_status").unwrap().result;

    assert_eq!(keys(&report, "request_status"), vec!["R-2", "R-3"]);
    assert_eq!(status.cell(0, "Old Request Status"), Some(Value::from("Open")));
    assert_eq!(status.cell(0, "New Request Status"), Some(Value::from("Cancelled")));
    // Passthrough values come from the new snapshot
    assert_eq!(status.cell(0, "Shipped to Location"), Some(Value::from("Jeddah North")));
    assert_eq!(status.cell(0, "Reason"), Some(Value::from("out of stock")));
    assert!(!status.columns()[1..5].contains(&"Reason".to_string()));
}

#[test]
fn identical_snapshots_produce_empty_reports() {
    let (old, _) = load_pair();
    let report = run_job(&JobConfig::default(), &old, &old).unwrap();

    assert_eq!(report.total_changes(), 0);
    let messages: Vec<&str> = report
        .comparisons
        .iter()
        .map(|c| c.empty_message.as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "No changes in Delivery Dates found.",
            "No changes in Request Status found."
        ]
    );
}

#[test]
fn missing_tracked_field_is_rejected() {
    let (old, _) = load_pair();
    let new = Dataset::from_rows(
        &["Request ID", "Delivery Date"],
        vec![vec!["R-1".into(), "2024-01-01".into()]],
    )
    .unwrap();

    let err = run_job(&JobConfig::default(), &old, &new).unwrap_err();
    assert_eq!(
        err,
        SchemaError::MissingColumn {
            side: Some(Side::New),
            column: "Request Status".to_string()
        }
    );
}

// -------------------------------------------------------------------------
// Config-driven job
// -------------------------------------------------------------------------

#[test]
fn config_file_job() {
    let config = JobConfig::from_file(fixtures_dir().join("combined.toml")).unwrap();
    let (old, new) = load_pair();
    let report = run_job(&config, &old, &new).unwrap();

    assert_eq!(report.comparisons.len(), 1);
    let comparison = report.get("status_and_date").unwrap();
    assert_eq!(comparison.title, "Status or date changed");

    let result = &comparison.result;
    assert_eq!(keys(&report, "status_and_date"), vec!["R-1", "R-2", "R-3"]);
    // "Warehouse" exists in neither snapshot and is dropped
    assert_eq!(
        result.columns(),
        vec![
            "Request",
            "Nupco PO No",
            "Old Request Status",
            "Old Delivery Date",
            "New Request Status",
            "New Delivery Date",
            "Reason"
        ]
    );
    // Separator strip switched off, no annotation lookup
    assert_eq!(result.cell(0, "Nupco PO No"), Some(Value::from("1,000")));
    assert_eq!(result.cell(2, "Reason"), Some(Value::Empty));

    let r1 = result.find(&Value::from("R-1")).unwrap();
    assert_eq!(r1.changed_indices().collect::<Vec<_>>(), vec![1]);
    let r3 = result.find(&Value::from("R-3")).unwrap();
    assert_eq!(r3.changed_indices().collect::<Vec<_>>(), vec![0, 1]);
}

// -------------------------------------------------------------------------
// Export
// -------------------------------------------------------------------------

#[test]
fn csv_export_round_trip_through_loader() {
    let report = run_default();
    let dir = tempfile::tempdir().unwrap();

    let paths = write_report_csvs(&report, dir.path()).unwrap();
    assert_eq!(paths.len(), 2);

    let written = load_dataset(&paths[1]).unwrap();
    assert_eq!(written.columns()[0], "ASN");
    assert_eq!(written.len(), 2);
    assert_eq!(written.rows()[1][0], Value::from("R-3"));
    assert_eq!(written.rows()[1][5], Value::from("supplier delay"));
}
