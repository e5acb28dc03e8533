use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tabcheck_compare::{
    CompareError, CompareOutcome, ComparisonConfig, CsvComparison, CsvTable, Measurement,
    MeasurementSeries, SeriesSide, TimeSeriesComparison, Tolerance,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

fn load_table(name: &str) -> CsvTable {
    CsvTable::from_csv_str(&read_fixture(name)).unwrap()
}

fn load_series(side: SeriesSide, name: &str) -> MeasurementSeries {
    let table = load_table(name);
    let measurements = table.rows().iter().map(|row| {
        let timestamp = DateTime::parse_from_rfc3339(&row[0])
            .unwrap()
            .with_timezone(&Utc);
        Measurement::new(timestamp, row[1].as_str(), row[2] == "true")
    });
    MeasurementSeries::from_measurements(side, measurements).unwrap()
}

fn at(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
}

// -------------------------------------------------------------------------
// Grid
// -------------------------------------------------------------------------

#[test]
fn grid_from_fixture_config() {
    let config = ComparisonConfig::from_toml(&read_fixture("prices.toml")).unwrap();
    let mut cmp = CsvComparison::from_config(
        load_table("prices_expected.csv"),
        load_table("prices_actual.csv"),
        &config,
    )
    .unwrap();

    let found: Vec<_> = cmp
        .query()
        .iter()
        .map(|e| (e.cell_reference(), e.row_name.clone(), e.comparison.outcome()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("B3".to_string(), "MSFT".to_string(), CompareOutcome::OutsideToleranceIssue),
            ("C4".to_string(), "GOOG".to_string(), CompareOutcome::OutsideToleranceIssue),
            ("B5".to_string(), "TSLA".to_string(), CompareOutcome::Surplus),
            ("C5".to_string(), "TSLA".to_string(), CompareOutcome::Surplus),
            ("D5".to_string(), "TSLA".to_string(), CompareOutcome::Surplus),
        ]
    );

    let summary = cmp.summary();
    assert_eq!(summary.compared, 4 + 4 * 3 + 3);
    assert_eq!(summary.failures, 5);
    assert_eq!(summary.surplus, 3);
    assert_eq!(summary.outcome_counts.get("outside_tolerance"), Some(&2));

    let table = cmp.do_table(config.column_refs().as_deref()).unwrap();
    let rows = table.to_rows();
    assert_eq!(rows[0], vec!["Cell", "Row Name", "Column Name", "Outcome", "Message"]);
    assert_eq!(
        rows[1],
        vec![
            "report:B3",
            "report:MSFT",
            "report:Price",
            "fail:outside_tolerance",
            "fail:412.4 != 412.25",
        ]
    );
    assert_eq!(rows[3][4], "fail:[250.00] surplus");
}

#[test]
fn grid_missing_row_reports_single_cell() {
    let base = CsvTable::from_csv_str("Key,Value\nA,1\n").unwrap();
    let compared = CsvTable::from_csv_str("Key,Value\n").unwrap();
    let mut cmp = CsvComparison::new(base, compared, None);

    assert_eq!(cmp.error_count(), 1);
    let e = &cmp.query()[0];
    assert_eq!(e.row, Some(0));
    assert_eq!(e.column_name, "Value");
    assert_eq!(e.comparison.outcome(), CompareOutcome::Missing);
    assert_eq!(e.comparison.value_message(), "[1] missing");
}

#[test]
fn grid_self_comparison_fixture_is_clean() {
    let table = load_table("prices_actual.csv");
    let mut cmp = CsvComparison::new(table.clone(), table, Some(Tolerance::parse("1%").unwrap()));
    assert_eq!(cmp.error_count(), 0);
    assert!(cmp.summary().is_clean());
}

#[test]
fn grid_error_delta_after_fix() {
    let expected = load_table("prices_expected.csv");
    let tolerance = Tolerance::parse("0.05").unwrap();
    let mut before = CsvComparison::new(expected.clone(), load_table("prices_actual.csv"), Some(tolerance.clone()));

    let fixed = CsvTable::from_csv_str(
        "Ticker,Price,Qty,Status\nAAPL,189.50,100,open\nMSFT,412.25,50,open\nGOOG,141.80,75,closed\n",
    )
    .unwrap();
    let mut after = CsvComparison::new(expected, fixed, Some(tolerance));

    let delta = before.error_delta(&mut after);
    assert_eq!(delta.only_in_first.len(), 5);
    assert!(delta.only_in_second.is_empty());
}

#[test]
fn grid_results_serialize() {
    let base = CsvTable::from_csv_str("Key,Value\nA,1\n").unwrap();
    let compared = CsvTable::from_csv_str("Key,Value\nA,2\n").unwrap();
    let mut cmp = CsvComparison::new(base, compared, None);

    let json = serde_json::to_value(cmp.query()).unwrap();
    assert_eq!(json[0]["row"], 0);
    assert_eq!(json[0]["column_name"], "Value");
    assert_eq!(json[0]["comparison"]["outcome"], "value_issue");
    assert_eq!(json[0]["comparison"]["compare_type"], "int");
}

// -------------------------------------------------------------------------
// Time series
// -------------------------------------------------------------------------

#[test]
fn series_from_fixture_config() {
    let config = ComparisonConfig::from_toml(&read_fixture("series.toml")).unwrap();
    let mut cmp = TimeSeriesComparison::from_config(
        load_series(SeriesSide::Expected, "series_expected.csv"),
        load_series(SeriesSide::Actual, "series_actual.csv"),
        &config,
    )
    .unwrap();

    assert_eq!(cmp.point_count().unwrap(), 5);
    assert_eq!(cmp.failure_count().unwrap(), 4);
    let used = cmp.used_tolerance().unwrap().unwrap();
    assert_eq!(used.data_range, Some(10.0));
    assert!((used.value - 0.5).abs() < 1e-12);

    let outcomes: Vec<_> = cmp.query().unwrap().iter().map(|c| c.outcome()).collect();
    assert_eq!(
        outcomes,
        vec![
            CompareOutcome::WithinTolerance,
            CompareOutcome::OutsideToleranceIssue,
            CompareOutcome::Missing,
            CompareOutcome::ValueIssue,
            CompareOutcome::Surplus,
        ]
    );

    let (start, end) = config.time_bounds();
    let window = cmp.subset(start, end).unwrap();
    assert_eq!(window.len(), 3);
    let messages: Vec<_> = window.iter().map(|c| c.outcome_message()).collect();
    assert_eq!(
        messages,
        vec![
            "value 13.5 != 12.5".to_string(),
            "[2024-01-01T02:00:00Z] missing".to_string(),
            "is_good [true] expected [false]".to_string(),
        ]
    );

    let table = cmp.do_table(config.column_refs().as_deref()).unwrap();
    assert_eq!(table.rows.len(), 5);
    assert_eq!(table.rows[4][0].to_string(), "fail:2024-01-01T04:00:00Z");
    assert_eq!(table.rows[4][2].to_string(), "fail:[2024-01-01T04:00:00Z] surplus");
}

#[test]
fn series_duplicate_timestamp_is_rejected() {
    let t = at("2024-01-01T00:00:00Z");
    let err = TimeSeriesComparison::from_measurements(
        vec![Measurement::new(t, "1", true), Measurement::new(t, "2", true)],
        vec![],
        None,
    )
    .err()
    .unwrap();
    assert_eq!(
        err,
        CompareError::DuplicateKey {
            side: SeriesSide::Expected,
            timestamp: "2024-01-01T00:00:00Z".into(),
        }
    );
    assert_eq!(err.to_string(), "expected series: duplicate timestamp 2024-01-01T00:00:00Z");
}

#[test]
fn series_summary_serializes() {
    let mut cmp = TimeSeriesComparison::new(
        load_series(SeriesSide::Expected, "series_expected.csv"),
        load_series(SeriesSide::Actual, "series_actual.csv"),
        Some(Tolerance::parse("5%").unwrap()),
    );
    let json = serde_json::to_value(cmp.summary().unwrap()).unwrap();
    assert_eq!(json["compared"], 5);
    assert_eq!(json["failures"], 4);
    assert_eq!(json["outcome_counts"]["missing"], 1);
}
