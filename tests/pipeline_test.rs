use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tempfile::TempDir;

use dashpipe::data::{
    apply_filters, load_file, recompute, AggregateSpec, ColumnDef, ColumnType, DataError,
    DatasetCache, FilterSpec, Measure, Reducer, Schema, Value,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn olympics_schema() -> Schema {
    Schema::new(vec![
        ColumnDef::new("Year", ColumnType::Integer),
        ColumnDef::new("City", ColumnType::Text),
        ColumnDef::new("Sport", ColumnType::Text),
        ColumnDef::new("Country", ColumnType::Text),
        ColumnDef::new("Gender", ColumnType::Text),
        ColumnDef::new("Medal", ColumnType::Text),
        ColumnDef::new("Latitude", ColumnType::Float),
        ColumnDef::new("Longitude", ColumnType::Float),
    ])
    .expect("valid schema")
}

fn west_nile_schema() -> Schema {
    Schema::new(vec![
        ColumnDef::new("Year", ColumnType::Integer),
        ColumnDef::new("Week_Reported", ColumnType::Integer),
        ColumnDef::new("County", ColumnType::Text),
        ColumnDef::new("Positive_Cases", ColumnType::Integer),
    ])
    .expect("valid schema")
}

fn olympics_plan() -> Vec<AggregateSpec> {
    vec![
        AggregateSpec::count("total_by_year", ["Year"]).with_value_name("TotalMedals"),
        AggregateSpec::count("medal_distribution", ["Year", "Medal"]).with_value_name("Count"),
        AggregateSpec::count("year_country_medals", ["Year", "Country"])
            .with_value_name("MedalsWon"),
        AggregateSpec::count("city_summary", ["Year", "City", "Latitude", "Longitude"])
            .with_value_name("CityMedals"),
        AggregateSpec::count("breakdown_full", ["Year", "Country", "Medal"])
            .with_value_name("NumMedals"),
    ]
}

#[test]
fn test_olympics_dashboard_recompute() {
    let ds = load_file(&fixture("olympics.json"), &olympics_schema()).unwrap();
    assert_eq!(ds.len(), 7);

    let filters = vec![
        FilterSpec::range("Year", 2002, 2006),
        FilterSpec::membership("Gender", ["M", "W", "X"]),
        FilterSpec::membership("Sport", ["Skating", "Luge", "Curling"]),
    ];
    let out = recompute(&ds, &filters, &olympics_plan()).unwrap();
    assert_eq!(out.view.len(), 6);

    for agg in out.aggregates.values() {
        assert_eq!(agg.total_records(), out.view.len());
    }

    let total = out.aggregate("total_by_year").unwrap();
    let years: Vec<Value> = total.sorted_rows().into_iter().map(|r| r.key[0].clone()).collect();
    assert_eq!(years, vec![Value::Integer(2002), Value::Integer(2006)]);

    let breakdown = out.aggregate("breakdown_full").unwrap();
    let usa_2002_silver = vec![Value::Integer(2002), "USA".into(), "Silver".into()];
    assert_eq!(breakdown.lookup(&usa_2002_silver), Some(Measure::Count(1)));
    let nor_2006_gold = vec![Value::Integer(2006), "NOR".into(), "Gold".into()];
    assert_eq!(breakdown.lookup(&nor_2006_gold), None);

    let cities = out.aggregate("city_summary").unwrap();
    let turin = vec![
        Value::Integer(2006),
        "Turin".into(),
        Value::Float(45.07),
        Value::Float(7.69),
    ];
    assert_eq!(cities.lookup(&turin), Some(Measure::Count(3)));

    // detail-panel options come from the view, not the dataset
    let countries = out.view.distinct("Country").unwrap();
    assert_eq!(countries.len(), 3);
    assert_eq!(ds.distinct("Year").unwrap().len(), 3);
}

#[test]
fn test_filters_are_subset_and_idempotent() {
    let ds = load_file(&fixture("olympics.json"), &olympics_schema()).unwrap();
    let filters = vec![
        FilterSpec::membership("Country", ["USA", "CAN"]),
        FilterSpec::range("Year", 1990, 2004),
    ];
    let first = apply_filters(&ds, &filters).unwrap();
    let second = apply_filters(&ds, &filters).unwrap();
    assert_eq!(first.indices(), second.indices());
    assert!(first.indices().iter().all(|&i| i < ds.len()));
    assert_eq!(first.len(), 2);
}

#[test]
fn test_west_nile_weekly_sum() {
    let ds = load_file(&fixture("west_nile.csv"), &west_nile_schema()).unwrap();
    // the non-numeric week is retained as missing, the empty case count is
    // missing but not a coercion failure
    assert_eq!(ds.len(), 7);
    assert_eq!(ds.report().coercion_failures.get("Week_Reported"), Some(&1));
    assert_eq!(ds.report().total_failures(), 1);

    let plan = vec![AggregateSpec::count("weekly_agg", ["County", "Week_Reported"])
        .with_reducer(Reducer::sum("Positive_Cases"))];
    let filters = vec![
        FilterSpec::membership("Year", [Value::Integer(2019)]),
        FilterSpec::membership("County", ["Kern", "Fresno"]),
    ];
    let out = recompute(&ds, &filters, &plan).unwrap();
    assert_eq!(out.view.len(), 5);

    let weekly = out.aggregate("weekly_agg").unwrap();
    assert_eq!(weekly.total_records(), 5);
    assert_eq!(
        weekly.lookup(&[Value::from("Kern"), Value::Integer(31)]),
        Some(Measure::Integer(5))
    );
    assert_eq!(
        weekly.lookup(&[Value::from("Fresno"), Value::Missing]),
        Some(Measure::Integer(5))
    );
    assert_eq!(weekly.lookup(&[Value::from("Inyo"), Value::Integer(33)]), None);
}

#[test]
fn test_load_is_stable() {
    let path = fixture("west_nile.csv");
    let a = load_file(&path, &west_nile_schema()).unwrap();
    let b = load_file(&path, &west_nile_schema()).unwrap();
    assert_eq!(a, b);

    let cache = DatasetCache::new();
    let c = cache.get_or_load(&path, &west_nile_schema()).unwrap();
    let d = cache.get_or_load(&path, &west_nile_schema()).unwrap();
    assert!(Arc::ptr_eq(&c, &d));
    assert_eq!(*c, a);
}

#[test]
fn test_missing_required_column_fails_at_load() {
    let schema = olympics_schema()
        .with_column(ColumnDef::new("Athlete", ColumnType::Text))
        .unwrap();
    let err = load_file(&fixture("olympics.json"), &schema).unwrap_err();
    match err {
        DataError::SchemaMismatch { missing, .. } => assert_eq!(missing, vec!["Athlete"]),
        other => panic!("expected schema mismatch, got {other}"),
    }
}

#[test]
fn test_parquet_columns_coerced_to_schema() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("co2.parquet");

    let arrow_schema = Arc::new(ArrowSchema::new(vec![
        Field::new("State", DataType::Utf8, false),
        Field::new("Year", DataType::Utf8, true),
        Field::new("Value", DataType::Int32, true),
    ]));
    let batch = RecordBatch::try_new(
        arrow_schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["Ohio", "Utah", "Ohio"])),
            Arc::new(StringArray::from(vec![Some("2010"), Some("2011"), Some("n/a")])),
            Arc::new(Int32Array::from(vec![Some(10), None, Some(30)])),
        ],
    )
    .unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, arrow_schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let schema = Schema::new(vec![
        ColumnDef::new("State", ColumnType::Text),
        ColumnDef::new("Year", ColumnType::Integer),
        ColumnDef::new("Value", ColumnType::Float),
    ])
    .unwrap();
    let ds = load_file(&path, &schema).unwrap();
    assert_eq!(ds.len(), 3);
    assert_eq!(ds.records()[0].values(), &[
        Value::from("Ohio"),
        Value::Integer(2010),
        Value::Float(10.0),
    ]);
    assert_eq!(ds.records()[1].get(2), &Value::Missing);
    assert_eq!(ds.records()[2].get(1), &Value::Missing);
    assert_eq!(ds.report().coercion_failures.get("Year"), Some(&1));
    assert_eq!(
        ds.extent("Value").unwrap(),
        Some((Value::Float(10.0), Value::Float(30.0)))
    );
}
