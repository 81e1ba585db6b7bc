use polars::prelude::*;
use std::fs;
use std::path::Path;
use tagtrends::api::{build_payload, respond, PipelineOptions};
use tagtrends::TrendsError;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn write_parquet(path: &Path, mut df: DataFrame) -> TestResult {
    let mut file = fs::File::create(path)?;
    ParquetWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}

/// Three months of questions, split across a parquet and a csv source.
fn create_monthly_data(data_dir: &Path) -> TestResult {
    // 2021-10: python x2, flask x1, rust x1
    let october = df![
        "Question ID" => ["q1", "q1", "q2", "q3"],
        "Tag" => ["python", "flask", "rust", "python"],
        "DateTime" => [
            "2021-10-03 10:00:00",
            "2021-10-03 10:00:00",
            "2021-10-15 08:30:00",
            "2021-10-31 23:59:59"
        ]
    ]?;
    write_parquet(&data_dir.join("2021-10.parquet"), october)?;

    // Before the cutoff: must never show up.
    let september = df![
        "Question ID" => ["q0", "q0"],
        "Tag" => ["python", "cobol"],
        "DateTime" => ["2021-09-30 12:00:00", "2021-09-30 12:00:00"]
    ]?;
    write_parquet(&data_dir.join("2021-09.parquet"), september)?;

    // Separate Date/Time columns, day-first, with padded headers and one bad row.
    fs::write(
        data_dir.join("late_2021.csv"),
        " Question ID ,Tag , Date ,Time\n\
         q4,python,05/11/2021,09:00:00\n\
         q4,flask,05/11/2021,09:00:00\n\
         q4,pandas,05/11/2021,09:00:00\n\
         q5,rust,20/11/2021,14:00:00\n\
         q6,python,01/12/2021,00:00:01\n\
         q6,pandas,01/12/2021,00:00:01\n\
         q7,rust,not-a-date,10:00:00\n",
    )?;

    Ok(())
}

#[test]
fn test_full_payload() -> TestResult {
    let dir = tempfile::tempdir()?;
    create_monthly_data(dir.path())?;

    let payload = build_payload(&PipelineOptions::new(dir.path()))?;

    assert_eq!(payload.months, vec!["Oct-2021", "Nov-2021", "Dec-2021"]);

    let python = payload.count.get("python").expect("python series");
    assert_eq!(python.months, payload.months);
    assert_eq!(python.values, vec![2, 1, 1]);
    assert_eq!(payload.count.get("rust").unwrap().values, vec![1, 1, 0]);
    assert!(payload.count.get("cobol").is_none(), "pre-cutoff tag leaked");

    // Oct total 4, Nov total 4, Dec total 2
    assert_eq!(payload.percentage.get("python").unwrap().values, vec![50.0, 25.0, 50.0]);
    assert_eq!(payload.volatile.get("python").unwrap().values, vec![0, 1, 0]);

    let growth = payload.growth.get("python").unwrap();
    assert_eq!(growth.months, vec!["Nov-2021", "Dec-2021"]);
    assert_eq!(growth.values, vec![-50.0, 0.0]);
    // pandas: 0 -> 1 -> 1, first step has a zero base
    assert_eq!(payload.growth.get("pandas").unwrap().values, vec![0.0, 0.0]);

    // Dec: pandas 1, python 1, everything else 0; ties in tag order
    assert_eq!(payload.pie.labels[..2], ["pandas".to_string(), "python".to_string()]);
    assert_eq!(payload.pie.values[..2], [1, 1]);
    assert!(payload.pie.values[2..].iter().all(|&v| v == 0));

    // q1: flask, q3: (alone), q4: flask + pandas, q6: pandas
    assert_eq!(
        payload.python_tags,
        vec![("flask".to_string(), 2), ("pandas".to_string(), 2)]
    );

    Ok(())
}

#[test]
fn test_view_invariants() -> TestResult {
    let dir = tempfile::tempdir()?;
    create_monthly_data(dir.path())?;
    let payload = build_payload(&PipelineOptions::new(dir.path()))?;

    for (tag, series) in payload.count.iter() {
        assert_eq!(series.months.len(), series.values.len());
        assert_eq!(payload.growth.get(tag).unwrap().months.len() + 1, series.months.len());
        assert_eq!(payload.volatile.get(tag).unwrap().values[0], 0);
    }

    for month_idx in 0..payload.months.len() {
        let sum: f64 = payload.percentage.iter().map(|(_, s)| s.values[month_idx]).sum();
        assert!((sum - 100.0).abs() < 0.05);
    }

    assert!(payload.pie.labels.len() <= 15);
    assert!(payload.pie.values.windows(2).all(|w| w[0] >= w[1]));
    assert!(payload.python_tags.len() <= 10);
    assert!(payload.python_tags.windows(2).all(|w| w[0].1 >= w[1].1));

    Ok(())
}

#[test]
fn test_python_flask_scenario() -> TestResult {
    let dir = tempfile::tempdir()?;
    let df = df![
        "Question ID" => [42i64, 42],
        "Tag" => ["python", "flask"],
        "DateTime" => ["2022-03-10 11:00:00", "2022-03-10 11:00:00"]
    ]?;
    write_parquet(&dir.path().join("2022-03.parquet"), df)?;

    let payload = build_payload(&PipelineOptions::new(dir.path()))?;
    assert_eq!(payload.python_tags, vec![("flask".to_string(), 1)]);
    assert_eq!(payload.count.get("python").unwrap().values, vec![1]);
    assert_eq!(payload.count.get("flask").unwrap().values, vec![1]);
    assert!(payload.growth.get("python").unwrap().values.is_empty());
    Ok(())
}

#[test]
fn test_everything_before_cutoff_is_empty_not_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let df = df![
        "Question ID" => ["1", "1"],
        "Tag" => ["python", "flask"],
        "DateTime" => ["2020-05-01 00:00:00", "2021-09-30 23:59:59"]
    ]?;
    write_parquet(&dir.path().join("old.parquet"), df)?;

    let response = respond(&PipelineOptions::new(dir.path()));
    assert!(response.error.is_none());

    let value: serde_json::Value = serde_json::from_str(&response.body)?;
    assert!(value.get("error").is_none());
    for key in ["count", "percentage", "volatile", "growth"] {
        assert_eq!(value[key], serde_json::json!({}), "{} should be empty", key);
    }
    assert_eq!(value["pie"], serde_json::json!({"labels": [], "values": []}));
    assert_eq!(value["python_tags"], serde_json::json!([]));
    assert_eq!(value["months"], serde_json::json!([]));
    Ok(())
}

#[test]
fn test_no_input_files_is_error_payload() -> TestResult {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("notes.txt"), "not data")?;

    let response = respond(&PipelineOptions::new(dir.path()));
    assert!(matches!(response.error, Some(TrendsError::DataUnavailable(_))));

    let value: serde_json::Value = serde_json::from_str(&response.body)?;
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert!(object["error"].as_str().unwrap().contains("no parquet or csv files"));
    Ok(())
}

#[test]
fn test_all_sources_empty_is_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("empty.csv"), "")?;

    let err = build_payload(&PipelineOptions::new(dir.path())).unwrap_err();
    assert!(matches!(err, TrendsError::DataUnavailable(_)));
    Ok(())
}

#[test]
fn test_missing_tag_column_is_error_payload() -> TestResult {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("broken.csv"), "Question ID,Date\n1,01/11/2021\n")?;

    let response = respond(&PipelineOptions::new(dir.path()));
    assert!(matches!(response.error, Some(TrendsError::MissingColumn { .. })));
    assert!(response.body.contains("\"error\""));
    Ok(())
}

#[test]
fn test_repeated_calls_are_identical() -> TestResult {
    let dir = tempfile::tempdir()?;
    create_monthly_data(dir.path())?;
    let options = PipelineOptions::new(dir.path());

    let first = respond(&options);
    let second = respond(&options);
    assert!(first.error.is_none());
    assert_eq!(first.body, second.body);
    Ok(())
}
