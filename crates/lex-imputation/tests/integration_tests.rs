//! Integration tests for iterative imputation.
//!
//! These tests verify end-to-end behavior of the imputer and the streaming
//! filter on CSV fixtures and small hand-built tables.

use lex_imputation::{
    AttributeKind, CancellationToken, Dataset, ImputationError, ImputationFilter, ImputationStage,
    ImputerConfig, IterativeImputer, LearnerKind, Learners, MajorityLearner,
    NearestNeighborLearner, ProgressUpdate, Row, SkipReason, is_missing,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    let path = fixtures_path().join(filename);
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn load_patients() -> Dataset {
    Dataset::from_dataframe(&load_csv("patients.csv"), Some("outcome"))
        .expect("Failed to build dataset")
}

/// Missing cells in every column except the target.
fn non_target_missing(dataset: &Dataset) -> usize {
    let target = dataset.schema().target_index();
    dataset
        .rows()
        .iter()
        .map(|row| {
            row.cells()
                .iter()
                .enumerate()
                .filter(|(i, v)| *i != target && is_missing(**v))
                .count()
        })
        .sum()
}

fn knn_learners() -> Learners {
    Learners::new(
        Arc::new(NearestNeighborLearner::new(1)),
        Arc::new(NearestNeighborLearner::new(1)),
    )
    .unwrap()
}

// ============================================================================
// Dataset Loading
// ============================================================================

#[test]
fn test_patients_fixture_structure() {
    let dataset = load_patients();
    let schema = dataset.schema();

    assert_eq!(dataset.len(), 16);
    assert_eq!(schema.len(), 5);
    assert_eq!(schema.target().name(), "outcome");
    assert!(schema.attribute(0).is_numeric());
    assert!(schema.attribute(1).is_numeric());
    assert_eq!(
        schema.attribute(3).kind(),
        &AttributeKind::Nominal {
            values: vec!["north".to_string(), "south".to_string(), "east".to_string()]
        }
    );

    // age 2, income 3, smoker 2, region 2, outcome 1
    assert_eq!(dataset.missing_count(0), 2);
    assert_eq!(dataset.missing_count(1), 3);
    assert_eq!(dataset.missing_count(2), 2);
    assert_eq!(dataset.missing_count(3), 2);
    assert_eq!(dataset.missing_count(4), 1);
    assert_eq!(dataset.total_missing(), 10);
}

// ============================================================================
// Full Imputation Runs
// ============================================================================

#[test]
fn test_default_learners_fill_every_non_target_cell() {
    let dataset = load_patients();
    let outcome = IterativeImputer::from_config(&ImputerConfig::default())
        .unwrap()
        .run(dataset)
        .expect("Imputation should succeed");

    assert_eq!(non_target_missing(&outcome.dataset), 0);
    for row in outcome.dataset.rows() {
        for value in row.cells() {
            assert!(value.is_finite(), "every cell should be finite: {:?}", row);
        }
        outcome.dataset.schema().validate_row(row).unwrap();
    }

    let report = &outcome.report;
    assert_eq!(report.rows, 16);
    assert_eq!(report.target, "outcome");
    assert_eq!(report.cells_missing_before, 10);
    assert_eq!(report.cells_missing_after, 0);
    assert!(report.epochs_run >= 1);
    assert!(report.total_fits >= 4);

    // Ranked by missingness, target last
    let names: Vec<&str> = report.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["income", "age", "smoker", "region", "outcome"]);
    assert_eq!(report.attribute("income").unwrap().rank, Some(0));
    assert_eq!(
        report.attribute("outcome").unwrap().skipped,
        Some(SkipReason::Target)
    );
    assert_eq!(
        report.attribute("smoker").unwrap().learner.as_deref(),
        Some("logistic_regression")
    );
    assert_eq!(
        report.attribute("age").unwrap().learner.as_deref(),
        Some("linear_regression")
    );
}

#[test]
fn test_observed_cells_are_never_changed() {
    let original = load_patients();
    let outcome = IterativeImputer::new(ImputerConfig::default(), knn_learners())
        .unwrap()
        .run(original.clone())
        .unwrap();

    let target = original.schema().target_index();
    for (before, after) in original.rows().iter().zip(outcome.dataset.rows()) {
        for index in 0..before.len() {
            if !before.is_missing(index) {
                assert_eq!(before.value(index), after.value(index));
            } else if index != target {
                assert!(!after.is_missing(index));
            }
        }
    }
}

#[test]
fn test_unseeded_target_stays_missing() {
    let config = ImputerConfig::builder().seed_target(false).build().unwrap();
    let outcome = IterativeImputer::new(config, knn_learners())
        .unwrap()
        .run(load_patients())
        .unwrap();

    assert_eq!(non_target_missing(&outcome.dataset), 0);
    assert_eq!(outcome.report.cells_missing_after, 1);
    assert!(outcome.dataset.row(12).is_missing(4));
}

#[test]
fn test_rerun_on_completed_data_fits_nothing() {
    let imputer = IterativeImputer::new(ImputerConfig::default(), knn_learners()).unwrap();
    let first = imputer.run(load_patients()).unwrap();
    let completed = first.dataset.clone();

    let second = imputer.run(first.dataset).unwrap();

    assert_eq!(second.report.total_fits, 0);
    assert_eq!(second.report.epochs_run, 0);
    assert!(second.models.is_empty());
    for (a, b) in completed.rows().iter().zip(second.dataset.rows()) {
        assert_eq!(a.cells(), b.cells());
    }
}

#[test]
fn test_small_mixed_table_with_nearest_neighbour() {
    let df = df![
        "x1" => [Some(1.0), None, Some(2.0), Some(3.0)],
        "x2" => [Some("yes"), Some("yes"), None, Some("no")],
        "class" => ["c1", "c2", "c1", "c2"],
    ]
    .unwrap();
    let dataset = Dataset::from_dataframe(&df, Some("class")).unwrap();

    let outcome = IterativeImputer::new(ImputerConfig::default(), knn_learners())
        .unwrap()
        .run(dataset)
        .unwrap();

    let x1 = outcome.dataset.row(1).value(0);
    let x2 = outcome.dataset.row(2).value(1);
    assert!([1.0, 2.0, 3.0].contains(&x1), "x1 imputed as {}", x1);
    assert!(x2 == 0.0 || x2 == 1.0, "x2 imputed as {}", x2);

    // class is untouched
    let classes: Vec<f64> = outcome.dataset.column(2);
    assert_eq!(classes, vec![0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn test_majority_learners_reproduce_column_statistics() {
    let df = df![
        "a" => [Some(1.0), Some(2.0), None, Some(6.0)],
        "b" => [Some("x"), None, Some("y"), Some("y")],
        "t" => ["p", "q", "p", "q"],
    ]
    .unwrap();
    let dataset = Dataset::from_dataframe(&df, None).unwrap();
    let learners = Learners::new(Arc::new(MajorityLearner), Arc::new(MajorityLearner)).unwrap();

    let outcome = IterativeImputer::new(ImputerConfig::default(), learners)
        .unwrap()
        .run(dataset)
        .unwrap();

    assert_eq!(outcome.dataset.row(2).value(0), 3.0);
    assert_eq!(outcome.dataset.row(1).value(1), 1.0);
}

// ============================================================================
// Streaming Filter
// ============================================================================

#[test]
fn test_filter_trains_then_applies_frozen_models() {
    let training = load_patients();
    let schema = training.schema_arc().clone();

    let mut filter = ImputationFilter::new(ImputerConfig::default()).unwrap();
    filter.set_schema(schema.clone());

    for row in training.into_rows() {
        assert!(!filter.input(row).unwrap(), "buffering emits nothing");
    }
    assert_eq!(filter.num_pending_output(), 0);
    assert!(filter.phase().is_buffering());

    assert!(filter.batch_finished().unwrap());
    assert!(filter.is_first_batch_done());
    let completed = filter.drain_output();
    assert_eq!(completed.len(), 16);
    assert_eq!(filter.models().unwrap().len(), 4);

    let incoming =
        Dataset::from_dataframe_with_schema(&load_csv("patients_new.csv"), schema).unwrap();
    assert_eq!(incoming.total_missing(), 4);

    for row in incoming.into_rows() {
        assert!(filter.input(row).unwrap());
    }
    filter.batch_finished().unwrap();

    let applied: Vec<Row> = filter.drain_output();
    assert_eq!(applied.len(), 3);
    for row in &applied {
        assert_eq!(row.missing_count(), 0, "row not fully imputed: {:?}", row);
    }
    // Observed cells pass through
    assert_eq!(applied[0].value(0), 39.0);
    assert_eq!(applied[1].value(1), 70000.0);
}

#[test]
fn test_filter_applies_to_single_row_with_empty_numeric_cell() {
    let training = load_patients();
    let schema = training.schema_arc().clone();
    let mut filter = ImputationFilter::with_learners(ImputerConfig::default(), knn_learners()).unwrap();
    filter.filter_dataset(training).unwrap();

    // The only age cell is empty, so the CSV reader cannot type the column as numeric
    let df = load_csv("patients_single.csv");
    let incoming = Dataset::from_dataframe_with_schema(&df, schema).unwrap();
    assert_eq!(incoming.len(), 1);
    assert!(incoming.row(0).is_missing(0));

    for row in incoming.into_rows() {
        assert!(filter.input(row).unwrap());
    }
    let row = filter.output().expect("row should be queued");
    assert!(!row.is_missing(0));
    assert_eq!(row.value(1), 70000.0);
    assert_eq!(row.missing_count(), 0);
}

#[test]
fn test_filter_without_apply_time_imputation_passes_rows_through() {
    let training = load_patients();
    let schema = training.schema_arc().clone();
    let config = ImputerConfig::builder()
        .impute_at_apply_time(false)
        .build()
        .unwrap();

    let mut filter = ImputationFilter::with_learners(config, knn_learners()).unwrap();
    let completed = filter.filter_dataset(training).unwrap();
    assert_eq!(non_target_missing(&completed), 0);

    let incoming =
        Dataset::from_dataframe_with_schema(&load_csv("patients_new.csv"), schema).unwrap();
    let expected: Vec<Row> = incoming.rows().to_vec();
    for row in incoming.into_rows() {
        filter.input(row).unwrap();
    }

    let passed: Vec<Row> = filter.drain_output();
    assert_eq!(passed.len(), expected.len());
    for (a, b) in passed.iter().zip(&expected) {
        assert_eq!(a.missing_count(), b.missing_count());
    }
}

#[test]
fn test_filter_rejects_rows_before_schema() {
    let mut filter = ImputationFilter::new(ImputerConfig::default()).unwrap();
    let err = filter.input(Row::new(vec![1.0, 2.0])).unwrap_err();

    assert!(matches!(err, ImputationError::NoSchema));
    assert!(err.is_configuration_error());
    assert_eq!(err.error_code(), "NO_SCHEMA");
}

#[test]
fn test_apply_file_with_unknown_label_is_rejected() {
    let schema = load_patients().schema_arc().clone();
    let df = df![
        "age" => [40.0],
        "income" => [50000.0],
        "smoker" => ["sometimes"],
        "region" => ["north"],
        "outcome" => ["low"],
    ]
    .unwrap();

    let err = Dataset::from_dataframe_with_schema(&df, schema).unwrap_err();
    assert!(matches!(err, ImputationError::InvalidValue { ref attribute, .. } if attribute == "smoker"));
}

// ============================================================================
// DataFrame Round Trip
// ============================================================================

#[test]
fn test_completed_dataset_converts_back_to_dataframe() {
    let outcome = IterativeImputer::new(ImputerConfig::default(), knn_learners())
        .unwrap()
        .run(load_patients())
        .unwrap();

    let df = outcome.dataset.to_dataframe().unwrap();
    assert_eq!(df.shape(), (16, 5));
    assert_eq!(
        df.get_column_names_str(),
        vec!["age", "income", "smoker", "region", "outcome"]
    );
    for name in ["age", "income", "smoker", "region", "outcome"] {
        assert_eq!(df.column(name).unwrap().null_count(), 0, "nulls in {}", name);
    }
    assert_eq!(df.column("smoker").unwrap().dtype(), &DataType::String);

    let reloaded = Dataset::from_dataframe_with_schema(&df, outcome.dataset.schema_arc().clone())
        .unwrap();
    for (a, b) in reloaded.rows().iter().zip(outcome.dataset.rows()) {
        assert_eq!(a.cells(), b.cells());
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_from_json_with_aliases_and_defaults() {
    let config = ImputerConfig::from_json(
        r#"{ "max_epochs": 7, "numeric_learner": "knn", "nominal_learner": "majority" }"#,
    )
    .unwrap();

    assert_eq!(config.max_epochs, 7);
    assert_eq!(config.numeric_learner, LearnerKind::NearestNeighbor);
    assert_eq!(config.nominal_learner, LearnerKind::Majority);
    assert_eq!(config.epsilon, 5.0);
    assert!(config.seed_target);

    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(ImputerConfig::from_json(&json).unwrap(), config);
}

#[test]
fn test_config_from_json_rejects_invalid_values() {
    let err = ImputerConfig::from_json(r#"{ "epsilon": -1.0 }"#).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_CONFIG");
    assert!(err.is_configuration_error());

    let err = ImputerConfig::from_json(r#"{ "nominal_learner": "linear" }"#).unwrap_err();
    assert!(err.is_configuration_error());

    let err = ImputerConfig::from_json(r#"{ "numeric_learner": "svm" }"#).unwrap_err();
    assert_eq!(err.error_code(), "JSON_ERROR");
}

#[test]
fn test_config_epoch_limit_is_respected() {
    let config = ImputerConfig::builder()
        .max_epochs(1)
        .epsilon(0.0)
        .build()
        .unwrap();
    let outcome = IterativeImputer::new(config, knn_learners())
        .unwrap()
        .run(load_patients())
        .unwrap();

    assert_eq!(outcome.report.epochs_run, 1);
    assert_eq!(outcome.report.total_fits, 4);
    assert_eq!(non_target_missing(&outcome.dataset), 0);
}

// ============================================================================
// Progress and Cancellation
// ============================================================================

#[test]
fn test_progress_updates_cover_every_stage() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();

    IterativeImputer::new(ImputerConfig::default(), knn_learners())
        .unwrap()
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .run(load_patients())
        .unwrap();

    let updates = updates.lock().unwrap();
    let stages: Vec<ImputationStage> = updates.iter().map(|u| u.stage).collect();
    assert_eq!(stages.first(), Some(&ImputationStage::Ranking));
    assert!(stages.contains(&ImputationStage::Seeding));
    assert!(stages.contains(&ImputationStage::Fitting));
    assert_eq!(stages.last(), Some(&ImputationStage::Complete));

    for update in updates.iter() {
        assert!((0.0..=1.0).contains(&update.progress));
    }
    let fitted: Vec<&str> = updates
        .iter()
        .filter_map(|u| u.attribute.as_deref())
        .collect();
    assert!(fitted.contains(&"income"));
    assert!(!fitted.contains(&"outcome"));
}

#[test]
fn test_cancelled_run_reports_cancellation() {
    let token = CancellationToken::new();
    token.cancel();
    let stages: Arc<Mutex<Vec<ImputationStage>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = stages.clone();

    let result = IterativeImputer::new(ImputerConfig::default(), knn_learners())
        .unwrap()
        .with_cancellation(token.clone())
        .on_progress(move |update| sink.lock().unwrap().push(update.stage))
        .run(load_patients());

    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.error_code(), "CANCELLED");
    assert_eq!(
        stages.lock().unwrap().last(),
        Some(&ImputationStage::Cancelled)
    );

    // The same token can serve another run once reset
    token.reset();
    let imputer = IterativeImputer::new(ImputerConfig::default(), knn_learners())
        .unwrap()
        .with_cancellation(token);
    assert!(imputer.run(load_patients()).is_ok());
}

#[test]
fn test_errors_serialize_with_code_and_message() {
    let err = ImputationError::predictor("income", "singular design matrix");
    let json = serde_json::to_value(&err).unwrap();

    assert_eq!(json["code"], "PREDICTOR_FAILED");
    assert_eq!(
        json["message"],
        "Predictor for attribute 'income' failed: singular design matrix"
    );
}
