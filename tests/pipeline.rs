//! Integration tests for the churn prediction pipeline

use churn_prediction_pipeline::config::{AppConfig, ClassifierFormat, MissingColumnPolicy};
use churn_prediction_pipeline::handler::{handle_request, Outcome};
use churn_prediction_pipeline::models::{loader::load_encoder, FsArtifactStore};
use churn_prediction_pipeline::{
    ChurnError, ChurnPipeline, ErrorKind, FeatureRecord, FeatureValue, Label, PredictionResponse,
    SharedPipeline, Stage,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_store() -> FsArtifactStore {
    FsArtifactStore::new(fixtures_dir(), "preprocessor.json", "model.json")
}

fn load_pipeline() -> ChurnPipeline {
    ChurnPipeline::from_store(
        &fixture_store(),
        ClassifierFormat::Forest,
        1,
        MissingColumnPolicy::TrainingMode,
    )
    .unwrap()
}

/// The sample customer from the prediction form
fn sample_form() -> Vec<(&'static str, String)> {
    [
        ("age", "32"),
        ("tenure_months", "24"),
        ("monthly_logins", "40"),
        ("weekly_active_days", "5"),
        ("avg_session_time", "12.5"),
        ("monthly_fee", "49.99"),
        ("total_revenue", "1200.0"),
        ("payment_failures", "0"),
        ("support_tickets", "1"),
        ("csat_score", "8"),
        ("nps_score", "9"),
        ("gender", "Male"),
        ("contract_type", "Yearly"),
        ("payment_method", "Card"),
        ("complaint_type", "None"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect()
}

fn at_risk_form() -> Vec<(&'static str, String)> {
    let overrides = [
        ("tenure_months", "2"),
        ("monthly_logins", "3"),
        ("payment_failures", "4"),
        ("support_tickets", "6"),
        ("csat_score", "2"),
        ("contract_type", "Monthly"),
    ];
    sample_form()
        .into_iter()
        .map(|(k, v)| match overrides.iter().find(|(name, _)| *name == k) {
            Some((_, value)) => (k, value.to_string()),
            None => (k, v),
        })
        .collect()
}

#[test]
fn test_sample_customer_will_stay() {
    let pipeline = load_pipeline();
    let record = FeatureRecord::from_form(sample_form()).unwrap();

    let prediction = pipeline.predict(&record).unwrap();
    assert_eq!(prediction.label, Label::Stay);
    assert!((prediction.churn_probability - 0.192_592_592_592_592_6).abs() < 1e-9);
    assert_eq!(prediction.label.render(), "Customer Will Stay");
    assert_eq!(pipeline.predict_one(&record).unwrap(), Label::Stay);
}

#[test]
fn test_at_risk_customer_will_churn() {
    let pipeline = load_pipeline();
    let record = FeatureRecord::from_form(at_risk_form()).unwrap();

    let prediction = pipeline.predict(&record).unwrap();
    assert_eq!(prediction.label, Label::Churn);
    assert!((prediction.churn_probability - 0.847_619_047_619_047_6).abs() < 1e-9);
    assert_eq!(prediction.label.render(), "Customer Will Churn");
}

#[test]
fn test_repeated_predictions_are_identical() {
    let pipeline = load_pipeline();
    let record = FeatureRecord::from_form(at_risk_form()).unwrap();

    let first = pipeline.predict(&record).unwrap();
    for _ in 0..10 {
        assert_eq!(pipeline.predict(&record).unwrap(), first);
    }
}

#[test]
fn test_unknown_category_scores_without_error() {
    let pipeline = load_pipeline();
    let form: Vec<_> = at_risk_form()
        .into_iter()
        .map(|(k, v)| {
            if k == "contract_type" {
                (k, "Weekly".to_string())
            } else {
                (k, v)
            }
        })
        .collect();
    let record = FeatureRecord::from_form(form).unwrap();

    let prediction = pipeline.predict(&record).unwrap();
    assert!((prediction.churn_probability - 0.661_904_761_904_761_9).abs() < 1e-9);
}

#[test]
fn test_vector_width_is_fixed() {
    let store = fixture_store();
    let encoder = load_encoder(&store).unwrap();
    assert_eq!(encoder.output_dim(), 53);

    for (gender, city) in [("Male", "Delhi"), ("Female", "Atlantis"), ("Unlisted", "London")] {
        let mut form = sample_form();
        form.retain(|(k, _)| *k != "gender");
        form.push(("gender", gender.to_string()));
        form.push(("city", city.to_string()));
        let record = FeatureRecord::from_form(form).unwrap();

        let pipeline = load_pipeline();
        let aligned = pipeline.align(&record);
        assert_eq!(aligned.columns(), encoder.expected_schema());
        assert_eq!(encoder.transform(&aligned).unwrap().len(), 53);
    }
}

#[test]
fn test_partial_record_is_aligned_to_full_schema() {
    let pipeline = load_pipeline();
    let record = FeatureRecord::from_values([
        ("age", FeatureValue::Int(30)),
        ("customer_id", FeatureValue::from("CUST-1001")),
    ]);

    let aligned = pipeline.align(&record);
    assert_eq!(aligned.len(), 30);
    assert_eq!(aligned.get("age"), Some(&FeatureValue::Int(30)));
    assert_eq!(aligned.get("referral_count"), Some(&FeatureValue::Int(0)));
    assert_eq!(aligned.get("gender"), Some(&FeatureValue::from("Male")));
    assert!(aligned.get("customer_id").is_none());

    assert!(pipeline.predict(&record).is_ok());
}

#[test]
fn test_missing_classifier_artifact() {
    let dir = TempDir::new().unwrap();
    std::fs::copy(
        fixtures_dir().join("preprocessor.json"),
        dir.path().join("preprocessor.json"),
    )
    .unwrap();

    let mut config = AppConfig::default();
    config.artifacts.dir = dir.path().display().to_string();
    let store = FsArtifactStore::from_config(&config.artifacts);

    let err = ChurnPipeline::from_config(&store, &config).err().unwrap();
    assert_eq!(err.stage, Stage::LoadArtifacts);
    assert_eq!(err.kind(), ErrorKind::ArtifactNotFound);
    assert!(matches!(
        err.source,
        ChurnError::ArtifactNotFound { ref location, .. } if location.ends_with("model.json")
    ));

    let shared = SharedPipeline::from_config(store, &config);
    let record = FeatureRecord::from_form(sample_form()).unwrap();
    let result = shared.predict(&record);
    let response = PredictionResponse::from_result(&result);
    assert!(response.is_error());
    assert!(response.label.is_none());
    assert!(response.result.contains("classifier artifact not found"));
}

#[test]
fn test_corrupt_classifier_artifact() {
    let dir = TempDir::new().unwrap();
    std::fs::copy(
        fixtures_dir().join("preprocessor.json"),
        dir.path().join("preprocessor.json"),
    )
    .unwrap();
    std::fs::write(dir.path().join("model.json"), b"\x00\x01 pickle").unwrap();

    let store = FsArtifactStore::new(dir.path(), "preprocessor.json", "model.json");
    let err = ChurnPipeline::from_store(
        &store,
        ClassifierFormat::Forest,
        1,
        MissingColumnPolicy::Zero,
    )
    .err()
    .unwrap();
    assert_eq!(err.kind(), ErrorKind::ArtifactCorrupt);
}

#[test]
fn test_malformed_field_fails_before_pipeline() {
    let mut form = sample_form();
    form.retain(|(k, _)| *k != "support_tickets");
    form.push(("support_tickets", "abc".to_string()));

    let err = FeatureRecord::from_form(form).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_handle_request_end_to_end() {
    let pipeline = load_pipeline();

    let body = serde_json::json!({
        "age": 32, "tenure_months": 2, "monthly_logins": 3, "weekly_active_days": 5,
        "avg_session_time": 12.5, "monthly_fee": 49.99, "total_revenue": 100,
        "payment_failures": 4, "support_tickets": 6, "csat_score": 2, "nps_score": 9,
        "gender": "Male", "contract_type": "Monthly", "payment_method": "Card",
        "complaint_type": "Billing"
    });
    let (response, outcome) = handle_request(&pipeline, body.to_string().as_bytes());

    assert_eq!(response.result, "Customer Will Churn");
    assert_eq!(response.label, Some(1));
    assert!(matches!(outcome, Outcome::Scored(p) if p.label == Label::Churn));

    let bad = serde_json::json!({ "age": 32, "support_tickets": "abc" });
    let (response, outcome) = handle_request(&pipeline, bad.to_string().as_bytes());
    assert!(response.is_error());
    assert_eq!(outcome, Outcome::Failed(ErrorKind::Validation));
}
