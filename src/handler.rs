//! Request handling for the scoring service: JSON form body in, response out

use crate::error::{ChurnError, ErrorKind, PipelineError};
use crate::models::inference::ChurnPipeline;
use crate::types::prediction::{Prediction, PredictionResponse};
use crate::types::record::FeatureRecord;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Outcome of one request, for metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Scored(Prediction),
    Failed(ErrorKind),
}

/// Flatten a JSON object body into string form fields.
///
/// Scalars are converted to their string form; `null` counts as absent.
pub fn parse_form(payload: &[u8]) -> Result<BTreeMap<String, String>, ChurnError> {
    let body: Value = serde_json::from_slice(payload)
        .map_err(|e| ChurnError::validation("body", format!("invalid JSON: {}", e)))?;

    let Value::Object(fields) = body else {
        return Err(ChurnError::validation("body", "expected a JSON object"));
    };

    let mut form = BTreeMap::new();
    for (key, value) in fields {
        let raw = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(ChurnError::validation(key, "expected a scalar value"));
            }
        };
        form.insert(key, raw);
    }
    Ok(form)
}

/// Build a record from a request body and score it.
///
/// Failures are logged once here and rendered into the response.
pub fn handle_request(pipeline: &ChurnPipeline, payload: &[u8]) -> (PredictionResponse, Outcome) {
    let record = match parse_form(payload).and_then(|form| FeatureRecord::from_form(form)) {
        Ok(record) => record,
        Err(e) => {
            error!(kind = e.kind().as_str(), error = %e, "Rejected scoring request");
            return (
                PredictionResponse::failure(e.to_string()),
                Outcome::Failed(e.kind()),
            );
        }
    };

    let result = pipeline.predict(&record);
    let response = PredictionResponse::from_result(&result);
    let outcome = match result {
        Ok(prediction) => {
            debug!(
                request_id = %response.request_id,
                result = %response.result,
                churn_probability = prediction.churn_probability,
                "Scoring request complete"
            );
            Outcome::Scored(prediction)
        }
        Err(e) => {
            log_failure(&response.request_id, &e);
            Outcome::Failed(e.kind())
        }
    };
    (response, outcome)
}

fn log_failure(request_id: &str, e: &PipelineError) {
    error!(
        request_id = %request_id,
        stage = %e.stage,
        kind = e.kind().as_str(),
        error = %e,
        "Scoring request failed"
    );
}
