//! Prediction results and the response sent back to callers

use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary churn label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Stay,
    Churn,
}

impl Label {
    pub fn as_u8(&self) -> u8 {
        match self {
            Label::Stay => 0,
            Label::Churn => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Label::Stay),
            1 => Some(Label::Churn),
            _ => None,
        }
    }

    /// Label with the higher class probability; ties go to `Stay`
    pub fn from_probability(churn_probability: f64) -> Self {
        if churn_probability > 1.0 - churn_probability {
            Label::Churn
        } else {
            Label::Stay
        }
    }

    /// Human-readable rendering shown to the caller
    pub fn render(&self) -> &'static str {
        match self {
            Label::Churn => "Customer Will Churn",
            Label::Stay => "Customer Will Stay",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render())
    }
}

/// Label plus the classifier's churn probability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    /// Probability of the churn class (0.0 - 1.0)
    pub churn_probability: f64,
}

impl Prediction {
    /// Churn probability as a percentage rounded to one decimal
    pub fn risk_score(&self) -> f64 {
        (self.churn_probability * 1000.0).round() / 10.0
    }
}

/// Response published for each scoring request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    /// Rendered label, or the error text on failure
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub churn_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResponse {
    pub fn success(prediction: &Prediction) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            result: prediction.label.render().to_string(),
            label: Some(prediction.label.as_u8()),
            churn_probability: Some(prediction.churn_probability),
            risk_score: Some(prediction.risk_score()),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            result: message.clone(),
            label: None,
            churn_probability: None,
            risk_score: None,
            error: Some(message),
        }
    }

    pub fn from_result(result: &Result<Prediction, PipelineError>) -> Self {
        match result {
            Ok(prediction) => Self::success(prediction),
            Err(e) => Self::failure(e.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArtifactSlot, ChurnError, Stage};

    #[test]
    fn test_label_rendering() {
        assert_eq!(Label::Churn.render(), "Customer Will Churn");
        assert_eq!(Label::Stay.render(), "Customer Will Stay");
        assert_eq!(Label::from_u8(1), Some(Label::Churn));
        assert_eq!(Label::from_u8(0), Some(Label::Stay));
        assert_eq!(Label::from_u8(2), None);
    }

    #[test]
    fn test_label_from_probability() {
        assert_eq!(Label::from_probability(0.51), Label::Churn);
        assert_eq!(Label::from_probability(0.5), Label::Stay);
        assert_eq!(Label::from_probability(0.0), Label::Stay);
    }

    #[test]
    fn test_risk_score_rounding() {
        let prediction = Prediction {
            label: Label::Stay,
            churn_probability: 0.23456,
        };
        assert_eq!(prediction.risk_score(), 23.5);
    }

    #[test]
    fn test_failure_response_has_no_label() {
        let result: Result<Prediction, PipelineError> = Err(PipelineError::new(
            Stage::LoadArtifacts,
            ChurnError::ArtifactNotFound {
                slot: ArtifactSlot::Classifier,
                location: "artifacts/model.json".to_string(),
            },
        ));

        let response = PredictionResponse::from_result(&result);
        assert!(response.is_error());
        assert!(response.label.is_none());
        assert!(response.result.contains("not found"));

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("\"label\""));
    }

    #[test]
    fn test_success_response_serialization() {
        let response = PredictionResponse::success(&Prediction {
            label: Label::Churn,
            churn_probability: 0.81,
        });

        let json = serde_json::to_string(&response).unwrap();
        let deserialized: PredictionResponse = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.result, "Customer Will Churn");
        assert_eq!(deserialized.label, Some(1));
        assert_eq!(deserialized.risk_score, Some(81.0));
    }
}
