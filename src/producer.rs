//! NATS publisher for prediction responses

use crate::types::prediction::PredictionResponse;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Publishes responses to the request's reply subject, or the default subject
#[derive(Clone)]
pub struct ResponsePublisher {
    client: Client,
    default_subject: String,
}

impl ResponsePublisher {
    pub fn new(client: Client, default_subject: &str) -> Self {
        Self {
            client,
            default_subject: default_subject.to_string(),
        }
    }

    /// Publish a response
    pub async fn publish(
        &self,
        reply: Option<Subject>,
        response: &PredictionResponse,
    ) -> Result<()> {
        let payload = serde_json::to_vec(response)?;
        let subject = reply.unwrap_or_else(|| Subject::from(self.default_subject.as_str()));

        self.client.publish(subject.clone(), payload.into()).await?;

        debug!(
            request_id = %response.request_id,
            subject = %subject,
            is_error = response.is_error(),
            "Published prediction response"
        );

        Ok(())
    }

    pub fn default_subject(&self) -> &str {
        &self.default_subject
    }
}
