//! NATS subscriber for incoming scoring requests

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Receives scoring requests, optionally as a member of a queue group
pub struct RequestConsumer {
    client: Client,
    subject: String,
    queue_group: Option<String>,
}

impl RequestConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            queue_group: None,
        }
    }

    /// Share requests with other instances subscribed under the same group
    pub fn with_queue_group(mut self, group: Option<&str>) -> Self {
        self.queue_group = group.map(str::to_string);
        self
    }

    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = match &self.queue_group {
            Some(group) => {
                let subscriber = self
                    .client
                    .queue_subscribe(self.subject.clone(), group.clone())
                    .await?;
                info!(
                    subject = %self.subject,
                    queue_group = %group,
                    "Subscribed to scoring requests"
                );
                subscriber
            }
            None => {
                let subscriber = self.client.subscribe(self.subject.clone()).await?;
                info!(subject = %self.subject, "Subscribed to scoring requests");
                subscriber
            }
        };
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn queue_group(&self) -> Option<&str> {
        self.queue_group.as_deref()
    }
}
