use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{FeedbackError, MalformedRecord, Result};
use crate::models::{FeedbackPayload, SubmissionRecord};
use crate::record::{normalize, payload_to_wire};

/// Raw access to the feedback store. Implementations do no normalization.
#[async_trait]
pub trait FeedbackTransport: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Value>>;
    async fn post(&self, body: &Value) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    config: Config,
}

impl HttpTransport {
    /// No timeout or retry is configured; a hung backend blocks the call.
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn with_client(config: Config, client: Client) -> Self {
        Self { client, config }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(status = status.as_u16(), "could not read error response body: {err}");
                format!("<unreadable body: {err}>")
            }
        };
        Err(FeedbackError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl FeedbackTransport for HttpTransport {
    async fn fetch_all(&self) -> Result<Vec<Value>> {
        let url = self.config.feedback_url();
        debug!("GET {url}");
        let response = Self::check(self.client.get(&url).send().await?).await?;
        let body = response.text().await?;
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(records)) => Ok(records),
            Ok(other) => Err(FeedbackError::Decode(format!(
                "expected a JSON array, got {}",
                truncate(&other.to_string(), 120)
            ))),
            Err(err) => Err(FeedbackError::Decode(err.to_string())),
        }
    }

    async fn post(&self, body: &Value) -> Result<()> {
        let url = self.config.feedback_url();
        debug!("POST {url}");
        Self::check(self.client.post(&url).json(body).send().await?).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.config.feedback_item_url(id);
        debug!("DELETE {url}");
        Self::check(self.client.delete(&url).send().await?).await?;
        Ok(())
    }
}

/// List, create and delete submissions. Holds no cache: callers re-list
/// after a mutation.
pub struct FeedbackRepository<T> {
    transport: T,
}

impl<T: FeedbackTransport> FeedbackRepository<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Fails as a whole if any record cannot be normalized.
    pub async fn list(&self) -> Result<Vec<SubmissionRecord>> {
        let raw = self.transport.fetch_all().await?;
        let total = raw.len();
        let mut records = Vec::with_capacity(total);
        let mut failures: Vec<(usize, MalformedRecord)> = Vec::new();

        for (index, value) in raw.iter().enumerate() {
            match normalize(value) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(index, reason = %err.reason, raw = %err.raw, "malformed feedback record");
                    failures.push((index, err));
                }
            }
        }

        if !failures.is_empty() {
            return Err(FeedbackError::Fetch { total, failures });
        }

        info!("fetched {total} feedback records");
        Ok(records)
    }

    pub async fn create(&self, payload: &FeedbackPayload) -> Result<()> {
        validate(payload)?;
        self.transport.post(&payload_to_wire(payload)).await?;
        info!(topic = payload.topic(), "feedback submitted");
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(FeedbackError::validation("an id is required to delete feedback"));
        }
        self.transport.delete(id).await?;
        info!(id, "feedback deleted");
        Ok(())
    }
}

/// Client-side checks run before anything is sent.
pub fn validate(payload: &FeedbackPayload) -> Result<()> {
    if payload.topic().trim().is_empty() {
        return Err(FeedbackError::validation("a topic is required"));
    }

    match payload {
        FeedbackPayload::Standard(submission) => {
            let required = [
                &submission.name,
                &submission.email,
                &submission.course_name,
                &submission.comments,
            ];
            if required.iter().any(|value| value.trim().is_empty()) {
                return Err(FeedbackError::validation(
                    "Name, Email, Specific Identifier, and Comments are required fields.",
                ));
            }
            if !(1..=5).contains(&submission.rating) {
                return Err(FeedbackError::validation(
                    "Please select a Star Rating before submitting.",
                ));
            }
        }
        FeedbackPayload::Custom(submission) => {
            let missing: Vec<&str> = submission
                .fields
                .iter()
                .filter(|field| field.required)
                .filter(|field| {
                    submission
                        .values
                        .get(&field.key())
                        .map_or(true, |value| value.trim().is_empty())
                })
                .map(|field| field.label.as_str())
                .collect();
            if !missing.is_empty() {
                return Err(FeedbackError::validation(format!(
                    "Please fill out all required fields: {}",
                    missing.join(", ")
                )));
            }
        }
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
