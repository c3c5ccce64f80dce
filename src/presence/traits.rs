use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::fields::PresenceFields;
use crate::error::ClientError;

/// The activity pushed to the presence service on every update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityPayload {
    pub details: String,
    pub state: String,
    pub large_image: String,
    pub large_text: String,
    /// Omitted when blank, the service treats an absent key differently from ""
    pub small_image: Option<String>,
    pub small_text: Option<String>,
    pub start: DateTime<Utc>,
}

impl ActivityPayload {
    pub fn from_fields(fields: &PresenceFields, start: DateTime<Utc>) -> Self {
        Self {
            details: fields.details.clone(),
            state: fields.state.clone(),
            large_image: fields.large_image_key.clone(),
            large_text: fields.large_image_text.clone(),
            small_image: non_blank(&fields.small_image_key),
            small_text: non_blank(&fields.small_image_text),
            start,
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Opens connections to a presence service (Discord, or a test double)
#[async_trait]
pub trait PresenceConnector: Send + Sync {
    /// Returns the name of this presence service (for logging)
    fn name(&self) -> &'static str;

    /// Open a connection for the given application/client id
    async fn connect(&self, client_id: &str) -> Result<Box<dyn PresenceConnection>, ClientError>;
}

/// A live connection to a presence service
#[async_trait]
pub trait PresenceConnection: Send {
    /// Replace the displayed activity
    async fn update(&mut self, payload: &ActivityPayload) -> Result<(), ClientError>;

    /// Remove the displayed activity. Must be safe on a degraded connection.
    async fn clear(&mut self) -> Result<(), ClientError>;

    /// Tear down the connection
    async fn close(self: Box<Self>);
}
