//! Discord Rich Presence integration using discord-sdk

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use discord_sdk::{
    activity::{ActivityBuilder, Assets},
    wheel::{UserState, Wheel},
    Discord, Subscriptions,
};

use crate::error::ClientError;
use crate::presence::{ActivityPayload, PresenceConnection, PresenceConnector};

/// Timeout for waiting for Discord handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens Rich Presence connections to the locally running Discord client
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscordConnector;

impl DiscordConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Discord application ids are positive snowflakes
fn parse_app_id(client_id: &str) -> Result<i64, ClientError> {
    match client_id.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ClientError::InvalidClientId(client_id.to_string())),
    }
}

#[async_trait]
impl PresenceConnector for DiscordConnector {
    fn name(&self) -> &'static str {
        "Discord"
    }

    async fn connect(&self, client_id: &str) -> Result<Box<dyn PresenceConnection>, ClientError> {
        let app_id = parse_app_id(client_id)?;

        let (wheel, handler) = Wheel::new(Box::new(|err| {
            tracing::warn!("Discord error: {:?}", err);
        }));

        let mut user_spoke = wheel.user();

        let discord = Discord::new(app_id, Subscriptions::ACTIVITY, Box::new(handler))
            .map_err(|e| ClientError::Unavailable(format!("{:?}", e)))?;

        let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            if user_spoke.0.changed().await.is_err() {
                Err("Discord connection closed".to_string())
            } else {
                match &*user_spoke.0.borrow() {
                    UserState::Connected(user) => Ok(user.clone()),
                    UserState::Disconnected(err) => Err(format!("Discord disconnected: {:?}", err)),
                }
            }
        })
        .await;

        let user = match handshake {
            Ok(Ok(user)) => user,
            Ok(Err(e)) => {
                discord.disconnect().await;
                return Err(ClientError::Handshake(e));
            }
            Err(_) => {
                discord.disconnect().await;
                return Err(ClientError::Handshake(
                    "Discord handshake timed out".to_string(),
                ));
            }
        };

        tracing::info!(
            "Discord Rich Presence connected as {}#{}",
            user.username,
            user.discriminator.unwrap_or(0)
        );

        Ok(Box::new(DiscordConnection {
            discord,
            _wheel: wheel,
        }))
    }
}

struct DiscordConnection {
    discord: Discord,
    // Keeps the event spokes alive for the lifetime of the connection
    _wheel: Wheel,
}

fn build_activity(payload: &ActivityPayload) -> ActivityBuilder {
    let mut assets = Assets::default().large(
        payload.large_image.as_str(),
        Some(payload.large_text.as_str()),
    );

    match (&payload.small_image, &payload.small_text) {
        (Some(key), text) => assets = assets.small(key.as_str(), text.as_deref()),
        (None, Some(_)) => {
            tracing::debug!("Ignoring small image text without a small image key");
        }
        (None, None) => {}
    }

    ActivityBuilder::new()
        .details(payload.details.as_str())
        .state(payload.state.as_str())
        .assets(assets)
        .start_timestamp(SystemTime::from(payload.start))
}

#[async_trait]
impl PresenceConnection for DiscordConnection {
    async fn update(&mut self, payload: &ActivityPayload) -> Result<(), ClientError> {
        self.discord
            .update_activity(build_activity(payload))
            .await
            .map(|_| ())
            .map_err(|e| ClientError::Request(format!("{:?}", e)))
    }

    async fn clear(&mut self) -> Result<(), ClientError> {
        self.discord
            .clear_activity()
            .await
            .map(|_| ())
            .map_err(|e| ClientError::Request(format!("{:?}", e)))
    }

    async fn close(self: Box<Self>) {
        let this = *self;
        this.discord.disconnect().await;
    }
}
