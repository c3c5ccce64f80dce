//! Configure, save and broadcast Discord Rich Presence.
//!
//! [`presence::SessionManager`] owns the connection and refresh loop,
//! [`profiles::ProfileStore`] persists named field snapshots.

pub mod discord;
pub mod error;
pub mod logging;
pub mod presence;
pub mod profiles;
pub mod settings;

pub use discord::DiscordConnector;
pub use error::{ClientError, ProfileError, SessionError, SettingsError};
pub use presence::{
    ActivityPayload, Field, PresenceConnection, PresenceConnector, PresenceFields, SessionConfig,
    SessionManager, SessionStatus, SharedFields,
};
pub use profiles::{Profile, ProfileStore, Theme};
pub use settings::AppSettings;
