mod fields;
mod manager;
mod traits;

#[cfg(test)]
mod testing;

pub use fields::{Field, PresenceFields, SharedFields};
pub use manager::{
    SessionConfig, SessionManager, SessionStatus, DEFAULT_CALL_TIMEOUT, DEFAULT_REFRESH_INTERVAL,
};
pub use traits::{ActivityPayload, PresenceConnection, PresenceConnector};
