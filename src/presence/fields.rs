//! Editable presence values shared between the front end and the session manager

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;

/// The user-editable presence values. An empty string means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceFields {
    pub client_id: String,
    pub details: String,
    pub state: String,
    pub large_image_key: String,
    pub large_image_text: String,
    pub small_image_key: String,
    pub small_image_text: String,
}

/// Names a single presence value, using the profile file's key names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ClientId,
    Details,
    State,
    LargeImage,
    LargeText,
    SmallImage,
    SmallText,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::ClientId,
        Field::Details,
        Field::State,
        Field::LargeImage,
        Field::LargeText,
        Field::SmallImage,
        Field::SmallText,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Field::ClientId => "client_id",
            Field::Details => "details",
            Field::State => "state",
            Field::LargeImage => "large_image",
            Field::LargeText => "large_text",
            Field::SmallImage => "small_image",
            Field::SmallText => "small_text",
        }
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.key() == s)
            .ok_or_else(|| format!("unknown field '{}'", s))
    }
}

impl PresenceFields {
    /// The client id with surrounding whitespace removed, or `None` if blank
    pub fn client_id(&self) -> Option<&str> {
        let id = self.client_id.trim();
        (!id.is_empty()).then_some(id)
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::ClientId => &self.client_id,
            Field::Details => &self.details,
            Field::State => &self.state,
            Field::LargeImage => &self.large_image_key,
            Field::LargeText => &self.large_image_text,
            Field::SmallImage => &self.small_image_key,
            Field::SmallText => &self.small_image_text,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::ClientId => &mut self.client_id,
            Field::Details => &mut self.details,
            Field::State => &mut self.state,
            Field::LargeImage => &mut self.large_image_key,
            Field::LargeText => &mut self.large_image_text,
            Field::SmallImage => &mut self.small_image_key,
            Field::SmallText => &mut self.small_image_text,
        };
        *slot = value.into();
    }
}

/// Cloneable handle to a single `PresenceFields` value.
///
/// The front end writes through it while the refresh task reads from it, so
/// edits take effect on the next refresh without restarting the session.
#[derive(Debug, Clone, Default)]
pub struct SharedFields {
    inner: Arc<RwLock<PresenceFields>>,
}

impl SharedFields {
    pub fn new(fields: PresenceFields) -> Self {
        Self {
            inner: Arc::new(RwLock::new(fields)),
        }
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> PresenceFields {
        self.inner.read().clone()
    }

    /// Replace every value, e.g. after loading a profile
    pub fn replace(&self, fields: PresenceFields) {
        *self.inner.write() = fields;
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut PresenceFields),
    {
        let mut guard = self.inner.write();
        f(&mut *guard);
    }
}
