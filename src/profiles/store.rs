//! JSON-file profile persistence.
//!
//! Each profile `name` maps to `{dir}/{name}.json`. Every key is written on
//! save; every key is optional on load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::theme::Theme;
use crate::error::ProfileError;
use crate::presence::PresenceFields;

const PROFILE_EXTENSION: &str = "json";

/// A named, persisted snapshot of presence fields and a theme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub fields: PresenceFields,
    pub theme: Theme,
}

/// On-disk layout of a profile file
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ProfileFile {
    client_id: String,
    details: String,
    state: String,
    large_image: String,
    large_text: String,
    small_image: String,
    small_text: String,
    theme: String,
}

impl ProfileFile {
    fn new(fields: &PresenceFields, theme: Theme) -> Self {
        Self {
            client_id: fields.client_id.clone(),
            details: fields.details.clone(),
            state: fields.state.clone(),
            large_image: fields.large_image_key.clone(),
            large_text: fields.large_image_text.clone(),
            small_image: fields.small_image_key.clone(),
            small_text: fields.small_image_text.clone(),
            theme: theme.as_str().to_string(),
        }
    }

    fn into_profile(self, name: String) -> Profile {
        Profile {
            name,
            theme: Theme::from_name_or_default(&self.theme),
            fields: PresenceFields {
                client_id: self.client_id,
                details: self.details,
                state: self.state,
                large_image_key: self.large_image,
                large_image_text: self.large_text,
                small_image_key: self.small_image,
                small_image_text: self.small_text,
            },
        }
    }
}

/// Profile store backed by one JSON file per profile
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Open the store, creating `dir` if it doesn't exist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| ProfileError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a profile, overwriting any existing one with the same name
    pub fn save(
        &self,
        name: &str,
        fields: &PresenceFields,
        theme: Theme,
    ) -> Result<(), ProfileError> {
        let name = validate_name(name)?;
        let path = self.profile_path(name);

        let contents = serde_json::to_string_pretty(&ProfileFile::new(fields, theme))
            .map_err(|source| ProfileError::Serialize {
                name: name.to_string(),
                source,
            })?;

        fs::write(&path, contents).map_err(|source| ProfileError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("Saved profile '{}' to {}", name, path.display());
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<Profile, ProfileError> {
        let name = validate_name(name)?;
        let path = self.profile_path(name);

        if !path.is_file() {
            return Err(ProfileError::ProfileNotFound(name.to_string()));
        }

        let contents = fs::read_to_string(&path).map_err(|source| ProfileError::Io {
            path: path.clone(),
            source,
        })?;

        let file: ProfileFile =
            serde_json::from_str(&contents).map_err(|source| ProfileError::Malformed {
                path: path.clone(),
                source,
            })?;

        tracing::debug!("Loaded profile '{}'", name);
        Ok(file.into_profile(name.to_string()))
    }

    /// Names of all stored profiles, sorted
    pub fn list(&self) -> Result<Vec<String>, ProfileError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| ProfileError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(PROFILE_EXTENSION) {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .collect();

        names.sort();
        Ok(names)
    }

    fn profile_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, PROFILE_EXTENSION))
    }
}

/// Trim a profile name and reject anything that could escape the store directory
fn validate_name(name: &str) -> Result<&str, ProfileError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProfileError::MissingName);
    }

    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(ProfileError::InvalidName(name.to_string()));
    }

    Ok(name)
}
