use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Known form themes a profile can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Cosmo,
    Flatly,
    Litera,
    Minty,
    Lumen,
    Sandstone,
    Yeti,
    Pulse,
    United,
    Morph,
    Journal,
    #[default]
    Darkly,
    Superhero,
    Solar,
    Cyborg,
    Vapor,
    Simplex,
    Cerculean,
}

impl Theme {
    pub const ALL: [Theme; 18] = [
        Theme::Cosmo,
        Theme::Flatly,
        Theme::Litera,
        Theme::Minty,
        Theme::Lumen,
        Theme::Sandstone,
        Theme::Yeti,
        Theme::Pulse,
        Theme::United,
        Theme::Morph,
        Theme::Journal,
        Theme::Darkly,
        Theme::Superhero,
        Theme::Solar,
        Theme::Cyborg,
        Theme::Vapor,
        Theme::Simplex,
        Theme::Cerculean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Cosmo => "cosmo",
            Theme::Flatly => "flatly",
            Theme::Litera => "litera",
            Theme::Minty => "minty",
            Theme::Lumen => "lumen",
            Theme::Sandstone => "sandstone",
            Theme::Yeti => "yeti",
            Theme::Pulse => "pulse",
            Theme::United => "united",
            Theme::Morph => "morph",
            Theme::Journal => "journal",
            Theme::Darkly => "darkly",
            Theme::Superhero => "superhero",
            Theme::Solar => "solar",
            Theme::Cyborg => "cyborg",
            Theme::Vapor => "vapor",
            Theme::Simplex => "simplex",
            Theme::Cerculean => "cerculean",
        }
    }

    /// Parse a stored theme name, falling back to the default when unknown
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == s)
            .ok_or_else(|| format!("unknown theme '{}'", s))
    }
}
