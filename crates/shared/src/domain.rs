use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(EventId);
id_newtype!(TalkId);
id_newtype!(WorkshopId);
id_newtype!(AppearanceId);

/// URL-safe identifier used to route to a talk, workshop, event or post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(pub String);

impl Slug {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Slug {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: Option<String>,
    pub country: String,
}

impl Location {
    /// Human readable place line, e.g. `Portland, OR, USA`.
    pub fn place(&self) -> String {
        [
            Some(self.city.as_str()),
            self.state.as_deref(),
            Some(self.country.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppearanceLength {
    Short,
    Medium,
    Long,
}

impl AppearanceLength {
    pub fn as_db_str(self) -> &'static str {
        match self {
            AppearanceLength::Short => "SHORT",
            AppearanceLength::Medium => "MEDIUM",
            AppearanceLength::Long => "LONG",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown appearance length '{0}'")]
pub struct UnknownAppearanceLength(pub String);

impl FromStr for AppearanceLength {
    type Err = UnknownAppearanceLength;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SHORT" => Ok(AppearanceLength::Short),
            "MEDIUM" => Ok(AppearanceLength::Medium),
            "LONG" => Ok(AppearanceLength::Long),
            _ => Err(UnknownAppearanceLength(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppearanceKind {
    Talk,
    Workshop,
}

impl AppearanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AppearanceKind::Talk => "Talk",
            AppearanceKind::Workshop => "Workshop",
        }
    }

    /// Display label for an appearance length; the scale differs per kind.
    pub fn length_label(self, length: AppearanceLength) -> &'static str {
        match (self, length) {
            (AppearanceKind::Talk, AppearanceLength::Short) => "Lightning",
            (AppearanceKind::Talk, AppearanceLength::Medium) => "Regular",
            (AppearanceKind::Talk, AppearanceLength::Long) => "Extended",
            (AppearanceKind::Workshop, AppearanceLength::Short) => "2-3 Hours",
            (AppearanceKind::Workshop, AppearanceLength::Medium) => "Half Day",
            (AppearanceKind::Workshop, AppearanceLength::Long) => "Full Day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_skips_missing_state() {
        let location = Location {
            city: "Berlin".into(),
            state: None,
            country: "Germany".into(),
        };
        assert_eq!(location.place(), "Berlin, Germany");
    }

    #[test]
    fn place_skips_blank_parts() {
        let location = Location {
            city: "Portland".into(),
            state: Some("  ".into()),
            country: "USA".into(),
        };
        assert_eq!(location.place(), "Portland, USA");
    }

    #[test]
    fn parses_lengths_case_insensitively() {
        assert_eq!("short".parse(), Ok(AppearanceLength::Short));
        assert_eq!("LONG".parse(), Ok(AppearanceLength::Long));
        assert!("huge".parse::<AppearanceLength>().is_err());
    }

    #[test]
    fn length_labels_depend_on_kind() {
        assert_eq!(
            AppearanceKind::Talk.length_label(AppearanceLength::Short),
            "Lightning"
        );
        assert_eq!(
            AppearanceKind::Workshop.length_label(AppearanceLength::Medium),
            "Half Day"
        );
    }

    #[test]
    fn theme_defaults_to_light() {
        assert_eq!(Theme::default(), Theme::Light);
        let dark: Theme = serde_json::from_str("\"dark\"").expect("theme");
        assert_eq!(dark, Theme::Dark);
    }
}
