use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slug of the title an alliance is currently boosting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemIdentifier(String);

impl ItemIdentifier {
    /// Returns `None` for empty or whitespace-only input.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == value.len() {
            Some(Self(value))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemIdentifier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "identifier must not be empty".to_string())
    }
}

impl From<ItemIdentifier> for String {
    fn from(identifier: ItemIdentifier) -> Self {
        identifier.0
    }
}

/// Details of a title as seen on its own page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub slug: ItemIdentifier,
    pub title: String,
    pub image: Option<String>,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
}

impl ItemRecord {
    pub fn new(slug: ItemIdentifier, title: String, image: Option<String>) -> Self {
        Self::observed_at(slug, title, image, Local::now().naive_local())
    }

    pub fn observed_at(
        slug: ItemIdentifier,
        title: String,
        image: Option<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            slug,
            title,
            image,
            timestamp,
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS`, the layout used by the history file.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
