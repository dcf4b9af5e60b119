//! Bookmark entity
//!
//! Stored as camelCase JSON in the `bookmarks` store. Tags live in the `tags`
//! store and are never written as part of the bookmark record.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::storage::IndexValue;

/// Fixed-width format of `creationDate`, so that string order is time order
pub const CREATION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Where a bookmark lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookmarkType {
    Library,
    Backlog,
}

impl BookmarkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookmarkType::Library => "LIBRARY",
            BookmarkType::Backlog => "BACKLOG",
        }
    }

    /// Indexed representation, identical to the stored one
    pub fn to_index_value(&self) -> IndexValue {
        IndexValue::from_string(self.as_str())
    }
}

/// A saved page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Primary key
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(rename = "type")]
    pub bookmark_type: BookmarkType,
    #[serde(with = "creation_date")]
    pub creation_date: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remind_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
    /// Joined from the `tags` store on read
    #[serde(default, skip_serializing)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub comment: String,
}

impl Bookmark {
    /// New backlog bookmark with no dates, tags or comment
    pub fn new(url: impl Into<String>, title: impl Into<String>, creation_date: NaiveDateTime) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            favicon: None,
            bookmark_type: BookmarkType::Backlog,
            creation_date,
            deadline: None,
            remind_date: None,
            expiration_date: None,
            tags: Vec::new(),
            favorite: false,
            comment: String::new(),
        }
    }

    pub fn with_type(mut self, bookmark_type: BookmarkType) -> Self {
        self.bookmark_type = bookmark_type;
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_remind_date(mut self, remind_date: NaiveDate) -> Self {
        self.remind_date = Some(remind_date);
        self
    }

    pub fn with_expiration_date(mut self, expiration_date: NaiveDate) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }
}

/// Indexed representation of a creation date
pub fn creation_date_key(date: &NaiveDateTime) -> IndexValue {
    IndexValue::from_string(date.format(CREATION_DATE_FORMAT).to_string())
}

mod creation_date {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::CREATION_DATE_FORMAT;

    pub fn serialize<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(CREATION_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, CREATION_DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}
