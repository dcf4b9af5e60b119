//! Bookmark retrieval queries and the fields they target

use std::fmt;

use chrono::NaiveDateTime;

use super::entity::{creation_date_key, Bookmark, BookmarkType};
use super::schema::{CREATION_DATE_INDEX, TITLE_INDEX, TYPE_INDEX};
use crate::retrieve::{Comparator, FieldTarget, RetrieveQuery};

/// What can be asked of the bookmark store
#[derive(Clone)]
pub enum BookmarkRetrieveQuery {
    /// Sort or filter by creation date (indexed)
    CreationDate(RetrieveQuery<Bookmark, NaiveDateTime>),
    /// Sort or filter by title (indexed)
    Title(RetrieveQuery<Bookmark, String>),
    /// Filter by type (indexed)
    Type(RetrieveQuery<Bookmark, BookmarkType>),
    /// Filter by the favorite flag (not indexed, applied in memory)
    Favorite(RetrieveQuery<Bookmark, bool>),
    /// Whole store, fully sorted in memory
    InMemory(Comparator<Bookmark>),
}

impl BookmarkRetrieveQuery {
    pub fn name(&self) -> &'static str {
        match self {
            BookmarkRetrieveQuery::CreationDate(_) => "creationDate",
            BookmarkRetrieveQuery::Title(_) => "title",
            BookmarkRetrieveQuery::Type(_) => "type",
            BookmarkRetrieveQuery::Favorite(_) => "favorite",
            BookmarkRetrieveQuery::InMemory(_) => "inMemory",
        }
    }
}

impl fmt::Debug for BookmarkRetrieveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkRetrieveQuery::CreationDate(q) => f.debug_tuple("CreationDate").field(q).finish(),
            BookmarkRetrieveQuery::Title(q) => f.debug_tuple("Title").field(q).finish(),
            BookmarkRetrieveQuery::Type(q) => f.debug_tuple("Type").field(q).finish(),
            BookmarkRetrieveQuery::Favorite(q) => f.debug_tuple("Favorite").field(q).finish(),
            BookmarkRetrieveQuery::InMemory(_) => f.write_str("InMemory"),
        }
    }
}

pub(crate) fn creation_date_target() -> FieldTarget<Bookmark, NaiveDateTime> {
    FieldTarget::indexed_mapped(
        CREATION_DATE_INDEX,
        |b: &Bookmark| Some(b.creation_date),
        creation_date_key,
    )
}

pub(crate) fn title_target() -> FieldTarget<Bookmark, String> {
    FieldTarget::indexed(TITLE_INDEX, |b: &Bookmark| Some(b.title.clone()))
}

pub(crate) fn type_target() -> FieldTarget<Bookmark, BookmarkType> {
    FieldTarget::indexed_mapped(
        TYPE_INDEX,
        |b: &Bookmark| Some(b.bookmark_type),
        BookmarkType::to_index_value,
    )
}

pub(crate) fn favorite_target() -> FieldTarget<Bookmark, bool> {
    FieldTarget::unindexed("favorite", |b: &Bookmark| Some(b.favorite))
}
