//! Bookmark record source

use serde::Deserialize;
use serde_json::Value;

use super::entity::Bookmark;
use super::query::{
    creation_date_target, favorite_target, title_target, type_target, BookmarkRetrieveQuery,
};
use super::schema::{bookmark_schema, TAG_STORE, TAG_URL_INDEX};
use crate::retrieve::{
    resolve, DatabaseQuery, DatabaseRetrieveResolver, FallbackSort, RecordSource, RetrieveError,
    RetrieveResult,
};
use crate::schema::IndexSchema;
use crate::storage::{Database, IndexValue, KeyRange, ScanSource, Transaction};

/// Reads bookmarks and joins their tags
#[derive(Debug, Clone)]
pub struct BookmarkResolver {
    schema: IndexSchema,
}

impl BookmarkResolver {
    pub fn new() -> Self {
        Self {
            schema: bookmark_schema(),
        }
    }
}

impl Default for BookmarkResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolver over the bookmark store
pub type BookmarkRetrieveResolver<D> = DatabaseRetrieveResolver<D, BookmarkResolver>;

impl<D: Database> RecordSource<D> for BookmarkResolver {
    type Record = Bookmark;
    type Query = BookmarkRetrieveQuery;

    fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    fn extract(&self, value: &Value) -> RetrieveResult<Bookmark> {
        Bookmark::deserialize_stored(value)
    }

    fn resolve_query(
        &self,
        query: &BookmarkRetrieveQuery,
    ) -> RetrieveResult<DatabaseQuery<Bookmark>> {
        match query {
            BookmarkRetrieveQuery::CreationDate(q) => {
                resolve(q, &creation_date_target(), &self.schema)
            }
            BookmarkRetrieveQuery::Title(q) => resolve(q, &title_target(), &self.schema),
            BookmarkRetrieveQuery::Type(q) => resolve(q, &type_target(), &self.schema),
            BookmarkRetrieveQuery::Favorite(q) => resolve(q, &favorite_target(), &self.schema),
            BookmarkRetrieveQuery::InMemory(comparator) => Ok(DatabaseQuery {
                fallback: Some(FallbackSort::whole(comparator.clone())),
                ..DatabaseQuery::full_scan()
            }),
        }
    }

    async fn post_fetch(&self, database: &D, mut bookmark: Bookmark) -> RetrieveResult<Bookmark> {
        bookmark.tags = load_tags(database, &bookmark.url).await?;
        Ok(bookmark)
    }
}

impl Bookmark {
    /// Parses a record read from the `bookmarks` store
    pub fn deserialize_stored(value: &Value) -> RetrieveResult<Bookmark> {
        Bookmark::deserialize(value).map_err(|e| {
            let url = value.get("url").and_then(Value::as_str).unwrap_or("<no url>");
            RetrieveError::extraction_failed(format!("bookmark {}: {}", url, e))
        })
    }
}

/// Tags of one bookmark, in tag order
pub(crate) async fn load_tags<D: Database>(database: &D, url: &str) -> RetrieveResult<Vec<String>> {
    let tx = database.transaction(&[TAG_STORE]).await?;
    let rows = tx
        .get_all(
            ScanSource::index(TAG_STORE, TAG_URL_INDEX),
            Some(&KeyRange::only(IndexValue::from_string(url))),
        )
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get("tag").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}
