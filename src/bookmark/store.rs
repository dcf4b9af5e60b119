//! Bookmark writes and point reads
//!
//! A bookmark and its tag rows are written in one transaction over both
//! stores. Saving replaces the bookmark and its full tag set.

use std::sync::Arc;

use serde_json::json;

use super::entity::Bookmark;
use super::resolver::load_tags;
use super::schema::{tag_schema, BOOKMARK_STORE, TAG_STORE, TAG_URL_INDEX};
use crate::observability::{log_event_with_fields, Event};
use crate::retrieve::RetrieveResult;
use crate::schema::IndexSchema;
use crate::storage::{Database, IndexValue, KeyRange, ScanSource, StorageError, Transaction};

/// Read/write access to bookmarks by url
pub struct BookmarkStore<D> {
    database: Arc<D>,
    tags: IndexSchema,
}

impl<D: Database> BookmarkStore<D> {
    pub fn new(database: Arc<D>) -> Self {
        Self {
            database,
            tags: tag_schema(),
        }
    }

    pub fn database(&self) -> &Arc<D> {
        &self.database
    }

    /// Inserts or replaces a bookmark together with its tags
    pub async fn save(&self, bookmark: &Bookmark) -> RetrieveResult<()> {
        let record = serde_json::to_value(bookmark).map_err(StorageError::from)?;

        let mut tx = self
            .database
            .write_transaction(&[BOOKMARK_STORE, TAG_STORE])
            .await?;
        tx.put(BOOKMARK_STORE, record).await?;
        self.delete_tags(&mut tx, &bookmark.url).await?;
        for tag in &bookmark.tags {
            tx.put(TAG_STORE, json!({"url": bookmark.url, "tag": tag}))
                .await?;
        }
        tx.commit().await?;

        log_event_with_fields(
            Event::WriteCommit,
            &[
                ("store", BOOKMARK_STORE),
                ("tags", &bookmark.tags.len().to_string()),
                ("url", &bookmark.url),
            ],
        );
        Ok(())
    }

    /// Reads one bookmark with its tags
    pub async fn load(&self, url: &str) -> RetrieveResult<Option<Bookmark>> {
        let tx = self.database.transaction(&[BOOKMARK_STORE]).await?;
        let stored = tx
            .get(BOOKMARK_STORE, &IndexValue::from_string(url))
            .await?;
        drop(tx);

        match stored {
            Some(value) => {
                let mut bookmark = Bookmark::deserialize_stored(&value)?;
                bookmark.tags = load_tags(self.database.as_ref(), url).await?;
                Ok(Some(bookmark))
            }
            None => Ok(None),
        }
    }

    /// Deletes a bookmark and its tags. Unknown urls are ignored.
    pub async fn delete(&self, url: &str) -> RetrieveResult<()> {
        let mut tx = self
            .database
            .write_transaction(&[BOOKMARK_STORE, TAG_STORE])
            .await?;
        tx.delete(BOOKMARK_STORE, &IndexValue::from_string(url))
            .await?;
        self.delete_tags(&mut tx, url).await?;
        tx.commit().await?;

        log_event_with_fields(
            Event::DeleteCommit,
            &[("store", BOOKMARK_STORE), ("url", url)],
        );
        Ok(())
    }

    async fn delete_tags(&self, tx: &mut D::Transaction, url: &str) -> RetrieveResult<()> {
        let rows = tx
            .get_all(
                ScanSource::index(TAG_STORE, TAG_URL_INDEX),
                Some(&KeyRange::only(IndexValue::from_string(url))),
            )
            .await?;
        for row in &rows {
            let key = self
                .tags
                .primary_key_of(row)
                .ok_or_else(|| StorageError::InvalidKey(TAG_STORE.to_string()))?;
            tx.delete(TAG_STORE, &key).await?;
        }
        Ok(())
    }
}
