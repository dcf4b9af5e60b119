//! Bookmark domain: entity, stores, queries and sorts

mod entity;
mod query;
mod resolver;
mod schema;
mod sorts;
mod store;

pub use entity::{creation_date_key, Bookmark, BookmarkType, CREATION_DATE_FORMAT};
pub use query::BookmarkRetrieveQuery;
pub use resolver::{BookmarkResolver, BookmarkRetrieveResolver};
pub use schema::{
    all_schemas, bookmark_schema, tag_schema, BOOKMARK_STORE, CREATION_DATE_INDEX,
    TAG_NAME_INDEX, TAG_STORE, TAG_URL_INDEX, TITLE_INDEX, TYPE_INDEX,
};
pub use sorts::{
    by_creation_date, by_title, smart_sort, BookmarkSort, CreationDate,
    DeadlineFirst, ExpiringSoonFirst, ReminderFirst, Title, UnreachedReminderLast,
};
pub use store::BookmarkStore;
