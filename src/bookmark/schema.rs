//! Bookmark and tag store schemas

use crate::schema::IndexSchema;

pub const BOOKMARK_STORE: &str = "bookmarks";
pub const TAG_STORE: &str = "tags";

pub const CREATION_DATE_INDEX: &str = "creationDate";
pub const TITLE_INDEX: &str = "title";
pub const TYPE_INDEX: &str = "type";

pub const TAG_URL_INDEX: &str = "url";
pub const TAG_NAME_INDEX: &str = "tag";

/// `bookmarks`: keyed by url, indexed by creation date, title and type
pub fn bookmark_schema() -> IndexSchema {
    IndexSchema::new(
        BOOKMARK_STORE,
        ["url"],
        [CREATION_DATE_INDEX, TITLE_INDEX, TYPE_INDEX],
    )
}

/// `tags`: one row per (url, tag), indexed both ways
pub fn tag_schema() -> IndexSchema {
    IndexSchema::new(TAG_STORE, ["url", "tag"], [TAG_URL_INDEX, TAG_NAME_INDEX])
}

/// Every store a bookmark database needs
pub fn all_schemas() -> Vec<IndexSchema> {
    vec![bookmark_schema(), tag_schema()]
}
