//! Bookmark sorts
//!
//! Creation date and title sorts can be pushed down to their indexes. The
//! date-urgency sorts only exist in memory; a chain they lead is retrieved
//! by a full scan sorted in memory.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;

use super::entity::Bookmark;
use super::query::BookmarkRetrieveQuery;
use crate::retrieve::{Comparator, RetrieveQuery, SortQuery};
use crate::sort::{SortChain, SortCriterion};

/// A sort over bookmarks
pub type BookmarkSort = SortChain<Bookmark, BookmarkRetrieveQuery>;

type Criterion = Arc<dyn SortCriterion<Bookmark, BookmarkRetrieveQuery>>;

/// Present dates first, earliest first
fn earliest_present_first(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn directed(ordering: Ordering, ascending: bool) -> Ordering {
    if ascending {
        ordering
    } else {
        ordering.reverse()
    }
}

/// By creation date, backed by the `creationDate` index
#[derive(Debug, Clone, Copy)]
pub struct CreationDate {
    pub ascending: bool,
}

impl SortCriterion<Bookmark, BookmarkRetrieveQuery> for CreationDate {
    fn name(&self) -> &str {
        if self.ascending {
            "creationDateAsc"
        } else {
            "creationDateDesc"
        }
    }

    fn compare(&self, a: &Bookmark, b: &Bookmark) -> Ordering {
        directed(a.creation_date.cmp(&b.creation_date), self.ascending)
    }

    fn retrieve(&self, chain: &Comparator<Bookmark>) -> Option<BookmarkRetrieveQuery> {
        let sort = SortQuery::new(self.ascending).with_fallback(Arc::clone(chain));
        Some(BookmarkRetrieveQuery::CreationDate(RetrieveQuery::Sort(sort)))
    }
}

/// By title, backed by the `title` index
#[derive(Debug, Clone, Copy)]
pub struct Title {
    pub ascending: bool,
}

impl SortCriterion<Bookmark, BookmarkRetrieveQuery> for Title {
    fn name(&self) -> &str {
        if self.ascending {
            "titleAsc"
        } else {
            "titleDesc"
        }
    }

    fn compare(&self, a: &Bookmark, b: &Bookmark) -> Ordering {
        directed(a.title.cmp(&b.title), self.ascending)
    }

    fn retrieve(&self, chain: &Comparator<Bookmark>) -> Option<BookmarkRetrieveQuery> {
        let sort = SortQuery::new(self.ascending).with_fallback(Arc::clone(chain));
        Some(BookmarkRetrieveQuery::Title(RetrieveQuery::Sort(sort)))
    }
}

/// Bookmarks with a deadline first, nearest deadline first
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlineFirst;

impl SortCriterion<Bookmark, BookmarkRetrieveQuery> for DeadlineFirst {
    fn name(&self) -> &str {
        "deadlineFirst"
    }

    fn compare(&self, a: &Bookmark, b: &Bookmark) -> Ordering {
        earliest_present_first(a.deadline, b.deadline)
    }
}

/// Bookmarks with a reminder first, earliest reminder first
#[derive(Debug, Clone, Copy, Default)]
pub struct ReminderFirst;

impl SortCriterion<Bookmark, BookmarkRetrieveQuery> for ReminderFirst {
    fn name(&self) -> &str {
        "reminderFirst"
    }

    fn compare(&self, a: &Bookmark, b: &Bookmark) -> Ordering {
        earliest_present_first(a.remind_date, b.remind_date)
    }
}

/// Bookmarks that expire first, soonest expiry first
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiringSoonFirst;

impl SortCriterion<Bookmark, BookmarkRetrieveQuery> for ExpiringSoonFirst {
    fn name(&self) -> &str {
        "expiringSoonFirst"
    }

    fn compare(&self, a: &Bookmark, b: &Bookmark) -> Ordering {
        earliest_present_first(a.expiration_date, b.expiration_date)
    }
}

/// Bookmarks whose reminder is still in the future go last
#[derive(Debug, Clone, Copy)]
pub struct UnreachedReminderLast {
    pub today: NaiveDate,
}

impl UnreachedReminderLast {
    fn unreached(&self, bookmark: &Bookmark) -> bool {
        bookmark.remind_date.map_or(false, |date| date > self.today)
    }
}

impl SortCriterion<Bookmark, BookmarkRetrieveQuery> for UnreachedReminderLast {
    fn name(&self) -> &str {
        "unreachedReminderLast"
    }

    fn compare(&self, a: &Bookmark, b: &Bookmark) -> Ordering {
        self.unreached(a).cmp(&self.unreached(b))
    }
}

pub fn by_creation_date(ascending: bool) -> BookmarkSort {
    SortChain::new(CreationDate { ascending })
}

pub fn by_title(ascending: bool) -> BookmarkSort {
    SortChain::new(Title { ascending })
}

/// Default ordering: due work first, newest first otherwise
pub fn smart_sort(today: NaiveDate) -> BookmarkSort {
    let criteria: [Criterion; 5] = [
        Arc::new(UnreachedReminderLast { today }),
        Arc::new(DeadlineFirst),
        Arc::new(ReminderFirst),
        Arc::new(ExpiringSoonFirst),
        Arc::new(CreationDate { ascending: false }),
    ];
    SortChain::combine("smart", criteria)
}

impl BookmarkSort {
    /// How to retrieve bookmarks already in this order
    pub fn retrieve_query(&self) -> BookmarkRetrieveQuery {
        self.retrieve_or_else(BookmarkRetrieveQuery::InMemory)
    }
}
