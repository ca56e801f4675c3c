//! Cursor-paginated feeds
//!
//! A `FeedPager` fetches pages newest-first, advancing an id cursor after
//! every successful page and merging results into one ordered, duplicate-free
//! list. An empty page ends the stream until the query is reset.

mod pager;
mod source;

pub use pager::{FeedPager, PageOutcome};
pub use source::{DocumentPageSource, PageSource};

use chrono::{DateTime, Utc};
use remote_store::{Query, CREATED_AT};

use crate::models::{Post, User};

/// Anything a feed can order and de-duplicate
pub trait FeedItem: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

impl FeedItem for Post {
    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl FeedItem for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// What a feed lists
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedQuery {
    /// Every document in the collection
    All,
    /// Posts by one creator
    Creator(String),
    /// Posts whose caption matches a search term
    Search(String),
}

impl FeedQuery {
    /// Remote queries for the page after `cursor`
    pub fn to_queries(&self, cursor: Option<&str>, limit: usize) -> Vec<Query> {
        let mut queries = Vec::with_capacity(4);
        match self {
            FeedQuery::All => {}
            FeedQuery::Creator(user_id) => queries.push(Query::equal("creator", user_id.as_str())),
            FeedQuery::Search(term) => queries.push(Query::search("caption", term.as_str())),
        }
        queries.push(Query::order_desc(CREATED_AT));
        if let Some(cursor) = cursor {
            queries.push(Query::cursor_after(cursor));
        }
        queries.push(Query::limit(limit));
        queries
    }
}
