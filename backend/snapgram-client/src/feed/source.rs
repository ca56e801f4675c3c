use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use remote_store::DocumentStore;
use serde::de::DeserializeOwned;

use super::FeedQuery;
use crate::error::Result;

/// Fetches one page of a feed
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(
        &self,
        query: &FeedQuery,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<T>>;
}

/// Page source backed by a document collection
pub struct DocumentPageSource<T> {
    documents: Arc<dyn DocumentStore>,
    collection: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> DocumentPageSource<T> {
    pub fn new(documents: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            documents,
            collection: collection.into(),
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<T> PageSource<T> for DocumentPageSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(
        &self,
        query: &FeedQuery,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<T>> {
        let queries = query.to_queries(cursor, limit);
        let list = self
            .documents
            .list_documents(&self.collection, &queries)
            .await?;
        Ok(list.decode_all()?)
    }
}
