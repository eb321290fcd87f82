//! Database collection seam used by the runners.

use crate::error::StoreError;
use async_trait::async_trait;
use bson::{Bson, Document};
use mongodb::options::{UpdateModifications, UpdateOptions};
use mongodb::results::UpdateResult;
use mongodb::Collection;
use workload_core::UpdateBody;

/// Options applied to an update call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSettings {
    /// Insert a document when nothing matches.
    pub upsert: bool,
}

/// Result of an update call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Documents matched by the filter.
    pub matched: u64,
    /// Documents modified.
    pub modified: u64,
    /// Id of the upserted document, if any.
    pub upserted: Option<Bson>,
}

impl From<UpdateResult> for UpdateOutcome {
    fn from(result: UpdateResult) -> Self {
        Self {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted: result.upserted_id,
        }
    }
}

/// Operations a runner performs against its target collection.
///
/// Handles are shared between runners and worker tasks; implementations
/// must not require exclusive access.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Collection name, for logging.
    fn name(&self) -> &str;

    /// Insert a single document.
    async fn insert_one(&self, doc: Document) -> Result<(), StoreError>;

    /// Apply an update to every matching document.
    async fn update_many(
        &self,
        filter: Document,
        update: UpdateBody,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Apply an update to the first matching document.
    async fn update_one(
        &self,
        filter: Document,
        update: UpdateBody,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError>;
}

/// [`DocumentCollection`] backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoCollection {
    inner: Collection<Document>,
}

impl MongoCollection {
    pub fn new(inner: Collection<Document>) -> Self {
        Self { inner }
    }

    fn options(settings: UpdateSettings) -> UpdateOptions {
        let mut options = UpdateOptions::default();
        if settings.upsert {
            options.upsert = Some(true);
        }
        options
    }
}

fn modifications(update: UpdateBody) -> UpdateModifications {
    match update {
        UpdateBody::Document(doc) => UpdateModifications::Document(doc),
        UpdateBody::Pipeline(stages) => UpdateModifications::Pipeline(stages),
    }
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn insert_one(&self, doc: Document) -> Result<(), StoreError> {
        self.inner.insert_one(doc).await?;
        Ok(())
    }

    async fn update_many(
        &self,
        filter: Document,
        update: UpdateBody,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .inner
            .update_many(filter, modifications(update))
            .with_options(Self::options(settings))
            .await?;
        Ok(result.into())
    }

    async fn update_one(
        &self,
        filter: Document,
        update: UpdateBody,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .inner
            .update_one(filter, modifications(update))
            .with_options(Self::options(settings))
            .await?;
        Ok(result.into())
    }
}
