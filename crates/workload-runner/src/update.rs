//! Filter/update runners.
//!
//! Every invocation renders the step's filter and update templates afresh
//! (template state such as sequence counters moves between calls) and
//! hands them to an [`UpdateStrategy`]. The strategy decides how many
//! documents the update applies to.

use crate::collection::{DocumentCollection, UpdateOutcome, UpdateSettings};
use crate::error::{RunnerError, StoreError};
use crate::runner::{Runner, RunnerContext};
use async_trait::async_trait;
use bson::{Bson, Document};
use std::time::{Duration, Instant};
use tracing::debug;
use workload_core::{UpdateBody, UpdateSpec};
use workload_template::TemplateError;

/// How a rendered filter/update pair is applied to the collection.
///
/// One method per update-body shape.
#[async_trait]
pub trait UpdateStrategy: Send + Sync {
    /// Strategy name, for logging.
    fn name(&self) -> &'static str;

    /// Apply a single replacement/modifier document.
    async fn update_with_document(
        &self,
        collection: &dyn DocumentCollection,
        filter: Document,
        update: Document,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Apply an ordered sequence of pipeline stages.
    async fn update_with_pipeline(
        &self,
        collection: &dyn DocumentCollection,
        filter: Document,
        pipeline: Vec<Document>,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError>;
}

/// Applies the update to every matching document in one call.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateMany;

#[async_trait]
impl UpdateStrategy for UpdateMany {
    fn name(&self) -> &'static str {
        "update_many"
    }

    async fn update_with_document(
        &self,
        collection: &dyn DocumentCollection,
        filter: Document,
        update: Document,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError> {
        collection
            .update_many(filter, UpdateBody::Document(update), settings)
            .await
    }

    async fn update_with_pipeline(
        &self,
        collection: &dyn DocumentCollection,
        filter: Document,
        pipeline: Vec<Document>,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError> {
        collection
            .update_many(filter, UpdateBody::Pipeline(pipeline), settings)
            .await
    }
}

/// Applies the update to the first matching document.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOne;

#[async_trait]
impl UpdateStrategy for UpdateOne {
    fn name(&self) -> &'static str {
        "update_one"
    }

    async fn update_with_document(
        &self,
        collection: &dyn DocumentCollection,
        filter: Document,
        update: Document,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError> {
        collection
            .update_one(filter, UpdateBody::Document(update), settings)
            .await
    }

    async fn update_with_pipeline(
        &self,
        collection: &dyn DocumentCollection,
        filter: Document,
        pipeline: Vec<Document>,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError> {
        collection
            .update_one(filter, UpdateBody::Pipeline(pipeline), settings)
            .await
    }
}

/// Runner rendering a filter and update per invocation.
pub struct UpdateRunner<S> {
    context: RunnerContext,
    strategy: S,
    filter: Bson,
    update: UpdateBody,
    settings: UpdateSettings,
}

/// Update runner applying to all matching documents.
pub type UpdateManyRunner = UpdateRunner<UpdateMany>;

/// Update runner applying to the first matching document.
pub type UpdateOneRunner = UpdateRunner<UpdateOne>;

impl<S: UpdateStrategy> UpdateRunner<S> {
    /// Create a runner from the step's `filter`, `update` and `upsert`.
    pub fn new(context: RunnerContext, strategy: S) -> Result<Self, RunnerError> {
        let spec = UpdateSpec::from_params(&context.step)?;

        Ok(Self {
            context,
            strategy,
            filter: Bson::Document(spec.filter),
            update: spec.update,
            settings: UpdateSettings {
                upsert: spec.upsert,
            },
        })
    }

    /// Render the filter document.
    pub fn render_filter(&self) -> Result<Document, RunnerError> {
        match self.context.template.generate_expression(&self.filter)? {
            Bson::Document(doc) => Ok(doc),
            other => Err(unexpected_shape("filter", "a document", &other)),
        }
    }

    /// Render the update body, keeping its shape.
    pub fn render_update(&self) -> Result<UpdateBody, RunnerError> {
        let template = &self.context.template;
        match &self.update {
            UpdateBody::Document(doc) => {
                match template.generate_expression(&Bson::Document(doc.clone()))? {
                    Bson::Document(doc) => Ok(UpdateBody::Document(doc)),
                    other => Err(unexpected_shape("update", "a document", &other)),
                }
            }
            UpdateBody::Pipeline(stages) => stages
                .iter()
                .map(|stage| match template.generate_expression(&Bson::Document(stage.clone()))? {
                    Bson::Document(doc) => Ok(doc),
                    other => Err(unexpected_shape("update", "a pipeline stage document", &other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(UpdateBody::Pipeline),
        }
    }
}

fn unexpected_shape(field: &str, expected: &'static str, found: &Bson) -> RunnerError {
    RunnerError::Template(TemplateError::UnexpectedShape {
        field: field.to_string(),
        expected,
        found: found.to_string(),
    })
}

#[async_trait]
impl<S: UpdateStrategy> Runner for UpdateRunner<S> {
    fn name(&self) -> &str {
        self.context.name()
    }

    async fn run_once(&mut self) -> Result<Duration, RunnerError> {
        let filter = self.render_filter()?;
        let update = self.render_update()?;
        let collection = self.context.collection.as_ref();

        let start = Instant::now();
        let outcome = match update {
            UpdateBody::Document(doc) => {
                self.strategy
                    .update_with_document(collection, filter, doc, self.settings)
                    .await?
            }
            UpdateBody::Pipeline(stages) => {
                self.strategy
                    .update_with_pipeline(collection, filter, stages, self.settings)
                    .await?
            }
        };
        let elapsed = start.elapsed();

        debug!(
            "{} '{}': matched {}, modified {}",
            self.strategy.name(),
            self.name(),
            outcome.matched,
            outcome.modified
        );
        self.context.reporter.report_op(self.name(), 1, elapsed);

        Ok(elapsed)
    }
}
