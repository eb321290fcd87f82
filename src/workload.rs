//! Loading a workload file and turning its steps into runners.

use crate::driver::ScheduledRunner;
use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use workload_core::{ConfigError, MetaConfig, OperationKind, WorkloadSchema};
use workload_runner::{build_runner, validate_step, DocumentCollection, Reporter};
use workload_template::TemplateSet;

/// Seed used when neither the command line nor the workload file sets one.
pub const DEFAULT_SEED: u64 = 42;

/// A parsed workload with its templates and dictionaries resolved.
pub struct Workload {
    pub schema: WorkloadSchema,
    pub templates: TemplateSet,
    pub seed: u64,
}

impl Workload {
    /// Load a workload file. `seed` overrides the file's seed.
    pub fn from_file(path: &Path, seed: Option<u64>) -> anyhow::Result<Self> {
        let schema = WorkloadSchema::from_file(path)
            .with_context(|| format!("Failed to load workload from {path:?}"))?;
        Self::from_schema(schema, seed)
    }

    /// Parse a workload from YAML. `seed` overrides the document's seed.
    pub fn from_yaml(yaml: &str, seed: Option<u64>) -> anyhow::Result<Self> {
        let schema = WorkloadSchema::from_yaml(yaml).context("Failed to parse workload")?;
        Self::from_schema(schema, seed)
    }

    fn from_schema(schema: WorkloadSchema, seed: Option<u64>) -> anyhow::Result<Self> {
        let seed = seed.or(schema.seed).unwrap_or(DEFAULT_SEED);
        let templates = TemplateSet::from_schema(&schema, seed)
            .context("Failed to build templates")?;

        debug!(
            "Loaded workload: {} steps, {} templates, {} dictionaries (seed={})",
            schema.workloads.len(),
            schema.templates.len(),
            schema.dictionaries.len(),
            seed
        );

        Ok(Self {
            schema,
            templates,
            seed,
        })
    }

    /// Check every step without touching a database.
    ///
    /// Covers parameter shapes, template references and, for time-series
    /// steps, that the series dictionary exists.
    pub fn validate(&self) -> anyhow::Result<()> {
        for step in &self.schema.workloads {
            validate_step(step).with_context(|| format!("Invalid step '{}'", step.name))?;

            self.templates
                .resolve(step.template.as_deref())
                .with_context(|| format!("Invalid step '{}'", step.name))?;

            if step.op == OperationKind::Timeseries {
                let meta = MetaConfig::from_params(step)?;
                if !self.templates.dictionaries().contains_key(&meta.dictionary) {
                    return Err(ConfigError::DictionaryNotFound {
                        step: step.name.clone(),
                        dictionary: meta.dictionary,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Build one runner per step.
    ///
    /// Steps targeting the same collection share one handle.
    pub fn build_runners<F>(
        &self,
        mut collection_for: F,
        reporter: Arc<dyn Reporter>,
    ) -> anyhow::Result<Vec<ScheduledRunner>>
    where
        F: FnMut(&str) -> Arc<dyn DocumentCollection>,
    {
        let mut collections: HashMap<String, Arc<dyn DocumentCollection>> = HashMap::new();
        let mut runners = Vec::with_capacity(self.schema.workloads.len());

        for step in &self.schema.workloads {
            let template = self
                .templates
                .resolve(step.template.as_deref())
                .with_context(|| format!("Failed to build runner '{}'", step.name))?;
            let collection = Arc::clone(
                collections
                    .entry(step.collection.clone())
                    .or_insert_with(|| collection_for(&step.collection)),
            );

            let runner = build_runner(step.clone(), template, collection, Arc::clone(&reporter))
                .with_context(|| format!("Failed to build runner '{}'", step.name))?;

            info!(
                "Built {} runner '{}' on collection '{}'",
                step.op, step.name, step.collection
            );
            runners.push(ScheduledRunner::new(
                runner,
                step.pace.map(Duration::from_millis),
            ));
        }

        Ok(runners)
    }
}
