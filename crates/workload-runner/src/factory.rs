//! Maps workload steps to runner implementations.

use crate::collection::DocumentCollection;
use crate::error::RunnerError;
use crate::reporter::Reporter;
use crate::runner::{Runner, RunnerContext};
use crate::timeseries::TimeSeriesRunner;
use crate::update::{UpdateMany, UpdateManyRunner, UpdateOne, UpdateOneRunner};
use std::sync::Arc;
use workload_core::{
    workers, ConfigError, MetaConfig, OperationKind, TimeConfig, UpdateSpec, WorkloadStep,
};
use workload_template::Template;

/// Build the runner for a step.
///
/// Parameter errors surface here, before any database traffic.
pub fn build_runner(
    step: WorkloadStep,
    template: Arc<dyn Template>,
    collection: Arc<dyn DocumentCollection>,
    reporter: Arc<dyn Reporter>,
) -> Result<Box<dyn Runner>, RunnerError> {
    let op = step.op;
    let context = RunnerContext::new(step, template, collection, reporter);

    let runner: Box<dyn Runner> = match op {
        OperationKind::Timeseries => Box::new(TimeSeriesRunner::new(context)?),
        OperationKind::UpdateMany => Box::new(UpdateManyRunner::new(context, UpdateMany)?),
        OperationKind::UpdateOne => Box::new(UpdateOneRunner::new(context, UpdateOne)?),
    };
    Ok(runner)
}

/// Check that a step's parameters can be interpreted, without building it.
pub fn validate_step(step: &WorkloadStep) -> Result<(), ConfigError> {
    match step.op {
        OperationKind::Timeseries => {
            TimeConfig::from_params(step)?;
            MetaConfig::from_params(step)?;
            workers(step)?;
        }
        OperationKind::UpdateMany | OperationKind::UpdateOne => {
            UpdateSpec::from_params(step)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryCollection, RecordingReporter};
    use bson::doc;
    use workload_template::{Dictionaries, SchemaTemplate};

    fn empty_template() -> Arc<dyn Template> {
        Arc::new(SchemaTemplate::empty(Arc::new(Dictionaries::new()), 1))
    }

    #[test]
    fn test_build_by_operation() {
        let steps = [
            WorkloadStep::new(
                "ingest",
                OperationKind::Timeseries,
                "readings",
                doc! {
                    "time": { "start": "2024-01-01", "timeField": "ts" },
                    "meta": { "dictionary": "devices", "metaField": "device" },
                },
            ),
            WorkloadStep::new(
                "touch",
                OperationKind::UpdateMany,
                "readings",
                doc! { "update": { "$set": { "seen": true } } },
            ),
            WorkloadStep::new(
                "bump",
                OperationKind::UpdateOne,
                "readings",
                doc! { "update": { "$inc": { "n": 1 } } },
            ),
        ];

        for step in steps {
            let name = step.name.clone();
            let runner = build_runner(
                step,
                empty_template(),
                Arc::new(MemoryCollection::new("readings")),
                Arc::new(RecordingReporter::new()),
            )
            .unwrap();
            assert_eq!(runner.name(), name);
        }
    }

    #[test]
    fn test_build_rejects_bad_params() {
        let step = WorkloadStep::new("touch", OperationKind::UpdateOne, "readings", doc! {});

        let result = build_runner(
            step,
            empty_template(),
            Arc::new(MemoryCollection::new("readings")),
            Arc::new(RecordingReporter::new()),
        );
        assert!(matches!(result, Err(e) if e.is_configuration()));
    }

    #[test]
    fn test_validate_step() {
        let good = WorkloadStep::new(
            "touch",
            OperationKind::UpdateMany,
            "readings",
            doc! { "filter": { "a": 1 }, "update": [{ "$set": { "b": 2 } }] },
        );
        assert!(validate_step(&good).is_ok());

        let bad = WorkloadStep::new(
            "ingest",
            OperationKind::Timeseries,
            "readings",
            doc! { "time": { "timeField": "ts" } },
        );
        assert!(matches!(
            validate_step(&bad),
            Err(ConfigError::MissingParam { field, .. }) if field == "meta"
        ));
    }
}
