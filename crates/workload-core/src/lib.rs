//! Workload definitions for the loadsim runner framework.
//!
//! This crate provides the declarative side of a workload:
//!
//! - [`WorkloadSchema`] - the workload file (dictionaries, templates, steps)
//! - [`WorkloadStep`] - one named step: operation, collection, parameters
//! - [`TimeConfig`] / [`MetaConfig`] - typed views for time-series steps
//! - [`UpdateSpec`] / [`UpdateBody`] - typed views for update steps
//! - [`ConfigError`] - fatal configuration errors
//!
//! # Architecture
//!
//! ```text
//! workload-core (this crate)
//!    │
//!    ├─── workload-template  (renders documents and expressions)
//!    │
//!    └─── workload-runner    (turns steps into timed database operations)
//! ```
//!
//! # Example
//!
//! ```rust
//! use workload_core::{OperationKind, TimeConfig, WorkloadSchema};
//!
//! let schema = WorkloadSchema::from_yaml(r#"
//! workloads:
//!   - name: ingest
//!     op: timeseries
//!     collection: readings
//!     params:
//!       time: { start: "2024-01-01T00:00:00Z", step: 1000, timeField: ts }
//!       meta: { dictionary: devices, metaField: device }
//! "#).unwrap();
//!
//! let step = schema.get_step("ingest").unwrap();
//! assert_eq!(step.op, OperationKind::Timeseries);
//! let time = TimeConfig::from_params(step).unwrap();
//! assert_eq!(time.step_millis(), Some(1000));
//! ```

pub mod error;
pub mod params;
pub mod schema;

// Re-exports for convenience
pub use error::ConfigError;
pub use params::{
    bson_as_i64, parse_timestamp, workers, GenerateMode, MetaConfig, TimeConfig, UpdateBody,
    UpdateSpec, DEFAULT_STEP_MILLIS, DEFAULT_WORKERS,
};
pub use schema::{
    DictionaryDefinition, FieldDefinition, GeneratorConfig, OperationKind, TemplateDefinition,
    WorkloadSchema, WorkloadStep,
};
