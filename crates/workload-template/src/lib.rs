//! Document template engine for the loadsim runner framework.
//!
//! This crate provides the [`Template`] contract consumed by the runners and
//! [`SchemaTemplate`], an implementation driven by the field generators of a
//! workload file. Generation uses a seeded RNG, so a workload with a fixed
//! seed renders the same documents on every run.
//!
//! # Architecture
//!
//! ```text
//! WorkloadSchema (YAML)
//!        │
//!        ▼
//! ┌─────────────────┐
//! │   TemplateSet   │──── dictionaries (resolved once)
//! └────────┬────────┘
//!          │  one per template
//!          ▼
//! ┌─────────────────┐
//! │ SchemaTemplate  │
//! │  - rng (StdRng) │
//! │  - index        │
//! └────────┬────────┘
//!          │
//!          ▼
//!   generate() / generate_expression() / dictionary()
//! ```
//!
//! # Expressions
//!
//! A single-key document `{ "$gen": <generator> }` anywhere inside an
//! expression is replaced by one generated value:
//!
//! ```rust
//! use bson::{doc, Bson};
//! use std::sync::Arc;
//! use workload_template::{SchemaTemplate, Template};
//!
//! let template = SchemaTemplate::empty(Arc::default(), 42);
//! let raw = Bson::Document(doc! {
//!     "$set": { "level": { "$gen": { "type": "int_range", "min": 1, "max": 5 } } }
//! });
//! let rendered = template.generate_expression(&raw).unwrap();
//! let level = rendered.as_document().unwrap()
//!     .get_document("$set").unwrap()
//!     .get_i64("level").unwrap();
//! assert!((1..=5).contains(&level));
//! ```
//!
//! # Generators
//!
//! - `uuid_v4` - Random UUID v4 (BSON binary subtype 4)
//! - `sequential` - Sequential integers
//! - `pattern` - Pattern strings with placeholders (`{index}`, `{uuid}`, `{rand:N}`)
//! - `int_range` / `float_range` - Random numbers in a range
//! - `timestamp_range` - Random timestamps in a date range
//! - `timestamp_now` / `epoch_millis_now` - Current time
//! - `weighted_bool` - Boolean with configurable true probability
//! - `one_of` - Random selection from a list
//! - `dictionary` - Random entry of a named dictionary
//! - `static` - Static value
//! - `null` - Null value

pub mod error;
pub mod generators;
pub mod set;
pub mod template;

// Re-exports for convenience
pub use error::TemplateError;
pub use generators::Dictionaries;
pub use set::{resolve_dictionaries, TemplateSet};
pub use template::{SchemaTemplate, Template, GENERATOR_KEY};
