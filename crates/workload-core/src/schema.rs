//! Workload document definitions.
//!
//! A workload file declares the dictionaries, templates and steps that the
//! runner framework turns into database traffic:
//!
//! - `DictionaryDefinition` - named, enumerable identifier set
//! - `TemplateDefinition` - named document template (fields with generators)
//! - `WorkloadStep` - one runner: name, operation, collection, parameters
//! - `WorkloadSchema` - the whole file

use crate::error::ConfigError;
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

// ============================================================================
// Generators
// ============================================================================

/// Generator configuration for a field or expression.
///
/// This enum defines the different types of value generators available
/// for producing documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorConfig {
    /// Generate UUIDs (v4)
    UuidV4,

    /// Generate sequential integers
    Sequential {
        /// Starting value
        #[serde(default)]
        start: i64,
    },

    /// Generate values using a pattern with placeholders
    Pattern {
        /// Pattern string (supports {index}, {uuid}, {rand:N})
        pattern: String,
    },

    /// Generate random integers in a range
    IntRange {
        /// Minimum value (inclusive)
        min: i64,
        /// Maximum value (inclusive)
        max: i64,
    },

    /// Generate random floats in a range
    FloatRange {
        /// Minimum value (inclusive)
        min: f64,
        /// Maximum value (inclusive)
        max: f64,
    },

    /// Generate timestamps in a range
    TimestampRange {
        /// Start timestamp (ISO 8601)
        start: String,
        /// End timestamp (ISO 8601)
        end: String,
    },

    /// Current UTC timestamp at generation time.
    ///
    /// Not deterministic.
    TimestampNow,

    /// Current time as integer epoch milliseconds.
    EpochMillisNow,

    /// Generate weighted boolean values
    WeightedBool {
        /// Weight for true value (0.0 to 1.0)
        true_weight: f64,
    },

    /// Random selection from a pool of values
    OneOf {
        /// Pool of values to select from
        values: Vec<Bson>,
    },

    /// Random entry of a named dictionary
    Dictionary {
        /// Dictionary name
        name: String,
    },

    /// Generate a static value
    Static {
        /// The static value to use
        value: Bson,
    },

    /// Generate null values
    Null,
}

// ============================================================================
// Dictionaries and templates
// ============================================================================

/// Named set of identifier values used to fan out per-entity operations.
///
/// Either `values` lists the entries explicitly, or `generator` is run
/// `count` times when the template set is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryDefinition {
    /// Dictionary name
    pub name: String,

    /// Explicit entries
    #[serde(default)]
    pub values: Vec<Bson>,

    /// Generator producing the entries
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,

    /// Number of generated entries
    #[serde(default)]
    pub count: u64,
}

/// Field with generator config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Output field name
    pub name: String,

    /// Generator configuration
    pub generator: GeneratorConfig,
}

/// Named document template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateDefinition {
    /// Template name
    pub name: String,

    /// Field definitions, emitted in order
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

// ============================================================================
// Steps
// ============================================================================

/// Operation performed by a workload step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Per-entity time-stamped inserts
    Timeseries,
    /// Filter/update against all matching documents
    UpdateMany,
    /// Filter/update against the first matching document
    UpdateOne,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Timeseries => write!(f, "timeseries"),
            OperationKind::UpdateMany => write!(f, "update_many"),
            OperationKind::UpdateOne => write!(f, "update_one"),
        }
    }
}

/// One named workload step.
///
/// Immutable after load. Runners keep their own copy of the step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadStep {
    /// Step name, used for reporting and log correlation
    pub name: String,

    /// Operation kind
    pub op: OperationKind,

    /// Target collection
    pub collection: String,

    /// Template used for document generation
    #[serde(default)]
    pub template: Option<String>,

    /// Milliseconds between invocation starts (driver pacing)
    #[serde(default)]
    pub pace: Option<u64>,

    /// Operation-specific parameters
    #[serde(default)]
    pub params: Document,
}

impl WorkloadStep {
    /// Create a step with the given parameters.
    pub fn new(
        name: impl Into<String>,
        op: OperationKind,
        collection: impl Into<String>,
        params: Document,
    ) -> Self {
        Self {
            name: name.into(),
            op,
            collection: collection.into(),
            template: None,
            pace: None,
            params,
        }
    }

    /// Set the template name.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Get a parameter by key.
    pub fn param(&self, key: &str) -> Option<&Bson> {
        self.params.get(key)
    }
}

// ============================================================================
// Workload file
// ============================================================================

/// Full workload file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSchema {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Random seed for deterministic generation
    #[serde(default)]
    pub seed: Option<u64>,

    /// Dictionary definitions
    #[serde(default)]
    pub dictionaries: Vec<DictionaryDefinition>,

    /// Template definitions
    #[serde(default)]
    pub templates: Vec<TemplateDefinition>,

    /// Workload steps
    #[serde(default)]
    pub workloads: Vec<WorkloadStep>,

    /// Internal lookup map for templates by name
    #[serde(skip)]
    template_map: HashMap<String, usize>,
}

fn default_version() -> u32 {
    1
}

impl WorkloadSchema {
    /// Load a workload from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a workload from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut schema: WorkloadSchema = serde_yaml::from_str(yaml)?;

        let mut seen = HashSet::new();
        for step in &schema.workloads {
            if !seen.insert(step.name.as_str()) {
                return Err(ConfigError::DuplicateStep(step.name.clone()));
            }
        }

        schema.build_template_map();
        debug!(
            "Parsed workload v{}: {} steps",
            schema.version,
            schema.workloads.len()
        );
        Ok(schema)
    }

    /// Build the internal template lookup map.
    fn build_template_map(&mut self) {
        self.template_map = self
            .templates
            .iter()
            .enumerate()
            .map(|(idx, template)| (template.name.clone(), idx))
            .collect();
    }

    /// Get a template definition by name.
    pub fn get_template(&self, name: &str) -> Option<&TemplateDefinition> {
        self.template_map
            .get(name)
            .and_then(|&idx| self.templates.get(idx))
    }

    /// Get a workload step by name.
    pub fn get_step(&self, name: &str) -> Option<&WorkloadStep> {
        self.workloads.iter().find(|s| s.name == name)
    }

    /// Get all step names in declaration order.
    pub fn step_names(&self) -> Vec<&str> {
        self.workloads.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKLOAD: &str = r#"
version: 1
seed: 7
dictionaries:
  - name: devices
    values: ["A", "B"]
  - name: sensors
    generator:
      type: pattern
      pattern: "sensor_{index}"
    count: 3
templates:
  - name: reading
    fields:
      - name: temperature
        generator:
          type: float_range
          min: 10
          max: 30
      - name: status
        generator:
          type: one_of
          values: ["ok", "degraded"]
workloads:
  - name: ingest
    op: timeseries
    collection: readings
    template: reading
    pace: 500
    params:
      workers: 4
      time:
        start: "2024-01-01T00:00:00Z"
        step: 5000
        timeField: ts
      meta:
        dictionary: devices
        metaField: device
  - name: touch
    op: update_many
    collection: readings
    params:
      filter: { device: "A" }
      update: { "$set": { seen: true } }
"#;

    #[test]
    fn test_parse_workload() {
        let schema = WorkloadSchema::from_yaml(WORKLOAD).unwrap();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.seed, Some(7));
        assert_eq!(schema.dictionaries.len(), 2);
        assert_eq!(schema.step_names(), vec!["ingest", "touch"]);

        let ingest = schema.get_step("ingest").unwrap();
        assert_eq!(ingest.op, OperationKind::Timeseries);
        assert_eq!(ingest.template.as_deref(), Some("reading"));
        assert_eq!(ingest.pace, Some(500));
        assert!(ingest.params.get_document("time").is_ok());

        let touch = schema.get_step("touch").unwrap();
        assert_eq!(touch.op, OperationKind::UpdateMany);
        assert!(touch.template.is_none());
    }

    #[test]
    fn test_template_lookup() {
        let schema = WorkloadSchema::from_yaml(WORKLOAD).unwrap();

        let template = schema.get_template("reading").unwrap();
        assert_eq!(template.fields.len(), 2);
        assert!(matches!(
            template.fields[0].generator,
            GeneratorConfig::FloatRange { .. }
        ));
        assert!(schema.get_template("missing").is_none());
    }

    #[test]
    fn test_generated_dictionary_definition() {
        let schema = WorkloadSchema::from_yaml(WORKLOAD).unwrap();

        let sensors = &schema.dictionaries[1];
        assert_eq!(sensors.count, 3);
        assert!(sensors.values.is_empty());
        assert_eq!(
            sensors.generator,
            Some(GeneratorConfig::Pattern {
                pattern: "sensor_{index}".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let yaml = r#"
workloads:
  - name: a
    op: update_one
    collection: c
  - name: a
    op: update_many
    collection: c
"#;
        let result = WorkloadSchema::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigError::DuplicateStep(name)) if name == "a"));
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let yaml = r#"
workloads:
  - name: a
    op: delete_all
    collection: c
"#;
        assert!(matches!(
            WorkloadSchema::from_yaml(yaml),
            Err(ConfigError::YamlError(_))
        ));
    }

    #[test]
    fn test_generator_from_bson() {
        let config: GeneratorConfig = bson::from_bson(Bson::Document(bson::doc! {
            "type": "int_range",
            "min": 1,
            "max": 5,
        }))
        .unwrap();

        assert_eq!(config, GeneratorConfig::IntRange { min: 1, max: 5 });
    }
}
