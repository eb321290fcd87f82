//! All templates of a workload, sharing one set of resolved dictionaries.

use crate::error::TemplateError;
use crate::generators::{generate_value, Dictionaries};
use crate::template::{SchemaTemplate, Template};
use bson::Bson;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use workload_core::{DictionaryDefinition, WorkloadSchema};

/// Templates of a workload, by name.
pub struct TemplateSet {
    templates: HashMap<String, Arc<SchemaTemplate>>,
    dictionaries: Arc<Dictionaries>,
    seed: u64,
}

impl TemplateSet {
    /// Build every template and resolve every dictionary of a workload.
    pub fn from_schema(schema: &WorkloadSchema, seed: u64) -> Result<Self, TemplateError> {
        let dictionaries = Arc::new(resolve_dictionaries(&schema.dictionaries, seed)?);

        let templates = schema
            .templates
            .iter()
            .enumerate()
            .map(|(idx, definition)| {
                let template = SchemaTemplate::new(
                    definition.name.clone(),
                    definition.fields.clone(),
                    Arc::clone(&dictionaries),
                    derive_seed(seed, idx as u64 + 1),
                );
                (definition.name.clone(), Arc::new(template))
            })
            .collect();

        Ok(Self {
            templates,
            dictionaries,
            seed,
        })
    }

    /// Get the template for a step.
    ///
    /// Steps without a template get a fresh empty one that still sees the
    /// workload's dictionaries.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn Template>, TemplateError> {
        match name {
            Some(name) => self
                .templates
                .get(name)
                .map(|t| Arc::clone(t) as Arc<dyn Template>)
                .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string())),
            None => Ok(Arc::new(SchemaTemplate::empty(
                Arc::clone(&self.dictionaries),
                self.seed,
            ))),
        }
    }

    /// Resolved dictionaries.
    pub fn dictionaries(&self) -> &Dictionaries {
        &self.dictionaries
    }
}

/// Resolve dictionary definitions into their entries.
///
/// Explicit `values` win; otherwise `generator` is run `count` times with
/// indices `0..count`.
pub fn resolve_dictionaries(
    definitions: &[DictionaryDefinition],
    seed: u64,
) -> Result<Dictionaries, TemplateError> {
    let empty = Dictionaries::new();
    let mut resolved = Dictionaries::new();

    for definition in definitions {
        let values: Vec<Bson> = match &definition.generator {
            Some(generator) if definition.values.is_empty() => {
                let mut rng = StdRng::seed_from_u64(derive_seed(seed, resolved.len() as u64));
                (0..definition.count)
                    .map(|index| generate_value(generator, &mut rng, index, &empty))
                    .collect::<Result<_, _>>()?
            }
            _ => definition.values.clone(),
        };

        debug!(
            "Resolved dictionary '{}' with {} entries",
            definition.name,
            values.len()
        );
        resolved.insert(definition.name.clone(), values);
    }

    Ok(resolved)
}

/// Per-consumer seed derived from the workload seed.
fn derive_seed(seed: u64, salt: u64) -> u64 {
    seed.wrapping_add(salt.wrapping_mul(0x9E3779B97F4A7C15))
}
