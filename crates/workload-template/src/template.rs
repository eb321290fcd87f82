//! The template contract and its schema-backed implementation.

use crate::error::TemplateError;
use crate::generators::{generate_value, Dictionaries};
use bson::{Bson, Document};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use workload_core::{FieldDefinition, GeneratorConfig};

/// Key marking a generator expression: `{ "$gen": { type: ..., ... } }`.
pub const GENERATOR_KEY: &str = "$gen";

/// Source of generated documents, resolved expressions and dictionaries.
///
/// Implementations are shared between runners and worker tasks, so every
/// method takes `&self`.
pub trait Template: Send + Sync {
    /// Template name, for logging.
    fn name(&self) -> &str;

    /// Produce a freshly generated document.
    fn generate(&self) -> Result<Document, TemplateError>;

    /// Resolve a configured expression.
    ///
    /// Generator expressions are replaced by generated values; documents
    /// and arrays are rendered recursively; scalars pass through.
    fn generate_expression(&self, raw: &Bson) -> Result<Bson, TemplateError>;

    /// Look up a named dictionary.
    fn dictionary(&self, name: &str) -> Option<&[Bson]>;
}

/// Template generating documents from field definitions.
///
/// The RNG is seeded, so two templates built from the same definition and
/// seed produce the same sequence of documents.
pub struct SchemaTemplate {
    name: String,
    fields: Vec<FieldDefinition>,
    dictionaries: Arc<Dictionaries>,
    rng: Mutex<StdRng>,
    /// Generation index (for `sequential` and `{index}`)
    index: AtomicU64,
}

impl SchemaTemplate {
    /// Create a template with the given fields, dictionaries and seed.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldDefinition>,
        dictionaries: Arc<Dictionaries>,
        seed: u64,
    ) -> Self {
        Self {
            name: name.into(),
            fields,
            dictionaries,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            index: AtomicU64::new(0),
        }
    }

    /// Template with no fields: `generate()` yields empty documents.
    pub fn empty(dictionaries: Arc<Dictionaries>, seed: u64) -> Self {
        Self::new("<anonymous>", Vec::new(), dictionaries, seed)
    }

    fn next_index(&self) -> u64 {
        self.index.fetch_add(1, Ordering::Relaxed)
    }

    fn render(&self, raw: &Bson, rng: &mut StdRng, index: u64) -> Result<Bson, TemplateError> {
        match raw {
            Bson::Document(doc) => {
                if let Some(config) = generator_expression(doc) {
                    let config: GeneratorConfig = bson::from_bson(config.clone())?;
                    return generate_value(&config, rng, index, &self.dictionaries);
                }

                let mut rendered = Document::new();
                for (key, value) in doc {
                    rendered.insert(key.clone(), self.render(value, rng, index)?);
                }
                Ok(Bson::Document(rendered))
            }
            Bson::Array(items) => items
                .iter()
                .map(|item| self.render(item, rng, index))
                .collect::<Result<Vec<_>, _>>()
                .map(Bson::Array),
            scalar => Ok(scalar.clone()),
        }
    }
}

/// The generator config of a `{ "$gen": ... }` document, if it is one.
fn generator_expression(doc: &Document) -> Option<&Bson> {
    if doc.len() == 1 {
        doc.get(GENERATOR_KEY)
    } else {
        None
    }
}

impl Template for SchemaTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self) -> Result<Document, TemplateError> {
        let index = self.next_index();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let mut doc = Document::new();
        for field in &self.fields {
            let value = generate_value(&field.generator, &mut *rng, index, &self.dictionaries)?;
            doc.insert(field.name.clone(), value);
        }
        Ok(doc)
    }

    fn generate_expression(&self, raw: &Bson) -> Result<Bson, TemplateError> {
        let index = self.next_index();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.render(raw, &mut rng, index)
    }

    fn dictionary(&self, name: &str) -> Option<&[Bson]> {
        self.dictionaries.get(name).map(Vec::as_slice)
    }
}
