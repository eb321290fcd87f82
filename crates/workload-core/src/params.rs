//! Typed views over a step's parameter document.
//!
//! The parameter block of a [`WorkloadStep`] stays a raw BSON document so
//! expressions can be handed to the template engine untouched. The structs
//! here pull out the parts each runner needs and reject shapes that cannot
//! be interpreted.

use crate::error::ConfigError;
use crate::schema::WorkloadStep;
use bson::{Bson, Document};
use chrono::{DateTime, NaiveDate, Utc};

/// Default clock step when `step` is absent or not a number.
pub const DEFAULT_STEP_MILLIS: i64 = 1000;

/// Default worker pool size.
pub const DEFAULT_WORKERS: usize = 1;

// ============================================================================
// Time series
// ============================================================================

/// `time` block of a time-series step.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeConfig {
    /// Initial clock cursor
    pub start: Option<DateTime<Utc>>,
    /// Raw `step` value; interpreted leniently by the runner
    pub step: Option<Bson>,
    /// Expression producing an explicit timestamp
    pub value: Option<Bson>,
    /// Timestamp after which the runner emits nothing
    pub stop: Option<DateTime<Utc>>,
    /// Raw `jitter` value; only numeric bounds apply
    pub jitter: Option<Bson>,
    /// Output field for the timestamp
    pub time_field: String,
}

impl TimeConfig {
    /// Parse the `time` block of a step.
    pub fn from_params(step: &WorkloadStep) -> Result<Self, ConfigError> {
        let block = sub_document(step, "time")?;

        let time_field = block
            .get("timeField")
            .ok_or_else(|| ConfigError::missing(&step.name, "time.timeField"))?;
        let time_field = match time_field {
            Bson::String(s) if !s.is_empty() => s.clone(),
            other => {
                return Err(ConfigError::invalid(
                    &step.name,
                    "time.timeField",
                    format!("expected a non-empty string, got {other}"),
                ))
            }
        };

        Ok(Self {
            start: optional_timestamp(step, block, "start")?,
            step: block.get("step").cloned(),
            value: block.get("value").cloned(),
            stop: optional_timestamp(step, block, "stop")?,
            jitter: block.get("jitter").cloned(),
            time_field,
        })
    }

    /// Clock step in milliseconds, `None` when `step` is not numeric.
    pub fn step_millis(&self) -> Option<i64> {
        self.step.as_ref().and_then(bson_as_i64)
    }

    /// Jitter bound in milliseconds, `None` when absent or not numeric.
    pub fn jitter_millis(&self) -> Option<i64> {
        self.jitter.as_ref().and_then(bson_as_i64)
    }
}

/// Entity generation mode of the `meta` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateMode {
    /// One document per dictionary entry (also the default)
    All,
    /// Anything else; rejected when the runner is invoked
    Unsupported(String),
}

impl GenerateMode {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("all") => GenerateMode::All,
            Some(other) => GenerateMode::Unsupported(other.to_string()),
        }
    }
}

/// `meta` block of a time-series step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaConfig {
    /// Name of the identifier dictionary
    pub dictionary: String,
    /// Output field for the identifier
    pub meta_field: String,
    /// Generation mode
    pub generate: GenerateMode,
}

impl MetaConfig {
    /// Parse the `meta` block of a step.
    pub fn from_params(step: &WorkloadStep) -> Result<Self, ConfigError> {
        let block = sub_document(step, "meta")?;

        let generate = match block.get("generate") {
            None | Some(Bson::Null) => GenerateMode::All,
            Some(Bson::String(s)) => GenerateMode::parse(Some(s)),
            Some(other) => GenerateMode::Unsupported(other.to_string()),
        };

        Ok(Self {
            dictionary: required_string(step, block, "meta", "dictionary")?,
            meta_field: required_string(step, block, "meta", "metaField")?,
            generate,
        })
    }
}

/// Worker pool size of a step (`workers`, default 1, never below 1).
pub fn workers(step: &WorkloadStep) -> Result<usize, ConfigError> {
    match step.param("workers") {
        None | Some(Bson::Null) => Ok(DEFAULT_WORKERS),
        Some(value) => match bson_as_i64(value) {
            Some(n) => Ok(n.max(1) as usize),
            None => Err(ConfigError::invalid(
                &step.name,
                "workers",
                format!("expected an integer, got {value}"),
            )),
        },
    }
}

// ============================================================================
// Updates
// ============================================================================

/// Update body shape.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateBody {
    /// Replacement/modifier document
    Document(Document),
    /// Ordered aggregation-pipeline stages
    Pipeline(Vec<Document>),
}

impl UpdateBody {
    /// Raw BSON form, suitable for template rendering.
    pub fn to_bson(&self) -> Bson {
        match self {
            UpdateBody::Document(doc) => Bson::Document(doc.clone()),
            UpdateBody::Pipeline(stages) => {
                Bson::Array(stages.iter().cloned().map(Bson::Document).collect())
            }
        }
    }

    /// Interpret a BSON value as an update body.
    pub fn from_bson(step: &str, field: &str, value: Bson) -> Result<Self, ConfigError> {
        match value {
            Bson::Document(doc) => Ok(UpdateBody::Document(doc)),
            Bson::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Bson::Document(stage) => Ok(stage),
                    other => Err(ConfigError::invalid(
                        step,
                        field,
                        format!("pipeline stage {i} is not a document: {other}"),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(UpdateBody::Pipeline),
            other => Err(ConfigError::invalid(
                step,
                field,
                format!("expected a document or an array of documents, got {other}"),
            )),
        }
    }
}

/// Parameters of an update step.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    /// Filter template
    pub filter: Document,
    /// Update template
    pub update: UpdateBody,
    /// Insert when nothing matches
    pub upsert: bool,
}

impl UpdateSpec {
    /// Parse `filter`, `update` and `upsert` from a step.
    pub fn from_params(step: &WorkloadStep) -> Result<Self, ConfigError> {
        let filter = match step.param("filter") {
            None | Some(Bson::Null) => Document::new(),
            Some(Bson::Document(doc)) => doc.clone(),
            Some(other) => {
                return Err(ConfigError::invalid(
                    &step.name,
                    "filter",
                    format!("expected a document, got {other}"),
                ))
            }
        };

        let update = step
            .param("update")
            .cloned()
            .ok_or_else(|| ConfigError::missing(&step.name, "update"))?;
        let update = UpdateBody::from_bson(&step.name, "update", update)?;

        let upsert = match step.param("upsert") {
            None | Some(Bson::Null) => false,
            Some(Bson::Boolean(b)) => *b,
            Some(other) => {
                return Err(ConfigError::invalid(
                    &step.name,
                    "upsert",
                    format!("expected a boolean, got {other}"),
                ))
            }
        };

        Ok(Self {
            filter,
            update,
            upsert,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Integer view of a numeric BSON value.
pub fn bson_as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.is_finite() => Some(*v as i64),
        _ => None,
    }
}

/// Parse a timestamp string in RFC 3339 or `YYYY-MM-DD` form.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}

fn sub_document<'a>(step: &'a WorkloadStep, key: &str) -> Result<&'a Document, ConfigError> {
    match step.param(key) {
        Some(Bson::Document(doc)) => Ok(doc),
        Some(other) => Err(ConfigError::invalid(
            &step.name,
            key,
            format!("expected a document, got {other}"),
        )),
        None => Err(ConfigError::missing(&step.name, key)),
    }
}

fn required_string(
    step: &WorkloadStep,
    block: &Document,
    block_name: &str,
    key: &str,
) -> Result<String, ConfigError> {
    let field = format!("{block_name}.{key}");
    match block.get(key) {
        Some(Bson::String(s)) => Ok(s.clone()),
        Some(other) => Err(ConfigError::invalid(
            &step.name,
            &field,
            format!("expected a string, got {other}"),
        )),
        None => Err(ConfigError::missing(&step.name, &field)),
    }
}

fn optional_timestamp(
    step: &WorkloadStep,
    block: &Document,
    key: &str,
) -> Result<Option<DateTime<Utc>>, ConfigError> {
    let field = format!("time.{key}");
    match block.get(key) {
        None | Some(Bson::Null) => Ok(None),
        Some(Bson::DateTime(dt)) => Ok(Some(dt.to_chrono())),
        Some(Bson::Int64(ms)) => epoch_millis(step, &field, *ms).map(Some),
        Some(Bson::Int32(ms)) => epoch_millis(step, &field, i64::from(*ms)).map(Some),
        Some(Bson::String(s)) => parse_timestamp(s).map(Some).ok_or_else(|| {
            ConfigError::invalid(&step.name, &field, format!("unparseable timestamp '{s}'"))
        }),
        Some(other) => Err(ConfigError::invalid(
            &step.name,
            &field,
            format!("expected a timestamp, got {other}"),
        )),
    }
}

fn epoch_millis(
    step: &WorkloadStep,
    field: &str,
    ms: i64,
) -> Result<DateTime<Utc>, ConfigError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        ConfigError::invalid(&step.name, field, format!("timestamp {ms} out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OperationKind;
    use bson::doc;
    use chrono::TimeZone;

    fn ts_step(params: Document) -> WorkloadStep {
        WorkloadStep::new("ts", OperationKind::Timeseries, "readings", params)
    }

    #[test]
    fn test_time_config_full() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let step = ts_step(doc! {
            "time": {
                "start": bson::DateTime::from_chrono(start),
                "step": 5000,
                "stop": "2024-01-02",
                "jitter": 100i64,
                "timeField": "ts",
            }
        });

        let time = TimeConfig::from_params(&step).unwrap();
        assert_eq!(time.start, Some(start));
        assert_eq!(time.step_millis(), Some(5000));
        assert_eq!(
            time.stop,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(time.jitter_millis(), Some(100));
        assert!(time.value.is_none());
        assert_eq!(time.time_field, "ts");
    }

    #[test]
    fn test_time_config_non_numeric_step_kept_raw() {
        let step = ts_step(doc! {
            "time": { "start": "2024-01-01T00:00:00Z", "step": "fast", "timeField": "ts" }
        });

        let time = TimeConfig::from_params(&step).unwrap();
        assert_eq!(time.step, Some(Bson::String("fast".to_string())));
        assert_eq!(time.step_millis(), None);
    }

    #[test]
    fn test_time_config_requires_time_field() {
        let step = ts_step(doc! { "time": { "step": 1000 } });

        let err = TimeConfig::from_params(&step).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParam { field, .. } if field == "time.timeField"));
    }

    #[test]
    fn test_time_config_rejects_bad_start() {
        let step = ts_step(doc! { "time": { "start": "yesterday", "timeField": "ts" } });

        assert!(matches!(
            TimeConfig::from_params(&step),
            Err(ConfigError::InvalidParam { .. })
        ));
    }

    #[test]
    fn test_time_config_rejects_out_of_range_epoch() {
        for key in ["start", "stop"] {
            let mut time = doc! { "timeField": "ts" };
            time.insert(key, i64::MAX);
            let step = ts_step(doc! { "time": time });

            let err = TimeConfig::from_params(&step).unwrap_err();
            let expected = format!("time.{key}");
            assert!(
                matches!(err, ConfigError::InvalidParam { ref field, .. } if *field == expected),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn test_time_config_epoch_millis() {
        let step = ts_step(doc! {
            "time": { "start": 0i64, "stop": 86_400_000i64, "timeField": "ts" }
        });

        let time = TimeConfig::from_params(&step).unwrap();
        assert_eq!(time.start, Some(DateTime::UNIX_EPOCH));
        assert_eq!(
            time.stop,
            Some(Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_meta_config_modes() {
        let step = ts_step(doc! { "meta": { "dictionary": "devices", "metaField": "device" } });
        let meta = MetaConfig::from_params(&step).unwrap();
        assert_eq!(meta.generate, GenerateMode::All);
        assert_eq!(meta.dictionary, "devices");
        assert_eq!(meta.meta_field, "device");

        let step = ts_step(doc! {
            "meta": { "dictionary": "devices", "metaField": "device", "generate": "batch" }
        });
        let meta = MetaConfig::from_params(&step).unwrap();
        assert_eq!(meta.generate, GenerateMode::Unsupported("batch".to_string()));
    }

    #[test]
    fn test_meta_config_requires_dictionary() {
        let step = ts_step(doc! { "meta": { "metaField": "device" } });

        assert!(matches!(
            MetaConfig::from_params(&step),
            Err(ConfigError::MissingParam { field, .. }) if field == "meta.dictionary"
        ));
    }

    #[test]
    fn test_workers() {
        assert_eq!(workers(&ts_step(doc! {})).unwrap(), 1);
        assert_eq!(workers(&ts_step(doc! { "workers": 8 })).unwrap(), 8);
        assert_eq!(workers(&ts_step(doc! { "workers": 0 })).unwrap(), 1);
        assert!(workers(&ts_step(doc! { "workers": "many" })).is_err());
    }

    #[test]
    fn test_update_spec_document() {
        let step = WorkloadStep::new(
            "touch",
            OperationKind::UpdateMany,
            "readings",
            doc! {
                "filter": { "device": "A" },
                "update": { "$set": { "seen": true } },
                "upsert": true,
            },
        );

        let spec = UpdateSpec::from_params(&step).unwrap();
        assert_eq!(spec.filter, doc! { "device": "A" });
        assert_eq!(
            spec.update,
            UpdateBody::Document(doc! { "$set": { "seen": true } })
        );
        assert!(spec.upsert);
    }

    #[test]
    fn test_update_spec_pipeline_keeps_order() {
        let step = WorkloadStep::new(
            "pipe",
            OperationKind::UpdateMany,
            "readings",
            doc! {
                "update": [
                    { "$set": { "a": 1 } },
                    { "$unset": "b" },
                ],
            },
        );

        let spec = UpdateSpec::from_params(&step).unwrap();
        assert_eq!(spec.filter, Document::new());
        assert!(!spec.upsert);
        assert_eq!(
            spec.update,
            UpdateBody::Pipeline(vec![doc! { "$set": { "a": 1 } }, doc! { "$unset": "b" }])
        );
    }

    #[test]
    fn test_update_spec_rejects_scalar_update() {
        let step = WorkloadStep::new(
            "bad",
            OperationKind::UpdateOne,
            "readings",
            doc! { "update": 3 },
        );

        assert!(matches!(
            UpdateSpec::from_params(&step),
            Err(ConfigError::InvalidParam { .. })
        ));

        let step = WorkloadStep::new("bad", OperationKind::UpdateOne, "readings", doc! {});
        assert!(matches!(
            UpdateSpec::from_params(&step),
            Err(ConfigError::MissingParam { .. })
        ));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-01T10:00:00+02:00").is_some());
        assert!(parse_timestamp("2024-01-01").is_some());
        assert!(parse_timestamp("01/01/2024").is_none());
    }
}
