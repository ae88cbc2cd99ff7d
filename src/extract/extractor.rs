use serde_json::{Map, Value};
use tracing::debug;

use super::field::{find_colocated, first_object, project, FieldValue};
use super::record::AnnotationRecord;
use super::ExtractionConfig;
use crate::clinsig;

/// Response key holding per-transcript consequences
pub const TRANSCRIPT_CONSEQUENCES: &str = "transcript_consequences";
/// Response key holding known variants at the same locus
pub const COLOCATED_VARIANTS: &str = "colocated_variants";
/// Colocated-variant key scored for clinical significance
pub const CLIN_SIG_ALLELE: &str = "clin_sig_allele";

/// Output field for the variant class
pub const VARIANT_CLASS: &str = "variant_class";
/// Fallback source for [`VARIANT_CLASS`]
pub const MOST_SEVERE_CONSEQUENCE: &str = "most_severe_consequence";
/// Output field for the chromosome reported by the service
pub const SEQ_REGION_NAME: &str = "seq_region_name";

/// Default name of the derived clinical-significance field
pub const DEFAULT_CLINICAL_FIELD: &str = "CLIN_SIG_CLASS";

/// Projects raw annotation payloads onto flat records.
///
/// The payload is only read. Every configured key appears in the output,
/// null when the response lacks it.
#[derive(Debug, Clone)]
pub struct AnnotationExtractor {
    config: ExtractionConfig,
    clinical_field: String,
}

impl Default for AnnotationExtractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl AnnotationExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            clinical_field: DEFAULT_CLINICAL_FIELD.to_string(),
        }
    }

    /// Rename the derived clinical-significance field.
    pub fn with_clinical_field(mut self, name: impl Into<String>) -> Self {
        self.clinical_field = name.into();
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn clinical_field(&self) -> &str {
        &self.clinical_field
    }

    /// Every field name [`annotate`](Self::annotate) produces, in order.
    pub fn columns(&self) -> Vec<String> {
        let mut record = self.empty_record();
        record.set(self.clinical_field.clone(), Value::Null);
        record.columns().map(str::to_string).collect()
    }

    /// Project a payload onto the configured fields.
    ///
    /// Accepts the service's array response (element 0 is used) or a bare
    /// annotation object. Anything else yields an all-null record.
    pub fn extract(&self, payload: &Value) -> AnnotationRecord {
        let mut record = self.empty_record();

        let Some(root) = annotation_root(payload) else {
            debug!("Payload has no annotation object, all fields null");
            return record;
        };

        if let Some(consequence) = root.get(TRANSCRIPT_CONSEQUENCES).and_then(first_object) {
            for key in &self.config.transcript_keys {
                record.set(key.clone(), project(consequence, key).into_cell());
            }
        }

        if let Some(colocated) = root
            .get(COLOCATED_VARIANTS)
            .and_then(|value| find_colocated(value, self.config.colocated_keys.as_slice()))
        {
            for key in &self.config.colocated_keys {
                record.set(key.clone(), project(colocated, key).into_cell());
            }
        }

        let variant_class = [VARIANT_CLASS, MOST_SEVERE_CONSEQUENCE]
            .iter()
            .map(|key| FieldValue::decode(root.get(*key)))
            .find(|field| !field.is_missing())
            .unwrap_or(FieldValue::Missing);
        record.set(VARIANT_CLASS, variant_class.into_cell());
        record.set(
            SEQ_REGION_NAME,
            FieldValue::decode(root.get(SEQ_REGION_NAME)).into_cell(),
        );

        record
    }

    /// [`extract`](Self::extract) plus the clinical-significance call for `alt`.
    pub fn annotate(&self, payload: &Value, alt: &str) -> AnnotationRecord {
        let mut record = self.extract(payload);
        let call = clinical_significance(payload)
            .and_then(|raw| clinsig::score(raw, alt))
            .map(|call| Value::String(call.as_str().to_string()))
            .unwrap_or(Value::Null);
        record.set(self.clinical_field.clone(), call);
        record
    }

    /// Record with every configured field set to null.
    fn empty_record(&self) -> AnnotationRecord {
        let mut record = AnnotationRecord::new();
        for key in self
            .config
            .transcript_keys
            .iter()
            .chain(&self.config.colocated_keys)
        {
            record.set(key.clone(), Value::Null);
        }
        record.set(VARIANT_CLASS, Value::Null);
        record.set(SEQ_REGION_NAME, Value::Null);
        record
    }
}

/// The annotation object inside a payload.
fn annotation_root(payload: &Value) -> Option<&Map<String, Value>> {
    first_object(payload)
}

/// Raw `clin_sig_allele` of the first colocated variant that has one.
pub fn clinical_significance(payload: &Value) -> Option<&str> {
    annotation_root(payload)?
        .get(COLOCATED_VARIANTS)
        .and_then(|value| find_colocated(value, &[CLIN_SIG_ALLELE]))?
        .get(CLIN_SIG_ALLELE)?
        .as_str()
}
