//! Flattening of annotation payloads into table columns.
//!
//! A payload from the annotation service is a nested structure whose fields
//! may be absent, null, a scalar, a list, or an object depending on the
//! variant. The extractor decodes each field defensively (see [`FieldValue`])
//! and produces an [`AnnotationRecord`] with one entry per configured key.
//!
//! Sources, in output order:
//!
//! - `transcript_consequences[0]`: [`ExtractionConfig::transcript_keys`]
//! - the first colocated variant supplying every
//!   [`ExtractionConfig::colocated_keys`] entry
//! - top-level `variant_class` (falling back to `most_severe_consequence`)
//!   and `seq_region_name`
//! - the derived clinical-significance call (see [`crate::clinsig`])
//!
//! A key ending in `_count` that is not itself in the response is the length
//! of the list under its base name, e.g. `domains_count` is `len(domains)`.

mod extractor;
mod field;
mod record;

pub use extractor::{
    clinical_significance, AnnotationExtractor, CLIN_SIG_ALLELE, COLOCATED_VARIANTS,
    DEFAULT_CLINICAL_FIELD, MOST_SEVERE_CONSEQUENCE, SEQ_REGION_NAME, TRANSCRIPT_CONSEQUENCES,
    VARIANT_CLASS,
};
pub use field::{find_colocated, first_object, project, scalar_text, FieldValue, COUNT_SUFFIX};
pub use record::{cell_text, AnnotationRecord};

use serde::{Deserialize, Serialize};

/// Which response keys become output fields
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Keys projected from the first transcript consequence
    pub transcript_keys: Vec<String>,
    /// Keys projected from the matching colocated variant
    pub colocated_keys: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let owned =
            |keys: &[&str]| -> Vec<String> { keys.iter().map(|k| k.to_string()).collect() };
        Self {
            transcript_keys: owned(&[
                "gene_symbol",
                "gene_id",
                "transcript_id",
                "biotype",
                "impact",
                "strand",
                "consequence_terms",
                "exon",
                "intron",
                "domains_count",
                "hgvsc",
                "hgvsp",
                "amino_acids",
                "codons",
            ]),
            colocated_keys: owned(&["id", "clin_sig_allele", "pubmed_count"]),
        }
    }
}
