//! Annotation pipeline.
//!
//! Each variant goes through cache lookup and, on a miss, classification,
//! liftover to GRCh38, gene and transcript lookup, the annotation request,
//! a cache write and extraction. [`run_batch`] drives a whole
//! [`VariantTable`](crate::table::VariantTable) with periodic snapshots of
//! the processed rows.
//!
//! # Example
//!
//! ```
//! use ferro_vep::cache::AnnotationCache;
//! use ferro_vep::config::VepConfig;
//! use ferro_vep::gateway::MockTransport;
//! use ferro_vep::pipeline::{AnnotationPipeline, VariantOutcome};
//! use ferro_vep::variant::VariantKey;
//! use serde_json::json;
//!
//! let key = VariantKey::new("1", 182712, "A", "C");
//! let mut cache = AnnotationCache::new();
//! cache.put(&key, json!([{"variant_class": "SNV"}])).unwrap();
//!
//! let mock = MockTransport::new();
//! let config = VepConfig::default();
//! let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config);
//!
//! let outcome = pipeline.annotate(&key).unwrap();
//! assert!(matches!(outcome, VariantOutcome::CacheHit(_)));
//! assert!(mock.calls().is_empty());
//! ```

mod annotate;
mod batch;
mod request;

pub use annotate::{AnnotationPipeline, Stage, VariantOutcome};
pub use batch::{run_batch, BatchOptions, BatchProgress, BatchSummary, RunOutcome};
pub use request::{RequestBuilder, TRANSCRIPT_PARAM};
