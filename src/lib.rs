// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-vep: variant annotation with a persistent response cache
//!
//! Part of the ferro bioinformatics toolkit.
//!
//! Variants from a GRCh37 table are classified into the region notation of
//! a remote annotation service, lifted to GRCh38, annotated, and flattened
//! into extra table columns. Every response is cached by variant so reruns
//! only go to the network for new variants.
//!
//! # Example
//!
//! ```
//! use ferro_vep::{classify, VariantKey, AnnotationExtractor};
//! use serde_json::json;
//!
//! // Region notation for a single-base deletion
//! let region = classify("3", 319780, "GA", "G").unwrap();
//! assert_eq!(region.value, "3:319781-319781:1/-");
//!
//! // Flatten a cached payload into output fields
//! let payload = json!([{
//!     "variant_class": "SNV",
//!     "transcript_consequences": [{"gene_symbol": "BRCA1", "impact": "MODERATE"}]
//! }]);
//! let record = AnnotationExtractor::default().annotate(&payload, "A");
//! assert_eq!(record.get("gene_symbol"), Some(&json!("BRCA1")));
//!
//! let key = VariantKey::new("17", 41244936, "G", "A");
//! assert_eq!(key.signature(), "17 41244936 . G A . . .");
//! ```

pub mod cache;
pub mod clinsig;
pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod liftover;
pub mod lookup;
pub mod pipeline;
pub mod region;
pub mod table;
pub mod variant;

// Re-export commonly used types
pub use cache::{AnnotationCache, CacheStats};
pub use clinsig::{ClinicalCall, ClinicalSignificance};
pub use config::VepConfig;
pub use error::{ErrorCode, VepError};
pub use extract::{AnnotationExtractor, AnnotationRecord, ExtractionConfig};
pub use gateway::{MockTransport, ReqwestTransport, RetryPolicy, RetryingGateway, Transport};
pub use liftover::LiftoverClient;
pub use lookup::{GeneRegions, TranscriptIds};
pub use pipeline::{run_batch, AnnotationPipeline, BatchOptions, BatchSummary, VariantOutcome};
pub use region::{classify, classify_query, RegionDescriptor, RegionKind};
pub use table::{VariantTable, WriteOptions};
pub use variant::VariantKey;

/// Result type alias for ferro-vep operations
pub type Result<T> = std::result::Result<T, VepError>;
