//! Per-variant annotation.

use std::fmt;

use tracing::{debug, error};

use super::request::RequestBuilder;
use crate::cache::AnnotationCache;
use crate::config::{LookupConfig, VepConfig};
use crate::error::VepError;
use crate::extract::{AnnotationExtractor, AnnotationRecord};
use crate::gateway::{GatewayStats, RetryPolicy, RetryingGateway, Transport};
use crate::liftover::LiftoverClient;
use crate::lookup::{GeneRegions, TranscriptEntry, TranscriptIds};
use crate::region::classify_key;
use crate::variant::VariantKey;

/// Step of the per-variant state machine.
///
/// ```text
/// KeyBuilt -> CacheChecked -> CacheHit -> Extracted
///                          -> Classified -> LiftedOver -> GeneLocated
///                             -> TranscriptResolved -> Requested -> Cached -> Extracted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    KeyBuilt,
    CacheChecked,
    Classified,
    LiftedOver,
    GeneLocated,
    TranscriptResolved,
    Requested,
    Cached,
    Extracted,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::KeyBuilt => "key",
            Stage::CacheChecked => "cache lookup",
            Stage::Classified => "classification",
            Stage::LiftedOver => "liftover",
            Stage::GeneLocated => "gene lookup",
            Stage::TranscriptResolved => "transcript lookup",
            Stage::Requested => "annotation request",
            Stage::Cached => "cache write",
            Stage::Extracted => "extraction",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one variant was annotated
#[derive(Debug, Clone, PartialEq)]
pub enum VariantOutcome {
    /// Extracted from a cached payload; no network access
    CacheHit(AnnotationRecord),
    /// Fetched, cached, then extracted
    Fetched(AnnotationRecord),
    /// No annotation for this variant
    Skipped(VepError),
}

impl VariantOutcome {
    pub fn record(&self) -> Option<&AnnotationRecord> {
        match self {
            VariantOutcome::CacheHit(record) | VariantOutcome::Fetched(record) => Some(record),
            VariantOutcome::Skipped(_) => None,
        }
    }

    pub fn into_record(self) -> Option<AnnotationRecord> {
        match self {
            VariantOutcome::CacheHit(record) | VariantOutcome::Fetched(record) => Some(record),
            VariantOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, VariantOutcome::Skipped(_))
    }
}

/// Orchestrates cache, liftover, lookups, request and extraction.
///
/// The cache is borrowed for the pipeline's lifetime; the caller owns it
/// before and after a run. Without gene-region or transcript tables the
/// corresponding steps are skipped and the request carries no transcript.
pub struct AnnotationPipeline<'a, T: Transport> {
    cache: &'a mut AnnotationCache,
    liftover: LiftoverClient<T>,
    gateway: RetryingGateway<T>,
    requests: RequestBuilder,
    genes: Option<GeneRegions>,
    transcripts: Option<TranscriptIds>,
    extractor: AnnotationExtractor,
}

impl<'a, T: Transport + Clone> AnnotationPipeline<'a, T> {
    /// Build a pipeline from configuration.
    ///
    /// Liftover and annotation requests share `transport` but keep separate
    /// retry statistics.
    pub fn new(cache: &'a mut AnnotationCache, transport: T, config: &VepConfig) -> Self {
        let policy = RetryPolicy::from(&config.retry);
        let endpoints = &config.endpoints;

        Self {
            cache,
            liftover: LiftoverClient::new(
                RetryingGateway::new(transport.clone(), policy.clone()),
                &endpoints.liftover_url,
                &endpoints.species,
            ),
            gateway: RetryingGateway::new(transport, policy),
            requests: RequestBuilder::new(
                &endpoints.vep_url,
                &endpoints.species,
                config.query.clone(),
            ),
            genes: None,
            transcripts: None,
            extractor: AnnotationExtractor::new(config.extraction.clone())
                .with_clinical_field(config.output.clinical_significance_column.clone()),
        }
    }
}

impl<'a, T: Transport> AnnotationPipeline<'a, T> {
    pub fn with_gene_regions(mut self, genes: GeneRegions) -> Self {
        self.genes = Some(genes);
        self
    }

    pub fn with_transcripts(mut self, transcripts: TranscriptIds) -> Self {
        self.transcripts = Some(transcripts);
        self
    }

    /// Load whichever lookup files are configured.
    pub fn with_lookups(mut self, lookup: &LookupConfig) -> Result<Self, VepError> {
        if let Some(path) = &lookup.gene_regions {
            self.genes = Some(GeneRegions::from_file(path)?);
        }
        if let Some(path) = &lookup.transcripts {
            self.transcripts = Some(TranscriptIds::from_file(path)?);
        }
        Ok(self)
    }

    pub fn cache(&self) -> &AnnotationCache {
        self.cache
    }

    pub fn extractor(&self) -> &AnnotationExtractor {
        &self.extractor
    }

    /// Retry statistics for the annotation and liftover gateways
    pub fn gateway_stats(&self) -> (GatewayStats, GatewayStats) {
        (self.gateway.stats(), self.liftover.gateway().stats())
    }

    /// Annotate one variant.
    ///
    /// Per-variant failures come back as [`VariantOutcome::Skipped`]. The
    /// only `Err` is a failure to write the cache file, which stops a batch.
    pub fn annotate(&mut self, key: &VariantKey) -> Result<VariantOutcome, VepError> {
        if let Some(payload) = self.cache.get(key) {
            debug!("Cache hit for {}", key);
            let record = self.extractor.annotate(payload, &key.alternate);
            return Ok(VariantOutcome::CacheHit(record));
        }

        let payload = match self.fetch(key) {
            Ok(payload) => payload,
            Err((stage, error)) => {
                if error.is_loud() {
                    error!("Skipping {} at {}: {}", key, stage, error.detailed_message());
                } else {
                    debug!("Skipping {} at {}: {}", key, stage, error);
                }
                return Ok(VariantOutcome::Skipped(error));
            }
        };

        let record = self.extractor.annotate(&payload, &key.alternate);
        self.cache.put(key, payload)?;
        Ok(VariantOutcome::Fetched(record))
    }

    /// The cache-miss path up to the annotation response.
    fn fetch(&self, key: &VariantKey) -> Result<serde_json::Value, (Stage, VepError)> {
        let grch37 = classify_key(key).map_err(|e| (Stage::Classified, e))?;

        let lifted = self
            .liftover
            .try_lift(&grch37, key)
            .map_err(|e| (Stage::LiftedOver, e))?;

        let transcript = self
            .resolve_transcript(key, lifted.pos)
            .map_err(|e| match e {
                VepError::GeneNotFound { .. } => (Stage::GeneLocated, e),
                _ => (Stage::TranscriptResolved, e),
            })?;

        let url = self
            .requests
            .url(&lifted.region, transcript)
            .map_err(|e| (Stage::Requested, e))?;
        self.gateway
            .try_get(&url)
            .map_err(|e| (Stage::Requested, e))
    }

    /// Gene and transcript for a lifted position, where tables are loaded.
    fn resolve_transcript(
        &self,
        key: &VariantKey,
        lifted_pos: u64,
    ) -> Result<Option<&TranscriptEntry>, VepError> {
        let Some(genes) = &self.genes else {
            return Ok(None);
        };

        let span = genes
            .locate(&key.chrom, lifted_pos)
            .ok_or_else(|| VepError::GeneNotFound {
                chrom: key.request_chrom(),
                pos: lifted_pos,
            })?;

        let Some(transcripts) = &self.transcripts else {
            return Ok(None);
        };
        transcripts
            .resolve(&span.gene)
            .map(Some)
            .ok_or_else(|| VepError::TranscriptNotFound {
                gene: span.gene.clone(),
            })
    }
}
