//! Annotation request URLs.

use std::collections::BTreeMap;

use url::Url;

use crate::error::VepError;
use crate::lookup::TranscriptEntry;
use crate::region::{RegionDescriptor, RegionKind};

/// Query parameter restricting annotation to one transcript
pub const TRANSCRIPT_PARAM: &str = "transcript_id";

/// Builds `GET {base}/vep/{species}/{kind}/{value}?{flags}` URLs.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    species: String,
    flags: BTreeMap<String, String>,
}

impl RequestBuilder {
    pub fn new(base_url: &str, species: &str, flags: BTreeMap<String, String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            species: species.to_string(),
            flags,
        }
    }

    /// URL for a classified query, optionally pinned to a transcript.
    ///
    /// Region values are encoded as two path segments, location and allele,
    /// so the `/` between them survives. Identifier and HGVS values are one
    /// encoded segment.
    pub fn url(
        &self,
        region: &RegionDescriptor,
        transcript: Option<&TranscriptEntry>,
    ) -> Result<String, VepError> {
        let value = match (region.kind, region.location(), region.allele()) {
            (RegionKind::Region, Some(location), Some(allele)) => format!(
                "{}/{}",
                urlencoding::encode(location),
                urlencoding::encode(allele)
            ),
            _ => urlencoding::encode(&region.value).into_owned(),
        };

        let raw = format!(
            "{}/vep/{}/{}/{}",
            self.base_url,
            self.species,
            region.kind.as_str(),
            value
        );
        let mut url = Url::parse(&raw).map_err(|e| VepError::Config {
            msg: format!("Invalid annotation URL '{}': {}", raw, e),
        })?;

        if !self.flags.is_empty() || transcript.is_some() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.flags {
                query.append_pair(key, value);
            }
            if let Some(entry) = transcript {
                query.append_pair(TRANSCRIPT_PARAM, &entry.transcript_id);
            }
        }

        Ok(url.into())
    }
}
