//! Remote GRCh37 to GRCh38 coordinate mapping.

use serde::Deserialize;
use tracing::{debug, error};

use crate::error::VepError;
use crate::gateway::{RetryingGateway, Transport};
use crate::region::{classify, classify_key, RegionDescriptor};
use crate::variant::VariantKey;

/// Source assembly of input coordinates
pub const SOURCE_ASSEMBLY: &str = "GRCh37";
/// Target assembly of annotation requests
pub const TARGET_ASSEMBLY: &str = "GRCh38";

/// Response of the coordinate-mapping endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MapResponse {
    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

/// One mapped segment
#[derive(Debug, Clone, Deserialize)]
pub struct Mapping {
    pub mapped: MappedRegion,
    #[serde(default)]
    pub original: Option<MappedRegion>,
}

/// Coordinates on one assembly
#[derive(Debug, Clone, Deserialize)]
pub struct MappedRegion {
    pub start: u64,
    #[serde(default)]
    pub end: Option<u64>,
    #[serde(default)]
    pub seq_region_name: Option<String>,
    #[serde(default)]
    pub assembly: Option<String>,
    #[serde(default)]
    pub strand: Option<i8>,
}

/// A variant placed on the target assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftedVariant {
    /// VCF-style position on the target assembly
    pub pos: u64,
    /// END on the target assembly, for symbolic alleles
    pub end: Option<u64>,
    /// Region string on the target assembly
    pub region: RegionDescriptor,
}

/// Client for the coordinate-mapping endpoint.
///
/// The first mapping in a response is authoritative. The mapped start is
/// the start of the region string, so the variant is re-anchored by the
/// classifier's offset for its allele lengths and reclassified.
pub struct LiftoverClient<T: Transport> {
    gateway: RetryingGateway<T>,
    base_url: String,
    species: String,
}

impl<T: Transport> LiftoverClient<T> {
    pub fn new(gateway: RetryingGateway<T>, base_url: &str, species: &str) -> Self {
        Self {
            gateway,
            base_url: base_url.trim_end_matches('/').to_string(),
            species: species.to_string(),
        }
    }

    pub fn gateway(&self) -> &RetryingGateway<T> {
        &self.gateway
    }

    /// Mapping URL for a region location such as `17:41244936-41244936:1`.
    pub fn url(&self, location: &str) -> String {
        format!(
            "{}/map/{}/{}/{}/{}",
            self.base_url, self.species, SOURCE_ASSEMBLY, location, TARGET_ASSEMBLY
        )
    }

    /// Lift a GRCh37 region descriptor to GRCh38.
    ///
    /// Returns `None` when the request fails, the response has no mappings,
    /// or the lifted variant cannot be classified. Callers skip the variant.
    pub fn lift(
        &self,
        region: &RegionDescriptor,
        reference: &str,
        alternate: &str,
        chrom: &str,
    ) -> Option<RegionDescriptor> {
        // Only the alleles matter for re-anchoring a sequence variant
        let key = VariantKey::new(chrom, 0, reference, alternate);
        self.try_lift(region, &key).ok().map(|lifted| lifted.region)
    }

    /// Lift the GRCh37 region of `key`, keeping the failure reason.
    pub fn try_lift(
        &self,
        region: &RegionDescriptor,
        key: &VariantKey,
    ) -> Result<LiftedVariant, VepError> {
        let location = region.location().ok_or_else(|| {
            VepError::malformed(format!("Cannot lift non-region query {}", region))
        })?;

        let url = self.url(location);
        let body = self.gateway.try_get(&url)?;
        let response: MapResponse = serde_json::from_value(body).map_err(|e| {
            VepError::malformed(format!("Unexpected mapping response for {}: {}", location, e))
        })?;

        let Some(first) = response.mappings.first() else {
            error!("No GRCh38 mapping for {}", location);
            return Err(VepError::malformed(format!("No mappings for {}", location)));
        };
        let mapped = &first.mapped;

        // Not reclassified at the mapped start: that is the region start, so
        // the VCF position is recovered by subtracting the allele offset first.
        let offset = anchor_offset(key)?;
        let pos = mapped.start.checked_sub(offset).ok_or_else(|| {
            VepError::malformed(format!(
                "Mapped start {} precedes allele offset {} for {}",
                mapped.start, offset, location
            ))
        })?;
        let end = key.end.map(|end| {
            mapped.end.unwrap_or_else(|| {
                mapped
                    .start
                    .saturating_add(end.saturating_sub(key.pos.saturating_add(1)))
            })
        });

        let lifted = classify_key(&key.at_position(pos).with_end(end))?;
        debug!("Lifted {} to {}", region.value, lifted.value);
        Ok(LiftedVariant {
            pos,
            end,
            region: lifted,
        })
    }
}

/// Distance from the VCF position to the region start for `key`'s alleles.
fn anchor_offset(key: &VariantKey) -> Result<u64, VepError> {
    if key.end.is_some() {
        // Padding base
        return Ok(1);
    }
    Ok(classify(&key.chrom, 0, &key.reference, &key.alternate)?
        .span()
        .map(|(start, _)| start)
        .unwrap_or(0))
}
