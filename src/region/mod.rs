//! Region notation for the remote annotation service.
//!
//! The annotation endpoint takes one of three query kinds in its URL path:
//!
//! | Kind     | Example value              |
//! |----------|----------------------------|
//! | `region` | `1:182712-182712:1/C`      |
//! | `id`     | `rs699`                    |
//! | `hgvs`   | `NM_000088.3:c.459A>G`     |
//!
//! Region values have the form `{chrom}:{start}-{end}:{strand}/{allele}`.
//! The strand is always `1`; insertions are written with `start = end + 1`.
//!
//! # Example
//!
//! ```
//! use ferro_vep::region::{classify, RegionKind};
//!
//! let region = classify("3", 319780, "GAA", "G").unwrap();
//! assert_eq!(region.kind, RegionKind::Region);
//! assert_eq!(region.value, "3:319781-319782:1/-");
//! ```

mod classify;

pub use classify::{
    classify, classify_key, classify_query, classify_structural, StructuralType,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strand written into every region string.
pub const FORWARD_STRAND: u8 = 1;

/// How the remote service should interpret a query value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Coordinate region with allele
    Region,
    /// Variant identifier (e.g., dbSNP rsID)
    Id,
    /// HGVS expression
    Hgvs,
}

impl RegionKind {
    /// URL path segment for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Region => "region",
            RegionKind::Id => "id",
            RegionKind::Hgvs => "hgvs",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified query: kind plus wire-format value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionDescriptor {
    pub kind: RegionKind,
    pub value: String,
}

impl RegionDescriptor {
    /// Build a `region` descriptor from its parts.
    pub fn region(chrom: &str, start: u64, end: u64, allele: &str) -> Self {
        Self {
            kind: RegionKind::Region,
            value: format!("{}:{}-{}:{}/{}", chrom, start, end, FORWARD_STRAND, allele),
        }
    }

    /// Build an `id` descriptor.
    pub fn id(value: impl Into<String>) -> Self {
        Self {
            kind: RegionKind::Id,
            value: value.into(),
        }
    }

    /// Build an `hgvs` descriptor.
    pub fn hgvs(value: impl Into<String>) -> Self {
        Self {
            kind: RegionKind::Hgvs,
            value: value.into(),
        }
    }

    /// The coordinate part of a region value, without the allele.
    ///
    /// `"3:319781-319782:1/-"` becomes `"3:319781-319782:1"`. This is what the
    /// coordinate-mapping endpoint accepts. Returns `None` for `id` and `hgvs`
    /// descriptors.
    pub fn location(&self) -> Option<&str> {
        if self.kind != RegionKind::Region {
            return None;
        }
        Some(
            self.value
                .split_once('/')
                .map(|(loc, _)| loc)
                .unwrap_or(&self.value),
        )
    }

    /// Start and end coordinates of a region value.
    pub fn span(&self) -> Option<(u64, u64)> {
        let location = self.location()?;
        let mut parts = location.split(':');
        let _chrom = parts.next()?;
        let (start, end) = parts.next()?.split_once('-')?;
        Some((start.parse().ok()?, end.parse().ok()?))
    }

    /// The allele part of a region value.
    pub fn allele(&self) -> Option<&str> {
        if self.kind != RegionKind::Region {
            return None;
        }
        self.value.split_once('/').map(|(_, allele)| allele)
    }
}

impl fmt::Display for RegionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.value)
    }
}
