//! Canonical variant identity.
//!
//! A [`VariantKey`] is the (chrom, pos, ref, alt) tuple read from a table
//! row. It is the unit of caching: its [`signature`](VariantKey::signature)
//! is the pseudo-VCF line `"{chrom} {pos} . {ref} {alt} . . ."`, which is
//! also the key format of existing cache files.
//!
//! Symbolic structural alleles (`<DUP>`, `<DEL>`) carry their END coordinate
//! in the key and write it to the INFO column of the signature, e.g.
//! `"7 100318422 . N <DUP> . . END=100321323"`.
//!
//! Keys are compared field by field with no allele normalization, so
//! `chr1` and `1` are different keys. Chromosome prefixes are only stripped
//! when building remote requests, see [`normalize_chrom`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VepError;

/// Number of whitespace-separated fields in a signature line.
const SIGNATURE_FIELDS: usize = 8;

/// A variant as identified in the input table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    /// Chromosome name as written in the table (e.g., "17", "chr17")
    pub chrom: String,

    /// 1-based position of the first reference base
    pub pos: u64,

    /// Reference allele
    pub reference: String,

    /// Alternate allele
    pub alternate: String,

    /// END coordinate of a symbolic structural allele
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

impl VariantKey {
    /// Create a new key
    pub fn new(
        chrom: impl Into<String>,
        pos: u64,
        reference: impl Into<String>,
        alternate: impl Into<String>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            reference: reference.into(),
            alternate: alternate.into(),
            end: None,
        }
    }

    /// Attach an END coordinate; ignored unless the ALT is symbolic.
    pub fn with_end(mut self, end: Option<u64>) -> Self {
        self.end = if self.is_symbolic() { end } else { None };
        self
    }

    /// True when the ALT is a symbolic structural allele.
    pub fn is_symbolic(&self) -> bool {
        is_symbolic_allele(&self.alternate)
    }

    /// The pseudo-VCF line used as cache key.
    pub fn signature(&self) -> String {
        match self.end {
            Some(end) => format!(
                "{} {} . {} {} . . END={}",
                self.chrom, self.pos, self.reference, self.alternate, end
            ),
            None => format!(
                "{} {} . {} {} . . .",
                self.chrom, self.pos, self.reference, self.alternate
            ),
        }
    }

    /// Parse a signature line back into a key.
    ///
    /// Accepts any whitespace between fields. The ID, QUAL and FILTER columns
    /// are ignored; INFO is only read for the END of a symbolic allele.
    pub fn from_signature(line: &str) -> Result<Self, VepError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != SIGNATURE_FIELDS {
            return Err(VepError::unparseable(
                line,
                format!(
                    "expected {} fields, found {}",
                    SIGNATURE_FIELDS,
                    fields.len()
                ),
            ));
        }

        let pos = fields[1]
            .parse::<u64>()
            .map_err(|_| VepError::unparseable(line, format!("invalid position '{}'", fields[1])))?;

        Ok(Self::new(fields[0], pos, fields[3], fields[4]).with_end(info_end(fields[7])))
    }

    /// Chromosome name suitable for remote requests.
    pub fn request_chrom(&self) -> String {
        normalize_chrom(&self.chrom)
    }

    /// Same alleles at a different position.
    ///
    /// Used after liftover, where only the coordinate changes.
    pub fn at_position(&self, pos: u64) -> Self {
        Self {
            chrom: self.chrom.clone(),
            pos,
            reference: self.reference.clone(),
            alternate: self.alternate.clone(),
            end: self.end,
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

impl FromStr for VariantKey {
    type Err = VepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_signature(s)
    }
}

/// True for `<...>` alleles and the bare `DUP`/`DEL` forms.
pub fn is_symbolic_allele(allele: &str) -> bool {
    (allele.len() > 2 && allele.starts_with('<') && allele.ends_with('>'))
        || allele.eq_ignore_ascii_case("DUP")
        || allele.eq_ignore_ascii_case("DEL")
}

/// Read `END=` from a VCF INFO column.
pub fn info_end(info: &str) -> Option<u64> {
    info.split(';')
        .find_map(|entry| entry.strip_prefix("END="))
        .and_then(|value| value.parse().ok())
}

/// Strip a UCSC-style `chr` prefix and map `M` to Ensembl's `MT`.
///
/// ```
/// use ferro_vep::variant::normalize_chrom;
///
/// assert_eq!(normalize_chrom("chr17"), "17");
/// assert_eq!(normalize_chrom("chrM"), "MT");
/// assert_eq!(normalize_chrom("X"), "X");
/// ```
pub fn normalize_chrom(chrom: &str) -> String {
    let trimmed = chrom.trim();
    let stripped = if trimmed.len() > 3 && trimmed[..3].eq_ignore_ascii_case("chr") {
        &trimmed[3..]
    } else {
        trimmed
    };

    if stripped.eq_ignore_ascii_case("M") {
        "MT".to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_signature_format() {
        let key = VariantKey::new("1", 182712, "A", "C");
        assert_eq!(key.signature(), "1 182712 . A C . . .");
        assert_eq!(key.to_string(), "1 182712 . A C . . .");
    }

    #[test]
    fn test_signature_keeps_chrom_verbatim() {
        let key = VariantKey::new("chr19", 110747, "G", "GT");
        assert_eq!(key.signature(), "chr19 110747 . G GT . . .");
    }

    #[test]
    fn test_from_signature() {
        let key = VariantKey::from_signature("3 319780 . GAA G . . .").unwrap();
        assert_eq!(key, VariantKey::new("3", 319780, "GAA", "G"));

        let parsed: VariantKey = "17\t41244936\t.\tG\tA\t.\t.\t.".parse().unwrap();
        assert_eq!(parsed, VariantKey::new("17", 41244936, "G", "A"));
    }

    #[test]
    fn test_from_signature_errors() {
        assert!(VariantKey::from_signature("1 100 A C").is_err());
        assert!(VariantKey::from_signature("1 abc . A C . . .").is_err());
        assert!(VariantKey::from_signature("").is_err());
    }

    #[test]
    fn test_equality_is_literal() {
        let a = VariantKey::new("1", 100, "A", "C");
        let b = VariantKey::new("chr1", 100, "A", "C");
        let c = VariantKey::new("1", 100, "a", "C");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, VariantKey::new("1", 100, "A", "C"));

        let set: HashSet<VariantKey> = [a.clone(), b, c, a].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_request_chrom() {
        assert_eq!(VariantKey::new("chr17", 1, "A", "C").request_chrom(), "17");
        assert_eq!(VariantKey::new("CHRX", 1, "A", "C").request_chrom(), "X");
        assert_eq!(VariantKey::new("17", 1, "A", "C").request_chrom(), "17");
        assert_eq!(VariantKey::new("chrM", 1, "A", "C").request_chrom(), "MT");
    }

    #[test]
    fn test_normalize_chrom_does_not_strip_bare_chr() {
        // "chr" alone is not a prefix followed by a name
        assert_eq!(normalize_chrom("chr"), "chr");
        assert_eq!(normalize_chrom(" 7 "), "7");
    }

    #[test]
    fn test_at_position() {
        let key = VariantKey::new("17", 41244936, "G", "A");
        let lifted = key.at_position(43092919);
        assert_eq!(lifted.pos, 43092919);
        assert_eq!(lifted.chrom, "17");
        assert_eq!(lifted.reference, "G");
        assert_eq!(lifted.alternate, "A");
    }

    #[test]
    fn test_structural_signature_carries_end() {
        let key = VariantKey::new("7", 100318422, "N", "<DUP>").with_end(Some(100321323));
        assert_eq!(key.signature(), "7 100318422 . N <DUP> . . END=100321323");
        assert_eq!(VariantKey::from_signature(&key.signature()).unwrap(), key);
    }

    #[test]
    fn test_end_ignored_for_sequence_alleles() {
        let key = VariantKey::new("1", 100, "A", "C").with_end(Some(200));
        assert_eq!(key.end, None);
        assert_eq!(key.signature(), "1 100 . A C . . .");

        let parsed = VariantKey::from_signature("1 100 . A C . . END=200").unwrap();
        assert_eq!(parsed, VariantKey::new("1", 100, "A", "C"));
    }

    #[test]
    fn test_symbolic_alleles() {
        assert!(is_symbolic_allele("<DUP>"));
        assert!(is_symbolic_allele("<DEL:ME:ALU>"));
        assert!(is_symbolic_allele("DEL"));
        assert!(!is_symbolic_allele("<>"));
        assert!(!is_symbolic_allele("GTT"));
    }

    #[test]
    fn test_info_end() {
        assert_eq!(info_end("SVTYPE=DUP;END=200"), Some(200));
        assert_eq!(info_end("."), None);
        assert_eq!(info_end("END=abc"), None);
    }
}
