//! Heuristic classification of VCF-style variants into region notation.
//!
//! Rules, in order:
//!
//! 1. one-base `ref` and `alt`: substitution, `chrom:pos-pos:1/alt`
//! 2. `ref` longer than `alt`: deletion, `start = pos + len(alt)`,
//!    `end = pos + len(ref) - len(alt)`, allele `-`
//! 3. `ref` shorter than `alt`: insertion, `start = pos + len(ref)`,
//!    `end = pos`, allele is the inserted suffix of `alt`
//! 4. equal lengths above one base: not supported, reported as
//!    [`VepError::UnparseableVariant`]
//!
//! Symbolic structural alleles (`<DUP>`, `<DEL>`) carry no sequence, so they
//! are rejected by the length rules and go through [`classify_structural`]
//! with an explicit END coordinate. [`classify_key`] picks the rule set from
//! the key.
//!
//! All functions here are pure.

use tracing::debug;

use super::RegionDescriptor;
use crate::error::VepError;
use crate::variant::{info_end, is_symbolic_allele, normalize_chrom, VariantKey};

/// Structural variant types the annotation service accepts in region notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralType {
    Duplication,
    Deletion,
}

impl StructuralType {
    /// Allele token used in the region string
    pub fn as_str(&self) -> &'static str {
        match self {
            StructuralType::Duplication => "DUP",
            StructuralType::Deletion => "DEL",
        }
    }

    /// Parse `<DUP>`, `DUP`, `<DEL:ME>` style alleles.
    pub fn from_allele(allele: &str) -> Option<Self> {
        let inner = allele.trim().trim_start_matches('<').trim_end_matches('>');
        let base = inner.split(':').next().unwrap_or(inner);
        match base.to_ascii_uppercase().as_str() {
            "DUP" => Some(StructuralType::Duplication),
            "DEL" => Some(StructuralType::Deletion),
            _ => None,
        }
    }
}

/// Reject alleles that cannot carry sequence.
fn check_allele(variant: &str, label: &str, allele: &str) -> Result<(), VepError> {
    if allele.is_empty() {
        return Err(VepError::unparseable(variant, format!("empty {} allele", label)));
    }
    if allele == "." || allele == "*" {
        return Err(VepError::unparseable(
            variant,
            format!("{} allele '{}' is not a sequence", label, allele),
        ));
    }
    if !allele.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(VepError::unparseable(
            variant,
            format!("{} allele '{}' contains non-nucleotide characters", label, allele),
        ));
    }
    Ok(())
}

/// Classify a sequence-resolved variant into a `region` descriptor.
///
/// `chrom` may carry a `chr` prefix; it is stripped in the output.
///
/// # Example
///
/// ```
/// use ferro_vep::region::classify;
///
/// assert_eq!(classify("1", 182712, "A", "C").unwrap().value, "1:182712-182712:1/C");
/// assert_eq!(classify("19", 110747, "G", "GTT").unwrap().value, "19:110748-110747:1/TT");
/// assert!(classify("1", 100, "AC", "GT").is_err());
/// ```
pub fn classify(
    chrom: &str,
    pos: u64,
    reference: &str,
    alternate: &str,
) -> Result<RegionDescriptor, VepError> {
    let variant = VariantKey::new(chrom, pos, reference, alternate).signature();

    if is_symbolic_allele(alternate) {
        return Err(VepError::unparseable(
            variant,
            "symbolic allele needs an END coordinate",
        ));
    }
    check_allele(&variant, "reference", reference)?;
    check_allele(&variant, "alternate", alternate)?;

    let chrom = normalize_chrom(chrom);
    let ref_len = reference.len() as u64;
    let alt_len = alternate.len() as u64;
    let shifted = |by: u64| {
        pos.checked_add(by)
            .ok_or_else(|| VepError::unparseable(&variant, "position out of range"))
    };

    if ref_len == 1 && alt_len == 1 {
        Ok(RegionDescriptor::region(&chrom, pos, pos, alternate))
    } else if ref_len > alt_len {
        let start = shifted(alt_len)?;
        let end = shifted(ref_len - alt_len)?;
        Ok(RegionDescriptor::region(&chrom, start, end, "-"))
    } else if ref_len < alt_len {
        let start = shifted(ref_len)?;
        let inserted = &alternate[reference.len()..];
        Ok(RegionDescriptor::region(&chrom, start, pos, inserted))
    } else {
        Err(VepError::unparseable(
            variant,
            "multi-base substitution is not supported",
        ))
    }
}

/// Classify a [`VariantKey`].
///
/// A symbolic ALT with an END goes through [`classify_structural`]; all
/// other keys use the sequence rules of [`classify`].
pub fn classify_key(key: &VariantKey) -> Result<RegionDescriptor, VepError> {
    match key.end {
        Some(end) if key.is_symbolic() => {
            classify_structural(&key.chrom, key.pos, end, &key.alternate)
        }
        _ => classify(&key.chrom, key.pos, &key.reference, &key.alternate),
    }
}

/// Classify a symbolic structural variant with an explicit END.
///
/// `pos` is the VCF padding base, so the affected region starts one base
/// later: `chrom:{pos + 1}-{end}:1/{TYPE}`.
pub fn classify_structural(
    chrom: &str,
    pos: u64,
    end: u64,
    alternate: &str,
) -> Result<RegionDescriptor, VepError> {
    let variant = format!("{} {} . N {} . . END={}", chrom, pos, alternate, end);
    let sv_type = StructuralType::from_allele(alternate).ok_or_else(|| {
        VepError::unparseable(&variant, format!("unsupported structural allele '{}'", alternate))
    })?;

    let start = pos
        .checked_add(1)
        .ok_or_else(|| VepError::unparseable(&variant, "position out of range"))?;
    if end < start {
        return Err(VepError::unparseable(
            variant,
            format!("END {} precedes start {}", end, start),
        ));
    }

    Ok(RegionDescriptor::region(
        &normalize_chrom(chrom),
        start,
        end,
        sv_type.as_str(),
    ))
}

/// Classify free-text input.
///
/// - an eight-column pseudo-VCF line is classified by the region rules
///   (symbolic alleles take END from the INFO column)
/// - input starting with `rs` is an identifier
/// - input containing `:` is an HGVS expression
/// - anything else is sent as an identifier on a best-effort basis
pub fn classify_query(input: &str) -> Result<RegionDescriptor, VepError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(VepError::unparseable(input, "empty query"));
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() == 8 {
        let key = VariantKey::from_signature(trimmed)?;
        if key.is_symbolic() && info_end(fields[7]).is_none() {
            return Err(VepError::unparseable(
                trimmed,
                "symbolic allele without END in INFO",
            ));
        }
        return classify_key(&key);
    }

    if trimmed.starts_with("rs") {
        return Ok(RegionDescriptor::id(trimmed));
    }
    if trimmed.contains(':') {
        return Ok(RegionDescriptor::hgvs(trimmed));
    }

    debug!("Query '{}' matched no rule, sending as identifier", trimmed);
    Ok(RegionDescriptor::id(trimmed))
}
