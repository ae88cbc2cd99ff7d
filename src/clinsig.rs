//! Clinical significance scoring.
//!
//! Colocated known variants carry a `clin_sig_allele` string such as
//! `"A:benign;A:likely_benign;C:pathogenic"`. Entries are filtered to the
//! query's alternate allele, each term is weighted (benign-leaning positive,
//! pathogenic-leaning negative), and the mean weight is bucketed:
//!
//! | Mean weight | Call  |
//! |-------------|-------|
//! | `>= 0.3`    | `NEG` |
//! | `<= -0.3`   | `POS` |
//! | otherwise   | `VUS` |
//!
//! `NEG` and `POS` follow the lab result convention: a benign variant is a
//! negative finding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mean weight at or above which the call is `NEG`
pub const NEGATIVE_THRESHOLD: f64 = 0.3;

/// Mean weight at or below which the call is `POS`
pub const POSITIVE_THRESHOLD: f64 = -0.3;

/// A clinical significance term as reported by the annotation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClinicalSignificance {
    Benign,
    LikelyBenign,
    /// Combined `benign/likely_benign`
    BenignLikelyBenign,
    UncertainSignificance,
    /// Conflicting interpretations from different submitters
    Conflicting,
    LikelyPathogenic,
    /// Combined `pathogenic/likely_pathogenic`
    PathogenicLikelyPathogenic,
    Pathogenic,
    DrugResponse,
    Association,
    RiskFactor,
    Protective,
    Affects,
    NotProvided,
    Other,
}

impl ClinicalSignificance {
    /// Service spelling of the term
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benign => "benign",
            Self::LikelyBenign => "likely_benign",
            Self::BenignLikelyBenign => "benign/likely_benign",
            Self::UncertainSignificance => "uncertain_significance",
            Self::Conflicting => "conflicting_interpretations_of_pathogenicity",
            Self::LikelyPathogenic => "likely_pathogenic",
            Self::PathogenicLikelyPathogenic => "pathogenic/likely_pathogenic",
            Self::Pathogenic => "pathogenic",
            Self::DrugResponse => "drug_response",
            Self::Association => "association",
            Self::RiskFactor => "risk_factor",
            Self::Protective => "protective",
            Self::Affects => "affects",
            Self::NotProvided => "not_provided",
            Self::Other => "other",
        }
    }

    /// Score contribution of this term.
    ///
    /// Terms that say nothing about pathogenicity (drug response, risk
    /// factor, not provided, ...) have no weight and are left out of the mean.
    pub fn weight(&self) -> Option<f64> {
        match self {
            Self::Benign => Some(1.0),
            Self::BenignLikelyBenign => Some(0.75),
            Self::LikelyBenign => Some(0.5),
            Self::UncertainSignificance | Self::Conflicting => Some(0.0),
            Self::LikelyPathogenic => Some(-0.5),
            Self::PathogenicLikelyPathogenic => Some(-0.75),
            Self::Pathogenic => Some(-1.0),
            _ => None,
        }
    }

    pub fn is_pathogenic(&self) -> bool {
        matches!(
            self,
            Self::Pathogenic | Self::LikelyPathogenic | Self::PathogenicLikelyPathogenic
        )
    }

    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            Self::Benign | Self::LikelyBenign | Self::BenignLikelyBenign
        )
    }
}

impl fmt::Display for ClinicalSignificance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClinicalSignificance {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(' ', "_");
        Ok(match normalized.as_str() {
            "benign" => Self::Benign,
            "likely_benign" => Self::LikelyBenign,
            "benign/likely_benign" => Self::BenignLikelyBenign,
            "uncertain_significance" | "vus" => Self::UncertainSignificance,
            "conflicting_interpretations_of_pathogenicity"
            | "conflicting_classifications_of_pathogenicity"
            | "conflicting_data_from_submitters"
            | "conflicting" => Self::Conflicting,
            "likely_pathogenic" => Self::LikelyPathogenic,
            "pathogenic/likely_pathogenic" => Self::PathogenicLikelyPathogenic,
            "pathogenic" => Self::Pathogenic,
            "drug_response" => Self::DrugResponse,
            "association" => Self::Association,
            "risk_factor" => Self::RiskFactor,
            "protective" => Self::Protective,
            "affects" => Self::Affects,
            "not_provided" => Self::NotProvided,
            _ => Self::Other,
        })
    }
}

/// Derived classification for a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClinicalCall {
    /// Benign-leaning
    Neg,
    /// Pathogenic-leaning
    Pos,
    /// Uncertain
    Vus,
}

impl ClinicalCall {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicalCall::Neg => "NEG",
            ClinicalCall::Pos => "POS",
            ClinicalCall::Vus => "VUS",
        }
    }

    /// Bucket a mean weight.
    pub fn from_mean(mean: f64) -> Self {
        if mean >= NEGATIVE_THRESHOLD {
            ClinicalCall::Neg
        } else if mean <= POSITIVE_THRESHOLD {
            ClinicalCall::Pos
        } else {
            ClinicalCall::Vus
        }
    }
}

impl fmt::Display for ClinicalCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terms in `raw` whose allele starts with the same character as `alt`.
///
/// Entries without an `allele:` prefix are ignored.
pub fn matching_terms(raw: &str, alt: &str) -> Vec<ClinicalSignificance> {
    let Some(alt_first) = alt.chars().next() else {
        return Vec::new();
    };

    raw.split(';')
        .filter_map(|entry| entry.split_once(':'))
        .filter(|(allele, _)| allele.trim().starts_with(alt_first))
        .filter_map(|(_, term)| term.parse().ok())
        .collect()
}

/// Mean weight of the terms matching `alt`, or `None` if no weighted term matches.
pub fn mean_weight(raw: &str, alt: &str) -> Option<f64> {
    let weights: Vec<f64> = matching_terms(raw, alt)
        .iter()
        .filter_map(ClinicalSignificance::weight)
        .collect();

    if weights.is_empty() {
        return None;
    }
    Some(weights.iter().sum::<f64>() / weights.len() as f64)
}

/// Classify a raw `clin_sig_allele` string for the given alternate allele.
///
/// ```
/// use ferro_vep::clinsig::{score, ClinicalCall};
///
/// assert_eq!(score("A:benign;C:pathogenic", "A"), Some(ClinicalCall::Neg));
/// assert_eq!(score("A:benign;C:pathogenic", "X"), None);
/// ```
pub fn score(raw: &str, alt: &str) -> Option<ClinicalCall> {
    mean_weight(raw, alt).map(ClinicalCall::from_mean)
}
