use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

// ─── Column names ───────────────────────────────────────────────────────────

pub const GC_CONTENT: &str = "gc_content";
pub const RNA_TYPE: &str = "RNA_type";
pub const RNA_REGION: &str = "RNA_region";
pub const EXON_LENGTH: &str = "exon_length";
pub const DISTANCE_TO_JUNCTION: &str = "distance_to_junction";
pub const EVOLUTIONARY_CONSERVATION: &str = "evolutionary_conservation";
pub const DNA_5MER: &str = "DNA_5mer";

pub const PREDICTED_PROB: &str = "predicted_m6A_prob";
pub const PREDICTED_STATUS: &str = "predicted_m6A_status";

/// Prefix of the per-position columns produced by the sequence encoder.
pub const POSITION_PREFIX: &str = "nt_pos";

/// The seven columns every feature table has to carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    GC_CONTENT,
    RNA_TYPE,
    RNA_REGION,
    EXON_LENGTH,
    DISTANCE_TO_JUNCTION,
    EVOLUTIONARY_CONSERVATION,
    DNA_5MER,
];

/// Real-valued features handed to the classifier as `Float64`.
pub const NUMERIC_FEATURES: [&str; 4] = [
    GC_CONTENT,
    EXON_LENGTH,
    DISTANCE_TO_JUNCTION,
    EVOLUTIONARY_CONSERVATION,
];

/// Threshold used when the caller has no reason to pick another one.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Name of the encoded column for the 1-based nucleotide `position`.
pub fn position_column(position: usize) -> String {
    format!("{}{}", POSITION_PREFIX, position)
}

/// Parses `nt_posN` back into `N`.
pub fn position_index(column: &str) -> Option<usize> {
    column
        .strip_prefix(POSITION_PREFIX)
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// Wraps any foreign error (IO, JSON) into a polars compute error.
pub fn polars_err(e: Box<dyn std::error::Error>) -> PolarsError {
    PolarsError::ComputeError(format!("{}", e).into())
}

// ─── Closed domains ─────────────────────────────────────────────────────────

/// A categorical feature with a closed, ordered set of levels.
///
/// The position of a level inside `LEVELS` is the code the classifier was
/// trained with, so the order must never change.
pub trait CategoricalDomain: Copy + PartialEq + 'static {
    const LEVELS: &'static [Self];

    fn label(self) -> &'static str;

    fn level(self) -> u32 {
        Self::LEVELS
            .iter()
            .position(|l| *l == self)
            .map(|p| p as u32)
            .unwrap_or_default()
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::LEVELS.iter().copied().find(|l| l.label() == label)
    }

    fn labels() -> Vec<&'static str> {
        Self::LEVELS.iter().map(|l| l.label()).collect()
    }
}

macro_rules! categorical_domain {
    ($name:ident, $what:literal, [$($variant:ident => $label:literal),+ $(,)?]) => {
        impl CategoricalDomain for $name {
            const LEVELS: &'static [Self] = &[$($name::$variant),+];

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = PolarsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_label(s).ok_or_else(|| {
                    PolarsError::ComputeError(
                        format!("'{}' is not a valid {} (expected one of {:?})", s, $what, Self::labels()).into(),
                    )
                })
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RnaType {
    MRna,
    LincRna,
    LncRna,
    Pseudogene,
}

categorical_domain!(RnaType, "RNA type", [
    MRna => "mRNA",
    LincRna => "lincRNA",
    LncRna => "lncRNA",
    Pseudogene => "pseudogene",
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RnaRegion {
    Cds,
    Intron,
    ThreePrimeUtr,
    FivePrimeUtr,
}

categorical_domain!(RnaRegion, "RNA region", [
    Cds => "CDS",
    Intron => "intron",
    ThreePrimeUtr => "3'UTR",
    FivePrimeUtr => "5'UTR",
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nucleotide {
    A,
    T,
    C,
    G,
}

categorical_domain!(Nucleotide, "nucleotide", [
    A => "A",
    T => "T",
    C => "C",
    G => "G",
]);

/// Which closed domain a categorical column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    RnaType,
    RnaRegion,
    Nucleotide,
}

impl Domain {
    /// Domain of a categorical feature column, `None` for anything else.
    pub fn of_column(column: &str) -> Option<Domain> {
        match column {
            RNA_TYPE => Some(Domain::RnaType),
            RNA_REGION => Some(Domain::RnaRegion),
            c if position_index(c).is_some() => Some(Domain::Nucleotide),
            _ => None,
        }
    }

    /// Level code of `label`, `None` when it is outside the domain.
    pub fn code(self, label: &str) -> Option<u32> {
        match self {
            Domain::RnaType => RnaType::from_label(label).map(RnaType::level),
            Domain::RnaRegion => RnaRegion::from_label(label).map(RnaRegion::level),
            Domain::Nucleotide => Nucleotide::from_label(label).map(Nucleotide::level),
        }
    }

    pub fn labels(self) -> Vec<&'static str> {
        match self {
            Domain::RnaType => RnaType::labels(),
            Domain::RnaRegion => RnaRegion::labels(),
            Domain::Nucleotide => Nucleotide::labels(),
        }
    }

    pub fn n_levels(self) -> usize {
        self.labels().len()
    }
}

// ─── Prediction ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum M6aStatus {
    Positive,
    Negative,
}

impl M6aStatus {
    pub const POSITIVE: &'static str = "Positive";
    pub const NEGATIVE: &'static str = "Negative";

    /// Strictly greater than: a probability equal to the threshold is Negative.
    pub fn from_probability(prob: f64, threshold: f64) -> M6aStatus {
        if prob > threshold {
            M6aStatus::Positive
        } else {
            M6aStatus::Negative
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            M6aStatus::Positive => Self::POSITIVE,
            M6aStatus::Negative => Self::NEGATIVE,
        }
    }
}

impl fmt::Display for M6aStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for M6aStatus {
    type Err = PolarsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::POSITIVE => Ok(M6aStatus::Positive),
            Self::NEGATIVE => Ok(M6aStatus::Negative),
            other => Err(PolarsError::ComputeError(
                format!("unknown m6A status '{}'", other).into(),
            )),
        }
    }
}

// ─── Feature rows ───────────────────────────────────────────────────────────

/// One candidate site. Categorical fields stay raw strings so that values
/// outside the closed domains can still be represented and reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub gc_content: f64,
    #[serde(rename = "RNA_type")]
    pub rna_type: String,
    #[serde(rename = "RNA_region")]
    pub rna_region: String,
    pub exon_length: f64,
    pub distance_to_junction: f64,
    pub evolutionary_conservation: f64,
    #[serde(rename = "DNA_5mer")]
    pub dna_5mer: String,
}

/// Builds a feature table from records, preserving their order.
pub fn feature_frame(records: &[FeatureRecord]) -> PolarsResult<DataFrame> {
    let columns = vec![
        Column::new(GC_CONTENT.into(), records.iter().map(|r| r.gc_content).collect::<Vec<_>>()),
        Column::new(RNA_TYPE.into(), records.iter().map(|r| r.rna_type.as_str()).collect::<Vec<_>>()),
        Column::new(RNA_REGION.into(), records.iter().map(|r| r.rna_region.as_str()).collect::<Vec<_>>()),
        Column::new(EXON_LENGTH.into(), records.iter().map(|r| r.exon_length).collect::<Vec<_>>()),
        Column::new(
            DISTANCE_TO_JUNCTION.into(),
            records.iter().map(|r| r.distance_to_junction).collect::<Vec<_>>(),
        ),
        Column::new(
            EVOLUTIONARY_CONSERVATION.into(),
            records.iter().map(|r| r.evolutionary_conservation).collect::<Vec<_>>(),
        ),
        Column::new(DNA_5MER.into(), records.iter().map(|r| r.dna_5mer.as_str()).collect::<Vec<_>>()),
    ];
    DataFrame::new(columns)
}
