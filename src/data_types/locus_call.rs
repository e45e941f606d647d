
use log::warn;
use std::collections::BTreeSet;
use std::str::FromStr;
use strum_macros::EnumString;

/// Cell contents that mean "no usable call was made"; matched case-insensitively after trimming
const UNDETERMINED_MARKERS: [&str; 5] = ["-", "NA", "N/A", "UNDETERMINED", "MISSING"];

/// A single genotype or phenotype call from one source.
/// Multi-valued calls (mixed infections) are carried as a set; two determinate calls
/// agree only when their value sets are identical.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CallValue {
    /// One or more normalized (trimmed, upper-cased) values
    Determinate(BTreeSet<String>),
    /// The locus was tested but no usable value was reported
    Undetermined
}

impl CallValue {
    /// Parses a raw table cell into a call value.
    /// Values are trimmed and upper-cased; comma-separated cells become value sets.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || UNDETERMINED_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(trimmed)) {
            return Self::Undetermined;
        }

        let values: BTreeSet<String> = trimmed.split(',')
            .map(|v| v.trim().to_ascii_uppercase())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            // e.g. a cell of bare commas
            Self::Undetermined
        } else {
            Self::Determinate(values)
        }
    }

    pub fn is_determinate(&self) -> bool {
        matches!(self, Self::Determinate(_))
    }

    /// Compares two calls for exact agreement.
    /// Returns None when either side is undetermined, since those are excluded from
    /// comparison rather than counted as mismatches.
    pub fn matches(&self, other: &Self) -> Option<bool> {
        match (self, other) {
            (Self::Determinate(a), Self::Determinate(b)) => Some(a == b),
            _ => None
        }
    }

    /// The normalized display form, with multi-valued calls joined by "/"
    pub fn display_value(&self) -> String {
        match self {
            Self::Determinate(values) => {
                let joined: Vec<&str> = values.iter().map(|v| v.as_str()).collect();
                joined.join("/")
            },
            Self::Undetermined => String::new()
        }
    }
}

/// The phenotype vocabulary shared by both source projects
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display, EnumString)]
pub enum PhenotypeCall {
    #[strum(ascii_case_insensitive, serialize = "resistant")]
    Resistant,
    #[strum(ascii_case_insensitive, serialize = "sensitive")]
    Sensitive,
    #[strum(ascii_case_insensitive, serialize = "undetermined")]
    Undetermined
}

/// Parses a phenotype cell through the shared vocabulary.
/// Labels outside the vocabulary are treated as undetermined with a logged warning, so a
/// single bad cell neither excludes the sample nor ever counts as agreement.
/// # Arguments
/// * `raw` - the table cell
/// * `context` - a short label (sample/column) for the warning message
pub fn parse_phenotype(raw: &str, context: &str) -> CallValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() || UNDETERMINED_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(trimmed)) {
        return CallValue::Undetermined;
    }

    match PhenotypeCall::from_str(trimmed) {
        Ok(PhenotypeCall::Undetermined) => CallValue::Undetermined,
        Ok(call) => CallValue::parse(&call.to_string()),
        Err(_) => {
            warn!("Unrecognized phenotype value {trimmed:?} ({context}), treating as undetermined");
            CallValue::Undetermined
        }
    }
}
