
use std::ops::AddAssign;

/// Which call set a comparison ranges over
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum ComparisonScope {
    /// All drugs with a phenotype call in both sources
    #[strum(serialize = "phenotype")]
    Phenotype,
    /// All drug-resistance loci with a genotype call in both sources
    #[strum(serialize = "genotype")]
    Genotype
}

/// The outcome of comparing one sample across the two sources
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum ConcordanceStatus {
    /// At least one locus was compared and every comparison agreed
    #[strum(serialize = "concordant")]
    Concordant,
    /// At least one compared locus disagreed
    #[strum(serialize = "discordant")]
    Discordant,
    /// The sources share no determinate locus, so no comparison was possible
    #[strum(serialize = "non-comparable")]
    NonComparable
}

/// Per-sample comparison outcome for one scope, retaining the loci that were
/// actually compared so the result can be audited.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConcordanceResult {
    /// The scope this result was computed for
    pub scope: ComparisonScope,
    /// The classification of the sample under that scope
    pub status: ConcordanceStatus,
    /// Loci with a determinate value in both sources, in comparison order
    pub compared: Vec<String>,
    /// The subset of compared loci whose values disagreed
    pub mismatched: Vec<String>
}

impl ConcordanceResult {
    pub fn is_concordant(&self) -> bool {
        self.status == ConcordanceStatus::Concordant
    }
}

/// Running totals over a batch of comparison outcomes
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConcordanceSummary {
    /// Samples where every compared locus agreed
    pub concordant: u64,
    /// Samples with at least one disagreement
    pub discordant: u64,
    /// Samples with zero comparable loci
    pub non_comparable: u64
}

impl AddAssign for ConcordanceSummary {
    // Enables += with summaries
    fn add_assign(&mut self, rhs: Self) {
        self.concordant += rhs.concordant;
        self.discordant += rhs.discordant;
        self.non_comparable += rhs.non_comparable;
    }
}

impl ConcordanceSummary {
    /// Counts one result into the totals
    pub fn add_result(&mut self, result: &ConcordanceResult) {
        match result.status {
            ConcordanceStatus::Concordant => self.concordant += 1,
            ConcordanceStatus::Discordant => self.discordant += 1,
            ConcordanceStatus::NonComparable => self.non_comparable += 1
        }
    }

    /// Number of samples that entered a comparison at all
    pub fn comparable(&self) -> u64 {
        self.concordant + self.discordant
    }

    /// Fraction of comparable samples that were fully concordant, if any were comparable
    pub fn concordance_rate(&self) -> Option<f64> {
        let denom = self.comparable();
        if denom > 0 {
            Some(self.concordant as f64 / denom as f64)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_rates() {
        let summary = ConcordanceSummary { concordant: 9, discordant: 3, non_comparable: 5 };
        assert_eq!(summary.comparable(), 12);
        assert_approx_eq!(summary.concordance_rate().unwrap(), 9.0 / 12.0);

        // non-comparable samples never enter the denominator
        let empty = ConcordanceSummary { concordant: 0, discordant: 0, non_comparable: 7 };
        assert_eq!(empty.concordance_rate(), None);
    }

    #[test]
    fn test_add_assign() {
        let mut summary = ConcordanceSummary { concordant: 1, discordant: 2, non_comparable: 3 };
        summary += ConcordanceSummary { concordant: 10, discordant: 20, non_comparable: 30 };
        assert_eq!(summary, ConcordanceSummary { concordant: 11, discordant: 22, non_comparable: 33 });
    }
}
