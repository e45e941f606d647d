
use indexmap::IndexMap;
use log::debug;

use crate::data_types::concordance_result::{ComparisonScope, ConcordanceResult, ConcordanceStatus};
use crate::data_types::locus_call::CallValue;
use crate::data_types::sample_record::{SampleRecord, SourceCalls};

/// Compares two per-sample call maps over one scope.
/// The comparison is restricted to loci with a determinate value in both sets; a locus
/// tested by only one source, or undetermined in either, is excluded rather than counted
/// as a mismatch. A sample with zero comparable loci is non-comparable, never vacuously
/// concordant.
/// # Arguments
/// * `calls_a` - per-locus calls from the first source
/// * `calls_b` - per-locus calls from the second source
/// * `scope` - the scope to record on the result
pub fn compare_calls(
    calls_a: &IndexMap<String, CallValue>, calls_b: &IndexMap<String, CallValue>, scope: ComparisonScope
) -> ConcordanceResult {
    let mut compared: Vec<String> = vec![];
    let mut mismatched: Vec<String> = vec![];
    for (locus, value_a) in calls_a.iter() {
        let Some(value_b) = calls_b.get(locus) else {
            continue;
        };
        // None means one side is undetermined, which is an exclusion rather than a mismatch
        match value_a.matches(value_b) {
            Some(true) => compared.push(locus.clone()),
            Some(false) => {
                compared.push(locus.clone());
                mismatched.push(locus.clone());
            },
            None => {}
        }
    }

    let status = if compared.is_empty() {
        ConcordanceStatus::NonComparable
    } else if mismatched.is_empty() {
        ConcordanceStatus::Concordant
    } else {
        ConcordanceStatus::Discordant
    };

    ConcordanceResult {
        scope, status, compared, mismatched
    }
}

/// Runs one scope of the comparison for a joined sample.
/// Samples covered by a single source are non-comparable by definition.
pub fn compare_sample(record: &SampleRecord, scope: ComparisonScope) -> ConcordanceResult {
    let (Some(wgs), Some(amplicon)) = (record.wgs(), record.amplicon()) else {
        debug!("Sample {} is {} and cannot be compared", record.key(), record.provenance());
        return ConcordanceResult {
            scope,
            status: ConcordanceStatus::NonComparable,
            compared: vec![],
            mismatched: vec![]
        };
    };

    let result = compare_calls(scope_calls(wgs, scope), scope_calls(amplicon, scope), scope);
    debug!("Sample {} {scope}: {} ({} compared)", record.key(), result.status, result.compared.len());
    result
}

/// Pulls the agreed values for an ordered column set out of a comparable record.
/// A slot is Some only when both sources hold the identical determinate value; everything
/// else (untested, undetermined, disagreeing) is None. Feeding a fully concordant sample
/// through this yields its haplotype tuple for pattern grouping.
/// # Arguments
/// * `record` - a joined sample
/// * `scope` - which call maps to read
/// * `columns` - the ordered loci/drugs that define the output slots
pub fn agreed_values(record: &SampleRecord, scope: ComparisonScope, columns: &[String]) -> Vec<Option<String>> {
    columns.iter()
        .map(|column| {
            let value_a = record.wgs().and_then(|c| scope_calls(c, scope).get(column))?;
            let value_b = record.amplicon().and_then(|c| scope_calls(c, scope).get(column))?;
            if value_a.matches(value_b) == Some(true) {
                Some(value_a.display_value())
            } else {
                None
            }
        })
        .collect()
}

/// Selects the call map for a scope
fn scope_calls(calls: &SourceCalls, scope: ComparisonScope) -> &IndexMap<String, CallValue> {
    match scope {
        ComparisonScope::Phenotype => &calls.phenotypes,
        ComparisonScope::Genotype => &calls.genotypes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_map(pairs: &[(&str, &str)]) -> IndexMap<String, CallValue> {
        pairs.iter()
            .map(|(locus, value)| (locus.to_string(), CallValue::parse(value)))
            .collect()
    }

    #[test]
    fn test_one_sided_locus_ignored() {
        // drugY is untested in the first source, so only drugX is compared
        let a = call_map(&[("drugX", "resistant")]);
        let b = call_map(&[("drugX", "resistant"), ("drugY", "sensitive")]);
        let result = compare_calls(&a, &b, ComparisonScope::Phenotype);
        assert_eq!(result.status, ConcordanceStatus::Concordant);
        assert_eq!(result.compared, vec!["drugX".to_string()]);
        assert!(result.mismatched.is_empty());
        assert!(result.is_concordant());
    }

    #[test]
    fn test_discordant_genotype() {
        let a = call_map(&[("locus1", "K76T")]);
        let b = call_map(&[("locus1", "K76I")]);
        let result = compare_calls(&a, &b, ComparisonScope::Genotype);
        assert_eq!(result.status, ConcordanceStatus::Discordant);
        assert_eq!(result.compared, vec!["locus1".to_string()]);
        assert_eq!(result.mismatched, vec!["locus1".to_string()]);
    }

    #[test]
    fn test_zero_overlap_is_non_comparable() {
        // disjoint tested loci: not concordant, not discordant, just non-comparable
        let a = call_map(&[("crt", "K76T")]);
        let b = call_map(&[("dhfr", "N51I")]);
        let result = compare_calls(&a, &b, ComparisonScope::Genotype);
        assert_eq!(result.status, ConcordanceStatus::NonComparable);
        assert!(result.compared.is_empty());
    }

    #[test]
    fn test_undetermined_excluded_from_comparison() {
        let a = call_map(&[("crt", "K76T"), ("dhps", "NA")]);
        let b = call_map(&[("crt", "K76T"), ("dhps", "A437G")]);
        let result = compare_calls(&a, &b, ComparisonScope::Genotype);
        assert_eq!(result.status, ConcordanceStatus::Concordant);
        assert_eq!(result.compared, vec!["crt".to_string()]);
    }

    #[test]
    fn test_mixed_call_set_identity() {
        // mixed infections only agree when the value sets are identical
        let a = call_map(&[("crt", "K76T,K76")]);
        let equal = call_map(&[("crt", "K76, K76T")]);
        let subset = call_map(&[("crt", "K76T")]);
        assert_eq!(compare_calls(&a, &equal, ComparisonScope::Genotype).status, ConcordanceStatus::Concordant);
        assert_eq!(compare_calls(&a, &subset, ComparisonScope::Genotype).status, ConcordanceStatus::Discordant);
    }

    #[test]
    fn test_case_and_whitespace_normalized() {
        let a = call_map(&[("k13", " c580y ")]);
        let b = call_map(&[("k13", "C580Y")]);
        assert_eq!(compare_calls(&a, &b, ComparisonScope::Genotype).status, ConcordanceStatus::Concordant);
    }

    #[test]
    fn test_compared_loci_preserved_for_audit() {
        let a = call_map(&[("crt", "K76T"), ("dhfr", "N51I"), ("mdr1", "N86Y")]);
        let b = call_map(&[("crt", "K76T"), ("dhfr", "N51"), ("mdr1", "N86Y")]);
        let result = compare_calls(&a, &b, ComparisonScope::Genotype);
        assert_eq!(result.compared, vec!["crt".to_string(), "dhfr".to_string(), "mdr1".to_string()]);
        assert_eq!(result.mismatched, vec!["dhfr".to_string()]);
    }
}
