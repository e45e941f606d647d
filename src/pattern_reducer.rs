
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;

use crate::data_types::haplotype_pattern::HaplotypePattern;

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
#[error("the locus set for pattern reduction must not be empty")]
pub struct EmptyLocusSetError;

/// One sample entering the reduction: its canonical key and its agreed genotype
/// values aligned to the locus set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatternInput {
    /// Canonical sample key
    pub key: String,
    /// Agreed values, one slot per locus in locus-set order
    pub values: Vec<Option<String>>
}

/// One distinct haplotype pattern with its chosen representative
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatternRepresentative {
    /// The shared tuple of genotype values
    pub pattern: HaplotypePattern,
    /// The canonical key of the representative sample
    pub representative: String,
    /// How many input samples carried this pattern
    pub sample_count: u64
}

/// Groups samples by their ordered genotype tuple and selects one representative per
/// distinct pattern. The representative is the sample with the lexicographically smallest
/// canonical key; output rows are sorted by representative key so reruns are byte-identical.
/// # Arguments
/// * `samples` - the fully genotype-concordant samples with their aligned value tuples
/// * `locus_set` - the ordered loci the tuples range over; every input tuple must have this length
/// # Errors
/// * if `locus_set` is empty
pub fn reduce_patterns(
    samples: &[PatternInput], locus_set: &[String]
) -> Result<Vec<PatternRepresentative>, EmptyLocusSetError> {
    if locus_set.is_empty() {
        return Err(EmptyLocusSetError);
    }

    let mut groups: IndexMap<HaplotypePattern, (String, u64)> = Default::default();
    for sample in samples {
        assert_eq!(sample.values.len(), locus_set.len(), "pattern tuple width must match the locus set");
        let pattern = HaplotypePattern::new(sample.values.clone());
        match groups.get_mut(&pattern) {
            Some((representative, count)) => {
                *count += 1;
                if sample.key < *representative {
                    *representative = sample.key.clone();
                }
            },
            None => {
                debug!("New haplotype pattern {pattern} from sample {}", sample.key);
                groups.insert(pattern, (sample.key.clone(), 1));
            }
        }
    }

    let representatives: Vec<PatternRepresentative> = groups.into_iter()
        .map(|(pattern, (representative, sample_count))| PatternRepresentative {
            pattern, representative, sample_count
        })
        .sorted_by(|r1, r2| r1.representative.cmp(&r2.representative))
        .collect();
    Ok(representatives)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(key: &str, values: &[Option<&str>]) -> PatternInput {
        PatternInput {
            key: key.to_string(),
            values: values.iter().map(|v| v.map(|s| s.to_string())).collect()
        }
    }

    fn loci() -> Vec<String> {
        vec!["kelch13".to_string(), "crt".to_string()]
    }

    #[test]
    fn test_empty_locus_set_rejected() {
        assert_eq!(reduce_patterns(&[], &[]), Err(EmptyLocusSetError));
    }

    #[test]
    fn test_one_representative_per_pattern() {
        let samples = vec![
            input("RCN2", &[Some("C580Y"), Some("K76T")]),
            input("RCN1", &[Some("C580Y"), Some("K76T")]),
            input("RCN3", &[Some("C580"), Some("K76T")]),
        ];
        let reduced = reduce_patterns(&samples, &loci()).unwrap();
        assert_eq!(reduced.len(), 2);

        // no duplicate pattern tuples in the output
        let patterns: Vec<&HaplotypePattern> = reduced.iter().map(|r| &r.pattern).collect();
        assert!(patterns.windows(2).all(|w| w[0] != w[1]));

        // every input pattern is represented exactly once
        for sample in &samples {
            let pattern = HaplotypePattern::new(sample.values.clone());
            assert_eq!(reduced.iter().filter(|r| r.pattern == pattern).count(), 1);
        }
    }

    #[test]
    fn test_representative_tie_break() {
        // the representative is the lexicographically smallest canonical key,
        // independent of input order
        let samples = vec![
            input("RCN9", &[Some("C580Y"), Some("K76T")]),
            input("RCN10", &[Some("C580Y"), Some("K76T")]),
            input("RCN5", &[Some("C580Y"), Some("K76T")]),
        ];
        let reduced = reduce_patterns(&samples, &loci()).unwrap();
        assert_eq!(reduced.len(), 1);
        // string ordering: "RCN10" < "RCN5" < "RCN9"
        assert_eq!(reduced[0].representative, "RCN10");
        assert_eq!(reduced[0].sample_count, 3);
    }

    #[test]
    fn test_missing_slots_are_distinct_patterns() {
        let samples = vec![
            input("RCN1", &[Some("C580Y"), None]),
            input("RCN2", &[Some("C580Y"), Some("K76T")]),
        ];
        let reduced = reduce_patterns(&samples, &loci()).unwrap();
        assert_eq!(reduced.len(), 2);
    }

    #[test]
    fn test_output_sorted_by_representative() {
        let samples = vec![
            input("RCN7", &[Some("R539T"), Some("K76")]),
            input("RCN2", &[Some("C580Y"), Some("K76T")]),
        ];
        let reduced = reduce_patterns(&samples, &loci()).unwrap();
        let reps: Vec<&str> = reduced.iter().map(|r| r.representative.as_str()).collect();
        assert_eq!(reps, vec!["RCN2", "RCN7"]);
    }
}
