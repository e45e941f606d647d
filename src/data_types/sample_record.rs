
use indexmap::IndexMap;

use crate::data_types::locus_call::CallValue;

/// The calls one source project contributed for one sample
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SourceCalls {
    /// The identifier exactly as it appeared in the source table
    pub raw_id: String,
    /// Per-locus genotype calls, in source column order
    pub genotypes: IndexMap<String, CallValue>,
    /// Per-drug phenotype calls, in source column order
    pub phenotypes: IndexMap<String, CallValue>
}

/// Which source(s) contributed a record
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum Provenance {
    #[strum(serialize = "both")]
    Both,
    #[strum(serialize = "wgs-only")]
    WgsOnly,
    #[strum(serialize = "amplicon-only")]
    AmpliconOnly
}

/// One biological sample after the two sources have been joined on the canonical key
#[derive(Clone, Debug)]
pub struct SampleRecord {
    /// Canonical sample key, unique across the merged dataset
    key: String,
    /// Calls from the whole-genome source, if it covered this sample
    wgs: Option<SourceCalls>,
    /// Calls from the amplicon-panel source, if it covered this sample
    amplicon: Option<SourceCalls>
}

impl SampleRecord {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn wgs(&self) -> Option<&SourceCalls> {
        self.wgs.as_ref()
    }

    pub fn amplicon(&self) -> Option<&SourceCalls> {
        self.amplicon.as_ref()
    }

    pub fn provenance(&self) -> Provenance {
        match (&self.wgs, &self.amplicon) {
            (Some(_), Some(_)) => Provenance::Both,
            (Some(_), None) => Provenance::WgsOnly,
            // both-None cannot be constructed through join_sources
            _ => Provenance::AmpliconOnly
        }
    }

    /// Only samples covered by both sources can enter a concordance comparison
    pub fn is_comparable(&self) -> bool {
        self.provenance() == Provenance::Both
    }
}

/// Joins the two per-source record maps on the canonical key.
/// Output order is deterministic: whole-genome table order first, then any
/// amplicon-only samples in their table order.
/// # Arguments
/// * `wgs_records` - canonical key to calls for the whole-genome source
/// * `amplicon_records` - canonical key to calls for the amplicon source
pub fn join_sources(
    wgs_records: IndexMap<String, SourceCalls>, mut amplicon_records: IndexMap<String, SourceCalls>
) -> Vec<SampleRecord> {
    let mut joined: Vec<SampleRecord> = Vec::with_capacity(wgs_records.len() + amplicon_records.len());
    for (key, wgs_calls) in wgs_records {
        let amplicon_calls = amplicon_records.shift_remove(&key);
        joined.push(SampleRecord {
            key,
            wgs: Some(wgs_calls),
            amplicon: amplicon_calls
        });
    }

    // whatever is left was only seen by the amplicon source
    for (key, amplicon_calls) in amplicon_records {
        joined.push(SampleRecord {
            key,
            wgs: None,
            amplicon: Some(amplicon_calls)
        });
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calls_with_id(raw_id: &str) -> SourceCalls {
        SourceCalls {
            raw_id: raw_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_join_on_shared_key() {
        // the same sample under the two case conventions joins into one record
        let mut wgs = IndexMap::new();
        wgs.insert("ABC123".to_string(), calls_with_id("ABC123"));
        let mut amplicon = IndexMap::new();
        amplicon.insert("ABC123".to_string(), calls_with_id("abc123"));

        let joined = join_sources(wgs, amplicon);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].key(), "ABC123");
        assert_eq!(joined[0].provenance(), Provenance::Both);
        assert!(joined[0].is_comparable());
        assert_eq!(joined[0].wgs().unwrap().raw_id, "ABC123");
        assert_eq!(joined[0].amplicon().unwrap().raw_id, "abc123");
    }

    #[test]
    fn test_join_preserves_single_source_samples() {
        let mut wgs = IndexMap::new();
        wgs.insert("AAA1".to_string(), calls_with_id("AAA1"));
        wgs.insert("BBB2".to_string(), calls_with_id("BBB2"));
        let mut amplicon = IndexMap::new();
        amplicon.insert("BBB2".to_string(), calls_with_id("bbb2"));
        amplicon.insert("CCC3".to_string(), calls_with_id("ccc3"));

        let joined = join_sources(wgs, amplicon);
        let keys: Vec<&str> = joined.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["AAA1", "BBB2", "CCC3"]);
        assert_eq!(joined[0].provenance(), Provenance::WgsOnly);
        assert_eq!(joined[1].provenance(), Provenance::Both);
        assert_eq!(joined[2].provenance(), Provenance::AmpliconOnly);
        assert!(!joined[0].is_comparable());
        assert!(!joined[2].is_comparable());
    }
}
