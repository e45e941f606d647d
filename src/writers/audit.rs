
use anyhow::Context;
use itertools::Itertools;
use serde::Serialize;
use std::path::Path;

use crate::data_types::concordance_result::ConcordanceResult;
use crate::data_types::sample_record::Provenance;
use crate::parsing::source_table::ExcludedRow;

/// One row of the audit table, covering every sample seen anywhere in the inputs so
/// consumers can account for everything the gold tables left out
#[derive(Clone, Debug, Serialize)]
pub struct AuditRow {
    /// Canonical key, or the raw identifier for rows that never normalized
    sample: String,
    /// Which source(s) contributed, or "excluded:<source>" for dropped rows
    provenance: String,
    /// Phenotype-scope classification
    phenotype_status: String,
    /// Drugs compared under the phenotype scope, ";"-joined
    phenotype_compared: String,
    /// Drugs that disagreed, ";"-joined
    phenotype_mismatched: String,
    /// Genotype-scope classification
    genotype_status: String,
    /// Loci compared under the genotype scope, ";"-joined
    genotype_compared: String,
    /// Loci that disagreed, ";"-joined
    genotype_mismatched: String,
    /// Exclusion reason or other annotation
    note: String
}

impl AuditRow {
    /// Builds the row for a joined sample that went through both comparison passes
    pub fn from_comparison(
        key: &str, provenance: Provenance, phenotype: &ConcordanceResult, genotype: &ConcordanceResult
    ) -> Self {
        Self {
            sample: key.to_string(),
            provenance: provenance.to_string(),
            phenotype_status: phenotype.status.to_string(),
            phenotype_compared: phenotype.compared.iter().join(";"),
            phenotype_mismatched: phenotype.mismatched.iter().join(";"),
            genotype_status: genotype.status.to_string(),
            genotype_compared: genotype.compared.iter().join(";"),
            genotype_mismatched: genotype.mismatched.iter().join(";"),
            note: String::new()
        }
    }

    /// Builds the row for a source row that was excluded during parsing
    pub fn from_excluded(excluded: &ExcludedRow) -> Self {
        Self {
            sample: excluded.raw_id.clone(),
            provenance: format!("excluded:{}", excluded.source_label),
            phenotype_status: String::new(),
            phenotype_compared: String::new(),
            phenotype_mismatched: String::new(),
            genotype_status: String::new(),
            genotype_compared: String::new(),
            genotype_mismatched: String::new(),
            note: excluded.reason.clone()
        }
    }
}

/// Writes the audit table accompanying the gold outputs
/// # Arguments
/// * `filename` - output path; delimiter switches on the .tsv extension
/// * `rows` - one entry per sample or excluded source row
pub fn write_audit_table(filename: &Path, rows: &[AuditRow]) -> anyhow::Result<()> {
    let is_tsv: bool = filename.extension().unwrap_or_default() == "tsv";
    let delimiter: u8 = if is_tsv { b'\t' } else { b',' };
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;

    for row in rows {
        csv_writer.serialize(row)
            .with_context(|| format!("Error while writing {filename:?}:"))?;
    }
    csv_writer.flush()
        .with_context(|| format!("Error while flushing {filename:?}:"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::concordance_result::{ComparisonScope, ConcordanceStatus};

    #[test]
    fn test_audit_rows() {
        let phenotype = ConcordanceResult {
            scope: ComparisonScope::Phenotype,
            status: ConcordanceStatus::Concordant,
            compared: vec!["artemisinin".to_string()],
            mismatched: vec![]
        };
        let genotype = ConcordanceResult {
            scope: ComparisonScope::Genotype,
            status: ConcordanceStatus::Discordant,
            compared: vec!["kelch13".to_string(), "crt".to_string()],
            mismatched: vec!["crt".to_string()]
        };
        let rows = vec![
            AuditRow::from_comparison("RCN1", Provenance::Both, &phenotype, &genotype),
            AuditRow::from_excluded(&ExcludedRow {
                source_label: "GenRe".to_string(),
                raw_id: "123bad".to_string(),
                reason: "identifier \"123bad\" does not match the <letters><digits> layout".to_string()
            })
        ];

        let dir = tempfile::tempdir().unwrap();
        let out_fn = dir.path().join("sample_audit.csv");
        write_audit_table(&out_fn, &rows).unwrap();

        let contents = std::fs::read_to_string(&out_fn).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("sample,provenance,phenotype_status"));
        assert!(lines[1].contains("concordant"));
        assert!(lines[1].contains("kelch13;crt"));
        assert!(lines[2].contains("excluded:GenRe"));
    }
}
