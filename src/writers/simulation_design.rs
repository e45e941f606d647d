
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

use crate::data_types::archive_metadata::ALL_PANELS;
use crate::pattern_reducer::PatternRepresentative;

/// Read-count quantiles the simulation sweeps over, lowest first
pub const READ_QUANTILES: [&str; 3] = ["q25", "q50", "q75"];

/// One simulated sample the external read-simulation workflow should produce
#[derive(Clone, Debug, Serialize)]
struct SampleDesignRow {
    /// Name the workflow encodes into its output files: sample, panel, quantile
    simulated_sample: String,
    /// Identifier of the haplotype pattern being simulated
    pattern_id: String,
    /// The real representative sample the haplotype came from
    source_sample: String,
    /// Primer panel to simulate
    panel: String,
    /// Read-count quantile to simulate
    read_quantile: String
}

/// Writes the haplotype manifest the simulation workflow takes as input: one row per
/// distinct pattern with its identifier, representative, and per-locus genotype values.
/// # Arguments
/// * `filename` - output path
/// * `locus_columns` - the loci the pattern tuples range over, in order
/// * `representatives` - the reduced pattern set
pub fn write_haplotype_manifest(
    filename: &Path, locus_columns: &[String], representatives: &[PatternRepresentative]
) -> anyhow::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;

    let mut header: Vec<&str> = vec!["pattern_id", "sample", "sample_count"];
    header.extend(locus_columns.iter().map(|c| c.as_str()));
    csv_writer.write_record(&header)
        .with_context(|| format!("Error while writing header to {filename:?}:"))?;

    for (index, rep) in representatives.iter().enumerate() {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        record.push(pattern_id(index));
        record.push(rep.representative.clone());
        record.push(rep.sample_count.to_string());
        record.extend(rep.pattern.values().iter().map(|v| v.clone().unwrap_or_default()));
        csv_writer.write_record(&record)
            .with_context(|| format!("Error while writing {filename:?}:"))?;
    }
    csv_writer.flush()
        .with_context(|| format!("Error while flushing {filename:?}:"))?;
    Ok(())
}

/// Writes the sample-design table: one simulated sample per representative, panel, and
/// read-count quantile, named so the workflow's outputs are self-describing.
pub fn write_sample_design(filename: &Path, representatives: &[PatternRepresentative]) -> anyhow::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;

    for (index, rep) in representatives.iter().enumerate() {
        for panel in ALL_PANELS {
            for quantile in READ_QUANTILES {
                csv_writer.serialize(SampleDesignRow {
                    simulated_sample: format!("{}_{panel}_{quantile}", rep.representative),
                    pattern_id: pattern_id(index),
                    source_sample: rep.representative.clone(),
                    panel: panel.to_string(),
                    read_quantile: quantile.to_string()
                }).with_context(|| format!("Error while writing {filename:?}:"))?;
            }
        }
    }
    csv_writer.flush()
        .with_context(|| format!("Error while flushing {filename:?}:"))?;
    Ok(())
}

/// Stable pattern identifiers: HP001, HP002, ...
fn pattern_id(index: usize) -> String {
    format!("HP{:03}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::haplotype_pattern::HaplotypePattern;

    fn representative() -> PatternRepresentative {
        PatternRepresentative {
            pattern: HaplotypePattern::new(vec![Some("C580Y".to_string()), None]),
            representative: "RCN1".to_string(),
            sample_count: 4
        }
    }

    #[test]
    fn test_haplotype_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out_fn = dir.path().join("haplotype_manifest.csv");
        let loci = vec!["kelch13".to_string(), "crt".to_string()];
        write_haplotype_manifest(&out_fn, &loci, &[representative()]).unwrap();

        let contents = std::fs::read_to_string(&out_fn).unwrap();
        assert_eq!(contents, "pattern_id,sample,sample_count,kelch13,crt\nHP001,RCN1,4,C580Y,\n");
    }

    #[test]
    fn test_sample_design_covers_panels_and_quantiles() {
        let dir = tempfile::tempdir().unwrap();
        let out_fn = dir.path().join("sample_design.csv");
        write_sample_design(&out_fn, &[representative()]).unwrap();

        let contents = std::fs::read_to_string(&out_fn).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        // header plus 3 panels x 3 quantiles
        assert_eq!(lines.len(), 10);
        assert!(lines[1].starts_with("RCN1_GRC1_q25,HP001,RCN1,GRC1,q25"));
        assert!(contents.contains("RCN1_SPEC_q75"));
    }
}
