
use anyhow::Context;
use itertools::Itertools;
use log::warn;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::Path;

use crate::data_types::archive_metadata::{ArchiveMetadata, PrimerPanel, ResourceKind};

/// One downloadable file in the manifest; the shape a bulk retrieval tool consumes
#[derive(Clone, Debug, Serialize)]
struct ManifestRow {
    /// Canonical sample key
    sample: String,
    /// Run accession the file belongs to
    run_accession: String,
    /// GenRe primer panel, or N/A for whole-genome runs
    panel: String,
    /// Download URI for one FASTQ mate
    fastq_uri: String
}

/// One row of the companion status table
#[derive(Clone, Debug, Serialize)]
struct StatusRow {
    sample: String,
    status: String,
    query_title: String,
    run_count: usize,
    detail: String
}

/// Writes the download manifest: one row per (sample, accession, FASTQ URI).
/// Only samples with a `found` status contribute rows; runs that cannot be assigned to a
/// resource are logged and skipped rather than guessed at.
/// # Arguments
/// * `filename` - output path
/// * `metadata` - the per-sample retrieval results
pub fn write_manifest(filename: &Path, metadata: &FxHashMap<String, ArchiveMetadata>) -> anyhow::Result<()> {
    let mut csv_writer = open_writer(filename)?;

    // iterate in key order so reruns produce identical bytes
    for key in metadata.keys().sorted() {
        let sample_metadata = &metadata[key];
        if !sample_metadata.is_found() {
            continue;
        }
        for run in &sample_metadata.runs {
            let panel = match run.classify() {
                Ok(ResourceKind::GenRe(panel)) => panel.to_string(),
                Ok(ResourceKind::Pf8Wgs) => "N/A".to_string(),
                Err(e) => {
                    warn!("Manifest skips run {}: {e}", run.run_accession);
                    continue;
                }
            };
            for fastq_uri in run.fastq_uris() {
                csv_writer.serialize(ManifestRow {
                    sample: key.clone(),
                    run_accession: run.run_accession.clone(),
                    panel: panel.clone(),
                    fastq_uri
                }).with_context(|| format!("Error while writing {filename:?}:"))?;
            }
        }
    }
    csv_writer.flush()
        .with_context(|| format!("Error while flushing {filename:?}:"))?;
    Ok(())
}

/// Writes the per-sample retrieval status table, one definite row per queried key
pub fn write_status_table(filename: &Path, metadata: &FxHashMap<String, ArchiveMetadata>) -> anyhow::Result<()> {
    let mut csv_writer = open_writer(filename)?;
    for key in metadata.keys().sorted() {
        let sample_metadata = &metadata[key];
        csv_writer.serialize(StatusRow {
            sample: key.clone(),
            status: sample_metadata.status.to_string(),
            query_title: sample_metadata.query_title.clone(),
            run_count: sample_metadata.runs.len(),
            detail: sample_metadata.detail.clone().unwrap_or_default()
        }).with_context(|| format!("Error while writing {filename:?}:"))?;
    }
    csv_writer.flush()
        .with_context(|| format!("Error while flushing {filename:?}:"))?;
    Ok(())
}

/// Copies the input table to a new file with the retrieval status and the per-resource
/// run accessions appended as columns. The input is never modified.
/// # Arguments
/// * `input_fn` - the table the sample keys came from
/// * `output_fn` - where the enriched copy goes
/// * `sample_column` - name of the sample-identifier column in the input
/// * `metadata` - the per-sample retrieval results
pub fn write_enriched_table(
    input_fn: &Path, output_fn: &Path, sample_column: &str, metadata: &FxHashMap<String, ArchiveMetadata>
) -> anyhow::Result<()> {
    let is_tsv: bool = input_fn.extension().unwrap_or_default() == "tsv";
    let delimiter: u8 = if is_tsv { b'\t' } else { b',' };
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(input_fn)
        .with_context(|| format!("Error while opening {input_fn:?}:"))?;
    let mut csv_writer = open_writer(output_fn)?;

    let headers = csv_reader.headers()
        .with_context(|| format!("Error while reading header of {input_fn:?}:"))?
        .clone();
    let sample_index = headers.iter()
        .position(|name| name.trim() == sample_column)
        .with_context(|| format!("{input_fn:?} is missing required column {sample_column:?}"))?;

    let mut out_header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    out_header.extend([
        "retrieval_status".to_string(),
        "ena_acc_pf8".to_string(),
        "ena_acc_genre_grc1".to_string(),
        "ena_acc_genre_grc2".to_string(),
        "ena_acc_genre_spec".to_string()
    ]);
    csv_writer.write_record(&out_header)
        .with_context(|| format!("Error while writing header to {output_fn:?}:"))?;

    for result in csv_reader.records() {
        let row = result.with_context(|| format!("Error while reading {input_fn:?}"))?;
        let key = row.get(sample_index).unwrap_or("").trim();

        let mut record: Vec<String> = row.iter().map(|f| f.to_string()).collect();
        match metadata.get(key) {
            Some(sample_metadata) => {
                record.push(sample_metadata.status.to_string());
                record.extend(accession_slots(sample_metadata));
            },
            None => {
                // duplicate or blank keys were collapsed before retrieval
                record.extend((0..5).map(|_| String::new()));
            }
        }
        csv_writer.write_record(&record)
            .with_context(|| format!("Error while writing {output_fn:?}:"))?;
    }
    csv_writer.flush()
        .with_context(|| format!("Error while flushing {output_fn:?}:"))?;
    Ok(())
}

/// The four per-resource accession cells, in output column order
fn accession_slots(metadata: &ArchiveMetadata) -> [String; 4] {
    let mut slots: [String; 4] = Default::default();
    if !metadata.is_found() {
        return slots;
    }
    for run in &metadata.runs {
        let slot = match run.classify() {
            Ok(ResourceKind::Pf8Wgs) => &mut slots[0],
            Ok(ResourceKind::GenRe(PrimerPanel::Grc1)) => &mut slots[1],
            Ok(ResourceKind::GenRe(PrimerPanel::Grc2)) => &mut slots[2],
            Ok(ResourceKind::GenRe(PrimerPanel::Spec)) => &mut slots[3],
            Err(_) => continue
        };
        // classification already rejected slot conflicts for found samples
        *slot = run.run_accession.clone();
    }
    slots
}

fn open_writer(filename: &Path) -> anyhow::Result<csv::Writer<std::fs::File>> {
    let is_tsv: bool = filename.extension().unwrap_or_default() == "tsv";
    let delimiter: u8 = if is_tsv { b'\t' } else { b',' };
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::archive_metadata::{RetrievalStatus, RunRecord};
    use std::io::Write;

    fn genre_run(title: &str, accession: &str, panel: &str) -> RunRecord {
        RunRecord {
            sample_title: title.to_string(),
            run_accession: accession.to_string(),
            sample_accession: "SAMEA1".to_string(),
            center_name: "GenRe-Mekong".to_string(),
            library_strategy: "AMPLICON".to_string(),
            fastq_ftp: format!("host/{accession}_1.fastq.gz;host/{accession}_2.fastq.gz"),
            submitted_ftp: format!("host/{title}_{panel}_1.cram")
        }
    }

    fn found(title: &str, runs: Vec<RunRecord>) -> ArchiveMetadata {
        ArchiveMetadata {
            status: RetrievalStatus::Found,
            query_title: title.to_string(),
            runs,
            detail: None
        }
    }

    #[test]
    fn test_manifest_found_only() {
        let mut metadata: FxHashMap<String, ArchiveMetadata> = Default::default();
        metadata.insert("RCN1".to_string(), found("RCN1", vec![genre_run("RCN1", "ERR1", "GRC1")]));
        metadata.insert("RCN2".to_string(), ArchiveMetadata {
            status: RetrievalStatus::Ambiguous,
            query_title: "RCN2".to_string(),
            runs: vec![genre_run("RCN2", "ERR2", "GRC1"), genre_run("RCN2", "ERR3", "GRC1")],
            detail: Some("2 runs compete for the GenRe-GRC1 slot".to_string())
        });
        metadata.insert("RCN3".to_string(), ArchiveMetadata {
            status: RetrievalStatus::NotFound,
            query_title: "RCN3".to_string(),
            runs: vec![],
            detail: None
        });

        let dir = tempfile::tempdir().unwrap();
        let manifest_fn = dir.path().join("manifest.csv");
        write_manifest(&manifest_fn, &metadata).unwrap();

        let contents = std::fs::read_to_string(&manifest_fn).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        // header plus two mates for the single found run; nothing for ambiguous/not-found
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "sample,run_accession,panel,fastq_uri");
        assert_eq!(lines[1], "RCN1,ERR1,GRC1,ftp://host/ERR1_1.fastq.gz");
        assert!(lines[2].ends_with("ERR1_2.fastq.gz"));

        // the status table still carries every sample
        let status_fn = dir.path().join("retrieval_status.csv");
        write_status_table(&status_fn, &metadata).unwrap();
        let status_contents = std::fs::read_to_string(&status_fn).unwrap();
        assert_eq!(status_contents.lines().count(), 4);
        assert!(status_contents.contains("RCN2,ambiguous"));
        assert!(status_contents.contains("RCN3,not-found"));
    }

    #[test]
    fn test_enriched_table_columns() {
        let dir = tempfile::tempdir().unwrap();
        let input_fn = dir.path().join("gold.csv");
        let mut input = std::fs::File::create(&input_fn).unwrap();
        writeln!(input, "sample,kelch13").unwrap();
        writeln!(input, "RCN1,C580Y").unwrap();
        writeln!(input, "RCN2,R539T").unwrap();
        drop(input);

        let mut metadata: FxHashMap<String, ArchiveMetadata> = Default::default();
        let mut wgs = genre_run("RCN1", "ERR9", "GRC1");
        wgs.center_name = "Wellcome Sanger Institute".to_string();
        wgs.library_strategy = "WGS".to_string();
        metadata.insert("RCN1".to_string(), found("RCN1", vec![wgs, genre_run("RCN1", "ERR1", "SPEC")]));
        metadata.insert("RCN2".to_string(), ArchiveMetadata {
            status: RetrievalStatus::RetrievalFailed,
            query_title: "RCN2".to_string(),
            runs: vec![],
            detail: Some("simulated outage".to_string())
        });

        let output_fn = dir.path().join("enriched.csv");
        write_enriched_table(&input_fn, &output_fn, "sample", &metadata).unwrap();

        let contents = std::fs::read_to_string(&output_fn).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "sample,kelch13,retrieval_status,ena_acc_pf8,ena_acc_genre_grc1,ena_acc_genre_grc2,ena_acc_genre_spec");
        assert_eq!(lines[1], "RCN1,C580Y,found,ERR9,,,ERR1");
        assert_eq!(lines[2], "RCN2,R539T,retrieval-failed,,,,");
    }
}
