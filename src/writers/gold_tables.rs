
use anyhow::Context;
use itertools::Itertools;
use std::path::Path;

use crate::pattern_reducer::PatternRepresentative;

/// One fully concordant sample ready for a gold table: its key, its agreed values
/// aligned to the table's call columns, and the loci that were actually compared.
#[derive(Clone, Debug)]
pub struct GoldRow {
    /// Canonical sample key
    pub key: String,
    /// Agreed call values, one slot per table column; None renders as an empty cell
    pub values: Vec<Option<String>>,
    /// The loci/drugs this sample was compared at, for the scope-metadata column
    pub compared: Vec<String>
}

/// Writes the phenotype-concordance table: one row per fully phenotype-concordant
/// sample, with a trailing column recording which drugs the comparison covered.
/// # Arguments
/// * `filename` - output path; delimiter switches on the .tsv extension
/// * `drug_columns` - the per-drug columns, in output order
/// * `rows` - the concordant samples
pub fn write_phenotype_table(filename: &Path, drug_columns: &[String], rows: &[GoldRow]) -> anyhow::Result<()> {
    let mut csv_writer = open_writer(filename)?;

    let mut header: Vec<&str> = vec!["sample"];
    header.extend(drug_columns.iter().map(|c| c.as_str()));
    header.push("compared_drugs");
    csv_writer.write_record(&header)
        .with_context(|| format!("Error while writing header to {filename:?}:"))?;

    for row in rows {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        record.push(row.key.clone());
        record.extend(row.values.iter().map(|v| v.clone().unwrap_or_default()));
        record.push(row.compared.iter().join(";"));
        csv_writer.write_record(&record)
            .with_context(|| format!("Error while writing {filename:?}:"))?;
    }
    csv_writer.flush()
        .with_context(|| format!("Error while flushing {filename:?}:"))?;
    Ok(())
}

/// Writes the genotype-concordance table: one row per fully genotype-concordant sample,
/// canonical key plus one column per locus.
pub fn write_genotype_table(filename: &Path, locus_columns: &[String], rows: &[GoldRow]) -> anyhow::Result<()> {
    let mut csv_writer = open_writer(filename)?;
    write_call_header(&mut csv_writer, locus_columns)
        .with_context(|| format!("Error while writing header to {filename:?}:"))?;

    for row in rows {
        let mut record: Vec<String> = Vec::with_capacity(locus_columns.len() + 1);
        record.push(row.key.clone());
        record.extend(row.values.iter().map(|v| v.clone().unwrap_or_default()));
        csv_writer.write_record(&record)
            .with_context(|| format!("Error while writing {filename:?}:"))?;
    }
    csv_writer.flush()
        .with_context(|| format!("Error while flushing {filename:?}:"))?;
    Ok(())
}

/// Writes the representative-pattern table: the genotype-table columns, restricted to
/// one representative sample per distinct haplotype pattern.
pub fn write_pattern_table(
    filename: &Path, locus_columns: &[String], representatives: &[PatternRepresentative]
) -> anyhow::Result<()> {
    let mut csv_writer = open_writer(filename)?;
    write_call_header(&mut csv_writer, locus_columns)
        .with_context(|| format!("Error while writing header to {filename:?}:"))?;

    for rep in representatives {
        let mut record: Vec<String> = Vec::with_capacity(locus_columns.len() + 1);
        record.push(rep.representative.clone());
        record.extend(rep.pattern.values().iter().map(|v| v.clone().unwrap_or_default()));
        csv_writer.write_record(&record)
            .with_context(|| format!("Error while writing {filename:?}:"))?;
    }
    csv_writer.flush()
        .with_context(|| format!("Error while flushing {filename:?}:"))?;
    Ok(())
}

/// Opens a writer with the delimiter matched to the extension
fn open_writer(filename: &Path) -> anyhow::Result<csv::Writer<std::fs::File>> {
    let is_tsv: bool = filename.extension().unwrap_or_default() == "tsv";
    let delimiter: u8 = if is_tsv { b'\t' } else { b',' };
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))
}

fn write_call_header(csv_writer: &mut csv::Writer<std::fs::File>, call_columns: &[String]) -> csv::Result<()> {
    let mut header: Vec<&str> = vec!["sample"];
    header.extend(call_columns.iter().map(|c| c.as_str()));
    csv_writer.write_record(&header)
}
