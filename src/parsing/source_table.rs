
use anyhow::Context;
use indexmap::IndexMap;
use log::warn;
use rustc_hash::FxHashMap;
use std::path::Path;

use crate::data_types::locus_call::{parse_phenotype, CallValue};
use crate::data_types::sample_key::{normalize_sample_key, CaseRule};
use crate::data_types::sample_record::SourceCalls;

#[derive(thiserror::Error, Debug)]
pub enum SchemaValidationError {
    #[error("{label} table is missing required column {column:?}")]
    MissingColumn { label: String, column: String }
}

/// Describes one source table: where the sample identifiers live, which case convention
/// they follow, and which columns carry calls. The upstream schemas are read-only
/// contracts, so everything here is validated against the header before any row is read.
#[derive(Clone, Debug)]
pub struct SourceTableConfig {
    /// Short label for logs and error messages, e.g. "Pf8"
    pub label: String,
    /// Name of the sample-identifier column
    pub sample_column: String,
    /// The case convention of the identifier's marker prefix in this source
    pub case_rule: CaseRule,
    /// Per-locus genotype columns, in the order comparisons and outputs use them
    pub genotype_columns: Vec<String>,
    /// Per-drug phenotype columns, in the order comparisons and outputs use them
    pub phenotype_columns: Vec<String>
}

/// A row that could not enter the dataset, with the reason recorded for the audit table
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExcludedRow {
    /// The source the row came from
    pub source_label: String,
    /// The identifier as it appeared in the table
    pub raw_id: String,
    /// Why the row was dropped
    pub reason: String
}

/// One loaded source table, keyed by canonical sample key in file order
#[derive(Clone, Debug)]
pub struct SourceTable {
    pub label: String,
    pub records: IndexMap<String, SourceCalls>,
    pub excluded: Vec<ExcludedRow>
}

/// Loads a source CSV/TSV into per-sample call maps.
/// Schema problems (a configured column missing from the header) abort the load; row-level
/// identifier problems exclude the row with a recorded reason and the load continues.
/// Duplicate canonical keys keep the first row and exclude the rest.
/// # Arguments
/// * `filename` - the table to open; delimiter switches on the .tsv extension
/// * `config` - the externally defined schema for this source
pub fn load_source_table(filename: &Path, config: &SourceTableConfig) -> anyhow::Result<SourceTable> {
    let is_tsv: bool = filename.extension().unwrap_or_default() == "tsv";
    let delimiter: u8 = if is_tsv { b'\t' } else { b',' };
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;

    let headers = csv_reader.headers()
        .with_context(|| format!("Error while reading header of {filename:?}:"))?;
    let column_lookup: FxHashMap<String, usize> = headers.iter()
        .enumerate()
        .map(|(index, name)| (name.trim().to_string(), index))
        .collect();

    // validate the full schema up front so nothing partial is ever emitted
    let sample_index = require_column(&column_lookup, &config.label, &config.sample_column)?;
    let genotype_indices = require_columns(&column_lookup, &config.label, &config.genotype_columns)?;
    let phenotype_indices = require_columns(&column_lookup, &config.label, &config.phenotype_columns)?;

    let mut records: IndexMap<String, SourceCalls> = Default::default();
    let mut excluded: Vec<ExcludedRow> = vec![];
    for result in csv_reader.records() {
        let row = result.with_context(|| format!("Error while reading {filename:?}"))?;
        let raw_id = row.get(sample_index).unwrap_or("").to_string();

        let key = match normalize_sample_key(&raw_id, config.case_rule) {
            Ok(key) => key,
            Err(e) => {
                warn!("Excluding {} row {raw_id:?}: {e}", config.label);
                excluded.push(ExcludedRow {
                    source_label: config.label.clone(),
                    raw_id,
                    reason: e.to_string()
                });
                continue;
            }
        };
        if records.contains_key(&key) {
            warn!("Excluding {} row {raw_id:?}: duplicate of canonical key {key}", config.label);
            excluded.push(ExcludedRow {
                source_label: config.label.clone(),
                raw_id,
                reason: format!("duplicate of canonical key {key}")
            });
            continue;
        }

        let genotypes: IndexMap<String, CallValue> = config.genotype_columns.iter()
            .zip(genotype_indices.iter())
            .map(|(column, &index)| (column.clone(), CallValue::parse(row.get(index).unwrap_or(""))))
            .collect();
        let phenotypes: IndexMap<String, CallValue> = config.phenotype_columns.iter()
            .zip(phenotype_indices.iter())
            .map(|(column, &index)| {
                let context = format!("{} sample {key}, column {column}", config.label);
                (column.clone(), parse_phenotype(row.get(index).unwrap_or(""), &context))
            })
            .collect();

        records.insert(key, SourceCalls {
            raw_id, genotypes, phenotypes
        });
    }

    Ok(SourceTable {
        label: config.label.clone(),
        records,
        excluded
    })
}

/// Reads just the sample-key column from a table, preserving order and dropping
/// duplicates. This is the input shape the archive retrieval accepts.
/// # Arguments
/// * `filename` - any table carrying the sample column, e.g. a gold output table
/// * `sample_column` - the name of the sample-identifier column
pub fn parse_sample_keys(filename: &Path, sample_column: &str) -> anyhow::Result<Vec<String>> {
    let is_tsv: bool = filename.extension().unwrap_or_default() == "tsv";
    let delimiter: u8 = if is_tsv { b'\t' } else { b',' };
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;

    let headers = csv_reader.headers()
        .with_context(|| format!("Error while reading header of {filename:?}:"))?;
    let sample_index = headers.iter()
        .position(|name| name.trim() == sample_column)
        .ok_or_else(|| SchemaValidationError::MissingColumn {
            label: format!("{filename:?}"),
            column: sample_column.to_string()
        })?;

    let mut keys: Vec<String> = vec![];
    for result in csv_reader.records() {
        let row = result.with_context(|| format!("Error while reading {filename:?}"))?;
        let key = row.get(sample_index).unwrap_or("").trim().to_string();
        if key.is_empty() {
            continue;
        }
        if keys.contains(&key) {
            warn!("Ignoring duplicate sample key {key} in {filename:?}");
            continue;
        }
        keys.push(key);
    }
    Ok(keys)
}

fn require_column(
    column_lookup: &FxHashMap<String, usize>, label: &str, column: &str
) -> Result<usize, SchemaValidationError> {
    column_lookup.get(column)
        .copied()
        .ok_or_else(|| SchemaValidationError::MissingColumn {
            label: label.to_string(),
            column: column.to_string()
        })
}

fn require_columns(
    column_lookup: &FxHashMap<String, usize>, label: &str, columns: &[String]
) -> Result<Vec<usize>, SchemaValidationError> {
    columns.iter()
        .map(|column| require_column(column_lookup, label, column))
        .collect()
}
