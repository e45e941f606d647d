
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_required_filename, AFTER_HELP, FULL_VERSION};
use crate::data_types::sample_key::CaseRule;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct BuildSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    goldpanner_version: String,

    /// Whole-genome source call table (CSV/TSV)
    #[clap(required = true)]
    #[clap(short = 'w')]
    #[clap(long = "wgs-csv")]
    #[clap(value_name = "CSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub wgs_filename: PathBuf,

    /// Amplicon-panel source call table (CSV/TSV)
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "amplicon-csv")]
    #[clap(value_name = "CSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub amplicon_filename: PathBuf,

    /// Output directory containing the gold tables and audit file
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// Optional output debug folder
    #[clap(long = "output-debug")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub debug_folder: Option<PathBuf>,

    /// Label for the whole-genome source in logs and the audit table
    #[clap(long = "wgs-label")]
    #[clap(value_name = "LABEL")]
    #[clap(help_heading = Some("Source schemas"))]
    #[clap(default_value = "Pf8")]
    pub wgs_label: String,

    /// Label for the amplicon source in logs and the audit table
    #[clap(long = "amplicon-label")]
    #[clap(value_name = "LABEL")]
    #[clap(help_heading = Some("Source schemas"))]
    #[clap(default_value = "GenRe-Mekong")]
    pub amplicon_label: String,

    /// Name of the sample-identifier column, shared by both tables
    #[clap(long = "sample-column")]
    #[clap(value_name = "COLUMN")]
    #[clap(help_heading = Some("Source schemas"))]
    #[clap(default_value = "sample")]
    pub sample_column: String,

    /// Case convention of the identifier prefix in the whole-genome source
    #[clap(long = "wgs-id-case")]
    #[clap(value_name = "CASE")]
    #[clap(help_heading = Some("Source schemas"))]
    #[clap(default_value = "upper")]
    pub wgs_id_case: CaseRule,

    /// Case convention of the identifier prefix in the amplicon source
    #[clap(long = "amplicon-id-case")]
    #[clap(value_name = "CASE")]
    #[clap(help_heading = Some("Source schemas"))]
    #[clap(default_value = "lower")]
    pub amplicon_id_case: CaseRule,

    /// Comma-separated genotype locus columns shared by both tables
    #[clap(long = "genotype-loci")]
    #[clap(value_name = "LOCI")]
    #[clap(help_heading = Some("Comparison scopes"))]
    #[clap(value_delimiter = ',')]
    #[clap(default_value = "kelch13,crt,mdr1,dhfr,dhps")]
    pub genotype_loci: Vec<String>,

    /// Comma-separated phenotype drug columns shared by both tables
    #[clap(long = "phenotype-drugs")]
    #[clap(value_name = "DRUGS")]
    #[clap(help_heading = Some("Comparison scopes"))]
    #[clap(value_delimiter = ',')]
    #[clap(default_value = "artemisinin,chloroquine,piperaquine,pyrimethamine,sulfadoxine")]
    pub phenotype_drugs: Vec<String>,

    /// Number of threads to use in the comparison step
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn check_build_settings(mut settings: BuildSettings) -> anyhow::Result<BuildSettings> {
    // hard code the version in
    settings.goldpanner_version = FULL_VERSION.clone();
    info!("Goldpanner version: {:?}", &settings.goldpanner_version);
    info!("Sub-command: build");
    info!("Inputs:");

    // check for all the required input files
    check_required_filename(&settings.wgs_filename, "Whole-genome table")?;
    check_required_filename(&settings.amplicon_filename, "Amplicon table")?;

    // dump stuff to the logger
    info!("\t{} table: {:?}", settings.wgs_label, &settings.wgs_filename);
    info!("\t{} table: {:?}", settings.amplicon_label, &settings.amplicon_filename);
    info!("\tSample column: {:?}", &settings.sample_column);
    info!("\tIdentifier case rules: {}={}, {}={}",
        settings.wgs_label, settings.wgs_id_case,
        settings.amplicon_label, settings.amplicon_id_case);

    if settings.genotype_loci.is_empty() {
        bail!("--genotype-loci must name at least one locus");
    }
    if settings.phenotype_drugs.is_empty() {
        bail!("--phenotype-drugs must name at least one drug");
    }
    info!("Comparison scopes:");
    info!("\tGenotype loci: {:?}", &settings.genotype_loci);
    info!("\tPhenotype drugs: {:?}", &settings.phenotype_drugs);

    // outputs
    info!("Outputs:");
    info!("\tOutput folder: {:?}", &settings.output_folder);
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}
