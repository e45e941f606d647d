
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::archive_client::ENA_SEARCH_BASE_URL;
use crate::cli::core::{check_required_filename, AFTER_HELP, FULL_VERSION};

#[derive(Args, Clone, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct RetrieveSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    goldpanner_version: String,

    /// Input table carrying the sample keys to look up (CSV/TSV)
    #[clap(required = true)]
    #[clap(short = 'd')]
    #[clap(long = "data-csv")]
    #[clap(value_name = "CSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub data_filename: PathBuf,

    /// Output directory containing the enriched table, status table, and manifest
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// Name of the sample-identifier column in the input table
    #[clap(long = "sample-column")]
    #[clap(value_name = "COLUMN")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "sample")]
    pub sample_column: String,

    /// Only query the first N samples; run this first to validate the output shape
    /// before committing to a full retrieval
    #[clap(long = "take")]
    #[clap(value_name = "N")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "0")]
    pub take_samples: usize,

    /// Search endpoint of the archive
    #[clap(long = "base-url")]
    #[clap(value_name = "URL")]
    #[clap(help_heading = Some("Archive parameters"))]
    #[clap(default_value = ENA_SEARCH_BASE_URL)]
    pub base_url: String,

    /// Number of sample keys folded into one search request
    #[clap(long = "chunk-size")]
    #[clap(value_name = "N")]
    #[clap(help_heading = Some("Archive parameters"))]
    #[clap(default_value = "50")]
    pub chunk_size: usize,

    /// Attempts per request before its samples are marked retrieval-failed
    #[clap(long = "download-attempts")]
    #[clap(value_name = "N")]
    #[clap(help_heading = Some("Archive parameters"))]
    #[clap(default_value = "3")]
    pub download_attempts: u32,

    /// Base delay between retry attempts, in milliseconds
    #[clap(long = "retry-delay-ms")]
    #[clap(value_name = "MS")]
    #[clap(help_heading = Some("Archive parameters"))]
    #[clap(default_value = "1000")]
    pub retry_delay_ms: u64,

    /// Minimum interval between request starts, in milliseconds
    #[clap(long = "request-interval-ms")]
    #[clap(value_name = "MS")]
    #[clap(help_heading = Some("Archive parameters"))]
    #[clap(default_value = "500")]
    pub request_interval_ms: u64,

    /// Maximum simultaneous outstanding requests
    #[clap(long = "concurrency")]
    #[clap(value_name = "N")]
    #[clap(help_heading = Some("Archive parameters"))]
    #[clap(default_value = "4")]
    pub concurrency: usize,

    /// Cap on rows returned per search request
    #[clap(long = "limit")]
    #[clap(value_name = "N")]
    #[clap(help_heading = Some("Archive parameters"))]
    #[clap(default_value = "10000")]
    pub result_limit: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn check_retrieve_settings(mut settings: RetrieveSettings) -> anyhow::Result<RetrieveSettings> {
    // hard code the version in
    settings.goldpanner_version = FULL_VERSION.clone();
    info!("Goldpanner version: {:?}", &settings.goldpanner_version);
    info!("Sub-command: retrieve");
    info!("Inputs:");

    check_required_filename(&settings.data_filename, "Data table")?;
    info!("\tData table: {:?}", &settings.data_filename);
    info!("\tSample column: {:?}", &settings.sample_column);
    if settings.take_samples > 0 {
        info!("\tTrial run: first {} samples only", settings.take_samples);
    }

    info!("Archive parameters:");
    info!("\tEndpoint: {}", &settings.base_url);
    if settings.chunk_size == 0 {
        bail!("--chunk-size must be >0");
    }
    info!("\tChunk size: {}", settings.chunk_size);
    if settings.download_attempts == 0 {
        bail!("--download-attempts must be >0");
    }
    info!("\tAttempts per request: {}", settings.download_attempts);
    info!("\tRetry delay: {} ms", settings.retry_delay_ms);
    info!("\tRequest interval: {} ms", settings.request_interval_ms);
    if settings.concurrency == 0 {
        settings.concurrency = 1;
    }
    info!("\tConcurrency: {}", settings.concurrency);
    info!("\tResult limit: {}", settings.result_limit);

    info!("Outputs:");
    info!("\tOutput folder: {:?}", &settings.output_folder);

    Ok(settings)
}
