
use indicatif::ParallelProgressIterator;
use log::{LevelFilter, error, info};
use rayon::prelude::*;
use std::time::Instant;

use goldpanner::archive_client::{EnaClient, RetrievalConfigBuilder};
use goldpanner::cli::build::{check_build_settings, BuildSettings};
use goldpanner::cli::core::{get_cli, Commands};
use goldpanner::cli::retrieve::{check_retrieve_settings, RetrieveSettings};
use goldpanner::concordance::{agreed_values, compare_sample};
use goldpanner::data_types::concordance_result::{ComparisonScope, ConcordanceResult, ConcordanceSummary};
use goldpanner::data_types::archive_metadata::RetrievalStatus;
use goldpanner::data_types::sample_record::{join_sources, SampleRecord};
use goldpanner::parsing::source_table::{load_source_table, parse_sample_keys, SourceTableConfig};
use goldpanner::pattern_reducer::{reduce_patterns, PatternInput};
use goldpanner::util::json_io::save_json;
use goldpanner::util::progress_bar::get_progress_style;
use goldpanner::writers::audit::{write_audit_table, AuditRow};
use goldpanner::writers::gold_tables::{write_genotype_table, write_pattern_table, write_phenotype_table, GoldRow};
use goldpanner::writers::manifest::{write_enriched_table, write_manifest, write_status_table};
use goldpanner::writers::simulation_design::{write_haplotype_manifest, write_sample_design};

fn setup_logging(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();
}

fn run_build(settings: BuildSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    setup_logging(settings.verbosity);

    let settings = match check_build_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // set up the number of threads for rayon
    match rayon::ThreadPoolBuilder::new().num_threads(settings.threads).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };

    // create the primary output folder
    info!("Creating output folder at {:?}...", settings.output_folder);
    match std::fs::create_dir_all(&settings.output_folder) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while creating output folder: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // create a debug folder if specified and save the CLI options there
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("Creating debug folder at {debug_folder:?}...");
        match std::fs::create_dir_all(debug_folder) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while creating debug folder: {e}");
                std::process::exit(exitcode::IOERR);
            }
        }

        let cli_json = debug_folder.join("cli_settings.json");
        info!("Saving CLI options to {cli_json:?}...");
        if let Err(e) = save_json(&settings, &cli_json) {
            error!("Error while saving CLI options: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // load the two source tables; a schema problem here aborts before anything is written
    let wgs_config = SourceTableConfig {
        label: settings.wgs_label.clone(),
        sample_column: settings.sample_column.clone(),
        case_rule: settings.wgs_id_case,
        genotype_columns: settings.genotype_loci.clone(),
        phenotype_columns: settings.phenotype_drugs.clone()
    };
    info!("Loading {} table...", settings.wgs_label);
    let wgs_table = match load_source_table(&settings.wgs_filename, &wgs_config) {
        Ok(t) => t,
        Err(e) => {
            error!("Error while loading {} table: {e:#}", settings.wgs_label);
            std::process::exit(exitcode::DATAERR);
        }
    };

    let amplicon_config = SourceTableConfig {
        label: settings.amplicon_label.clone(),
        sample_column: settings.sample_column.clone(),
        case_rule: settings.amplicon_id_case,
        genotype_columns: settings.genotype_loci.clone(),
        phenotype_columns: settings.phenotype_drugs.clone()
    };
    info!("Loading {} table...", settings.amplicon_label);
    let amplicon_table = match load_source_table(&settings.amplicon_filename, &amplicon_config) {
        Ok(t) => t,
        Err(e) => {
            error!("Error while loading {} table: {e:#}", settings.amplicon_label);
            std::process::exit(exitcode::DATAERR);
        }
    };

    let excluded_rows: Vec<_> = wgs_table.excluded.iter()
        .chain(amplicon_table.excluded.iter())
        .cloned()
        .collect();
    info!("Loaded {} + {} samples ({} rows excluded during parsing)",
        wgs_table.records.len(), amplicon_table.records.len(), excluded_rows.len());

    // join on the canonical key
    let samples: Vec<SampleRecord> = join_sources(wgs_table.records, amplicon_table.records);
    let comparable_count = samples.iter().filter(|s| s.is_comparable()).count();
    info!("Joined dataset: {} samples, {} covered by both sources", samples.len(), comparable_count);

    // run both comparison passes per sample
    let style = get_progress_style();
    info!("Comparing samples...");
    let comparisons: Vec<(ConcordanceResult, ConcordanceResult)> = samples.par_iter()
        .map(|record| {
            let phenotype = compare_sample(record, ComparisonScope::Phenotype);
            let genotype = compare_sample(record, ComparisonScope::Genotype);
            (phenotype, genotype)
        })
        .progress_with_style(style)
        .collect();

    // accumulate rows and summaries; only comparable samples count towards the scopes
    let mut phenotype_summary = ConcordanceSummary::default();
    let mut genotype_summary = ConcordanceSummary::default();
    let mut phenotype_rows: Vec<GoldRow> = vec![];
    let mut genotype_rows: Vec<GoldRow> = vec![];
    let mut audit_rows: Vec<AuditRow> = vec![];
    for (record, (phenotype, genotype)) in samples.iter().zip(comparisons.iter()) {
        audit_rows.push(AuditRow::from_comparison(record.key(), record.provenance(), phenotype, genotype));
        if !record.is_comparable() {
            continue;
        }

        phenotype_summary.add_result(phenotype);
        genotype_summary.add_result(genotype);
        if phenotype.is_concordant() {
            phenotype_rows.push(GoldRow {
                key: record.key().to_string(),
                values: agreed_values(record, ComparisonScope::Phenotype, &settings.phenotype_drugs),
                compared: phenotype.compared.clone()
            });
        }
        if genotype.is_concordant() {
            genotype_rows.push(GoldRow {
                key: record.key().to_string(),
                values: agreed_values(record, ComparisonScope::Genotype, &settings.genotype_loci),
                compared: genotype.compared.clone()
            });
        }
    }
    audit_rows.extend(excluded_rows.iter().map(AuditRow::from_excluded));

    // reduce the genotype-concordant set to representative patterns
    let pattern_inputs: Vec<PatternInput> = genotype_rows.iter()
        .map(|row| PatternInput {
            key: row.key.clone(),
            values: row.values.clone()
        })
        .collect();
    let representatives = match reduce_patterns(&pattern_inputs, &settings.genotype_loci) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while reducing patterns: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // save the outputs
    info!("Comparisons complete, saving all outputs...");
    let write_result = write_phenotype_table(
            &settings.output_folder.join("phenotype_concordance.csv"), &settings.phenotype_drugs, &phenotype_rows
        )
        .and_then(|()| write_genotype_table(
            &settings.output_folder.join("genotype_concordance.csv"), &settings.genotype_loci, &genotype_rows
        ))
        .and_then(|()| write_pattern_table(
            &settings.output_folder.join("representative_patterns.csv"), &settings.genotype_loci, &representatives
        ))
        .and_then(|()| write_audit_table(&settings.output_folder.join("sample_audit.csv"), &audit_rows))
        .and_then(|()| write_haplotype_manifest(
            &settings.output_folder.join("haplotype_manifest.csv"), &settings.genotype_loci, &representatives
        ))
        .and_then(|()| write_sample_design(&settings.output_folder.join("sample_design.csv"), &representatives));
    if let Err(e) = write_result {
        error!("Error while saving output files: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    // final accounting so consumers can audit completeness
    info!("Phenotype scope: {} concordant, {} discordant, {} non-comparable",
        phenotype_summary.concordant, phenotype_summary.discordant, phenotype_summary.non_comparable);
    if let Some(rate) = phenotype_summary.concordance_rate() {
        info!("\tConcordance rate: {rate:.4}");
    }
    info!("Genotype scope: {} concordant, {} discordant, {} non-comparable",
        genotype_summary.concordant, genotype_summary.discordant, genotype_summary.non_comparable);
    if let Some(rate) = genotype_summary.concordance_rate() {
        info!("\tConcordance rate: {rate:.4}");
    }
    info!("Excluded source rows: {}", excluded_rows.len());
    info!("Representative patterns: {}", representatives.len());

    info!("Build completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_retrieve(settings: RetrieveSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    setup_logging(settings.verbosity);

    let settings = match check_retrieve_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // create the primary output folder
    info!("Creating output folder at {:?}...", settings.output_folder);
    match std::fs::create_dir_all(&settings.output_folder) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while creating output folder: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // pull the sample keys out of the input table
    let mut sample_keys = match parse_sample_keys(&settings.data_filename, &settings.sample_column) {
        Ok(keys) => keys,
        Err(e) => {
            error!("Error while reading sample keys: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    if settings.take_samples > 0 && settings.take_samples < sample_keys.len() {
        sample_keys.truncate(settings.take_samples);
    }
    info!("Querying the archive for {} samples...", sample_keys.len());

    let retrieval_config = match RetrievalConfigBuilder::default()
        .chunk_size(settings.chunk_size)
        .max_attempts(settings.download_attempts)
        .retry_delay(std::time::Duration::from_millis(settings.retry_delay_ms))
        .request_interval(std::time::Duration::from_millis(settings.request_interval_ms))
        .concurrency(settings.concurrency)
        .result_limit(settings.result_limit)
        .build() {
        Ok(rc) => rc,
        Err(e) => {
            error!("Error while building retrieval config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    let client = match EnaClient::new(settings.base_url.clone(), retrieval_config) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while building archive client: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // one definite entry per key comes back, whatever the archive did
    let metadata = match client.retrieve(&sample_keys) {
        Ok(m) => m,
        Err(e) => {
            error!("Error while running retrieval: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };

    // save the outputs
    info!("Retrieval complete, saving all outputs...");
    let write_result = write_enriched_table(
            &settings.data_filename, &settings.output_folder.join("enriched.csv"),
            &settings.sample_column, &metadata
        )
        .and_then(|()| write_status_table(&settings.output_folder.join("retrieval_status.csv"), &metadata))
        .and_then(|()| write_manifest(&settings.output_folder.join("manifest.csv"), &metadata));
    if let Err(e) = write_result {
        error!("Error while saving output files: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    // final accounting per status
    for status in [RetrievalStatus::Found, RetrievalStatus::NotFound, RetrievalStatus::Ambiguous, RetrievalStatus::RetrievalFailed] {
        let count = metadata.values().filter(|m| m.status == status).count();
        info!("Samples {status}: {count}");
    }

    info!("Retrieval completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Build(settings) => {
            run_build(*settings);
        },
        Commands::Retrieve(settings) => {
            run_retrieve(*settings);
        }
    }

    info!("Process finished successfully.");
}
