
use anyhow::Context;
use derive_builder::Builder;
use indicatif::ParallelProgressIterator;
use itertools::Itertools;
use log::{debug, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::data_types::archive_metadata::{ArchiveMetadata, ResourceKind, RetrievalStatus, RunRecord};
use crate::util::progress_bar::get_progress_style;

/// Search endpoint of the ENA portal API
pub const ENA_SEARCH_BASE_URL: &str = "https://www.ebi.ac.uk/ena/portal/api/search";

/// The read-run fields we ask the archive to return
pub const ENA_RETURN_FIELDS: [&str; 7] = [
    "sample_title", "run_accession", "sample_accession", "center_name", "library_strategy", "fastq_ftp", "submitted_ftp"
];

/// Controls batching, retry, and pacing behavior of the retrieval run
#[derive(Builder, Clone, Copy, Debug)]
#[builder(default)]
pub struct RetrievalConfig {
    /// Number of sample keys folded into one search request; bounded to keep URLs short
    pub chunk_size: usize,
    /// Total attempts per request before its samples are marked retrieval-failed
    pub max_attempts: u32,
    /// Base delay between attempts; attempt N waits N-1 times this
    pub retry_delay: Duration,
    /// Minimum interval between request starts, shared across workers
    pub request_interval: Duration,
    /// Maximum simultaneous outstanding requests
    pub concurrency: usize,
    /// Cap on rows returned per search request
    pub result_limit: usize
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            request_interval: Duration::from_millis(500),
            concurrency: 4,
            result_limit: 10000
        }
    }
}

/// Builds the free-text search query, e.g. `(sample_title="A1" OR sample_title="B2")`.
/// The archive indexes these datasets by title rather than by a strict key field.
pub fn build_title_query(sample_keys: &[String]) -> String {
    let clauses = sample_keys.iter()
        .map(|key| format!("sample_title=\"{key}\""))
        .join(" OR ");
    format!("({clauses})")
}

/// Parses the tab-delimited search response into run records.
/// An empty body is a valid zero-hit response.
pub fn parse_run_table(response_text: &str) -> anyhow::Result<Vec<RunRecord>> {
    if response_text.trim().is_empty() {
        return Ok(vec![]);
    }
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(response_text.as_bytes());
    let records: Vec<RunRecord> = csv_reader.deserialize()
        .collect::<csv::Result<_>>()
        .context("Error while parsing archive search response:")?;
    Ok(records)
}

/// Classifies the hits for one sample key into a definite retrieval outcome.
/// Zero hits are a gap (not-found); hits that disagree on the underlying sample, or that
/// stack more than one run onto the same resource slot, are surfaced as ambiguous rather
/// than silently resolved.
/// # Arguments
/// * `key` - the canonical sample key that was queried
/// * `runs` - the hits whose title matched the key (case-insensitively)
pub fn classify_hits(key: &str, runs: Vec<RunRecord>) -> ArchiveMetadata {
    if runs.is_empty() {
        return ArchiveMetadata {
            status: RetrievalStatus::NotFound,
            query_title: key.to_string(),
            runs: vec![],
            detail: None
        };
    }

    let titles: Vec<&str> = runs.iter()
        .map(|r| r.sample_title.trim())
        .unique()
        .collect();
    if titles.len() > 1 {
        let detail = format!("hits carry inconsistent sample titles: {}", titles.join(", "));
        return ambiguous(key, runs, detail);
    }

    let accessions: Vec<&str> = runs.iter()
        .map(|r| r.sample_accession.trim())
        .filter(|a| !a.is_empty())
        .unique()
        .collect();
    if accessions.len() > 1 {
        let detail = format!("hits span multiple sample accessions: {}", accessions.join(", "));
        return ambiguous(key, runs, detail);
    }

    // one run per resource slot; a second GRC1 run (for example) is a conflict
    let mut slot_counts: FxHashMap<ResourceKind, u64> = Default::default();
    for run in &runs {
        match run.classify() {
            Ok(resource) => *slot_counts.entry(resource).or_default() += 1,
            Err(e) => warn!("Sample {key}: unclassifiable run kept out of resource slots: {e}")
        }
    }
    if let Some((resource, count)) = slot_counts.iter().find(|(_resource, count)| **count > 1) {
        let detail = format!("{count} runs compete for the {resource} slot");
        return ambiguous(key, runs, detail);
    }

    ArchiveMetadata {
        status: RetrievalStatus::Found,
        query_title: key.to_string(),
        runs,
        detail: None
    }
}

fn ambiguous(key: &str, runs: Vec<RunRecord>, detail: String) -> ArchiveMetadata {
    ArchiveMetadata {
        status: RetrievalStatus::Ambiguous,
        query_title: key.to_string(),
        runs,
        detail: Some(detail)
    }
}

/// Runs the retrieval over a caller-supplied fetcher, which issues one search request for
/// one chunk of sample keys and returns the raw response text.
/// Chunks are processed on a dedicated bounded pool; each chunk gets `max_attempts` tries
/// with a linear backoff, and an exhausted chunk marks its samples retrieval-failed while
/// the rest of the batch continues. The returned mapping has exactly one entry per input
/// key, each with a definite status.
/// # Arguments
/// * `sample_keys` - the keys to look up; duplicates collapse to one entry
/// * `config` - batching/retry/concurrency settings
/// * `fetch` - one search attempt for one chunk
pub fn retrieve_with<F>(
    sample_keys: &[String], config: &RetrievalConfig, fetch: F
) -> anyhow::Result<FxHashMap<String, ArchiveMetadata>>
where
    F: Fn(&[String]) -> anyhow::Result<String> + Sync
{
    let chunks: Vec<&[String]> = sample_keys.chunks(config.chunk_size.max(1)).collect();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.concurrency.max(1))
        .build()
        .context("Error while building retrieval thread pool:")?;

    let style = get_progress_style();
    let chunk_results: Vec<Vec<(String, ArchiveMetadata)>> = pool.install(|| {
        chunks.into_par_iter()
            .progress_with_style(style)
            .map(|chunk| process_chunk(chunk, config, &fetch))
            .collect()
    });

    // single accumulation point; completion order across chunks is irrelevant
    let mut merged: FxHashMap<String, ArchiveMetadata> = Default::default();
    for (key, metadata) in chunk_results.into_iter().flatten() {
        merged.insert(key, metadata);
    }
    Ok(merged)
}

/// One chunk: attempt loop, parse, then per-key classification
fn process_chunk<F>(
    chunk: &[String], config: &RetrievalConfig, fetch: &F
) -> Vec<(String, ArchiveMetadata)>
where
    F: Fn(&[String]) -> anyhow::Result<String> + Sync
{
    let mut last_error: Option<anyhow::Error> = None;
    for attempt in 1..=config.max_attempts.max(1) {
        if attempt > 1 {
            std::thread::sleep(config.retry_delay * (attempt - 1));
        }
        let response_text = match fetch(chunk) {
            Ok(text) => text,
            Err(e) => {
                warn!("Attempt {attempt} of {} failed for a {}-sample chunk: {e:#}", config.max_attempts, chunk.len());
                last_error = Some(e);
                continue;
            }
        };
        match parse_run_table(&response_text) {
            Ok(runs) => return assign_runs(chunk, runs),
            Err(e) => {
                warn!("Attempt {attempt} of {} returned an unparseable response: {e:#}", config.max_attempts);
                last_error = Some(e);
            }
        }
    }

    // attempts exhausted; the chunk fails but the batch carries on
    let detail = last_error.map(|e| format!("{e:#}")).unwrap_or_else(|| "unknown error".to_string());
    chunk.iter()
        .map(|key| {
            (key.clone(), ArchiveMetadata {
                status: RetrievalStatus::RetrievalFailed,
                query_title: key.clone(),
                runs: vec![],
                detail: Some(detail.clone())
            })
        })
        .collect()
}

/// Distributes parsed runs back onto the chunk's keys and classifies each key
fn assign_runs(chunk: &[String], runs: Vec<RunRecord>) -> Vec<(String, ArchiveMetadata)> {
    let mut by_key: FxHashMap<&str, Vec<RunRecord>> = Default::default();
    for key in chunk {
        by_key.insert(key.as_str(), vec![]);
    }
    for run in runs {
        let matched = chunk.iter()
            .find(|key| run.sample_title.trim().eq_ignore_ascii_case(key.as_str()));
        match matched {
            Some(key) => by_key.get_mut(key.as_str()).unwrap().push(run),
            None => warn!("Archive hit {} (title {:?}) matches no requested sample, dropping", run.run_accession, run.sample_title)
        }
    }

    chunk.iter()
        .map(|key| (key.clone(), classify_hits(key, by_key.remove(key.as_str()).unwrap())))
        .collect()
}

/// Enforces a minimum interval between request starts across workers
struct Pacer {
    interval: Duration,
    next_slot: Mutex<Instant>
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(Instant::now())
        }
    }

    /// Claims the next request slot, sleeping outside the lock until it arrives
    fn wait(&self) {
        let my_slot = {
            let mut next_slot = self.next_slot.lock().unwrap();
            let slot = (*next_slot).max(Instant::now());
            *next_slot = slot + self.interval;
            slot
        };
        let now = Instant::now();
        if my_slot > now {
            std::thread::sleep(my_slot - now);
        }
    }
}

/// The live archive client; everything except the HTTP round trip lives in the
/// free functions above so it can be exercised without a network.
pub struct EnaClient {
    base_url: String,
    config: RetrievalConfig,
    http: reqwest::blocking::Client
}

impl EnaClient {
    /// Creates a client against the given search endpoint
    /// # Errors
    /// * if the underlying HTTP client cannot be constructed
    pub fn new(base_url: String, config: RetrievalConfig) -> anyhow::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Error while building HTTP client:")?;
        Ok(Self {
            base_url, config, http
        })
    }

    /// Looks up every sample key against the archive, returning one definite entry per key
    pub fn retrieve(&self, sample_keys: &[String]) -> anyhow::Result<FxHashMap<String, ArchiveMetadata>> {
        let pacer = Pacer::new(self.config.request_interval);
        retrieve_with(sample_keys, &self.config, |chunk| {
            pacer.wait();
            self.fetch_chunk(chunk)
        })
    }

    /// One paced search request for one chunk of sample keys
    fn fetch_chunk(&self, chunk: &[String]) -> anyhow::Result<String> {
        let query = build_title_query(chunk);
        debug!("Archive query: {query}");
        let response = self.http.get(&self.base_url)
            .query(&[
                ("result", "read_run".to_string()),
                ("query", query),
                ("fields", ENA_RETURN_FIELDS.join(",")),
                ("limit", self.config.result_limit.to_string())
            ])
            .send()
            .context("Error while sending archive search request:")?
            .error_for_status()
            .context("Archive search request was rejected:")?;
        response.text()
            .context("Error while reading archive search response:")
    }
}
