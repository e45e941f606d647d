
use serde::{Deserialize, Serialize};

/// The GenRe Mekong primer panels, as encoded in submitted CRAM filenames
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum_macros::Display, strum_macros::AsRefStr)]
pub enum PrimerPanel {
    #[strum(serialize = "GRC1")]
    Grc1,
    #[strum(serialize = "GRC2")]
    Grc2,
    #[strum(serialize = "SPEC")]
    Spec
}

/// All simulated/retrieved panels, in the order design documents enumerate them
pub const ALL_PANELS: [PrimerPanel; 3] = [PrimerPanel::Grc1, PrimerPanel::Grc2, PrimerPanel::Spec];

/// Which upstream resource a run belongs to
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResourceKind {
    /// Whole-genome sequencing run from the Pf8 release
    Pf8Wgs,
    /// Amplicon run from GenRe Mekong, for one primer panel
    GenRe(PrimerPanel)
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pf8Wgs => write!(f, "Pf8"),
            Self::GenRe(panel) => write!(f, "GenRe-{panel}")
        }
    }
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum RunClassificationError {
    #[error("run {run_accession} center {center_name:?} is not a recognized resource")]
    UnknownCenter { run_accession: String, center_name: String },
    #[error("run {run_accession} is a {expected} resource but reports library strategy {found:?}")]
    StrategyMismatch { run_accession: String, expected: String, found: String },
    #[error("run {run_accession} submitted path {submitted_ftp:?} does not encode a primer panel")]
    UnknownPanel { run_accession: String, submitted_ftp: String }
}

/// One read-run row as returned by the archive search
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RunRecord {
    /// The free-text title the archive indexes samples under
    pub sample_title: String,
    /// Run accession, e.g. ERR14392568
    pub run_accession: String,
    /// BioSample accession, e.g. SAMEA117705075
    pub sample_accession: String,
    /// Submitting center string; identifies the upstream resource
    pub center_name: String,
    /// Sequencing strategy, WGS or AMPLICON for these resources
    pub library_strategy: String,
    /// Semicolon-separated FASTQ mate URIs
    pub fastq_ftp: String,
    /// Semicolon-separated submitted file URIs; encodes the GenRe panel
    pub submitted_ftp: String
}

impl RunRecord {
    /// Assigns this run to an upstream resource using the submitting center, with a
    /// sanity check on the library strategy and panel extraction for amplicon runs.
    /// # Errors
    /// * if the center is neither resource, the strategy contradicts the center, or
    ///   no panel marker is present in the submitted path
    pub fn classify(&self) -> Result<ResourceKind, RunClassificationError> {
        if self.center_name.contains("Wellcome Sanger") {
            if self.library_strategy != "WGS" {
                return Err(RunClassificationError::StrategyMismatch {
                    run_accession: self.run_accession.clone(),
                    expected: "WGS".to_string(),
                    found: self.library_strategy.clone()
                });
            }
            Ok(ResourceKind::Pf8Wgs)
        } else if self.center_name.contains("GenRe-Mekong") {
            if self.library_strategy != "AMPLICON" {
                return Err(RunClassificationError::StrategyMismatch {
                    run_accession: self.run_accession.clone(),
                    expected: "AMPLICON".to_string(),
                    found: self.library_strategy.clone()
                });
            }
            let panel = ALL_PANELS.iter()
                .find(|p| self.submitted_ftp.contains(p.as_ref()))
                .copied()
                .ok_or_else(|| RunClassificationError::UnknownPanel {
                    run_accession: self.run_accession.clone(),
                    submitted_ftp: self.submitted_ftp.clone()
                })?;
            Ok(ResourceKind::GenRe(panel))
        } else {
            Err(RunClassificationError::UnknownCenter {
                run_accession: self.run_accession.clone(),
                center_name: self.center_name.clone()
            })
        }
    }

    /// The FASTQ mate URIs with an explicit scheme, ready for a bulk downloader
    pub fn fastq_uris(&self) -> Vec<String> {
        self.fastq_ftp.split(';')
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(|u| {
                if u.contains("://") {
                    u.to_string()
                } else {
                    format!("ftp://{u}")
                }
            })
            .collect()
    }
}

/// The definite retrieval outcome for one sample key
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display, strum_macros::AsRefStr)]
pub enum RetrievalStatus {
    /// The archive returned a consistent set of runs for the sample
    #[strum(serialize = "found")]
    Found,
    /// The archive returned zero hits; a gap, not an error
    #[strum(serialize = "not-found")]
    NotFound,
    /// The hits disagreed on which sample they belong to
    #[strum(serialize = "ambiguous")]
    Ambiguous,
    /// Every attempt against the archive failed for this sample's batch
    #[strum(serialize = "retrieval-failed")]
    RetrievalFailed
}

/// Everything the archive reported (or failed to report) for one sample
#[derive(Clone, Debug)]
pub struct ArchiveMetadata {
    /// The retrieval outcome; always definite, never missing
    pub status: RetrievalStatus,
    /// The identifier the archive was actually queried with
    pub query_title: String,
    /// The runs retrieved for this sample; empty unless status is found or ambiguous
    pub runs: Vec<RunRecord>,
    /// Failure or ambiguity detail for the status table
    pub detail: Option<String>
}

impl ArchiveMetadata {
    pub fn is_found(&self) -> bool {
        self.status == RetrievalStatus::Found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(center: &str, strategy: &str, submitted: &str) -> RunRecord {
        RunRecord {
            sample_title: "RCN13560".to_string(),
            run_accession: "ERR14390721".to_string(),
            sample_accession: "SAMEA117704460".to_string(),
            center_name: center.to_string(),
            library_strategy: strategy.to_string(),
            fastq_ftp: String::new(),
            submitted_ftp: submitted.to_string()
        }
    }

    #[test]
    fn test_classify_resources() {
        let wgs = run("Wellcome Sanger Institute;WSI", "WGS", "some/sample_wgs.cram");
        assert_eq!(wgs.classify().unwrap(), ResourceKind::Pf8Wgs);

        let grc2 = run("The GenRe-Mekong Project;GenRe-Mekong", "AMPLICON", "some/RCN13560_GRC2_27488.cram");
        assert_eq!(grc2.classify().unwrap(), ResourceKind::GenRe(PrimerPanel::Grc2));

        let spec = run("GenRe-Mekong", "AMPLICON", "some/RCN13560_SPEC_29632.cram");
        assert_eq!(spec.classify().unwrap(), ResourceKind::GenRe(PrimerPanel::Spec));
    }

    #[test]
    fn test_classify_rejections() {
        let bad_strategy = run("Wellcome Sanger Institute", "AMPLICON", "x.cram");
        assert!(matches!(bad_strategy.classify(), Err(RunClassificationError::StrategyMismatch { .. })));

        let no_panel = run("GenRe-Mekong", "AMPLICON", "some/unmarked.cram");
        assert!(matches!(no_panel.classify(), Err(RunClassificationError::UnknownPanel { .. })));

        let stranger = run("Some Other Center", "WGS", "x.cram");
        assert!(matches!(stranger.classify(), Err(RunClassificationError::UnknownCenter { .. })));
    }

    #[test]
    fn test_fastq_uris_scheme() {
        let mut record = run("GenRe-Mekong", "AMPLICON", "some/RCN13560_GRC1_1.cram");
        record.fastq_ftp = "ftp.sra.ebi.ac.uk/vol1/a_1.fastq.gz;ftp://ftp.sra.ebi.ac.uk/vol1/a_2.fastq.gz".to_string();
        assert_eq!(record.fastq_uris(), vec![
            "ftp://ftp.sra.ebi.ac.uk/vol1/a_1.fastq.gz".to_string(),
            "ftp://ftp.sra.ebi.ac.uk/vol1/a_2.fastq.gz".to_string()
        ]);
        record.fastq_ftp = String::new();
        assert!(record.fastq_uris().is_empty());
    }
}
