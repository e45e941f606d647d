
/// Per-sample archive run records and retrieval statuses
pub mod archive_metadata;
/// Per-sample, per-scope comparison outcomes and running totals
pub mod concordance_result;
/// Ordered genotype tuples used to group samples into representative classes
pub mod haplotype_pattern;
/// Genotype/phenotype call values and their comparison rules
pub mod locus_call;
/// Canonical sample key normalization across the source conventions
pub mod sample_key;
/// Joined per-sample records with provenance
pub mod sample_record;
