
/// Client for the external sequencing-read archive and retrieval batching
pub mod archive_client;
/// Command line interface functionality
pub mod cli;
/// Core logic for comparing the two call sets per sample
pub mod concordance;
/// Contains various shared data types
pub mod data_types;
/// Contains the logic for parsing input tables
pub mod parsing;
/// Reduces concordant samples to one representative per haplotype pattern
pub mod pattern_reducer;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
