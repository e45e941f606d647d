/*!
# CLI module
Command line interface functionality that is specific to Goldpanner.
*/

/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
/// The build CLI subcommand
pub mod build;
/// The retrieve CLI subcommand
pub mod retrieve;
