/*!
# Parsing module
Contains the logic for parsing input tables into meaningful structs / data.
*/
/// Loader and schema validation for the per-source call tables
pub mod source_table;
