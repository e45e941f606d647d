/*!
# Writers module
Contains the logic for writing the output tables for the build and retrieve commands.
*/
/// Generates the per-sample audit table that accompanies the gold outputs
pub mod audit;
/// Generates the three gold concordance tables
pub mod gold_tables;
/// Generates the download manifest, status table, and enriched table
pub mod manifest;
/// Generates the design documents consumed by the external read-simulation workflow
pub mod simulation_design;
