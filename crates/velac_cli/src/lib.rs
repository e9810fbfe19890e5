//! Library half of the `velac` driver, split out from the `velac` binary so
//! integration tests can exercise the command implementations directly
//! instead of shelling out to a compiled executable.

pub mod cli;
pub mod commands;
