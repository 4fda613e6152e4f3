//! Subcommand modules for the `pepbind` binary.

pub mod negatives;
pub mod pdb;
pub mod scan;
