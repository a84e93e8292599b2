//! Subcommand modules for the `mulrfs` binary.

pub mod check;
pub mod cmp;
pub mod prep;
