//! Subcommand implementations

pub(crate) mod check;
pub(crate) mod run;
pub(crate) mod serve;
