//! Command line front-end for crucible.

pub mod commands;
