//! Command implementations behind the `recoup` binary.
pub mod cli;
pub mod commands;
