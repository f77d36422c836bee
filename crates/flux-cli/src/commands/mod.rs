//! Command implementations for the Flux CLI.
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and returns a Result.

pub mod dev;

pub use dev::execute as dev_execute;
