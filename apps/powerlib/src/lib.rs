//! # Powerlib
//!
//! Command-line front end for the Powerlib asset library.
//!
//! The binary in `main.rs` is a thin wrapper: it parses arguments, resolves
//! configuration, installs logging and hands off to [`cli::execute`].

pub mod cli;
pub mod config;
