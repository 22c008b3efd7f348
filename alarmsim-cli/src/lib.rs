//! alarmsim command-line front end
//!
//! Profile loading, report rendering and completion helpers live here so
//! integration tests can reach them; `main.rs` only wires arguments to them.

pub mod completions;
pub mod config;
pub mod output;
