//! Configuration loader and schema types.
//!
//! This module exposes the settings schema that drives scanning, selection
//! and the `play` command, and helpers to locate the configuration home.

mod load;
mod schema;

pub use load::resolve_home;
pub use schema::*;
