//! Database module for upwatch.
//!
//! Defines the result store contract and its SQLite implementation.

#[cfg(test)]
mod memory;
mod models;
mod store;

#[cfg(test)]
pub use memory::*;
pub use models::*;
pub use store::*;
