//! # matgraph-format
//!
//! Binary graph descriptor format (`.mgr`).
//!
//! - `encode` / `decode`: in-memory serialization of a `Graph`
//! - `save` / `load`: the same, to and from a file

pub mod wire;
pub mod format;
pub mod file;

pub use file::{load, save};
pub use format::{decode, encode, HEADER_LEN, MAGIC, VERSION};
