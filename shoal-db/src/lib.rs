//! Ordered byte-key KV adapter for the Shoal hub.
//!
//! The hub core treats its embedded store as an ordered, byte-keyed,
//! transactional map. This crate provides that contract:
//!
//! - `Database`: an ordered map with point reads, prefix scans, and atomic
//!   batch commits serialized through a single writer.
//! - `Batch`: a write transaction accumulated by the caller and applied in
//!   one commit.
//! - `keys`: the typed key layout — a single root-prefix byte discriminates
//!   tables, and per-user rows nest under a fid-scoped prefix.
//!
//! Every store mutation in the hub goes through one `Batch`, so the
//! externally observable state always reflects whole transactions.

mod db;

pub mod keys;

pub use db::{Batch, BatchOp, Database};
pub use keys::{RootPrefix, UserPostfix};
