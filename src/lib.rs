//! The eventual-consistency protection layer.
//!
//! This crate implements a block-store shim that sits in front of an object-store backend whose
//! consistency is only eventual, and makes that backend look, on a per-block basis, like it
//! offers read-after-write and per-block write ordering.
//!
//! It does this with a concurrent, time-indexed state machine over per-block entries
//! ([`protect::EcProtect`]), combining a write-rate limiter, an in-flight write registry that
//! serves reads from live data, and a bounded MD5 cache that rejects stale reads.
//!
//! Everything outside of that state machine -- the object-store transport, the optional data
//! block cache, compression/encryption, the filesystem adapter and CLI -- is out of scope for
//! this crate. It only defines the [`store::BlockStore`] seam those layers are expected to meet.

#[macro_use]
extern crate tracing;

mod config;
mod entry;
mod error;
mod ledger;
mod read;
mod stats;
mod store;
mod write;

pub use config::{BuildError, Config, ConfigBuilder};
pub use error::EcpError;
pub use stats::EcProtectStats;
pub use store::{BlockStore, BlockStoreSizes, Md5Digest, WriteInput};

mod protect;
pub use protect::EcProtect;

#[cfg(test)]
pub(crate) mod test_support;
