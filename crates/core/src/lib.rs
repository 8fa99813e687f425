//! symdex core: persistent classpath type-symbol index.
//!
//! An asynchronous build queue scans containers into per-container on-disk
//! segments; readers query immutable MVCC snapshots, optionally layered
//! under shared read-only prebuilt indexes; the readiness barrier lets
//! callers block until all queued work has drained.

pub mod engine;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod indexing;
pub mod logging;
pub mod query;
pub mod shared;
pub mod status;
pub mod store;

pub use engine::{EngineConfig, SymdexEngine, SymdexEngineBuilder};
pub use error::{Result, SymdexError};
