//! Storage and execution core of a small on-disk relational engine
//! optimized for SSDs: a slotted heap file with a catalog page, a pinning
//! buffer pool, tuple CRUD, a pull-based query executor, and a lazy-split
//! linear hash secondary index.

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod config;
pub mod error;
pub mod execution;
pub mod hashmap;
pub mod index;
pub mod session;
pub mod storage;
pub mod tuple;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use session::{Manager, Session};
