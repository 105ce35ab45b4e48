//! Buffer pool: the fixed-capacity cache of pinned pages sitting between
//! disk I/O and tuple CRUD.

pub mod pool;

pub use pool::{BufferPool, Frame};
