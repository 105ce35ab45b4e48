//! Engine configuration and logging bootstrap.
//!
//! Page size, slot layout, and the rest of the on-disk format are fixed by
//! the file format itself and are not configurable here; this surface only
//! covers what an embedder is actually allowed to tune.

use std::path::PathBuf;

/// Number of frames in the buffer pool. Kept small by default since this
/// engine targets a single small working set per table, not a shared
/// server-wide cache.
pub const DEFAULT_BUFFER_POOL_FRAMES: usize = 4;
/// Initial bucket count for a freshly built linear-hash index.
pub const DEFAULT_INITIAL_HASH_BUCKETS: usize = 128;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub buffer_pool_frames: usize,
    pub initial_hash_buckets: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            buffer_pool_frames: DEFAULT_BUFFER_POOL_FRAMES,
            initial_hash_buckets: DEFAULT_INITIAL_HASH_BUCKETS,
        }
    }
}

/// Installs a `tracing-subscriber` fmt layer honoring `RUST_LOG`.
///
/// Library code never calls this; it exists for binaries (the smoke demo)
/// that embed the engine and want human-readable spans for session open,
/// eviction, and index splits.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
