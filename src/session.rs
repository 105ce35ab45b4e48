//! Table session: binds a file, its catalog, and its buffer pool, and
//! exposes tuple CRUD. One `Session` is opened per table; it is not
//! thread-safe (see the crate-level concurrency notes) — callers that
//! dispatch work to multiple tables in parallel are responsible for
//! serializing access to any one table's session themselves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::buffer::BufferPool;
use crate::catalog::{Catalog, CatalogRecord};
use crate::common::{PageId, TupleId, FREE_SLOT_SENTINEL, PAGE_SIZE};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::storage::disk::DiskManager;
use crate::tuple::{attributes_equal, decode_tuple, encode_tuple, AttributeValue, OwnedTuple};

pub struct Session {
    pub(crate) table_name: String,
    pub(crate) catalog: Catalog,
    pub(crate) disk: DiskManager,
    pub(crate) buffer_pool: BufferPool,
    pub(crate) page_count_on_disk: PageId,
}

impl Session {
    /// Creates a brand-new table file: catalog page at offset 0, then a
    /// single initialized data page at page id 1.
    pub fn create_table(path: &Path, attributes: Vec<CatalogRecord>) -> Result<()> {
        if path.exists() {
            return Err(EngineError::TableAlreadyExists(path.display().to_string()));
        }
        let catalog = Catalog::build(attributes)?;
        let disk = DiskManager::create(path)?;
        disk.write_catalog(&catalog)?;

        let mut page = crate::storage::page::Page::new_empty(1);
        page.init_free_list(&catalog);
        let mut bytes = vec![0u8; PAGE_SIZE as usize];
        page.write_into(&mut bytes);
        disk.write_page(1, &bytes)?;
        disk.flush()?;
        Ok(())
    }

    pub fn open(path: &Path, config: &EngineConfig) -> Result<Self> {
        let table_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::InvalidTablePath(path.display().to_string()))?
            .to_string();

        let disk = DiskManager::open_existing(path)?;
        let file_size = disk.file_size()?;
        if file_size == 0 || file_size % PAGE_SIZE != 0 {
            return Err(EngineError::InvalidCatalog(format!(
                "file size {file_size} is not a positive multiple of PAGE_SIZE"
            )));
        }
        let page_count_on_disk = file_size / PAGE_SIZE - 1;
        let catalog = disk.read_catalog()?;
        let buffer_pool = BufferPool::new(config.buffer_pool_frames);

        info!(table = %table_name, page_count_on_disk, "opened session");
        Ok(Self {
            table_name,
            catalog,
            disk,
            buffer_pool,
            page_count_on_disk,
        })
    }

    pub fn close(mut self) -> Result<()> {
        self.buffer_pool.flush_all(&self.disk)?;
        info!(table = %self.table_name, "closed session");
        Ok(())
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn page_count_on_disk(&self) -> PageId {
        self.page_count_on_disk
    }

    pub fn flush_buffer_pool(&mut self) -> Result<()> {
        self.buffer_pool.flush_all(&self.disk)
    }

    /// Flushes a specific resident page back to disk and releases its
    /// frame, if it's currently resident.
    pub fn evict(&mut self, page_id: PageId) -> Result<()> {
        if let Some(idx) = self.find_resident_frame(page_id) {
            self.buffer_pool.flush_frame(&self.disk, idx, true)?;
        }
        Ok(())
    }

    fn find_resident_frame(&self, page_id: PageId) -> Option<usize> {
        (0..self.buffer_pool.num_frames()).find(|&idx| {
            let frame = self.buffer_pool.frame(idx);
            !frame.is_free && frame.page_id == page_id
        })
    }

    pub fn insert_tuple(&mut self, attributes: &[AttributeValue<'_>]) -> Result<TupleId> {
        let tuple_size = self.catalog.tuple_size() as u64;
        let idx = self.buffer_pool.find_page_with_free_space(
            &self.disk,
            &self.catalog,
            &mut self.page_count_on_disk,
        )?;

        let frame = self.buffer_pool.frame_mut(idx);
        let head = frame.page.free_space_head;
        if head == FREE_SLOT_SENTINEL {
            self.buffer_pool.unpin(idx);
            return Err(EngineError::InvalidCatalog(
                "page reported free space but its free list is empty".into(),
            ));
        }

        let page_id = frame.page_id;
        let base = head as usize;
        let slot_id = head / tuple_size;
        let next_free = frame.page.next_free_at(base);
        frame.page.free_space_head = next_free;
        encode_tuple(&mut frame.page.data, slot_id, tuple_size, &self.catalog, attributes)?;

        self.buffer_pool.mark_dirty(idx);
        self.buffer_pool.unpin(idx);
        Ok(TupleId::new(page_id, slot_id))
    }

    pub fn delete_tuple(&mut self, tid: TupleId) -> Result<()> {
        let tuple_size = self.catalog.tuple_size() as u64;
        let idx = self.buffer_pool.fetch(&self.disk, tid.page_id)?;

        let frame = self.buffer_pool.frame_mut(idx);
        let base = (tid.slot_id * tuple_size) as usize;
        let result = if frame.page.is_slot_null(base) {
            Err(EngineError::InvalidTupleId(tid))
        } else {
            let old_head = frame.page.free_space_head;
            frame.page.data[base..base + tuple_size as usize].fill(0);
            frame.page.set_next_free_at(base, old_head);
            frame.page.free_space_head = base as u64;
            Ok(())
        };

        if result.is_ok() {
            self.buffer_pool.mark_dirty(idx);
        }
        self.buffer_pool.unpin(idx);
        result
    }

    pub fn update_tuple(&mut self, tid: TupleId, attributes: &[AttributeValue<'_>]) -> Result<()> {
        let tuple_size = self.catalog.tuple_size() as u64;
        let idx = self.buffer_pool.fetch(&self.disk, tid.page_id)?;

        let frame = self.buffer_pool.frame_mut(idx);
        let base = (tid.slot_id * tuple_size) as usize;
        let result = if frame.page.is_slot_null(base) {
            Err(EngineError::InvalidTupleId(tid))
        } else {
            encode_tuple(&mut frame.page.data, tid.slot_id, tuple_size, &self.catalog, attributes)
        };

        if result.is_ok() {
            self.buffer_pool.mark_dirty(idx);
        }
        self.buffer_pool.unpin(idx);
        result
    }

    /// Returns a detached, owned copy of a tuple (not a zero-copy borrow):
    /// this call unpins its frame before returning, since it isn't part of
    /// an operator tree that can hold the pin open across the borrow. The
    /// zero-copy contract is honored by the executor operators instead.
    pub fn get_tuple(&mut self, tid: TupleId) -> Result<Option<OwnedTuple>> {
        let tuple_size = self.catalog.tuple_size() as u64;
        let idx = self.buffer_pool.fetch(&self.disk, tid.page_id)?;
        let owned = {
            let frame = self.buffer_pool.frame(idx);
            decode_tuple(&frame.page.data, tid.page_id, tid.slot_id, tuple_size, &self.catalog)
                .map(|h| h.to_owned_tuple())
        };
        self.buffer_pool.unpin(idx);
        Ok(owned)
    }

    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.catalog.get_record_by_name(name).map(|(i, _)| i)
    }

    pub fn values_equal(&self, a: &AttributeValue<'_>, b: &AttributeValue<'_>) -> bool {
        attributes_equal(a, b)
    }
}

/// Owns the set of currently open table sessions, keyed by table name.
/// Performs no locking of its own — the embedding shell is responsible for
/// the per-table mutual exclusion described in the concurrency model.
pub struct Manager {
    sessions: HashMap<String, Session>,
    config: EngineConfig,
}

impl Manager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    fn table_path(&self, table_name: &str) -> PathBuf {
        self.config.data_dir.join(format!("{table_name}.tbl"))
    }

    pub fn create_table(&mut self, table_name: &str, attributes: Vec<CatalogRecord>) -> Result<()> {
        Session::create_table(&self.table_path(table_name), attributes)
    }

    pub fn open(&mut self, table_name: &str) -> Result<()> {
        let session = Session::open(&self.table_path(table_name), &self.config)?;
        self.sessions.insert(table_name.to_string(), session);
        Ok(())
    }

    pub fn get(&mut self, table_name: &str) -> Result<&mut Session> {
        self.sessions
            .get_mut(table_name)
            .ok_or_else(|| EngineError::TableNotFound(table_name.to_string()))
    }

    pub fn close(&mut self, table_name: &str) -> Result<()> {
        let session = self
            .sessions
            .remove(table_name)
            .ok_or_else(|| EngineError::TableNotFound(table_name.to_string()))?;
        session.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::AttributeType;
    use std::borrow::Cow;

    fn catalog_attrs() -> Vec<CatalogRecord> {
        vec![
            CatalogRecord::new("id", 4, AttributeType::Int, 0).unwrap(),
            CatalogRecord::new("name", 16, AttributeType::String, 1).unwrap(),
        ]
    }

    #[test]
    fn insert_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.tbl");
        Session::create_table(&path, catalog_attrs()).unwrap();

        let config = EngineConfig::default();
        let mut session = Session::open(&path, &config).unwrap();

        let attrs = vec![
            AttributeValue::Int(1),
            AttributeValue::Str(Cow::Borrowed(b"John Doe".as_slice())),
        ];
        let tid = session.insert_tuple(&attrs).unwrap();
        assert_eq!(tid.page_id, 1);
        assert_eq!(tid.slot_id, 0);

        session.flush_buffer_pool().unwrap();

        let fetched = session.get_tuple(tid).unwrap().unwrap();
        assert_eq!(fetched.attributes[0], AttributeValue::Int(1));
    }

    #[test]
    fn page_fill_allocates_a_new_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fill.tbl");
        let attrs = vec![
            CatalogRecord::new("id", 4, AttributeType::Int, 0).unwrap(),
            CatalogRecord::new("name", 50, AttributeType::String, 1).unwrap(),
            CatalogRecord::new("salary", 4, AttributeType::Float, 2).unwrap(),
            CatalogRecord::new("department", 30, AttributeType::String, 3).unwrap(),
            CatalogRecord::new("is_active", 1, AttributeType::Bool, 4).unwrap(),
        ];
        Session::create_table(&path, attrs).unwrap();
        let config = EngineConfig::default();
        let mut session = Session::open(&path, &config).unwrap();
        assert_eq!(session.catalog().tuples_per_page(), 85);

        let row = |i: i32| {
            vec![
                AttributeValue::Int(i),
                AttributeValue::Str(Cow::Borrowed(b"x".as_slice())),
                AttributeValue::Float(1.0),
                AttributeValue::Str(Cow::Borrowed(b"eng".as_slice())),
                AttributeValue::Bool(true),
            ]
        };

        for i in 0..85 {
            let tid = session.insert_tuple(&row(i)).unwrap();
            assert_eq!(tid.page_id, 1);
        }
        assert_eq!(session.page_count_on_disk(), 1);

        let overflow = session.insert_tuple(&row(85)).unwrap();
        assert_eq!(overflow.page_id, 2);
        session.flush_buffer_pool().unwrap();
        assert_eq!(session.page_count_on_disk(), 2);
    }

    #[test]
    fn delete_then_get_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.tbl");
        Session::create_table(&path, catalog_attrs()).unwrap();
        let config = EngineConfig::default();
        let mut session = Session::open(&path, &config).unwrap();

        let attrs = vec![
            AttributeValue::Int(9),
            AttributeValue::Str(Cow::Borrowed(b"x".as_slice())),
        ];
        let tid = session.insert_tuple(&attrs).unwrap();
        session.delete_tuple(tid).unwrap();
        assert!(session.get_tuple(tid).unwrap().is_none());
        assert!(session.delete_tuple(tid).is_err());
    }
}
