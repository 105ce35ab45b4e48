//! Fixed-capacity pinning buffer pool.
//!
//! A free list is tried first, then an LRU victim among unpinned occupied
//! frames; a dirty victim is flushed before reuse. The `last_updated`
//! sequence counter stands in for a recency-ordered frame list, sized down
//! for the fixed small pool this engine always runs with.

use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::common::{PageId, FREE_SLOT_SENTINEL, PAGE_SIZE};
use crate::error::{EngineError, Result};
use crate::hashmap::ChainedHashMap64;
use crate::storage::disk::DiskManager;
use crate::storage::page::Page;

pub struct Frame {
    pub is_free: bool,
    pub is_dirty: bool,
    pub pin_count: u32,
    pub last_updated: u64,
    pub page_id: PageId,
    pub page: Page,
}

impl Frame {
    fn empty() -> Self {
        Self {
            is_free: true,
            is_dirty: false,
            pin_count: 0,
            last_updated: 0,
            page_id: 0,
            page: Page::new_empty(0),
        }
    }
}

pub struct BufferPool {
    frames: Vec<Frame>,
    page_table: ChainedHashMap64,
    free_list: Vec<usize>,
    update_ctr: u64,
}

impl BufferPool {
    pub fn new(num_frames: usize) -> Self {
        Self {
            frames: (0..num_frames).map(|_| Frame::empty()).collect(),
            page_table: ChainedHashMap64::new(num_frames.max(1)),
            free_list: (0..num_frames).rev().collect(),
            update_ctr: 0,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, idx: usize) -> &Frame {
        &self.frames[idx]
    }

    pub fn frame_mut(&mut self, idx: usize) -> &mut Frame {
        &mut self.frames[idx]
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.get(page_id).is_some()
    }

    /// Pins and returns the frame holding `page_id`, loading it from disk
    /// (evicting if necessary) if it isn't already resident.
    pub fn fetch(&mut self, disk: &DiskManager, page_id: PageId) -> Result<usize> {
        if let Some(idx) = self.page_table.get(page_id) {
            let idx = idx as usize;
            self.frames[idx].pin_count += 1;
            trace!(page_id, frame = idx, "buffer pool hit");
            return Ok(idx);
        }

        let idx = self.claim_frame(disk)?;
        let mut bytes = vec![0u8; PAGE_SIZE as usize];
        disk.read_page(page_id, &mut bytes)?;
        let page = Page::from_bytes(page_id, &bytes)?;

        self.update_ctr += 1;
        let frame = &mut self.frames[idx];
        frame.page = page;
        frame.page_id = page_id;
        frame.is_free = false;
        frame.is_dirty = false;
        frame.pin_count = 1;
        frame.last_updated = self.update_ctr;
        self.page_table.insert(page_id, idx as u64);
        debug!(page_id, frame = idx, "loaded page into buffer pool");
        Ok(idx)
    }

    pub fn unpin(&mut self, idx: usize) {
        let frame = &mut self.frames[idx];
        debug_assert!(frame.pin_count > 0, "unpin on a frame with zero pins");
        frame.pin_count = frame.pin_count.saturating_sub(1);
    }

    pub fn mark_dirty(&mut self, idx: usize) {
        let frame = &mut self.frames[idx];
        frame.is_dirty = true;
        self.update_ctr += 1;
        frame.last_updated = self.update_ctr;
    }

    /// Returns a pinned frame with at least one free slot, preferring a
    /// currently resident page, then scanning disk pages, then allocating
    /// a brand-new page if the whole table is full.
    pub fn find_page_with_free_space(
        &mut self,
        disk: &DiskManager,
        catalog: &Catalog,
        page_count_on_disk: &mut PageId,
    ) -> Result<usize> {
        for idx in 0..self.frames.len() {
            let frame = &self.frames[idx];
            if !frame.is_free && frame.page.free_space_head != FREE_SLOT_SENTINEL {
                self.frames[idx].pin_count += 1;
                return Ok(idx);
            }
        }

        for page_id in 1..=*page_count_on_disk {
            if self.page_table.get(page_id).is_some() {
                continue;
            }
            let idx = self.fetch(disk, page_id)?;
            if self.frames[idx].page.free_space_head != FREE_SLOT_SENTINEL {
                return Ok(idx);
            }
            self.unpin(idx);
        }

        let new_page_id = *page_count_on_disk + 1;
        let idx = self.claim_frame(disk)?;
        let mut page = Page::new_empty(new_page_id);
        page.init_free_list(catalog);

        let mut bytes = vec![0u8; PAGE_SIZE as usize];
        page.write_into(&mut bytes);
        disk.write_page(new_page_id, &bytes)?;

        self.update_ctr += 1;
        let frame = &mut self.frames[idx];
        frame.page = page;
        frame.page_id = new_page_id;
        frame.is_free = false;
        frame.is_dirty = false;
        frame.pin_count = 1;
        frame.last_updated = self.update_ctr;
        self.page_table.insert(new_page_id, idx as u64);
        *page_count_on_disk = new_page_id;
        debug!(page_id = new_page_id, frame = idx, "allocated new page");
        Ok(idx)
    }

    /// Writes the frame's page back to disk if dirty. Only releases the
    /// frame (clears the page table entry and marks it free) when nothing
    /// still holds a pin on it.
    pub fn flush_frame(&mut self, disk: &DiskManager, idx: usize, durable: bool) -> Result<()> {
        let (is_dirty, is_free, page_id, pin_count) = {
            let frame = &self.frames[idx];
            (frame.is_dirty, frame.is_free, frame.page_id, frame.pin_count)
        };
        if is_dirty && !is_free {
            let mut bytes = vec![0u8; PAGE_SIZE as usize];
            self.frames[idx].page.write_into(&mut bytes);
            disk.write_page(page_id, &bytes)?;
            if durable {
                disk.flush()?;
            }
            self.frames[idx].is_dirty = false;
        }
        if pin_count == 0 && !is_free {
            self.page_table.remove(page_id);
            self.frames[idx].is_free = true;
            self.free_list.push(idx);
        }
        Ok(())
    }

    pub fn flush_all(&mut self, disk: &DiskManager) -> Result<()> {
        for idx in 0..self.frames.len() {
            self.flush_frame(disk, idx, true)?;
        }
        Ok(())
    }

    fn claim_frame(&mut self, disk: &DiskManager) -> Result<usize> {
        if let Some(idx) = self.free_list.pop() {
            return Ok(idx);
        }

        let victim = self
            .frames
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_free && f.pin_count == 0)
            .min_by_key(|(idx, f)| (f.last_updated, *idx))
            .map(|(idx, _)| idx)
            .ok_or(EngineError::BufferPoolExhausted)?;

        if self.frames[victim].is_dirty {
            let mut bytes = vec![0u8; PAGE_SIZE as usize];
            self.frames[victim].page.write_into(&mut bytes);
            disk.write_page(self.frames[victim].page_id, &bytes)?;
            self.frames[victim].is_dirty = false;
        }
        self.page_table.remove(self.frames[victim].page_id);
        self.frames[victim].is_free = true;
        debug!(frame = victim, "evicted frame");
        Ok(victim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRecord;
    use crate::common::AttributeType;

    fn setup() -> (tempfile::TempDir, DiskManager, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tbl");
        let disk = DiskManager::create(&path).unwrap();
        let catalog = Catalog::build(vec![
            CatalogRecord::new("id", 8, AttributeType::Int, 0).unwrap(),
        ])
        .unwrap();
        disk.write_catalog(&catalog).unwrap();
        (dir, disk, catalog)
    }

    #[test]
    fn pin_prevents_eviction() {
        // Scenario: pool size 4, 5 pages already on disk. Pin page 1, load
        // 2, 3, 4 (now every frame occupied), then load page 5 — this must
        // evict one of 2/3/4, never the pinned page 1.
        let (_dir, disk, catalog) = setup();
        let mut bytes = vec![0u8; PAGE_SIZE as usize];
        for page_id in 1..=5u64 {
            let mut page = Page::new_empty(page_id);
            page.init_free_list(&catalog);
            page.write_into(&mut bytes);
            disk.write_page(page_id, &bytes).unwrap();
        }

        let mut pool = BufferPool::new(4);
        let idx1 = pool.fetch(&disk, 1).unwrap();
        for page_id in 2..=4u64 {
            let idx = pool.fetch(&disk, page_id).unwrap();
            pool.unpin(idx);
        }
        assert_eq!(pool.frame(idx1).pin_count, 1);

        let idx5 = pool.fetch(&disk, 5).unwrap();
        pool.unpin(idx5);

        assert!(pool.contains(1));
        assert_eq!(pool.frame(idx1).pin_count, 1);
        assert!(!pool.contains(2) || !pool.contains(3) || !pool.contains(4));
    }

    #[test]
    fn flush_frees_clean_unpinned_frame() {
        let (_dir, disk, catalog) = setup();
        let mut pool = BufferPool::new(4);
        let mut page_count = 0u64;
        let idx = pool.find_page_with_free_space(&disk, &catalog, &mut page_count).unwrap();
        pool.unpin(idx);
        pool.flush_frame(&disk, idx, true).unwrap();
        assert!(pool.frame(idx).is_free);
        assert!(!pool.contains(1));
    }
}
