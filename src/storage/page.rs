//! In-memory page representation and the slotted free-list layout threaded
//! through its data bytes.

use crate::catalog::Catalog;
use crate::common::{
    read_u64_le, write_u64_le, PageId, SlotId, DATA_SIZE, FREE_SLOT_SENTINEL, PAGE_HEADER_SIZE,
    PAGE_SIZE,
};
use crate::error::{EngineError, Result};

/// One page's in-memory contents: the 32-byte header plus its 8160-byte
/// data area, which is carved into fixed-size slots by the table's
/// catalog.
#[derive(Debug, Clone)]
pub struct Page {
    pub page_id: PageId,
    pub next_page: PageId,
    pub prev_page: PageId,
    /// Byte offset into `data` of the head of the free-slot list, or
    /// `FREE_SLOT_SENTINEL` when the page is full.
    pub free_space_head: u64,
    pub tuples_per_page: u64,
    pub data: Box<[u8; DATA_SIZE]>,
}

impl Page {
    pub fn new_empty(page_id: PageId) -> Self {
        Self {
            page_id,
            next_page: 0,
            prev_page: 0,
            free_space_head: FREE_SLOT_SENTINEL,
            tuples_per_page: 0,
            data: Box::new([0u8; DATA_SIZE]),
        }
    }

    /// Initializes a freshly allocated page: zeroes every slot, clears
    /// every null byte, and threads the free list front-to-back.
    pub fn init_free_list(&mut self, catalog: &Catalog) {
        let tuple_size = catalog.tuple_size() as u64;
        let n = catalog.tuples_per_page() as u64;
        self.data.fill(0);
        self.tuples_per_page = n;
        self.next_page = 0;
        self.prev_page = 0;
        for i in 0..n {
            let base = (i * tuple_size) as usize;
            self.data[base] = 0;
            let next = if i + 1 < n {
                (i + 1) * tuple_size
            } else {
                FREE_SLOT_SENTINEL
            };
            write_u64_le(&mut self.data, base + 8, next);
        }
        self.free_space_head = if n > 0 { 0 } else { FREE_SLOT_SENTINEL };
    }

    #[inline]
    pub fn slot_base(slot_id: SlotId, tuple_size: u64) -> usize {
        (slot_id * tuple_size) as usize
    }

    #[inline]
    pub fn is_slot_null(&self, base: usize) -> bool {
        self.data[base] == 0
    }

    pub fn next_free_at(&self, base: usize) -> u64 {
        read_u64_le(&self.data, base + 8)
    }

    pub fn set_next_free_at(&mut self, base: usize, next: u64) {
        write_u64_le(&mut self.data, base + 8, next);
    }

    /// Serializes the page into a `PAGE_SIZE`-byte buffer (header then
    /// data), little-endian.
    pub fn write_into(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= PAGE_SIZE as usize);
        write_u64_le(out, 0, self.next_page);
        write_u64_le(out, 8, self.prev_page);
        write_u64_le(out, 16, self.free_space_head);
        write_u64_le(out, 24, self.tuples_per_page);
        out[PAGE_HEADER_SIZE as usize..PAGE_SIZE as usize].copy_from_slice(self.data.as_slice());
    }

    pub fn from_bytes(page_id: PageId, buf: &[u8]) -> Result<Self> {
        if buf.len() < PAGE_SIZE as usize {
            return Err(EngineError::ShortTransfer {
                offset: page_id * PAGE_SIZE,
                expected: PAGE_SIZE as usize,
                actual: buf.len(),
            });
        }
        let next_page = read_u64_le(buf, 0);
        let prev_page = read_u64_le(buf, 8);
        let free_space_head = read_u64_le(buf, 16);
        let tuples_per_page = read_u64_le(buf, 24);
        let mut data = Box::new([0u8; DATA_SIZE]);
        data.copy_from_slice(&buf[PAGE_HEADER_SIZE as usize..PAGE_SIZE as usize]);
        Ok(Self {
            page_id,
            next_page,
            prev_page,
            free_space_head,
            tuples_per_page,
            data,
        })
    }
}
