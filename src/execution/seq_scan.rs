//! Sequential scan: pin-scan-unpin iteration over every page of a table.

use crate::common::{PageId, SlotId};
use crate::error::Result;
use crate::execution::Operator;
use crate::session::Session;
use crate::tuple::{decode_tuple, TupleHandle};

pub struct SeqScan<'s> {
    session: &'s mut Session,
    current_page_id: PageId,
    current_slot_id: SlotId,
    current_frame: Option<usize>,
    tuples_per_page: u64,
}

impl<'s> SeqScan<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            current_page_id: 0,
            current_slot_id: 0,
            current_frame: None,
            tuples_per_page: 0,
        }
    }
}

impl<'s> Operator for SeqScan<'s> {
    fn open(&mut self) -> Result<()> {
        if let Some(idx) = self.current_frame.take() {
            self.session.buffer_pool.unpin(idx);
        }
        self.tuples_per_page = self.session.catalog().tuples_per_page() as u64;
        self.current_page_id = 1;
        self.current_slot_id = 0;
        self.current_frame = if self.session.page_count_on_disk() >= 1 {
            let idx = self.session.buffer_pool.fetch(&self.session.disk, 1)?;
            Some(idx)
        } else {
            None
        };
        Ok(())
    }

    fn next(&mut self) -> Result<Option<TupleHandle<'_>>> {
        loop {
            let Some(idx) = self.current_frame else {
                return Ok(None);
            };

            if self.current_slot_id >= self.tuples_per_page {
                self.session.buffer_pool.unpin(idx);
                self.current_page_id += 1;
                self.current_slot_id = 0;
                if self.current_page_id > self.session.page_count_on_disk() {
                    self.current_frame = None;
                    return Ok(None);
                }
                let new_idx = self
                    .session
                    .buffer_pool
                    .fetch(&self.session.disk, self.current_page_id)?;
                self.current_frame = Some(new_idx);
                continue;
            }

            let slot_id = self.current_slot_id;
            self.current_slot_id += 1;

            let frame = self.session.buffer_pool.frame(idx);
            let tuple_size = self.session.catalog.tuple_size() as u64;
            if let Some(handle) = decode_tuple(
                &frame.page.data,
                frame.page_id,
                slot_id,
                tuple_size,
                &self.session.catalog,
            ) {
                return Ok(Some(handle));
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(idx) = self.current_frame.take() {
            self.session.buffer_pool.unpin(idx);
        }
        self.current_page_id = 0;
        self.current_slot_id = 0;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.close()?;
        self.open()
    }
}

impl<'s> Drop for SeqScan<'s> {
    fn drop(&mut self) {
        if let Some(idx) = self.current_frame.take() {
            self.session.buffer_pool.unpin(idx);
        }
    }
}
