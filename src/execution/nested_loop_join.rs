//! Cross-product join via outer/inner reset.
//!
//! Caches the current outer tuple, pulls inner tuples against it, and on
//! inner exhaustion resets the inner child and advances the outer. The
//! cached outer tuple is detached (`to_owned_tuple`) rather than borrowed:
//! holding a live borrow from one child while calling into a sibling child
//! would make the struct self-referential, which safe Rust disallows.

use crate::error::Result;
use crate::execution::Operator;
use crate::tuple::{OwnedTuple, TupleHandle};

pub struct NestedLoopJoin<'op> {
    outer: Box<dyn Operator + 'op>,
    inner: Box<dyn Operator + 'op>,
    outer_tuple: Option<OwnedTuple>,
    outer_exhausted: bool,
}

impl<'op> NestedLoopJoin<'op> {
    pub fn new(outer: Box<dyn Operator + 'op>, inner: Box<dyn Operator + 'op>) -> Self {
        Self {
            outer,
            inner,
            outer_tuple: None,
            outer_exhausted: false,
        }
    }

    fn pull_next_outer(&mut self) -> Result<()> {
        match self.outer.next()? {
            Some(tuple) => {
                self.outer_tuple = Some(tuple.to_owned_tuple());
                self.outer_exhausted = false;
            }
            None => {
                self.outer_tuple = None;
                self.outer_exhausted = true;
            }
        }
        Ok(())
    }
}

impl<'op> Operator for NestedLoopJoin<'op> {
    fn open(&mut self) -> Result<()> {
        self.outer.open()?;
        self.inner.open()?;
        self.pull_next_outer()
    }

    fn next(&mut self) -> Result<Option<TupleHandle<'_>>> {
        loop {
            if self.outer_exhausted {
                return Ok(None);
            }
            match self.inner.next()? {
                Some(inner_tuple) => {
                    let outer = self
                        .outer_tuple
                        .as_ref()
                        .expect("outer tuple present while not exhausted");
                    return Ok(Some(combine(outer, &inner_tuple)));
                }
                None => {
                    self.inner.reset()?;
                    self.pull_next_outer()?;
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.outer.close()?;
        self.inner.close()?;
        self.outer_tuple = None;
        self.outer_exhausted = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.outer.reset()?;
        self.inner.reset()?;
        self.pull_next_outer()
    }
}

fn combine<'a>(outer: &OwnedTuple, inner: &TupleHandle<'a>) -> TupleHandle<'a> {
    let mut attributes = Vec::with_capacity(outer.attributes.len() + inner.attributes.len());
    attributes.extend(outer.attributes.iter().cloned());
    attributes.extend(inner.attributes.iter().cloned());
    TupleHandle {
        tuple_id: outer.tuple_id,
        is_null: false,
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRecord;
    use crate::common::AttributeType;
    use crate::config::EngineConfig;
    use crate::execution::seq_scan::SeqScan;
    use crate::session::Session;
    use crate::tuple::AttributeValue;

    fn table_with_rows(dir: &std::path::Path, name: &str, rows: usize) -> Session {
        let path = dir.join(format!("{name}.tbl"));
        Session::create_table(
            &path,
            vec![CatalogRecord::new("id", 8, AttributeType::Int, 0).unwrap()],
        )
        .unwrap();
        let config = EngineConfig::default();
        let mut session = Session::open(&path, &config).unwrap();
        for i in 0..rows {
            session.insert_tuple(&[AttributeValue::Int(i as i32)]).unwrap();
        }
        session
    }

    #[test]
    fn cross_product_cardinality() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = table_with_rows(dir.path(), "a", 3);
        let mut b = table_with_rows(dir.path(), "b", 2);

        let scan_a = SeqScan::new(&mut a);
        let scan_b = SeqScan::new(&mut b);
        let mut join = NestedLoopJoin::new(Box::new(scan_a), Box::new(scan_b));
        join.open().unwrap();

        let mut count = 0;
        while join.next().unwrap().is_some() {
            count += 1;
        }
        join.close().unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn empty_outer_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = table_with_rows(dir.path(), "a", 0);
        let mut b = table_with_rows(dir.path(), "b", 2);

        let scan_a = SeqScan::new(&mut a);
        let scan_b = SeqScan::new(&mut b);
        let mut join = NestedLoopJoin::new(Box::new(scan_a), Box::new(scan_b));
        join.open().unwrap();
        assert!(join.next().unwrap().is_none());
    }
}
