//! Column subsetting with optional DISTINCT deduplication.
//!
//! DISTINCT hashes each row's canonical byte encoding with FNV-1a into a
//! fixed 256-bucket chained set, deep-copying each newly seen row so the
//! set outlives the borrowed tuple that produced it.

use crate::common::fnv1a_64;
use crate::error::Result;
use crate::execution::Operator;
use crate::tuple::{attributes_equal, canonical_bytes, OwnedTuple, TupleHandle};

const DISTINCT_BUCKETS: usize = 256;

struct DistinctSet {
    buckets: [Vec<OwnedTuple>; DISTINCT_BUCKETS],
}

impl DistinctSet {
    fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Returns `true` if an equal row was already present (caller should
    /// skip it); otherwise records a deep copy and returns `false`.
    fn contains_or_insert(&mut self, tuple: &TupleHandle<'_>) -> bool {
        let hash = content_hash(tuple);
        let bucket = &mut self.buckets[(hash as usize) & (DISTINCT_BUCKETS - 1)];
        if bucket.iter().any(|seen| rows_equal(seen, tuple)) {
            true
        } else {
            bucket.push(tuple.to_owned_tuple());
            false
        }
    }

    fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}

fn content_hash(tuple: &TupleHandle<'_>) -> u64 {
    let mut bytes = Vec::new();
    for attr in &tuple.attributes {
        bytes.extend(canonical_bytes(attr));
    }
    fnv1a_64(&bytes)
}

fn rows_equal(a: &OwnedTuple, b: &TupleHandle<'_>) -> bool {
    a.attributes.len() == b.attributes.len()
        && a.attributes
            .iter()
            .zip(b.attributes.iter())
            .all(|(x, y)| attributes_equal(x, y))
}

pub struct Project<'op> {
    child: Box<dyn Operator + 'op>,
    column_indices: Vec<usize>,
    distinct: Option<DistinctSet>,
}

impl<'op> Project<'op> {
    pub fn new(child: Box<dyn Operator + 'op>, column_indices: Vec<usize>, distinct: bool) -> Self {
        Self {
            child,
            column_indices,
            distinct: distinct.then(DistinctSet::new),
        }
    }
}

impl<'op> Operator for Project<'op> {
    fn open(&mut self) -> Result<()> {
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<TupleHandle<'_>>> {
        loop {
            let Some(tuple) = self.child.next()? else {
                return Ok(None);
            };
            let projected = project_tuple(&tuple, &self.column_indices);
            if let Some(set) = &mut self.distinct {
                if set.contains_or_insert(&projected) {
                    continue;
                }
            }
            return Ok(Some(projected));
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(set) = &mut self.distinct {
            set.clear();
        }
        self.child.close()
    }

    fn reset(&mut self) -> Result<()> {
        if let Some(set) = &mut self.distinct {
            set.clear();
        }
        self.child.reset()
    }
}

fn project_tuple<'a>(tuple: &TupleHandle<'a>, columns: &[usize]) -> TupleHandle<'a> {
    TupleHandle {
        tuple_id: tuple.tuple_id,
        is_null: tuple.is_null,
        attributes: columns.iter().map(|&i| tuple.attributes[i].clone()).collect(),
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

    #[test]
    fn distinct_collapses_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tbl");
        Session::create_table(
            &path,
            vec![CatalogRecord::new("id", 8, AttributeType::Int, 0).unwrap()],
        )
        .unwrap();
        let config = EngineConfig::default();
        let mut session = Session::open(&path, &config).unwrap();

        for id in [1, 2, 1, 3, 2] {
            session.insert_tuple(&[AttributeValue::Int(id)]).unwrap();
        }

        let scan = SeqScan::new(&mut session);
        let mut project = Project::new(Box::new(scan), vec![0], true);
        project.open().unwrap();

        let mut seen = Vec::new();
        while let Some(tuple) = project.next().unwrap() {
            match tuple.attributes[0] {
                AttributeValue::Int(v) => seen.push(v),
                _ => panic!("expected int"),
            }
        }
        project.close().unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
