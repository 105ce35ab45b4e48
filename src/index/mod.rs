//! Secondary index: a lazy-split linear hash over one attribute's
//! canonical byte encoding.

pub mod linear_hash;

pub use linear_hash::LinearHashIndex;

use crate::common::fnv1a_64;
use crate::error::Result;
use crate::execution::{Operator, SeqScan};
use crate::session::Session;
use crate::tuple::canonical_bytes;

/// FNV-1a key for one attribute value, the same hash the engine's
/// generic hash primitive uses elsewhere.
pub fn attribute_hash_key(value: &crate::tuple::AttributeValue<'_>) -> u64 {
    fnv1a_64(&canonical_bytes(value))
}

/// Builds an index over `attribute_index` by scanning every live tuple in
/// `session`'s table.
pub fn build_index(
    session: &mut Session,
    attribute_index: usize,
    initial_buckets: usize,
) -> Result<LinearHashIndex> {
    let mut index = LinearHashIndex::new(initial_buckets);
    let mut scan = SeqScan::new(session);
    scan.open()?;
    while let Some(tuple) = scan.next()? {
        if let Some(value) = tuple.attributes.get(attribute_index) {
            let key = attribute_hash_key(value);
            index.insert(key, tuple.tuple_id);
        }
    }
    scan.close()?;
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRecord;
    use crate::common::AttributeType;
    use crate::config::EngineConfig;
    use crate::tuple::AttributeValue;

    #[test]
    fn build_indexes_every_live_tuple() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tbl");
        Session::create_table(
            &path,
            vec![CatalogRecord::new("id", 8, AttributeType::Int, 0).unwrap()],
        )
        .unwrap();
        let config = EngineConfig::default();
        let mut session = Session::open(&path, &config).unwrap();
        let mut ids = Vec::new();
        for i in 0..50 {
            session.insert_tuple(&[AttributeValue::Int(i)]).unwrap();
            ids.push(i);
        }

        let index = build_index(&mut session, 0, 16).unwrap();
        assert_eq!(index.num_records(), 50);
        for i in ids {
            let key = attribute_hash_key(&AttributeValue::Int(i));
            assert!(!index.lookup(key).is_empty());
        }
    }
}
