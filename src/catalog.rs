//! Table schema: an ordered list of fixed-size typed attributes plus the
//! tuple layout derived from them.

use crate::common::{
    AttributeType, CATALOG_ATTRIBUTE_NAME_SIZE, CATALOG_RECORD_SIZE, DATA_SIZE, PADDING_NAME,
};
use crate::error::{EngineError, Result};

/// One on-disk catalog entry: a 61-byte NUL-padded name, a 1-byte size, a
/// 1-byte type tag, and a 1-byte display/storage order.
#[derive(Debug, Clone)]
pub struct CatalogRecord {
    attribute_name: [u8; CATALOG_ATTRIBUTE_NAME_SIZE],
    pub attribute_size: u8,
    pub attribute_type: AttributeType,
    pub attribute_order: u8,
}

impl CatalogRecord {
    pub fn new(name: &str, size: u8, attribute_type: AttributeType, order: u8) -> Result<Self> {
        if name.is_empty() || name.as_bytes().len() > CATALOG_ATTRIBUTE_NAME_SIZE {
            return Err(EngineError::InvalidCatalog(format!(
                "attribute name {name:?} must be 1..={CATALOG_ATTRIBUTE_NAME_SIZE} bytes"
            )));
        }
        if size == 0 {
            return Err(EngineError::InvalidCatalog(format!(
                "attribute {name:?} has zero size"
            )));
        }
        let mut attribute_name = [0u8; CATALOG_ATTRIBUTE_NAME_SIZE];
        attribute_name[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self {
            attribute_name,
            attribute_size: size,
            attribute_type,
            attribute_order: order,
        })
    }

    fn padding(size: u8, order: u8) -> Self {
        let mut attribute_name = [0u8; CATALOG_ATTRIBUTE_NAME_SIZE];
        attribute_name[..PADDING_NAME.len()].copy_from_slice(PADDING_NAME.as_bytes());
        Self {
            attribute_name,
            attribute_size: size,
            attribute_type: AttributeType::Unused,
            attribute_order: order,
        }
    }

    pub fn name(&self) -> &str {
        let end = self
            .attribute_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.attribute_name.len());
        std::str::from_utf8(&self.attribute_name[..end]).unwrap_or("")
    }

    pub fn to_bytes(&self) -> [u8; CATALOG_RECORD_SIZE] {
        let mut buf = [0u8; CATALOG_RECORD_SIZE];
        buf[..CATALOG_ATTRIBUTE_NAME_SIZE].copy_from_slice(&self.attribute_name);
        buf[CATALOG_ATTRIBUTE_NAME_SIZE] = self.attribute_size;
        buf[CATALOG_ATTRIBUTE_NAME_SIZE + 1] = self.attribute_type as u8;
        buf[CATALOG_ATTRIBUTE_NAME_SIZE + 2] = self.attribute_order;
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < CATALOG_RECORD_SIZE {
            return Err(EngineError::InvalidCatalog(
                "truncated catalog record".into(),
            ));
        }
        let mut attribute_name = [0u8; CATALOG_ATTRIBUTE_NAME_SIZE];
        attribute_name.copy_from_slice(&buf[..CATALOG_ATTRIBUTE_NAME_SIZE]);
        let attribute_size = buf[CATALOG_ATTRIBUTE_NAME_SIZE];
        let attribute_type = AttributeType::from_u8(buf[CATALOG_ATTRIBUTE_NAME_SIZE + 1])
            .ok_or_else(|| EngineError::InvalidCatalog("unknown attribute type tag".into()))?;
        let attribute_order = buf[CATALOG_ATTRIBUTE_NAME_SIZE + 2];
        Ok(Self {
            attribute_name,
            attribute_size,
            attribute_type,
            attribute_order,
        })
    }
}

/// A table's schema: the ordered attribute list plus the tuple size and
/// per-page capacity derived from it.
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
    tuple_size: u16,
}

impl Catalog {
    /// Builds a catalog from caller-supplied attributes, sorting by
    /// `attribute_order` and appending a synthetic `PADDING` record if
    /// needed so the resulting `tuple_size` (1 null byte + attribute
    /// bytes) is a multiple of 8 and at least 16.
    pub fn build(mut attributes: Vec<CatalogRecord>) -> Result<Self> {
        if attributes.is_empty() {
            return Err(EngineError::InvalidCatalog(
                "catalog must have at least one attribute".into(),
            ));
        }
        attributes.sort_by_key(|r| r.attribute_order);

        let used_bytes: u32 = attributes.iter().map(|r| r.attribute_size as u32).sum();
        let mut tuple_size = 1 + used_bytes;
        let next_order = attributes.last().map(|r| r.attribute_order).unwrap_or(0) + 1;

        let padding_needed = {
            let remainder = tuple_size % 8;
            let pad_for_alignment = if remainder == 0 { 0 } else { 8 - remainder };
            let floor = if tuple_size + pad_for_alignment < 16 {
                16 - (tuple_size + pad_for_alignment)
            } else {
                0
            };
            pad_for_alignment + floor
        };

        if padding_needed > 0 {
            if padding_needed > u8::MAX as u32 {
                return Err(EngineError::InvalidCatalog(
                    "tuple too large to pad to alignment".into(),
                ));
            }
            attributes.push(CatalogRecord::padding(padding_needed as u8, next_order));
            tuple_size += padding_needed;
        }

        if tuple_size as usize > DATA_SIZE {
            return Err(EngineError::InvalidCatalog(format!(
                "tuple_size {tuple_size} exceeds page data size {DATA_SIZE}"
            )));
        }
        if DATA_SIZE / tuple_size as usize == 0 {
            return Err(EngineError::InvalidCatalog(
                "tuple_size leaves no room for a single tuple per page".into(),
            ));
        }

        Ok(Self {
            records: attributes,
            tuple_size: tuple_size as u16,
        })
    }

    /// Rebuilds a catalog from on-disk records (already in storage order);
    /// used by session open, where padding has already been materialized.
    pub fn from_records(mut records: Vec<CatalogRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(EngineError::InvalidCatalog("empty catalog page".into()));
        }
        records.sort_by_key(|r| r.attribute_order);
        let tuple_size: u32 = 1 + records.iter().map(|r| r.attribute_size as u32).sum::<u32>();
        if tuple_size % 8 != 0 || tuple_size < 16 {
            return Err(EngineError::InvalidCatalog(format!(
                "on-disk tuple_size {tuple_size} violates alignment invariant"
            )));
        }
        Ok(Self {
            records,
            tuple_size: tuple_size as u16,
        })
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn tuple_size(&self) -> u16 {
        self.tuple_size
    }

    pub fn tuples_per_page(&self) -> usize {
        DATA_SIZE / self.tuple_size as usize
    }

    /// Count of attributes the caller actually populates (excludes a
    /// trailing padding record, if one was added).
    pub fn num_used(&self) -> usize {
        match self.records.last() {
            Some(r) if matches!(r.attribute_type, AttributeType::Unused) => self.records.len() - 1,
            _ => self.records.len(),
        }
    }

    pub fn get_record(&self, pos: usize) -> Option<&CatalogRecord> {
        self.records.get(pos)
    }

    pub fn get_record_by_name(&self, name: &str) -> Option<(usize, &CatalogRecord)> {
        self.records.iter().position(|r| r.name() == name).map(|i| (i, &self.records[i]))
    }

    /// Byte offset of attribute `pos` within a slot, counting the leading
    /// null byte at offset 0.
    pub fn attribute_offset(&self, pos: usize) -> usize {
        1 + self.records[..pos]
            .iter()
            .map(|r| r.attribute_size as usize)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        Catalog::build(vec![
            CatalogRecord::new("id", 4, AttributeType::Int, 0).unwrap(),
            CatalogRecord::new("name", 50, AttributeType::String, 1).unwrap(),
            CatalogRecord::new("salary", 4, AttributeType::Float, 2).unwrap(),
            CatalogRecord::new("department", 30, AttributeType::String, 3).unwrap(),
            CatalogRecord::new("is_active", 1, AttributeType::Bool, 4).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn five_column_schema_aligns_tuple_size() {
        let catalog = sample_catalog();
        assert_eq!(catalog.tuple_size(), 96);
        assert_eq!(catalog.tuples_per_page(), 85);
        assert_eq!(catalog.num_used(), 5);
    }

    #[test]
    fn record_round_trips_through_bytes() {
        let record = CatalogRecord::new("id", 4, AttributeType::Int, 0).unwrap();
        let bytes = record.to_bytes();
        let back = CatalogRecord::from_bytes(&bytes).unwrap();
        assert_eq!(back.name(), "id");
        assert_eq!(back.attribute_size, 4);
    }

    #[test]
    fn rejects_zero_size_attribute() {
        assert!(CatalogRecord::new("bad", 0, AttributeType::Int, 0).is_err());
    }
}
