//! Minimal end-to-end smoke test for the storage and execution core: create
//! a table, insert rows, and run them through a Filter -> Project pipeline.

use std::borrow::Cow;

use cascade_core::catalog::CatalogRecord;
use cascade_core::common::AttributeType;
use cascade_core::config::{init_tracing, EngineConfig};
use cascade_core::execution::{CompareOp, Filter, Operator, Project, Proposition, SeqScan};
use cascade_core::session::Session;
use cascade_core::tuple::AttributeValue;

fn main() -> cascade_core::Result<()> {
    init_tracing();

    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("employees.tbl");

    Session::create_table(
        &path,
        vec![
            CatalogRecord::new("id", 4, AttributeType::Int, 0)?,
            CatalogRecord::new("name", 32, AttributeType::String, 1)?,
            CatalogRecord::new("active", 1, AttributeType::Bool, 2)?,
        ],
    )?;

    let config = EngineConfig::default();
    let mut session = Session::open(&path, &config)?;

    for i in 1..=10 {
        let name = format!("employee-{i}");
        session.insert_tuple(&[
            AttributeValue::Int(i),
            AttributeValue::Str(Cow::Borrowed(name.as_bytes())),
            AttributeValue::Bool(i % 2 == 0),
        ])?;
    }
    session.flush_buffer_pool()?;

    let scan = SeqScan::new(&mut session);
    let filtered = Filter::new(
        Box::new(scan),
        vec![Proposition {
            attribute_index: 0,
            op: CompareOp::Gt,
            literal: AttributeValue::Int(3),
        }],
    );
    let mut projected = Project::new(Box::new(filtered), vec![0, 1], false);

    projected.open()?;
    println!("id | name");
    while let Some(tuple) = projected.next()? {
        let id = match tuple.attributes[0] {
            AttributeValue::Int(v) => v,
            _ => unreachable!(),
        };
        let name = match &tuple.attributes[1] {
            AttributeValue::Str(s) => String::from_utf8_lossy(s).trim_end_matches('\0').to_string(),
            _ => unreachable!(),
        };
        println!("{id} | {name}");
    }
    projected.close()?;

    session.close()?;
    Ok(())
}
