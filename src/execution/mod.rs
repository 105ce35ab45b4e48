//! Pull-based query executor: a small iterator-model framework plus four
//! operators (SeqScan, Filter, Project, NestedLoopJoin).
//!
//! Operators form a tree of `Box<dyn Operator>` children and expose
//! `open`/`next`/`close`/`reset`. There's no explicit teardown method —
//! whichever leaf operator directly holds a pinned frame (`SeqScan`)
//! implements `Drop` to unpin it, and Rust's ordinary per-field drop glue
//! propagates that into every composite operator above it (`Filter`,
//! `Project`, `NestedLoopJoin`) automatically once their owned
//! `Box<dyn Operator>` children are dropped — no composite operator needs
//! its own `Drop` impl to make this happen.

pub mod filter;
pub mod nested_loop_join;
pub mod project;
pub mod seq_scan;

pub use filter::{CompareOp, Filter, Proposition};
pub use nested_loop_join::NestedLoopJoin;
pub use project::Project;
pub use seq_scan::SeqScan;

use crate::error::Result;
use crate::tuple::TupleHandle;

/// Pull-based operator contract. Each `next()` call returns a tuple view
/// borrowed from `&mut self`, so the borrow checker enforces that the
/// returned tuple is valid only until the next call to next/reset/close.
pub trait Operator {
    fn open(&mut self) -> Result<()>;
    fn next(&mut self) -> Result<Option<TupleHandle<'_>>>;
    fn close(&mut self) -> Result<()>;
    fn reset(&mut self) -> Result<()>;
}
