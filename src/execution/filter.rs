//! Row-at-a-time predicate evaluation with conjunctive criteria.
//!
//! An empty criteria list passes every tuple; each proposition compares
//! one attribute against a literal; ordering operators (`<`, `<=`, `>`,
//! `>=`) on `Bool` are unsupported and evaluate to false.

use crate::error::Result;
use crate::execution::Operator;
use crate::tuple::{AttributeValue, TupleHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
pub struct Proposition {
    pub attribute_index: usize,
    pub op: CompareOp,
    pub literal: AttributeValue<'static>,
}

pub struct Filter<'op> {
    child: Box<dyn Operator + 'op>,
    criteria: Vec<Proposition>,
}

impl<'op> Filter<'op> {
    pub fn new(child: Box<dyn Operator + 'op>, criteria: Vec<Proposition>) -> Self {
        Self { child, criteria }
    }
}

impl<'op> Operator for Filter<'op> {
    fn open(&mut self) -> Result<()> {
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<TupleHandle<'_>>> {
        loop {
            match self.child.next()? {
                None => return Ok(None),
                Some(tuple) => {
                    if evaluate_criteria(&self.criteria, &tuple) {
                        return Ok(Some(tuple));
                    }
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }

    fn reset(&mut self) -> Result<()> {
        self.child.reset()
    }
}

fn evaluate_criteria(criteria: &[Proposition], tuple: &TupleHandle<'_>) -> bool {
    criteria.iter().all(|p| evaluate_proposition(p, tuple))
}

fn evaluate_proposition(proposition: &Proposition, tuple: &TupleHandle<'_>) -> bool {
    match tuple.attributes.get(proposition.attribute_index) {
        Some(attr) => compare(attr, &proposition.literal, proposition.op),
        None => false,
    }
}

fn compare(lhs: &AttributeValue<'_>, rhs: &AttributeValue<'_>, op: CompareOp) -> bool {
    use AttributeValue::*;
    match (lhs, rhs) {
        (Int(a), Int(b)) => compare_ord(a, b, op),
        (Float(a), Float(b)) => compare_ord(a, b, op),
        (Str(a), Str(b)) => compare_ord(&a.as_ref(), &b.as_ref(), op),
        (Bool(a), Bool(b)) => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            _ => false,
        },
        _ => false,
    }
}

fn compare_ord<T: PartialOrd>(a: &T, b: &T, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_criteria_passes_everything() {
        let tuple = TupleHandle {
            tuple_id: crate::common::TupleId::new(1, 0),
            is_null: false,
            attributes: vec![AttributeValue::Int(5)],
        };
        assert!(evaluate_criteria(&[], &tuple));
    }

    #[test]
    fn bool_ordering_is_unsupported() {
        let prop = Proposition {
            attribute_index: 0,
            op: CompareOp::Lt,
            literal: AttributeValue::Bool(true),
        };
        let tuple = TupleHandle {
            tuple_id: crate::common::TupleId::new(1, 0),
            is_null: false,
            attributes: vec![AttributeValue::Bool(false)],
        };
        assert!(!evaluate_proposition(&prop, &tuple));
    }

    #[test]
    fn numeric_range() {
        let props = vec![
            Proposition {
                attribute_index: 0,
                op: CompareOp::Gt,
                literal: AttributeValue::Int(3),
            },
            Proposition {
                attribute_index: 0,
                op: CompareOp::Le,
                literal: AttributeValue::Int(7),
            },
        ];
        for v in [3, 4, 7, 8] {
            let tuple = TupleHandle {
                tuple_id: crate::common::TupleId::new(1, 0),
                is_null: false,
                attributes: vec![AttributeValue::Int(v)],
            };
            assert_eq!(evaluate_criteria(&props, &tuple), v > 3 && v <= 7, "v={v}");
        }
    }
}
