//! Three-way ordering of constant expression nodes and runtime values.
//!
//! Both orderings share one type order:
//!
//! ```text
//! null < bool < number < string < array < range < object
//! ```
//!
//! Integers and doubles sit on one numeric axis, so `1` and `1.0` compare
//! equal. Mixed comparisons are exact: a fractional double never equals an
//! integer, however close it is.

use std::cmp::Ordering;

use crate::{
    ast::{AstNode, Literal, NodeKind},
    value::Value,
};

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Double(f64),
}

fn compare_numbers(lhs: Number, rhs: Number) -> Ordering {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => a.cmp(&b),
        (Number::Double(a), Number::Double(b)) => {
            a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
        }
        (Number::Int(a), Number::Double(b)) => compare_int_double(a, b),
        (Number::Double(a), Number::Int(b)) => compare_int_double(b, a).reverse(),
    }
}

fn compare_int_double(a: i64, b: f64) -> Ordering {
    if b.is_nan() {
        return (a as f64).total_cmp(&b);
    }
    if let Some(i) = exact_int(b) {
        return a.cmp(&i);
    }
    // b is fractional or outside the i64 range, so it never equals a
    match exact_int(b.floor()) {
        Some(floor) if a <= floor => Ordering::Less,
        Some(_) => Ordering::Greater,
        None if b > 0.0 => Ordering::Less,
        None => Ordering::Greater,
    }
}

/// The integer a double is exactly equal to, if any.
pub(crate) fn exact_int(n: f64) -> Option<i64> {
    // 2^63 is exactly representable, i64::MAX is not
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if n.fract() == 0.0 && n >= -BOUND && n < BOUND {
        Some(n as i64)
    } else {
        None
    }
}

fn literal_rank(literal: &Literal) -> u8 {
    match literal {
        Literal::Null => 0,
        Literal::Bool(_) => 1,
        Literal::Int(_) | Literal::Double(_) => 2,
        Literal::String(_) => 3,
    }
}

fn value_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Float(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Range { .. } => 5,
        Value::Object(_) => 6,
    }
}

/// Compares two literals by the shared type order.
pub fn compare_literals(lhs: &Literal, rhs: &Literal) -> Ordering {
    match (lhs, rhs) {
        (Literal::Null, Literal::Null) => Ordering::Equal,
        (Literal::Bool(a), Literal::Bool(b)) => a.cmp(b),
        (Literal::Int(a), Literal::Int(b)) => a.cmp(b),
        (Literal::Int(a), Literal::Double(b)) => compare_numbers(Number::Int(*a), Number::Double(*b)),
        (Literal::Double(a), Literal::Int(b)) => compare_numbers(Number::Double(*a), Number::Int(*b)),
        (Literal::Double(a), Literal::Double(b)) => {
            compare_numbers(Number::Double(*a), Number::Double(*b))
        }
        (Literal::String(a), Literal::String(b)) => a.cmp(b),
        (a, b) => literal_rank(a).cmp(&literal_rank(b)),
    }
}

fn node_rank(node: &AstNode) -> Option<u8> {
    match node.kind() {
        NodeKind::Value => node.literal().map(literal_rank),
        NodeKind::Array => Some(4),
        NodeKind::Object => Some(6),
        _ => None,
    }
}

/// Compares two constant nodes (values, arrays and objects of constants).
///
/// Returns `None` when either side is not a constant, or when an object
/// member does not carry exactly one value. Callers treat `None` as
/// "not equal".
///
/// Object members are compared in declaration order.
pub fn compare_nodes(lhs: &AstNode, rhs: &AstNode) -> Option<Ordering> {
    let (lhs_rank, rhs_rank) = (node_rank(lhs)?, node_rank(rhs)?);
    if lhs_rank != rhs_rank {
        return Some(lhs_rank.cmp(&rhs_rank));
    }

    match lhs.kind() {
        NodeKind::Value => Some(compare_literals(lhs.literal()?, rhs.literal()?)),
        NodeKind::Array => {
            for (a, b) in lhs.members().iter().zip(rhs.members()) {
                match compare_nodes(a, b)? {
                    Ordering::Equal => {}
                    other => return Some(other),
                }
            }
            Some(lhs.num_members().cmp(&rhs.num_members()))
        }
        NodeKind::Object => {
            for (a, b) in lhs.members().iter().zip(rhs.members()) {
                let (a_key, a_value) = object_member(a)?;
                let (b_key, b_value) = object_member(b)?;
                match a_key.cmp(b_key) {
                    Ordering::Equal => {}
                    other => return Some(other),
                }
                match compare_nodes(a_value, b_value)? {
                    Ordering::Equal => {}
                    other => return Some(other),
                }
            }
            Some(lhs.num_members().cmp(&rhs.num_members()))
        }
        _ => None,
    }
}

/// Key and value of a well-formed object member.
pub(crate) fn object_member(node: &AstNode) -> Option<(&str, &AstNode)> {
    match (node.kind(), node.members()) {
        (NodeKind::ObjectElement, [value]) => Some((node.string_value()?, value)),
        _ => None,
    }
}

/// Compares two runtime values by the shared type order.
///
/// Objects compare by their sorted keys, then by the values under those keys.
pub fn compare_values(lhs: &Value, rhs: &Value) -> Ordering {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        (Value::Integer(a), Value::Float(b)) => compare_numbers(Number::Int(*a), Number::Double(*b)),
        (Value::Float(a), Value::Integer(b)) => compare_numbers(Number::Double(*a), Number::Int(*b)),
        (Value::Float(a), Value::Float(b)) => compare_numbers(Number::Double(*a), Number::Double(*b)),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                match compare_values(x, y) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Range { low: al, high: ah }, Value::Range { low: bl, high: bh }) => {
            al.cmp(bl).then(ah.cmp(bh))
        }
        (Value::Object(a), Value::Object(b)) => {
            let mut a_keys: Vec<&String> = a.keys().collect();
            let mut b_keys: Vec<&String> = b.keys().collect();
            a_keys.sort();
            b_keys.sort();
            for (ka, kb) in a_keys.iter().zip(&b_keys) {
                match ka.cmp(kb) {
                    Ordering::Equal => {}
                    other => return other,
                }
                match compare_values(&a[*ka], &b[*kb]) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            a_keys.len().cmp(&b_keys.len())
        }
        (a, b) => value_rank(a).cmp(&value_rank(b)),
    }
}
