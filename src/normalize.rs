use tracing::{instrument, trace};

use crate::{
    ast::{AstNode, CmpOp, NodeKind, Variable},
    path::{check_attribute_access, find_reference},
};

/// A comparison rewritten as `attribute <cmp> value`, with the attribute
/// path of the reference variable on the left.
///
/// Both nodes borrow from the original tree.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedCmpNode<'a> {
    pub attribute: &'a AstNode,
    pub cmp: CmpOp,
    pub value: &'a AstNode,
}

/// Normalizes a binary comparison against the reference variable `reference`.
///
/// Returns `None` when the comparison isn't deterministic, when neither side
/// is a wildcard-free attribute path of `reference`, or when the value side
/// refers to `reference` as well. None of these are errors; the comparison
/// simply can't be served by an index.
///
/// # Examples
///
/// ```
/// use clove_canon::{Ast, CmpOp, normalize_cmp_node};
///
/// let mut ast = Ast::new();
/// let doc = ast.declare_variable("doc");
///
/// // 3 < doc.value
/// let attr = ast.attribute_access(ast.reference(&doc), "value");
/// let cond = ast.compare(CmpOp::Lt, ast.value(3), attr);
///
/// let normalized = normalize_cmp_node(&cond, &doc).unwrap();
/// assert_eq!(normalized.cmp, CmpOp::Gt);
/// assert_eq!(normalized.attribute.string_value(), Some("value"));
/// ```
#[instrument(level = "trace", skip_all, fields(node = node.id().0, reference = reference.name()))]
pub fn normalize_cmp_node<'a>(node: &'a AstNode, reference: &Variable) -> Option<NormalizedCmpNode<'a>> {
    if !node.is_deterministic() {
        trace!("non-deterministic comparison");
        return None;
    }

    let NodeKind::Compare(cmp) = node.kind() else {
        return None;
    };

    let [lhs, rhs] = node.members() else {
        return None;
    };

    let (attribute, value, cmp) = if check_attribute_access(lhs, reference).is_some() {
        (lhs, rhs, cmp)
    } else if check_attribute_access(rhs, reference).is_some() {
        (rhs, lhs, cmp.mirror())
    } else {
        trace!("no attribute path of the reference variable");
        return None;
    };

    if find_reference(value, reference) {
        trace!("value side refers to the reference variable");
        return None;
    }

    Some(NormalizedCmpNode { attribute, cmp, value })
}
