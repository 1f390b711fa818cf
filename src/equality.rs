use std::cmp::Ordering;

use crate::{
    ast::{AstNode, NodeKind},
    compare::compare_nodes,
    path::attribute_access_equal,
};

/// Structural equality of two expression subtrees.
///
/// True iff both sides denote the same expression shape and compile-time
/// content. Variables, references and builtin functions are compared by
/// identity; kinds without structural rules fall back to node identity.
/// Never fails: any mismatch, including a constant that cannot be
/// compared, is simply "not equal".
///
/// # Examples
///
/// ```
/// use clove_canon::{Ast, equal_to};
///
/// let mut ast = Ast::new();
/// let doc = ast.declare_variable("doc");
///
/// let lhs = ast.attribute_access(ast.reference(&doc), "a");
/// let rhs = ast.attribute_access(ast.reference(&doc), "a");
/// assert!(equal_to(Some(&lhs), Some(&rhs)));
///
/// assert!(equal_to(None, None));
/// assert!(!equal_to(Some(&lhs), None));
/// ```
pub fn equal_to(lhs: Option<&AstNode>, rhs: Option<&AstNode>) -> bool {
    let (lhs, rhs) = match (lhs, rhs) {
        (None, None) => return true,
        (Some(lhs), Some(rhs)) => (lhs, rhs),
        _ => return false,
    };

    if std::ptr::eq(lhs, rhs) {
        return true;
    }

    if lhs.kind() != rhs.kind() || lhs.num_members() != rhs.num_members() {
        return false;
    }

    match lhs.kind() {
        NodeKind::Variable | NodeKind::Reference => lhs.identity() == rhs.identity(),
        NodeKind::AttributeAccess => attribute_access_equal(lhs, rhs, None),
        NodeKind::Value | NodeKind::Object => compare_nodes(lhs, rhs) == Some(Ordering::Equal),
        NodeKind::Array | NodeKind::Range => members_equal(lhs, rhs),
        NodeKind::FunctionCall => {
            lhs.identity() == rhs.identity()
                && lhs.string_value() == rhs.string_value()
                && members_equal(lhs, rhs)
        }
        NodeKind::UserFunctionCall => {
            lhs.string_value() == rhs.string_value() && members_equal(lhs, rhs)
        }
        // only equal by node identity, checked above
        NodeKind::IndexedAccess
        | NodeKind::Expansion
        | NodeKind::Iterator
        | NodeKind::ObjectElement
        | NodeKind::Compare(_)
        | NodeKind::Arithmetic(_)
        | NodeKind::Opaque => false,
    }
}

/// Pairwise, in-order equality of members. Assumes equal member counts.
fn members_equal(lhs: &AstNode, rhs: &AstNode) -> bool {
    lhs.members()
        .iter()
        .zip(rhs.members())
        .all(|(a, b)| equal_to(Some(a), Some(b)))
}
