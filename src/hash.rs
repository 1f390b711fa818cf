//! Structural hashing of expression subtrees.
//!
//! The hash agrees with [`equal_to`](crate::equal_to): structurally equal
//! subtrees hash equally for every seed. The converse does not hold.
//!
//! Identity tokens and node ids only mean something inside one process, so
//! these hashes are in-memory cache keys and must never be persisted.

use xxhash_rust::xxh64::xxh64;

use crate::{
    ast::{AstNode, Identity, Literal, NodeKind},
    compare::{exact_int, object_member},
    path::{Step, recognize_step},
};

#[inline]
fn mix(bytes: &[u8], seed: u64) -> u64 {
    xxh64(bytes, seed)
}

fn mix_identity(identity: Option<Identity>, seed: u64) -> u64 {
    match identity {
        Some(identity) => mix(&identity.0.to_le_bytes(), seed),
        None => seed,
    }
}

fn mix_literal(literal: &Literal, seed: u64) -> u64 {
    match literal {
        Literal::Null => mix(b"null", seed),
        Literal::Bool(true) => mix(b"true", seed),
        Literal::Bool(false) => mix(b"false", seed),
        Literal::Int(n) => mix(&n.to_le_bytes(), seed),
        // integral doubles compare equal to ints, so they must hash like them
        Literal::Double(n) => match exact_int(*n) {
            Some(i) => mix(&i.to_le_bytes(), seed),
            None => mix(&n.to_bits().to_le_bytes(), seed),
        },
        Literal::String(s) => mix(s.as_bytes(), seed),
    }
}

fn mix_members(node: &AstNode, seed: u64) -> u64 {
    node.members()
        .iter()
        .fold(seed, |seed, member| hash_with_seed(Some(member), seed))
}

/// Hash of a subtree with seed `0`.
pub fn hash(node: Option<&AstNode>) -> u64 {
    hash_with_seed(node, 0)
}

/// Hash of a subtree, folding into `seed`.
///
/// Hashing a missing node returns `seed` unchanged.
///
/// # Examples
///
/// ```
/// use clove_canon::{Ast, hash, hash_with_seed};
///
/// let ast = Ast::new();
/// let one = ast.array(vec![ast.value(1), ast.value(2)]);
/// let other = ast.array(vec![ast.value(1), ast.value(2)]);
/// assert_eq!(hash(Some(&one)), hash(Some(&other)));
///
/// assert_eq!(hash_with_seed(None, 42), 42);
/// ```
pub fn hash_with_seed(node: Option<&AstNode>, seed: u64) -> u64 {
    let Some(node) = node else {
        return seed;
    };

    match node.kind() {
        NodeKind::Variable => mix_identity(node.identity(), mix(b"variable", seed)),
        NodeKind::Reference => mix_identity(node.identity(), mix(b"reference", seed)),
        NodeKind::AttributeAccess | NodeKind::IndexedAccess => {
            let tag: &[u8] = if node.kind() == NodeKind::AttributeAccess {
                b"attribute access"
            } else {
                b"indexed access"
            };
            let mut seed = mix(tag, seed);
            if let Some(literal) = node.literal() {
                seed = mix_literal(literal, seed);
            }
            mix_members(node, seed)
        }
        NodeKind::Expansion => {
            let seed = mix(b"*", seed);
            // path equality ignores the iterator variable and the
            // post-expansion reference of a well-formed expansion
            match recognize_step(node) {
                Some(Step::Expansion { root, .. }) => hash_with_seed(Some(root), seed),
                _ => mix_members(node, seed),
            }
        }
        NodeKind::Value => {
            let seed = mix(b"value", seed);
            match node.literal() {
                Some(literal) => mix_literal(literal, seed),
                None => seed,
            }
        }
        NodeKind::Array => mix_members(node, mix(b"array", seed)),
        NodeKind::Object => {
            let mut seed = mix(b"object", seed);
            for member in node.members() {
                if let Some(key) = member.string_value() {
                    seed = mix(key.as_bytes(), seed);
                }
                debug_assert!(
                    object_member(member).is_some(),
                    "object member must carry exactly one value"
                );
                if let Some((_, value)) = object_member(member) {
                    seed = hash_with_seed(Some(value), seed);
                }
            }
            seed
        }
        NodeKind::Range => mix_members(node, mix(b"range", seed)),
        NodeKind::FunctionCall => {
            let mut seed = mix_identity(node.identity(), mix(b"fcall", seed));
            if let Some(name) = node.string_value() {
                seed = mix(name.as_bytes(), seed);
            }
            mix_members(node, seed)
        }
        NodeKind::UserFunctionCall => {
            let mut seed = mix(b"fcalluser", seed);
            if let Some(name) = node.string_value() {
                seed = mix(name.as_bytes(), seed);
            }
            mix_members(node, seed)
        }
        NodeKind::Iterator
        | NodeKind::ObjectElement
        | NodeKind::Compare(_)
        | NodeKind::Arithmetic(_)
        | NodeKind::Opaque => mix(&node.id().0.to_le_bytes(), seed),
    }
}
