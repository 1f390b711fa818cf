use std::fmt;

use crate::ast::{ArithOp, CmpOp, Literal};

/// Per-build identifier of a single node.
///
/// Two nodes produced by the same [`Ast`](crate::ast::Ast) never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Opaque identity of a bound variable or a resolved function.
///
/// Identity, not content, is what equality and hashing compare for
/// variables, references and builtin function calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(pub u64);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind tag of an [`AstNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Variable declaration, e.g. the loop variable of an iterator.
    Variable,

    /// Use of a bound variable
    ///
    /// # Example
    /// ```text
    /// doc
    /// ```
    Reference,

    /// Attribute access with a literal key
    ///
    /// # Example
    /// ```text
    /// doc.name
    /// ```
    AttributeAccess,

    /// Access with a computed or literal offset
    ///
    /// # Examples
    /// ```text
    /// doc.items[0]
    /// doc.items[@i + 1]
    /// doc["name"]
    /// ```
    IndexedAccess,

    /// Array expansion (`[*]`)
    ///
    /// Member 0 is an `Iterator`, member 1 the post-expansion expression.
    Expansion,

    /// Iterator of an expansion: a `Variable` and the expression iterated over.
    Iterator,

    /// Literal value (null, bool, int, double, string)
    Value,

    /// Array literal
    ///
    /// # Example
    /// ```text
    /// [1, doc.a, "x"]
    /// ```
    Array,

    /// Object literal; every member is an `ObjectElement`.
    Object,

    /// One `key: value` member of an object literal.
    ObjectElement,

    /// Integer range
    ///
    /// # Example
    /// ```text
    /// 1..10
    /// ```
    Range,

    /// Call of a builtin function resolved at build time.
    FunctionCall,

    /// Call of a user-defined function, known only by name.
    UserFunctionCall,

    /// Binary comparison.
    Compare(CmpOp),

    /// Binary arithmetic.
    Arithmetic(ArithOp),

    /// Any node this crate has no structural knowledge of.
    Opaque,
}

impl NodeKind {
    pub fn is_comparison(self) -> bool {
        matches!(self, NodeKind::Compare(_))
    }
}

/// Immutable expression tree node.
///
/// Nodes are created through [`Ast`](crate::ast::Ast) and never change
/// afterwards. Member order is significant.
#[derive(Debug, Clone)]
pub struct AstNode {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) members: Vec<AstNode>,
    pub(crate) literal: Option<Literal>,
    pub(crate) identity: Option<Identity>,
    pub(crate) deterministic: bool,
}

impl AstNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn members(&self) -> &[AstNode] {
        &self.members
    }

    pub fn num_members(&self) -> usize {
        self.members.len()
    }

    pub fn member(&self, i: usize) -> Option<&AstNode> {
        self.members.get(i)
    }

    /// Literal payload: the value of a `Value` node, the key of an attribute
    /// access or object member, the name of a function call.
    pub fn literal(&self) -> Option<&Literal> {
        self.literal.as_ref()
    }

    /// String payload, if the literal is a string.
    pub fn string_value(&self) -> Option<&str> {
        self.literal.as_ref().and_then(Literal::as_str)
    }

    /// Identity token of a variable, reference or builtin function call.
    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    /// True iff re-evaluating the subtree always yields the same result
    /// within one transactional context.
    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    pub fn is_reference(&self) -> bool {
        self.kind == NodeKind::Reference
    }
}
