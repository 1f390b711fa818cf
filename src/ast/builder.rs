use std::sync::atomic::{AtomicU64, Ordering};

use crate::ast::{ArithOp, AstNode, CmpOp, Identity, Literal, NodeId, NodeKind};

/// A variable declared in an [`Ast`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    id: Identity,
    name: String,
}

impl Variable {
    pub fn id(&self) -> Identity {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A builtin function registered in an [`Ast`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    id: Identity,
    name: String,
    deterministic: bool,
}

impl Function {
    pub fn id(&self) -> Identity {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }
}

/// Build handle for one expression tree.
///
/// Hands out node ids and variable/function identities that are unique
/// within this build, and resolves identities back to declarations.
///
/// # Examples
///
/// ```
/// use clove_canon::Ast;
///
/// let mut ast = Ast::new();
/// let doc = ast.declare_variable("doc");
///
/// // doc.a.b
/// let path = ast.attribute_access(ast.attribute_access(ast.reference(&doc), "a"), "b");
/// assert_eq!(path.num_members(), 1);
/// assert!(path.is_deterministic());
/// ```
#[derive(Debug, Default)]
pub struct Ast {
    next_node: AtomicU64,
    next_identity: u64,
    variables: Vec<Variable>,
    functions: Vec<Function>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_variable(&mut self, name: impl Into<String>) -> Variable {
        let variable = Variable {
            id: self.fresh_identity(),
            name: name.into(),
        };
        self.variables.push(variable.clone());
        variable
    }

    pub fn register_function(&mut self, name: impl Into<String>, deterministic: bool) -> Function {
        let function = Function {
            id: self.fresh_identity(),
            name: name.into(),
            deterministic,
        };
        self.functions.push(function.clone());
        function
    }

    pub fn variable(&self, id: Identity) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn function(&self, id: Identity) -> Option<&Function> {
        self.functions.iter().find(|f| f.id == id)
    }

    fn fresh_identity(&mut self) -> Identity {
        self.next_identity += 1;
        Identity(self.next_identity)
    }

    fn node(
        &self,
        kind: NodeKind,
        members: Vec<AstNode>,
        literal: Option<Literal>,
        identity: Option<Identity>,
        deterministic: bool,
    ) -> AstNode {
        AstNode {
            id: NodeId(self.next_node.fetch_add(1, Ordering::Relaxed)),
            kind,
            members,
            literal,
            identity,
            deterministic,
        }
    }

    fn composite(&self, kind: NodeKind, members: Vec<AstNode>, literal: Option<Literal>) -> AstNode {
        let deterministic = members.iter().all(AstNode::is_deterministic);
        self.node(kind, members, literal, None, deterministic)
    }

    /// Literal value node.
    pub fn value(&self, literal: impl Into<Literal>) -> AstNode {
        self.node(NodeKind::Value, Vec::new(), Some(literal.into()), None, true)
    }

    pub fn null(&self) -> AstNode {
        self.value(Literal::Null)
    }

    /// Use of `variable`.
    pub fn reference(&self, variable: &Variable) -> AstNode {
        self.node(NodeKind::Reference, Vec::new(), None, Some(variable.id), true)
    }

    /// Declaration site of `variable`.
    pub fn variable_node(&self, variable: &Variable) -> AstNode {
        self.node(NodeKind::Variable, Vec::new(), None, Some(variable.id), true)
    }

    /// `root.key`
    pub fn attribute_access(&self, root: AstNode, key: &str) -> AstNode {
        self.composite(NodeKind::AttributeAccess, vec![root], Some(Literal::from(key)))
    }

    /// `root[offset]`
    pub fn indexed_access(&self, root: AstNode, offset: AstNode) -> AstNode {
        self.composite(NodeKind::IndexedAccess, vec![root, offset], None)
    }

    pub fn iterator(&self, variable: &Variable, root: AstNode) -> AstNode {
        self.composite(NodeKind::Iterator, vec![self.variable_node(variable), root], None)
    }

    pub fn expansion(&self, iterator: AstNode, post: AstNode) -> AstNode {
        self.composite(NodeKind::Expansion, vec![iterator, post], None)
    }

    /// `root[*]`, iterating with `variable` and yielding each element as is.
    pub fn expand(&self, root: AstNode, variable: &Variable) -> AstNode {
        self.expansion(self.iterator(variable, root), self.reference(variable))
    }

    pub fn array(&self, elements: Vec<AstNode>) -> AstNode {
        self.composite(NodeKind::Array, elements, None)
    }

    /// Object literal; members keep the given order.
    pub fn object<K: Into<String>>(&self, members: Vec<(K, AstNode)>) -> AstNode {
        let elements = members
            .into_iter()
            .map(|(key, value)| self.object_element(key, value))
            .collect();
        self.composite(NodeKind::Object, elements, None)
    }

    /// A single `key: value` member. Always carries exactly one value member.
    pub fn object_element(&self, key: impl Into<String>, value: AstNode) -> AstNode {
        self.composite(NodeKind::ObjectElement, vec![value], Some(Literal::String(key.into())))
    }

    /// `low..high`
    pub fn range(&self, low: AstNode, high: AstNode) -> AstNode {
        self.composite(NodeKind::Range, vec![low, high], None)
    }

    pub fn function_call(&self, function: &Function, args: Vec<AstNode>) -> AstNode {
        let deterministic = function.deterministic && args.iter().all(AstNode::is_deterministic);
        self.node(
            NodeKind::FunctionCall,
            args,
            Some(Literal::String(function.name.clone())),
            Some(function.id),
            deterministic,
        )
    }

    /// User-defined functions are opaque to the planner and never deterministic.
    pub fn user_function_call(&self, name: &str, args: Vec<AstNode>) -> AstNode {
        self.node(NodeKind::UserFunctionCall, args, Some(Literal::from(name)), None, false)
    }

    pub fn compare(&self, op: CmpOp, lhs: AstNode, rhs: AstNode) -> AstNode {
        self.composite(NodeKind::Compare(op), vec![lhs, rhs], None)
    }

    pub fn arithmetic(&self, op: ArithOp, lhs: AstNode, rhs: AstNode) -> AstNode {
        self.composite(NodeKind::Arithmetic(op), vec![lhs, rhs], None)
    }

    pub fn opaque(&self, label: Option<&str>, members: Vec<AstNode>) -> AstNode {
        self.composite(NodeKind::Opaque, members, label.map(Literal::from))
    }
}
