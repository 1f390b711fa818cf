//! Attribute paths: chains of attribute, index and expansion steps that end
//! at a reference to a bound variable.
//!
//! ```text
//! doc.a.b        attribute, attribute
//! doc.a[0]       attribute, index
//! doc.a[@i]      attribute, computed index
//! doc.a[*].b     attribute, expansion, attribute
//! ```
//!
//! One step recognizer ([`recognize_step`]) defines which node shapes form a
//! path. The recursive walk ([`visit_attribute_access`]) reports steps to a
//! [`StepVisitor`] from the root variable outwards. Three visitors are built
//! on top of it:
//!
//! - [`check_attribute_access`] - is a node a wildcard-free path rooted at a
//!   given variable
//! - [`attribute_access_equal`] - do two paths address the same attribute
//! - [`name_from_attribute_access`] - canonical path string for the index

use tracing::{instrument, trace};

use crate::{
    ast::{AstNode, Identity, Literal, NodeKind, Variable},
    scoped::{QueryContext, ScopedValue},
    value::ValueType,
};

/// One recognized step of an attribute path.
#[derive(Debug, Clone, Copy)]
pub enum Step<'a> {
    /// `root[*]`: an `Expansion` whose first member is an `Iterator` over
    /// (`Variable`, root) and whose second member is a `Reference`.
    Expansion {
        node: &'a AstNode,
        variable: &'a AstNode,
        root: &'a AstNode,
        reference: &'a AstNode,
    },

    /// `root[offset]`
    Index {
        node: &'a AstNode,
        root: &'a AstNode,
        offset: &'a AstNode,
    },

    /// `root.key`
    Attribute {
        node: &'a AstNode,
        root: &'a AstNode,
        key: &'a str,
    },

    /// End of the path: a `Reference` or a string `Value`.
    Head(&'a AstNode),
}

impl<'a> Step<'a> {
    /// The node the step is applied to, `None` for the head.
    pub fn root(&self) -> Option<&'a AstNode> {
        match self {
            Step::Expansion { root, .. } | Step::Index { root, .. } | Step::Attribute { root, .. } => {
                Some(root)
            }
            Step::Head(_) => None,
        }
    }

    /// Reports the step to `visitor`. The head carries no step and is
    /// accepted unconditionally.
    pub fn accept<V: StepVisitor + ?Sized>(&self, visitor: &mut V) -> bool {
        match *self {
            Step::Expansion { node, .. } => visitor.expansion_step(node),
            Step::Index { offset, .. } => visitor.index_step(offset),
            Step::Attribute { node, key, .. } => visitor.attribute_step(node, key),
            Step::Head(_) => true,
        }
    }
}

/// Recognizes the path step `node` represents, if any.
pub fn recognize_step(node: &AstNode) -> Option<Step<'_>> {
    match (node.kind(), node.members()) {
        (NodeKind::Expansion, [iterator, reference, ..]) => match iterator.members() {
            [variable, root]
                if iterator.kind() == NodeKind::Iterator
                    && variable.kind() == NodeKind::Variable
                    && reference.is_reference() =>
            {
                Some(Step::Expansion {
                    node,
                    variable,
                    root,
                    reference,
                })
            }
            _ => None,
        },
        (NodeKind::IndexedAccess, [root, offset]) => Some(Step::Index { node, root, offset }),
        (NodeKind::AttributeAccess, [root]) => {
            node.string_value().map(|key| Step::Attribute { node, root, key })
        }
        (NodeKind::Reference, []) => Some(Step::Head(node)),
        (NodeKind::Value, []) if node.literal().is_some_and(Literal::is_string) => {
            Some(Step::Head(node))
        }
        _ => None,
    }
}

/// Receives the steps of an attribute path. Returning `false` stops the walk.
pub trait StepVisitor {
    /// `root.key`
    fn attribute_step(&mut self, node: &AstNode, key: &str) -> bool;

    /// `root[offset]`
    fn index_step(&mut self, offset: &AstNode) -> bool;

    /// `root[*]`
    fn expansion_step(&mut self, node: &AstNode) -> bool;
}

/// Walks the path ending at `node`, reporting steps root first.
///
/// Returns the head of the path when every step was recognized and
/// accepted. After an expansion the walk continues into the post-expansion
/// expression, but the head is still taken from the iterated root.
pub fn visit_attribute_access<'a, V: StepVisitor + ?Sized>(
    node: &'a AstNode,
    visitor: &mut V,
) -> Option<&'a AstNode> {
    match recognize_step(node)? {
        Step::Head(head) => Some(head),
        Step::Expansion { node, root, reference, .. } => {
            let head = visit_attribute_access(root, visitor)?;
            if !visitor.expansion_step(node) {
                return None;
            }
            visit_attribute_access(reference, visitor)?;
            Some(head)
        }
        step => {
            let head = visit_attribute_access(step.root()?, visitor)?;
            step.accept(visitor).then_some(head)
        }
    }
}

/// Accepts attribute and index steps, rejects `[*]`.
struct PathChecker;

impl StepVisitor for PathChecker {
    fn attribute_step(&mut self, _node: &AstNode, _key: &str) -> bool {
        true
    }

    fn index_step(&mut self, _offset: &AstNode) -> bool {
        true
    }

    fn expansion_step(&mut self, _node: &AstNode) -> bool {
        false
    }
}

/// Returns `node` if it is an attribute path rooted at `variable` with at
/// least one access step and no expansion.
///
/// # Examples
///
/// ```
/// use clove_canon::{Ast, check_attribute_access};
///
/// let mut ast = Ast::new();
/// let doc = ast.declare_variable("doc");
/// let other = ast.declare_variable("other");
///
/// let path = ast.attribute_access(ast.reference(&doc), "a");
/// assert!(check_attribute_access(&path, &doc).is_some());
/// assert!(check_attribute_access(&path, &other).is_none());
///
/// // a bare reference is not a path
/// assert!(check_attribute_access(&ast.reference(&doc), &doc).is_none());
/// ```
pub fn check_attribute_access<'a>(node: &'a AstNode, variable: &Variable) -> Option<&'a AstNode> {
    if node.is_reference() {
        return None;
    }

    let head = visit_attribute_access(node, &mut PathChecker)?;
    (head.is_reference() && head.identity() == Some(variable.id())).then_some(node)
}

/// Key of a single path step as seen by path equality.
#[derive(Debug, Clone, PartialEq)]
enum PathKey {
    Str(String),
    Int(i64),
    Ref(Identity),
}

#[derive(Debug, Clone, PartialEq)]
enum StepValue {
    Invalid,
    Expansion,
    Access(PathKey),
    Value(PathKey),
}

/// Reads one path step at a time, from the outermost step inwards.
struct StepReader<'c> {
    ctx: Option<&'c QueryContext<'c>>,
    value: StepValue,
}

impl<'c> StepReader<'c> {
    fn new(ctx: Option<&'c QueryContext<'c>>) -> Self {
        StepReader {
            ctx,
            value: StepValue::Invalid,
        }
    }

    /// Reads the step at `node`. Returns the node of the next step, or
    /// `None` at the end of the path or on invalid input.
    fn read<'a>(&mut self, node: &'a AstNode) -> Option<&'a AstNode> {
        self.value = StepValue::Invalid;

        match recognize_step(node)? {
            Step::Head(head) => {
                self.value = match head.identity() {
                    Some(identity) if head.is_reference() => StepValue::Value(PathKey::Ref(identity)),
                    _ => StepValue::Value(PathKey::Str(head.string_value()?.to_string())),
                };
                None
            }
            step => {
                if step.accept(self) {
                    step.root()
                } else {
                    None
                }
            }
        }
    }
}

impl StepVisitor for StepReader<'_> {
    fn attribute_step(&mut self, _node: &AstNode, key: &str) -> bool {
        self.value = StepValue::Access(PathKey::Str(key.to_string()));
        true
    }

    fn index_step(&mut self, offset: &AstNode) -> bool {
        // offsets can't be evaluated at compile time
        let Some(ctx) = self.ctx else {
            return false;
        };

        let mut value = ScopedValue::new(offset);
        if !value.execute(ctx) {
            return false;
        }

        let key = match value.value_type() {
            Some(ValueType::Int | ValueType::Double) => value.get_int64().map(PathKey::Int),
            Some(ValueType::String) => value.get_string().map(|s| PathKey::Str(s.to_string())),
            _ => None,
        };

        match key {
            Some(key) => {
                self.value = StepValue::Access(key);
                true
            }
            None => false,
        }
    }

    fn expansion_step(&mut self, _node: &AstNode) -> bool {
        self.value = StepValue::Expansion;
        true
    }
}

/// True iff two attribute paths address the same attribute.
///
/// Both paths are read step by step in lockstep. Expansion steps match any
/// other expansion step. Index steps are only comparable when `ctx` can
/// evaluate their offsets; without a context they never match.
pub fn attribute_access_equal(
    lhs: &AstNode,
    rhs: &AstNode,
    ctx: Option<&QueryContext<'_>>,
) -> bool {
    let mut lhs_reader = StepReader::new(ctx);
    let mut rhs_reader = StepReader::new(ctx);
    let (mut lhs, mut rhs) = (lhs, rhs);

    loop {
        // both reads always run so each reader advances exactly once per
        // iteration, even when the other side has already failed
        let lhs_next = lhs_reader.read(lhs);
        let rhs_next = rhs_reader.read(rhs);

        let (Some(lhs_next), Some(rhs_next)) = (lhs_next, rhs_next) else {
            break;
        };

        if lhs_reader.value != rhs_reader.value {
            return false;
        }

        lhs = lhs_next;
        rhs = rhs_next;
    }

    lhs_reader.value != StepValue::Invalid
        && rhs_reader.value != StepValue::Invalid
        && lhs_reader.value == rhs_reader.value
}

/// Markers used to render a canonical path string.
///
/// The default renders `doc.a[0].b` as `a[0].b`. Keys are not escaped, so a
/// key containing the delimiter produces an ambiguous name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFormat {
    /// Between two consecutive keys.
    pub delimiter: char,
    /// Before a numeric offset.
    pub offset_prefix: char,
    /// After a numeric offset.
    pub offset_suffix: char,
}

impl Default for PathFormat {
    fn default() -> Self {
        PathFormat {
            delimiter: '.',
            offset_prefix: '[',
            offset_suffix: ']',
        }
    }
}

struct PathNameBuilder<'f, 'c> {
    format: &'f PathFormat,
    ctx: &'c QueryContext<'c>,
    name: String,
}

impl PathNameBuilder<'_, '_> {
    fn append_key(&mut self, key: &str) {
        if !self.name.is_empty() {
            self.name.push(self.format.delimiter);
        }
        self.name.push_str(key);
    }

    fn append_offset(&mut self, offset: i64) {
        self.name.push(self.format.offset_prefix);
        self.name.push_str(&offset.to_string());
        self.name.push(self.format.offset_suffix);
    }
}

impl StepVisitor for PathNameBuilder<'_, '_> {
    fn attribute_step(&mut self, _node: &AstNode, key: &str) -> bool {
        self.append_key(key);
        true
    }

    fn index_step(&mut self, offset: &AstNode) -> bool {
        let mut value = ScopedValue::new(offset);
        if !value.execute(self.ctx) {
            return false;
        }

        match value.value_type() {
            Some(ValueType::Int | ValueType::Double) => match value.get_int64() {
                Some(offset) => {
                    self.append_offset(offset);
                    true
                }
                None => false,
            },
            Some(ValueType::String) => match value.get_string() {
                Some(key) => {
                    self.append_key(key);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn expansion_step(&mut self, _node: &AstNode) -> bool {
        // [*] has no canonical name
        false
    }
}

/// Canonical path string of an attribute path, rendered with the default
/// [`PathFormat`].
///
/// Computed offsets are evaluated through `ctx`. Fails on expansions, on
/// offsets that don't evaluate to a number or string, and on paths that
/// don't end at a reference. A bare reference yields the empty name.
///
/// # Examples
///
/// ```
/// use clove_canon::{Ast, Bindings, Evaluator, QueryContext, name_from_attribute_access};
///
/// let mut ast = Ast::new();
/// let doc = ast.declare_variable("doc");
/// let path = ast.indexed_access(ast.attribute_access(ast.reference(&doc), "a"), ast.value(0));
///
/// let evaluator = Evaluator::new();
/// let bindings = Bindings::new();
/// let ctx = QueryContext::new(&evaluator, &ast, &bindings);
///
/// assert_eq!(name_from_attribute_access(&path, &ctx).as_deref(), Some("a[0]"));
/// ```
pub fn name_from_attribute_access(node: &AstNode, ctx: &QueryContext<'_>) -> Option<String> {
    name_from_attribute_access_with(node, ctx, &PathFormat::default())
}

/// Like [`name_from_attribute_access`], with explicit markers.
#[instrument(level = "trace", skip_all, fields(node = node.id().0))]
pub fn name_from_attribute_access_with(
    node: &AstNode,
    ctx: &QueryContext<'_>,
    format: &PathFormat,
) -> Option<String> {
    let mut builder = PathNameBuilder {
        format,
        ctx,
        name: String::new(),
    };

    match visit_attribute_access(node, &mut builder) {
        Some(head) if head.is_reference() => Some(builder.name),
        _ => {
            trace!("not a canonicalizable attribute path");
            None
        }
    }
}

/// True iff any node in the subtree is a reference to `variable`.
pub fn find_reference(node: &AstNode, variable: &Variable) -> bool {
    (node.is_reference() && node.identity() == Some(variable.id()))
        || node.members().iter().any(|member| find_reference(member, variable))
}

/// Name of the function a call node invokes.
pub fn function_name(node: &AstNode) -> Option<&str> {
    match node.kind() {
        NodeKind::FunctionCall | NodeKind::UserFunctionCall => node.string_value(),
        _ => None,
    }
}
