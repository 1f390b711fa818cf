pub mod ast;
pub mod cli;
pub mod compare;
pub mod equality;
pub mod evaluator;
pub mod hash;
pub mod normalize;
pub mod path;
pub mod scoped;
pub mod value;

pub use ast::{ArithOp, Ast, AstNode, CmpOp, Function, Identity, Literal, NodeId, NodeKind, Variable};
pub use compare::{compare_literals, compare_nodes, compare_values};
pub use equality::equal_to;
pub use evaluator::{Bindings, EvalError, Evaluator};
pub use hash::{hash, hash_with_seed};
pub use normalize::{NormalizedCmpNode, normalize_cmp_node};
pub use path::{
    PathFormat, Step, StepVisitor, attribute_access_equal, check_attribute_access, find_reference,
    function_name, name_from_attribute_access, name_from_attribute_access_with, recognize_step,
    visit_attribute_access,
};
pub use scoped::{Executor, ExpressionContext, QueryContext, ScopedValue};
pub use value::{Value, ValueType};
