//! Lazily evaluated sub-expressions.
//!
//! A [`ScopedValue`] wraps one node and asks the query's [`Executor`] to
//! evaluate it when a path step can't be decided from syntax alone, such as
//! a computed array offset. Results of deterministic nodes are memoized;
//! non-deterministic nodes are re-evaluated on every call.

use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
};

use tracing::{trace, warn};

use crate::{
    ast::{Ast, AstNode, Identity},
    evaluator::EvalError,
    value::{Value, ValueType},
};

/// Runtime variable bindings visible to an evaluation.
pub trait ExpressionContext {
    fn variable_value(&self, variable: Identity) -> Option<&Value>;
}

/// Runs a sub-expression. Implemented by the query's execution plan.
pub trait Executor {
    fn execute(&self, node: &AstNode, ast: &Ast, ctx: &dyn ExpressionContext) -> Result<Value, EvalError>;
}

/// Everything needed to evaluate a sub-expression. Evaluation fails, rather
/// than panics, when any handle is missing.
#[derive(Clone, Copy, Default)]
pub struct QueryContext<'a> {
    /// Execution plan that runs expressions.
    pub plan: Option<&'a dyn Executor>,
    /// The tree the evaluated nodes belong to.
    pub ast: Option<&'a Ast>,
    /// Variable bindings.
    pub ctx: Option<&'a dyn ExpressionContext>,
}

impl<'a> QueryContext<'a> {
    pub fn new(plan: &'a dyn Executor, ast: &'a Ast, ctx: &'a dyn ExpressionContext) -> Self {
        QueryContext {
            plan: Some(plan),
            ast: Some(ast),
            ctx: Some(ctx),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.plan.is_some() && self.ast.is_some() && self.ctx.is_some()
    }
}

impl fmt::Debug for QueryContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("plan", &self.plan.is_some())
            .field("ast", &self.ast.is_some())
            .field("ctx", &self.ctx.is_some())
            .finish()
    }
}

#[derive(Debug)]
enum Evaluation {
    NotEvaluated,
    Evaluated(Value),
    Failed(EvalError),
}

/// Lazily evaluated value of one node.
///
/// Lives within a single traversal and is never shared.
///
/// # Examples
///
/// ```
/// use clove_canon::{Ast, Bindings, Evaluator, QueryContext, ScopedValue, ValueType};
///
/// let ast = Ast::new();
/// let node = ast.value(3);
///
/// let evaluator = Evaluator::new();
/// let bindings = Bindings::new();
/// let ctx = QueryContext::new(&evaluator, &ast, &bindings);
///
/// let mut value = ScopedValue::new(&node);
/// assert!(value.execute(&ctx));
/// assert_eq!(value.value_type(), Some(ValueType::Int));
/// assert_eq!(value.get_int64(), Some(3));
/// ```
#[derive(Debug)]
pub struct ScopedValue<'n> {
    node: &'n AstNode,
    state: Evaluation,
}

impl<'n> ScopedValue<'n> {
    pub fn new(node: &'n AstNode) -> Self {
        ScopedValue {
            node,
            state: Evaluation::NotEvaluated,
        }
    }

    pub fn node(&self) -> &'n AstNode {
        self.node
    }

    /// Evaluates the node, returning whether a value is available.
    ///
    /// A deterministic node that was already evaluated successfully is not
    /// evaluated again. Evaluator errors and panics are reported as `false`.
    pub fn execute(&mut self, ctx: &QueryContext<'_>) -> bool {
        if self.node.is_deterministic() && matches!(self.state, Evaluation::Evaluated(_)) {
            return true;
        }

        let (Some(plan), Some(ast), Some(bindings)) = (ctx.plan, ctx.ast, ctx.ctx) else {
            trace!(?ctx, "incomplete query context, can't evaluate expression");
            return false;
        };

        let node = self.node;
        let result = panic::catch_unwind(AssertUnwindSafe(|| plan.execute(node, ast, bindings)))
            .unwrap_or_else(|payload| Err(EvalError::Panicked(panic_message(payload))));

        match result {
            Ok(value) => {
                self.state = Evaluation::Evaluated(value);
                true
            }
            Err(err) => {
                warn!(error = %err, node = node.id().0, "can't evaluate expression");
                self.state = Evaluation::Failed(err);
                false
            }
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self.state, Evaluation::Evaluated(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.state {
            Evaluation::Evaluated(value) => Some(value),
            _ => None,
        }
    }

    /// Error of the last failed evaluation.
    pub fn error(&self) -> Option<&EvalError> {
        match &self.state {
            Evaluation::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.value().map(Value::value_type)
    }

    /// Numeric value as an integer; doubles are truncated toward zero.
    pub fn get_int64(&self) -> Option<i64> {
        self.value().and_then(Value::as_int)
    }

    pub fn get_double(&self) -> Option<f64> {
        self.value().and_then(Value::as_float)
    }

    pub fn get_boolean(&self) -> Option<bool> {
        self.value().and_then(Value::as_bool)
    }

    pub fn get_string(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
