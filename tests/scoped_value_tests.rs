use std::cell::Cell;

use clove_canon::{
    Ast, AstNode, Bindings, EvalError, Evaluator, Executor, ExpressionContext, QueryContext,
    ScopedValue, Value, ValueType,
};

/// Delegates to the reference evaluator and counts invocations.
#[derive(Default)]
struct CountingExecutor {
    calls: Cell<usize>,
}

impl Executor for CountingExecutor {
    fn execute(&self, node: &AstNode, ast: &Ast, ctx: &dyn ExpressionContext) -> Result<Value, EvalError> {
        self.calls.set(self.calls.get() + 1);
        Evaluator::new().execute(node, ast, ctx)
    }
}

/// Always fails with a type error.
#[derive(Default)]
struct FailingExecutor {
    calls: Cell<usize>,
}

impl Executor for FailingExecutor {
    fn execute(&self, _node: &AstNode, _ast: &Ast, _ctx: &dyn ExpressionContext) -> Result<Value, EvalError> {
        self.calls.set(self.calls.get() + 1);
        Err(EvalError::TypeError("no".into()))
    }
}

struct PanickingExecutor;

impl Executor for PanickingExecutor {
    fn execute(&self, _node: &AstNode, _ast: &Ast, _ctx: &dyn ExpressionContext) -> Result<Value, EvalError> {
        panic!("boom")
    }
}

fn evaluate(node: &AstNode, ast: &Ast, bindings: &Bindings) -> Option<Value> {
    let evaluator = Evaluator::new();
    let ctx = QueryContext::new(&evaluator, ast, bindings);
    let mut value = ScopedValue::new(node);
    value.execute(&ctx).then(|| value.value().cloned()).flatten()
}

// ============================================================================
// Memoization
// ============================================================================

#[test]
fn test_deterministic_node_is_evaluated_once() {
    let ast = Ast::new();
    let node = ast.value(7);
    let executor = CountingExecutor::default();
    let bindings = Bindings::new();
    let ctx = QueryContext::new(&executor, &ast, &bindings);

    let mut value = ScopedValue::new(&node);
    assert!(value.execute(&ctx));
    assert!(value.execute(&ctx));

    assert_eq!(executor.calls.get(), 1);
    assert_eq!(value.get_int64(), Some(7));
}

#[test]
fn test_non_deterministic_node_is_evaluated_every_time() {
    let mut ast = Ast::new();
    let to_string = ast.register_function("TO_STRING", false);
    let node = ast.function_call(&to_string, vec![ast.value(1)]);
    assert!(!node.is_deterministic());

    let executor = CountingExecutor::default();
    let bindings = Bindings::new();
    let ctx = QueryContext::new(&executor, &ast, &bindings);

    let mut value = ScopedValue::new(&node);
    assert!(value.execute(&ctx));
    assert!(value.execute(&ctx));
    assert!(value.execute(&ctx));

    assert_eq!(executor.calls.get(), 3);
    assert_eq!(value.get_string(), Some("1"));
}

#[test]
fn test_failures_are_not_memoized() {
    let ast = Ast::new();
    let node = ast.value(7);
    let executor = FailingExecutor::default();
    let bindings = Bindings::new();
    let ctx = QueryContext::new(&executor, &ast, &bindings);

    let mut value = ScopedValue::new(&node);
    assert!(!value.execute(&ctx));
    assert!(!value.execute(&ctx));

    assert_eq!(executor.calls.get(), 2);
}

// ============================================================================
// Missing Handles
// ============================================================================

#[test]
fn test_empty_context_fails_without_evaluating() {
    let ast = Ast::new();
    let node = ast.value(7);

    let mut value = ScopedValue::new(&node);
    assert!(!value.execute(&QueryContext::default()));
    assert!(!value.is_executed());
    assert!(value.error().is_none());
}

#[test]
fn test_each_handle_is_required() {
    let ast = Ast::new();
    let node = ast.value(7);
    let executor = CountingExecutor::default();
    let bindings = Bindings::new();

    let contexts = [
        QueryContext {
            plan: None,
            ast: Some(&ast),
            ctx: Some(&bindings),
        },
        QueryContext {
            plan: Some(&executor),
            ast: None,
            ctx: Some(&bindings),
        },
        QueryContext {
            plan: Some(&executor),
            ast: Some(&ast),
            ctx: None,
        },
    ];

    for ctx in &contexts {
        assert!(!ctx.is_complete());
        let mut value = ScopedValue::new(&node);
        assert!(!value.execute(ctx));
    }
    assert_eq!(executor.calls.get(), 0);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_executor_error_is_kept() {
    let ast = Ast::new();
    let node = ast.value(7);
    let executor = FailingExecutor::default();
    let bindings = Bindings::new();
    let ctx = QueryContext::new(&executor, &ast, &bindings);

    let mut value = ScopedValue::new(&node);
    assert!(!value.execute(&ctx));

    assert!(!value.is_executed());
    assert_eq!(value.value(), None);
    assert_eq!(value.value_type(), None);
    assert_eq!(value.error(), Some(&EvalError::TypeError("no".into())));
}

#[test]
fn test_executor_panic_is_caught() {
    let ast = Ast::new();
    let node = ast.value(7);
    let bindings = Bindings::new();
    let ctx = QueryContext::new(&PanickingExecutor, &ast, &bindings);

    let mut value = ScopedValue::new(&node);
    assert!(!value.execute(&ctx));
    assert_eq!(value.error(), Some(&EvalError::Panicked("boom".into())));
}

#[test]
fn test_unbound_variable_fails() {
    let mut ast = Ast::new();
    let i = ast.declare_variable("i");
    let node = ast.reference(&i);
    let evaluator = Evaluator::new();
    let bindings = Bindings::new();
    let ctx = QueryContext::new(&evaluator, &ast, &bindings);

    let mut value = ScopedValue::new(&node);
    assert!(!value.execute(&ctx));
    assert_eq!(value.error(), Some(&EvalError::UndefinedVariable("i".into())));
}

// ============================================================================
// Typed Accessors
// ============================================================================

#[test]
fn test_accessors_before_evaluation() {
    let ast = Ast::new();
    let node = ast.value(7);
    let value = ScopedValue::new(&node);

    assert!(std::ptr::eq(value.node(), &node));
    assert_eq!(value.value_type(), None);
    assert_eq!(value.get_int64(), None);
    assert_eq!(value.get_double(), None);
    assert_eq!(value.get_boolean(), None);
    assert_eq!(value.get_string(), None);
}

#[test]
fn test_int_accessors() {
    let ast = Ast::new();
    let node = ast.value(7);
    let evaluator = Evaluator::new();
    let bindings = Bindings::new();
    let ctx = QueryContext::new(&evaluator, &ast, &bindings);

    let mut value = ScopedValue::new(&node);
    assert!(value.execute(&ctx));
    assert!(value.is_executed());
    assert_eq!(value.value_type(), Some(ValueType::Int));
    assert_eq!(value.get_int64(), Some(7));
    assert_eq!(value.get_double(), Some(7.0));
    assert_eq!(value.get_boolean(), None);
    assert_eq!(value.get_string(), None);
}

#[test]
fn test_double_truncates_toward_zero() {
    let ast = Ast::new();
    let bindings = Bindings::new();

    assert_eq!(evaluate(&ast.value(2.9), &ast, &bindings).and_then(|v| v.as_int()), Some(2));
    assert_eq!(evaluate(&ast.value(-2.9), &ast, &bindings).and_then(|v| v.as_int()), Some(-2));

    let node = ast.value(2.9);
    let evaluator = Evaluator::new();
    let ctx = QueryContext::new(&evaluator, &ast, &bindings);
    let mut value = ScopedValue::new(&node);
    assert!(value.execute(&ctx));
    assert_eq!(value.value_type(), Some(ValueType::Double));
    assert_eq!(value.get_int64(), Some(2));
    assert_eq!(value.get_double(), Some(2.9));
}

#[test]
fn test_bool_and_string_accessors() {
    let ast = Ast::new();
    let bindings = Bindings::new();

    assert_eq!(evaluate(&ast.value(true), &ast, &bindings), Some(Value::Boolean(true)));
    assert_eq!(evaluate(&ast.value("abc"), &ast, &bindings), Some(Value::String("abc".into())));

    let node = ast.value("abc");
    let evaluator = Evaluator::new();
    let ctx = QueryContext::new(&evaluator, &ast, &bindings);
    let mut value = ScopedValue::new(&node);
    assert!(value.execute(&ctx));
    assert_eq!(value.get_string(), Some("abc"));
    assert_eq!(value.get_int64(), None);
}
