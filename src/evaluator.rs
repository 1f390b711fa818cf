use std::collections::HashMap;

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    ast::{ArithOp, Ast, AstNode, CmpOp, Identity, Literal, NodeKind, Variable},
    compare::{compare_values, object_member},
    scoped::{ExpressionContext, Executor},
    value::Value,
};

/// Largest range `[*]` will materialize.
const MAX_RANGE_EXPANSION: u64 = 10_000_000;

/// Number of integers in `low..high`, `None` when it doesn't fit an i64.
fn range_length(low: i64, high: i64) -> Option<i64> {
    if high < low {
        return Some(0);
    }
    high.checked_sub(low)?.checked_add(1)
}

/// Errors that can occur while evaluating a sub-expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    TypeError(String),

    /// Invalid field access or array index
    #[error("Access error: {0}")]
    AccessError(String),

    /// Reference to a variable without a binding
    #[error("Undefined variable: {0} is not bound")]
    UndefinedVariable(String),

    /// Call of a function the tree doesn't know
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// User-defined functions run outside this evaluator
    #[error("User function {0} can't be evaluated here")]
    UserFunction(String),

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Node kind that has no value on its own
    #[error("{0} nodes can't be evaluated")]
    NotEvaluable(&'static str),

    /// The executor panicked
    #[error("Evaluator panicked: {0}")]
    Panicked(String),
}

/// Variable bindings backed by a map.
///
/// # Examples
///
/// ```
/// use clove_canon::{Ast, Bindings, ExpressionContext, Value};
///
/// let mut ast = Ast::new();
/// let i = ast.declare_variable("i");
///
/// let mut bindings = Bindings::new();
/// bindings.bind(&i, Value::Integer(2));
/// assert_eq!(bindings.variable_value(i.id()), Some(&Value::Integer(2)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<Identity, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, variable: &Variable, value: Value) {
        self.values.insert(variable.id(), value);
    }

    pub fn with(mut self, variable: &Variable, value: Value) -> Self {
        self.bind(variable, value);
        self
    }
}

impl ExpressionContext for Bindings {
    fn variable_value(&self, variable: Identity) -> Option<&Value> {
        self.values.get(&variable)
    }
}

/// One extra binding on top of a parent context, used for the iterator
/// variable of an expansion.
struct Overlay<'p> {
    parent: &'p dyn ExpressionContext,
    variable: Identity,
    value: Value,
}

impl ExpressionContext for Overlay<'_> {
    fn variable_value(&self, variable: Identity) -> Option<&Value> {
        if variable == self.variable {
            Some(&self.value)
        } else {
            self.parent.variable_value(variable)
        }
    }
}

/// Reference expression evaluator.
///
/// Evaluates literals, accesses, expansions, builtin functions, comparisons
/// and arithmetic against a set of variable bindings.
///
/// # Examples
///
/// ```
/// use clove_canon::{Ast, ArithOp, Bindings, Evaluator, Executor, Value};
///
/// let mut ast = Ast::new();
/// let i = ast.declare_variable("i");
/// let expr = ast.arithmetic(ArithOp::Add, ast.reference(&i), ast.value(1));
///
/// let bindings = Bindings::new().with(&i, Value::Integer(41));
/// let result = Evaluator::new().execute(&expr, &ast, &bindings).unwrap();
/// assert_eq!(result, Value::Integer(42));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Executor for Evaluator {
    fn execute(&self, node: &AstNode, ast: &Ast, ctx: &dyn ExpressionContext) -> Result<Value, EvalError> {
        self.eval(node, ast, ctx)
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    fn eval(&self, node: &AstNode, ast: &Ast, ctx: &dyn ExpressionContext) -> Result<Value, EvalError> {
        match node.kind() {
            NodeKind::Value => Ok(node.literal().map(Literal::to_value).unwrap_or(Value::Null)),
            NodeKind::Reference => {
                let id = node
                    .identity()
                    .ok_or_else(|| EvalError::TypeError("reference without a variable".into()))?;
                ctx.variable_value(id).cloned().ok_or_else(|| {
                    let name = ast.variable(id).map(|v| v.name().to_string());
                    EvalError::UndefinedVariable(name.unwrap_or_else(|| id.to_string()))
                })
            }
            NodeKind::AttributeAccess => match (node.members(), node.string_value()) {
                ([root], Some(key)) => {
                    let object = self.eval(root, ast, ctx)?;
                    self.apply_access(&object, &Value::String(key.to_string()))
                }
                _ => Err(EvalError::TypeError("malformed attribute access".into())),
            },
            NodeKind::IndexedAccess => match node.members() {
                [root, offset] => {
                    let object = self.eval(root, ast, ctx)?;
                    let key = self.eval(offset, ast, ctx)?;
                    self.apply_access(&object, &key)
                }
                _ => Err(EvalError::TypeError("malformed indexed access".into())),
            },
            NodeKind::Expansion => self.eval_expansion(node, ast, ctx),
            NodeKind::Array => {
                let mut arr = Vec::with_capacity(node.num_members());
                for member in node.members() {
                    arr.push(self.eval(member, ast, ctx)?);
                }
                Ok(Value::Array(arr))
            }
            NodeKind::Object => {
                let mut map = HashMap::new();
                for member in node.members() {
                    let (key, value) = object_member(member)
                        .ok_or_else(|| EvalError::TypeError("malformed object member".into()))?;
                    map.insert(key.to_string(), self.eval(value, ast, ctx)?);
                }
                Ok(Value::Object(map))
            }
            NodeKind::Range => match node.members() {
                [low, high] => {
                    let low = self.eval(low, ast, ctx)?;
                    let high = self.eval(high, ast, ctx)?;
                    match (low.as_int(), high.as_int()) {
                        (Some(low), Some(high)) => Ok(Value::Range { low, high }),
                        _ => Err(EvalError::TypeError(format!(
                            "Range bounds must be numeric, got {} and {}",
                            low.type_name(),
                            high.type_name()
                        ))),
                    }
                }
                _ => Err(EvalError::TypeError("malformed range".into())),
            },
            NodeKind::FunctionCall => {
                let function = node
                    .identity()
                    .and_then(|id| ast.function(id))
                    .ok_or_else(|| EvalError::UnknownFunction(node.string_value().unwrap_or("?").to_string()))?;
                let mut args = Vec::with_capacity(node.num_members());
                for member in node.members() {
                    args.push(self.eval(member, ast, ctx)?);
                }
                self.call_builtin(function.name(), &args)
            }
            NodeKind::UserFunctionCall => Err(EvalError::UserFunction(
                node.string_value().unwrap_or("?").to_string(),
            )),
            NodeKind::Compare(op) => match node.members() {
                [lhs, rhs] => {
                    let lhs = self.eval(lhs, ast, ctx)?;
                    let rhs = self.eval(rhs, ast, ctx)?;
                    Ok(Value::Boolean(self.apply_compare(op, &lhs, &rhs)))
                }
                _ => Err(EvalError::TypeError("malformed comparison".into())),
            },
            NodeKind::Arithmetic(op) => match node.members() {
                [lhs, rhs] => {
                    let lhs = self.eval(lhs, ast, ctx)?;
                    let rhs = self.eval(rhs, ast, ctx)?;
                    self.apply_arithmetic(op, &lhs, &rhs)
                }
                _ => Err(EvalError::TypeError("malformed arithmetic".into())),
            },
            NodeKind::Variable => Err(EvalError::NotEvaluable("variable")),
            NodeKind::Iterator => Err(EvalError::NotEvaluable("iterator")),
            NodeKind::ObjectElement => Err(EvalError::NotEvaluable("object member")),
            NodeKind::Opaque => Err(EvalError::NotEvaluable("opaque")),
        }
    }

    /// `root[*]`: evaluates the post-expansion expression once per element,
    /// with the iterator variable bound to that element.
    fn eval_expansion(&self, node: &AstNode, ast: &Ast, ctx: &dyn ExpressionContext) -> Result<Value, EvalError> {
        let [iterator, post, ..] = node.members() else {
            return Err(EvalError::TypeError("malformed expansion".into()));
        };
        let ([variable, root], NodeKind::Iterator) = (iterator.members(), iterator.kind()) else {
            return Err(EvalError::TypeError("malformed expansion iterator".into()));
        };
        let variable = variable
            .identity()
            .ok_or_else(|| EvalError::TypeError("iterator without a variable".into()))?;

        let items = match self.eval(root, ast, ctx)? {
            Value::Array(items) => items,
            Value::Range { low, high } => match range_length(low, high) {
                Some(n) if n as u64 <= MAX_RANGE_EXPANSION => (low..=high).map(Value::Integer).collect(),
                _ => {
                    return Err(EvalError::TypeError(format!(
                        "Cannot expand range {low}..{high}; it exceeds {MAX_RANGE_EXPANSION} elements"
                    )));
                }
            },
            Value::Null => Vec::new(),
            other => {
                return Err(EvalError::TypeError(format!(
                    "Cannot expand {}; only arrays can be expanded",
                    other.type_name()
                )));
            }
        };

        let mut result = Vec::with_capacity(items.len());
        for item in items {
            let scope = Overlay {
                parent: ctx,
                variable,
                value: item,
            };
            result.push(self.eval(post, ast, &scope)?);
        }
        Ok(Value::Array(result))
    }

    fn apply_access(&self, object: &Value, key: &Value) -> Result<Value, EvalError> {
        match (object, key) {
            (Value::Null, _) => Ok(Value::Null),
            (Value::Object(map), Value::String(k)) => Ok(map.get(k).cloned().unwrap_or(Value::Null)),
            (Value::Object(map), Value::Integer(k)) => {
                Ok(map.get(&k.to_string()).cloned().unwrap_or(Value::Null))
            }
            (Value::Object(map), Value::Float(k)) => {
                Ok(map.get(&k.to_string()).cloned().unwrap_or(Value::Null))
            }
            (Value::Array(arr), Value::Integer(_) | Value::Float(_)) => {
                let Some(n) = key.as_int() else {
                    return Err(EvalError::AccessError(format!("invalid array index {}", key.as_string())));
                };
                let index = if n < 0 {
                    // Negative index: count from end (-1 = last, -2 = second to last)
                    let abs_idx = n.unsigned_abs() as usize;
                    if abs_idx > arr.len() {
                        return Ok(Value::Null);
                    }
                    arr.len() - abs_idx
                } else {
                    n as usize
                };
                Ok(arr.get(index).cloned().unwrap_or(Value::Null))
            }
            (Value::Array(_), Value::String(k)) => Err(EvalError::TypeError(format!(
                "Cannot use string key '{}' on array; use integer index instead",
                k
            ))),
            (v, Value::Integer(_)) => Err(EvalError::TypeError(format!(
                "Cannot use integer index on {}; only arrays support integer indexing",
                v.type_name()
            ))),
            _ => Err(EvalError::AccessError(format!(
                "Cannot access {} with {} key",
                object.type_name(),
                key.type_name()
            ))),
        }
    }

    fn apply_compare(&self, op: CmpOp, lhs: &Value, rhs: &Value) -> bool {
        let ordering = compare_values(lhs, rhs);
        match op {
            CmpOp::Eq => ordering.is_eq(),
            CmpOp::Ne => ordering.is_ne(),
            CmpOp::Lt => ordering.is_lt(),
            CmpOp::Le => ordering.is_le(),
            CmpOp::Gt => ordering.is_gt(),
            CmpOp::Ge => ordering.is_ge(),
        }
    }

    fn apply_arithmetic(&self, op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
        if matches!(op, ArithOp::Divide | ArithOp::Modulo)
            && right.as_float().is_some_and(|r| r == 0.0)
        {
            return Err(EvalError::DivisionByZero);
        }

        match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => Ok(integer_arithmetic(op, *a, *b)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_arithmetic(op, *a, *b))),
            (Value::Integer(a), Value::Float(b)) => Ok(mixed_arithmetic(
                op,
                Decimal::from_i64(*a),
                Decimal::from_f64(*b),
                *a as f64,
                *b,
            )),
            (Value::Float(a), Value::Integer(b)) => Ok(mixed_arithmetic(
                op,
                Decimal::from_f64(*a),
                Decimal::from_i64(*b),
                *a,
                *b as f64,
            )),
            (Value::String(a), Value::String(b)) if op == ArithOp::Add => {
                Ok(Value::String(format!("{}{}", a, b)))
            }
            (a, b) => Err(EvalError::TypeError(format!(
                "Cannot apply {} to {} and {}",
                op.symbol(),
                a.type_name(),
                b.type_name()
            ))),
        }
    }

    fn call_builtin(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        match (name.to_ascii_uppercase().as_str(), args) {
            ("LENGTH", [value]) => match value {
                Value::Null => Ok(Value::Integer(0)),
                Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
                Value::Array(arr) => Ok(Value::Integer(arr.len() as i64)),
                Value::Object(obj) => Ok(Value::Integer(obj.len() as i64)),
                Value::Range { low, high } => range_length(*low, *high)
                    .map(Value::Integer)
                    .ok_or_else(|| EvalError::TypeError(format!("LENGTH() overflows on range {low}..{high}"))),
                v => Err(EvalError::TypeError(format!("LENGTH() not supported on {}", v.type_name()))),
            },
            ("LOWER", [Value::String(s)]) => Ok(Value::String(s.to_lowercase())),
            ("UPPER", [Value::String(s)]) => Ok(Value::String(s.to_uppercase())),
            ("TO_STRING", [value]) => Ok(Value::String(value.as_string())),
            ("CONCAT", values) => Ok(Value::String(values.iter().map(Value::as_string).collect())),
            ("REGEX_TEST", [Value::String(text), Value::String(pattern)]) => {
                let re = regex::Regex::new(pattern)
                    .map_err(|e| EvalError::TypeError(format!("invalid regex: {e}")))?;
                Ok(Value::Boolean(re.is_match(text)))
            }
            ("LENGTH" | "LOWER" | "UPPER" | "TO_STRING" | "REGEX_TEST", _) => Err(EvalError::TypeError(
                format!("invalid arguments for {}()", name),
            )),
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }
}

fn integer_arithmetic(op: ArithOp, a: i64, b: i64) -> Value {
    let exact = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Subtract => a.checked_sub(b),
        ArithOp::Multiply => a.checked_mul(b),
        // Check if division is exact; if not, return Float
        ArithOp::Divide => a.checked_rem(b).filter(|r| *r == 0).and_then(|_| a.checked_div(b)),
        ArithOp::Modulo => a.checked_rem(b),
    };
    match exact {
        Some(n) => Value::Integer(n),
        None => Value::Float(float_arithmetic(op, a as f64, b as f64)),
    }
}

fn float_arithmetic(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Subtract => a - b,
        ArithOp::Multiply => a * b,
        ArithOp::Divide => a / b,
        ArithOp::Modulo => a % b,
    }
}

/// Mixed integer/float arithmetic, kept integral when the exact decimal
/// result is a whole number.
fn mixed_arithmetic(op: ArithOp, ad: Option<Decimal>, bd: Option<Decimal>, a: f64, b: f64) -> Value {
    if let (Some(ad), Some(bd)) = (ad, bd) {
        let rd = match op {
            ArithOp::Add => ad.checked_add(bd),
            ArithOp::Subtract => ad.checked_sub(bd),
            ArithOp::Multiply => ad.checked_mul(bd),
            ArithOp::Divide => ad.checked_div(bd),
            ArithOp::Modulo => ad.checked_rem(bd),
        };
        if let Some(rd) = rd {
            if rd.is_integer()
                && let Some(r) = rd.to_i64()
            {
                return Value::Integer(r);
            } else if let Some(r) = rd.to_f64() {
                return Value::Float(r);
            }
        }
    }
    Value::Float(float_arithmetic(op, a, b))
}
