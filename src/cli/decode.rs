//! JSON encoding of expression trees.
//!
//! Scalars are literal values and arrays are array literals. Every other
//! node kind is an object with one discriminating key:
//!
//! ```text
//! {"ref": "doc"}                              doc
//! {"var": "x"}                                declaration of x
//! {"attr": "a", "of": {"ref": "doc"}}         doc.a
//! {"index": 0, "of": ...}                     ...[0]
//! {"expand": ..., "as": "x"}                  ...[*]
//! {"object": {"k": ...}}                      {k: ...}
//! {"range": [1, 10]}                          1..10
//! {"call": "LENGTH", "args": [...]}           LENGTH(...)
//! {"ucall": "MY::FN", "args": [...]}          MY::FN(...)
//! {"op": "<", "lhs": ..., "rhs": ...}         ... < ...
//! {"opaque": "label"}                         anything else
//! ```
//!
//! Object literal keys come out sorted. Variables and functions with the
//! same name share one identity within one decoder.

use std::collections::HashMap;

use serde_json::{Map, Value as Json, json};

use super::CliError;
use crate::{ArithOp, Ast, AstNode, CmpOp, Function, Literal, NodeKind, Variable};

/// Builds trees from their JSON encoding into one [`Ast`].
#[derive(Debug, Default)]
pub struct AstDecoder {
    ast: Ast,
    variables: HashMap<String, Variable>,
    functions: HashMap<String, Function>,
}

fn invalid(msg: impl Into<String>) -> CliError {
    CliError::InvalidAst(msg.into())
}

impl AstDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// The variable called `name`, declared on first use.
    pub fn variable(&mut self, name: &str) -> Variable {
        if let Some(variable) = self.variables.get(name) {
            return variable.clone();
        }
        let variable = self.ast.declare_variable(name);
        self.variables.insert(name.to_string(), variable.clone());
        variable
    }

    fn function(&mut self, name: &str, deterministic: bool) -> Function {
        if let Some(function) = self.functions.get(name) {
            return function.clone();
        }
        let function = self.ast.register_function(name, deterministic);
        self.functions.insert(name.to_string(), function.clone());
        function
    }

    pub fn decode_str(&mut self, input: &str) -> Result<AstNode, CliError> {
        let json: Json = serde_json::from_str(input)?;
        self.decode(&json)
    }

    pub fn decode(&mut self, json: &Json) -> Result<AstNode, CliError> {
        match json {
            Json::Null => Ok(self.ast.null()),
            Json::Bool(b) => Ok(self.ast.value(*b)),
            Json::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(self.ast.value(i)),
                (None, Some(f)) => Ok(self.ast.value(f)),
                _ => Err(invalid(format!("unsupported number {n}"))),
            },
            Json::String(s) => Ok(self.ast.value(s.as_str())),
            Json::Array(items) => {
                let elements = self.decode_all(items)?;
                Ok(self.ast.array(elements))
            }
            Json::Object(obj) => self.decode_object(obj),
        }
    }

    fn decode_all(&mut self, items: &[Json]) -> Result<Vec<AstNode>, CliError> {
        items.iter().map(|item| self.decode(item)).collect()
    }

    fn decode_args(&mut self, obj: &Map<String, Json>) -> Result<Vec<AstNode>, CliError> {
        match obj.get("args") {
            None => Ok(Vec::new()),
            Some(Json::Array(items)) => self.decode_all(items),
            Some(_) => Err(invalid("\"args\" must be an array")),
        }
    }

    fn decode_field(&mut self, obj: &Map<String, Json>, field: &str) -> Result<AstNode, CliError> {
        let json = obj
            .get(field)
            .ok_or_else(|| invalid(format!("missing \"{field}\"")))?;
        self.decode(json)
    }

    fn decode_object(&mut self, obj: &Map<String, Json>) -> Result<AstNode, CliError> {
        let name = |key: &str| -> Result<Option<&str>, CliError> {
            match obj.get(key) {
                None => Ok(None),
                Some(Json::String(s)) => Ok(Some(s.as_str())),
                Some(_) => Err(invalid(format!("\"{key}\" must be a string"))),
            }
        };

        if let Some(var) = name("ref")? {
            let variable = self.variable(var);
            return Ok(self.ast.reference(&variable));
        }

        if let Some(var) = name("var")? {
            let variable = self.variable(var);
            return Ok(self.ast.variable_node(&variable));
        }

        if let Some(key) = name("attr")? {
            let root = self.decode_field(obj, "of")?;
            return Ok(self.ast.attribute_access(root, key));
        }

        if obj.contains_key("index") {
            let root = self.decode_field(obj, "of")?;
            let offset = self.decode_field(obj, "index")?;
            return Ok(self.ast.indexed_access(root, offset));
        }

        if obj.contains_key("expand") {
            let root = self.decode_field(obj, "expand")?;
            let variable = self.variable(name("as")?.unwrap_or("CURRENT"));
            return Ok(self.ast.expand(root, &variable));
        }

        if let Some(members) = obj.get("object") {
            let Json::Object(members) = members else {
                return Err(invalid("\"object\" must be an object"));
            };
            let mut decoded = Vec::with_capacity(members.len());
            for (key, value) in members {
                decoded.push((key.as_str(), self.decode(value)?));
            }
            return Ok(self.ast.object(decoded));
        }

        if let Some(bounds) = obj.get("range") {
            let Json::Array(bounds) = bounds else {
                return Err(invalid("\"range\" must be an array"));
            };
            let [low, high] = bounds.as_slice() else {
                return Err(invalid("\"range\" needs exactly two bounds"));
            };
            let low = self.decode(low)?;
            let high = self.decode(high)?;
            return Ok(self.ast.range(low, high));
        }

        if let Some(fname) = name("call")? {
            let deterministic = obj.get("deterministic").and_then(Json::as_bool).unwrap_or(true);
            let function = self.function(fname, deterministic);
            let args = self.decode_args(obj)?;
            return Ok(self.ast.function_call(&function, args));
        }

        if let Some(fname) = name("ucall")? {
            let args = self.decode_args(obj)?;
            return Ok(self.ast.user_function_call(fname, args));
        }

        if let Some(symbol) = name("op")? {
            let lhs = self.decode_field(obj, "lhs")?;
            let rhs = self.decode_field(obj, "rhs")?;
            if let Some(op) = CmpOp::from_symbol(symbol) {
                return Ok(self.ast.compare(op, lhs, rhs));
            }
            if let Some(op) = ArithOp::from_symbol(symbol) {
                return Ok(self.ast.arithmetic(op, lhs, rhs));
            }
            return Err(invalid(format!("unknown operator \"{symbol}\"")));
        }

        if obj.contains_key("opaque") {
            let args = self.decode_args(obj)?;
            return Ok(self.ast.opaque(name("opaque").ok().flatten(), args));
        }

        Err(invalid(format!(
            "unrecognized node {}",
            serde_json::to_string(obj).unwrap_or_default()
        )))
    }

    /// JSON encoding of `node`, the inverse of [`AstDecoder::decode`].
    pub fn encode(&self, node: &AstNode) -> Json {
        let var_name = |node: &AstNode| {
            node.identity()
                .and_then(|id| self.ast.variable(id))
                .map(|v| Json::String(v.name().to_string()))
                .unwrap_or(Json::Null)
        };
        let members = |node: &AstNode| -> Vec<Json> { node.members().iter().map(|m| self.encode(m)).collect() };

        match (node.kind(), node.members()) {
            (NodeKind::Value, _) => match node.literal() {
                Some(Literal::Bool(b)) => json!(b),
                Some(Literal::Int(n)) => json!(n),
                Some(Literal::Double(n)) => json!(n),
                Some(Literal::String(s)) => json!(s),
                Some(Literal::Null) | None => Json::Null,
            },
            (NodeKind::Reference, _) => json!({ "ref": var_name(node) }),
            (NodeKind::Variable, _) => json!({ "var": var_name(node) }),
            (NodeKind::AttributeAccess, [root]) => {
                json!({ "attr": node.string_value(), "of": self.encode(root) })
            }
            (NodeKind::IndexedAccess, [root, offset]) => {
                json!({ "index": self.encode(offset), "of": self.encode(root) })
            }
            (NodeKind::Expansion, [iterator, ..]) => match iterator.members() {
                [variable, root] => json!({ "expand": self.encode(root), "as": var_name(variable) }),
                _ => json!({ "opaque": "expansion" }),
            },
            (NodeKind::Array, _) => Json::Array(members(node)),
            (NodeKind::Object, _) => {
                let mut map = Map::new();
                for member in node.members() {
                    if let (Some(key), [value]) = (member.string_value(), member.members()) {
                        map.insert(key.to_string(), self.encode(value));
                    }
                }
                json!({ "object": map })
            }
            (NodeKind::Range, _) => json!({ "range": members(node) }),
            (NodeKind::FunctionCall, _) => json!({
                "call": node.string_value(),
                "args": members(node),
                "deterministic": node.is_deterministic(),
            }),
            (NodeKind::UserFunctionCall, _) => json!({ "ucall": node.string_value(), "args": members(node) }),
            (NodeKind::Compare(op), [lhs, rhs]) => {
                json!({ "op": op.symbol(), "lhs": self.encode(lhs), "rhs": self.encode(rhs) })
            }
            (NodeKind::Arithmetic(op), [lhs, rhs]) => {
                json!({ "op": op.symbol(), "lhs": self.encode(lhs), "rhs": self.encode(rhs) })
            }
            _ => json!({ "opaque": node.string_value(), "args": members(node) }),
        }
    }
}
