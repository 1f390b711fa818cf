//! Run canonicalization operations on JSON-encoded trees

use serde_json::{Value as Json, json};

use super::{AstDecoder, CliError, json_to_value};
use crate::{
    Bindings, Evaluator, QueryContext, check_attribute_access, equal_to, hash_with_seed, name_from_attribute_access,
    normalize_cmp_node,
};

/// Options for the hash command
#[derive(Debug, Clone, Default)]
pub struct HashOptions {
    /// JSON-encoded tree
    pub input: String,
    /// Seed to fold into
    pub seed: u64,
}

/// Options for the path command
#[derive(Debug, Clone, Default)]
pub struct PathOptions {
    /// JSON-encoded tree
    pub input: String,
    /// Name of the reference variable the path must start at
    pub reference: String,
    /// JSON object of variable bindings for computed offsets
    pub bindings: Option<String>,
}

/// Options for the normalize command
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// JSON-encoded comparison
    pub input: String,
    /// Name of the reference variable
    pub reference: String,
}

/// Structural hash of a tree
pub fn execute_hash(options: &HashOptions) -> Result<Json, CliError> {
    let mut decoder = AstDecoder::new();
    let node = decoder.decode_str(&options.input)?;
    Ok(json!({ "hash": hash_with_seed(Some(&node), options.seed) }))
}

/// Structural equality of two trees; variables with the same name are the
/// same variable in both
pub fn execute_equal(lhs: &str, rhs: &str) -> Result<Json, CliError> {
    let mut decoder = AstDecoder::new();
    let lhs = decoder.decode_str(lhs)?;
    let rhs = decoder.decode_str(rhs)?;
    Ok(json!({
        "equal": equal_to(Some(&lhs), Some(&rhs)),
        "lhs_hash": hash_with_seed(Some(&lhs), 0),
        "rhs_hash": hash_with_seed(Some(&rhs), 0),
    }))
}

fn parse_bindings(decoder: &mut AstDecoder, input: Option<&str>) -> Result<Bindings, CliError> {
    let mut bindings = Bindings::new();
    let Some(input) = input else {
        return Ok(bindings);
    };

    let Json::Object(values) = serde_json::from_str::<Json>(input)? else {
        return Err(CliError::InvalidBindings("bindings must be a JSON object".into()));
    };
    for (name, value) in values {
        let variable = decoder.variable(&name);
        bindings.bind(&variable, json_to_value(value));
    }
    Ok(bindings)
}

/// Canonical path string of an attribute path rooted at the reference
/// variable; `null` when the tree has none
pub fn execute_path(options: &PathOptions) -> Result<Json, CliError> {
    let mut decoder = AstDecoder::new();
    let reference = decoder.variable(&options.reference);
    let node = decoder.decode_str(&options.input)?;
    let bindings = parse_bindings(&mut decoder, options.bindings.as_deref())?;

    let evaluator = Evaluator::new();
    let ctx = QueryContext::new(&evaluator, decoder.ast(), &bindings);
    let path = check_attribute_access(&node, &reference)
        .and_then(|node| name_from_attribute_access(node, &ctx));

    Ok(json!({ "path": path }))
}

/// Normalized comparison; `applicable` is false when no index can serve it
pub fn execute_normalize(options: &NormalizeOptions) -> Result<Json, CliError> {
    let mut decoder = AstDecoder::new();
    let reference = decoder.variable(&options.reference);
    let node = decoder.decode_str(&options.input)?;

    let Some(normalized) = normalize_cmp_node(&node, &reference) else {
        return Ok(json!({ "applicable": false }));
    };

    let bindings = Bindings::new();
    let evaluator = Evaluator::new();
    let ctx = QueryContext::new(&evaluator, decoder.ast(), &bindings);

    Ok(json!({
        "applicable": true,
        "attribute": decoder.encode(normalized.attribute),
        "path": name_from_attribute_access(normalized.attribute, &ctx),
        "cmp": normalized.cmp.symbol(),
        "value": decoder.encode(normalized.value),
    }))
}
