use std::collections::HashMap;

use clove_canon::{
    NodeKind, Value,
    cli::{
        AstDecoder, CliError, HashOptions, NormalizeOptions, PathOptions, execute_equal, execute_hash,
        execute_normalize, execute_path, json_to_value, value_to_json,
    },
};
use serde_json::json;

const DOC_A_B: &str = r#"{"attr": "b", "of": {"attr": "a", "of": {"ref": "doc"}}}"#;

fn path_of(input: &str, reference: &str, bindings: Option<&str>) -> serde_json::Value {
    let options = PathOptions {
        input: input.to_string(),
        reference: reference.to_string(),
        bindings: bindings.map(str::to_string),
    };
    execute_path(&options).unwrap()["path"].clone()
}

fn normalize(input: &str, reference: &str) -> serde_json::Value {
    execute_normalize(&NormalizeOptions {
        input: input.to_string(),
        reference: reference.to_string(),
    })
    .unwrap()
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_decode_scalars_and_arrays() {
    let mut decoder = AstDecoder::new();

    assert_eq!(decoder.decode_str("null").unwrap().kind(), NodeKind::Value);
    assert_eq!(decoder.decode_str("1.5").unwrap().kind(), NodeKind::Value);
    assert_eq!(decoder.decode_str(r#""x""#).unwrap().string_value(), Some("x"));

    let array = decoder.decode_str("[1, 2, 3]").unwrap();
    assert_eq!(array.kind(), NodeKind::Array);
    assert_eq!(array.num_members(), 3);
}

#[test]
fn test_decode_shares_variables_by_name() {
    let mut decoder = AstDecoder::new();
    let lhs = decoder.decode_str(r#"{"ref": "doc"}"#).unwrap();
    let rhs = decoder.decode_str(r#"{"ref": "doc"}"#).unwrap();
    let other = decoder.decode_str(r#"{"ref": "other"}"#).unwrap();

    assert_eq!(lhs.identity(), rhs.identity());
    assert_ne!(lhs.identity(), other.identity());
    assert_eq!(decoder.variable("doc").id(), lhs.identity().unwrap());
}

#[test]
fn test_decode_expansion() {
    let mut decoder = AstDecoder::new();
    let node = decoder
        .decode_str(r#"{"attr": "b", "of": {"expand": {"attr": "a", "of": {"ref": "doc"}}, "as": "x"}}"#)
        .unwrap();

    let expansion = node.member(0).unwrap();
    assert_eq!(expansion.kind(), NodeKind::Expansion);
    assert_eq!(expansion.member(0).unwrap().kind(), NodeKind::Iterator);
    assert_eq!(expansion.member(1).unwrap().identity(), Some(decoder.variable("x").id()));
}

#[test]
fn test_decode_calls() {
    let mut decoder = AstDecoder::new();

    let builtin = decoder.decode_str(r#"{"call": "LENGTH", "args": [{"ref": "doc"}]}"#).unwrap();
    assert_eq!(builtin.kind(), NodeKind::FunctionCall);
    assert!(builtin.is_deterministic());

    let random = decoder.decode_str(r#"{"call": "RAND", "deterministic": false}"#).unwrap();
    assert!(!random.is_deterministic());

    let user = decoder.decode_str(r#"{"ucall": "MY::FN", "args": [1]}"#).unwrap();
    assert_eq!(user.kind(), NodeKind::UserFunctionCall);
    assert!(!user.is_deterministic());
}

#[test]
fn test_decode_operators() {
    let mut decoder = AstDecoder::new();

    let cmp = decoder.decode_str(r#"{"op": "<=", "lhs": 1, "rhs": 2}"#).unwrap();
    assert!(cmp.kind().is_comparison());

    let sum = decoder.decode_str(r#"{"op": "+", "lhs": 1, "rhs": 2}"#).unwrap();
    assert!(matches!(sum.kind(), NodeKind::Arithmetic(_)));
}

#[test]
fn test_decode_errors() {
    let mut decoder = AstDecoder::new();

    assert!(matches!(decoder.decode_str("{"), Err(CliError::Json(_))));
    assert!(matches!(decoder.decode_str(r#"{"what": 1}"#), Err(CliError::InvalidAst(_))));
    assert!(matches!(
        decoder.decode_str(r#"{"op": "~", "lhs": 1, "rhs": 2}"#),
        Err(CliError::InvalidAst(_))
    ));
    assert!(matches!(decoder.decode_str(r#"{"attr": "a"}"#), Err(CliError::InvalidAst(_))));
    assert!(matches!(decoder.decode_str(r#"{"range": [1]}"#), Err(CliError::InvalidAst(_))));
    assert!(matches!(decoder.decode_str(r#"{"ref": 1}"#), Err(CliError::InvalidAst(_))));
}

#[test]
fn test_encode_mirrors_decode() {
    let input = json!({
        "op": "<",
        "lhs": {"index": 0, "of": {"attr": "a", "of": {"ref": "doc"}}},
        "rhs": {"object": {"k": [1, "x", null], "r": {"range": [1, 3]}}}
    });

    let mut decoder = AstDecoder::new();
    let node = decoder.decode(&input).unwrap();

    assert_eq!(decoder.encode(&node), input);
}

// ============================================================================
// Value Conversion
// ============================================================================

#[test]
fn test_json_to_value() {
    let value = json_to_value(json!({"a": [1, 2.5, "x", true, null]}));

    let mut expected = HashMap::new();
    expected.insert(
        "a".to_string(),
        Value::Array(vec![
            Value::Integer(1),
            Value::Float(2.5),
            Value::String("x".into()),
            Value::Boolean(true),
            Value::Null,
        ]),
    );
    assert_eq!(value, Value::Object(expected));
}

#[test]
fn test_value_to_json() {
    assert_eq!(value_to_json(Value::Range { low: 1, high: 3 }), json!({"low": 1, "high": 3}));
    assert_eq!(value_to_json(Value::Float(f64::NAN)), json!(null));
    assert_eq!(
        value_to_json(Value::Array(vec![Value::Integer(1), Value::String("x".into())])),
        json!([1, "x"])
    );
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn test_hash_is_reproducible_across_invocations() {
    let options = HashOptions {
        input: DOC_A_B.to_string(),
        seed: 0,
    };

    let first = execute_hash(&options).unwrap();
    let second = execute_hash(&options).unwrap();
    assert!(first["hash"].is_u64());
    assert_eq!(first, second);

    let seeded = execute_hash(&HashOptions { seed: 7, ..options }).unwrap();
    assert_ne!(first, seeded);
}

#[test]
fn test_equal_command() {
    let same = execute_equal(DOC_A_B, DOC_A_B).unwrap();
    assert_eq!(same["equal"], json!(true));
    assert_eq!(same["lhs_hash"], same["rhs_hash"]);

    let swapped = execute_equal("[1, 2]", "[2, 1]").unwrap();
    assert_eq!(swapped["equal"], json!(false));

    let numbers = execute_equal("1", "1.0").unwrap();
    assert_eq!(numbers["equal"], json!(true));
    assert_eq!(numbers["lhs_hash"], numbers["rhs_hash"]);
}

#[test]
fn test_path_command() {
    assert_eq!(path_of(DOC_A_B, "doc", None), json!("a.b"));
    assert_eq!(
        path_of(r#"{"index": 0, "of": {"attr": "a", "of": {"ref": "doc"}}}"#, "doc", None),
        json!("a[0]")
    );
}

#[test]
fn test_path_command_with_bindings() {
    let input = r#"{"index": {"ref": "i"}, "of": {"attr": "a", "of": {"ref": "doc"}}}"#;

    assert_eq!(path_of(input, "doc", Some(r#"{"i": 3}"#)), json!("a[3]"));
    assert_eq!(path_of(input, "doc", None), json!(null));
}

#[test]
fn test_path_command_rejections() {
    let expansion = r#"{"attr": "b", "of": {"expand": {"attr": "a", "of": {"ref": "doc"}}}}"#;

    assert_eq!(path_of(expansion, "doc", None), json!(null));
    assert_eq!(path_of(DOC_A_B, "other", None), json!(null));
    assert_eq!(path_of(r#"{"ref": "doc"}"#, "doc", None), json!(null));
}

#[test]
fn test_path_command_invalid_bindings() {
    let options = PathOptions {
        input: DOC_A_B.to_string(),
        reference: "doc".to_string(),
        bindings: Some("[1, 2]".to_string()),
    };

    assert!(matches!(execute_path(&options), Err(CliError::InvalidBindings(_))));
}

#[test]
fn test_normalize_command() {
    let result = normalize(r#"{"op": "<", "lhs": 3, "rhs": {"attr": "value", "of": {"ref": "doc"}}}"#, "doc");

    assert_eq!(
        result,
        json!({
            "applicable": true,
            "attribute": {"attr": "value", "of": {"ref": "doc"}},
            "path": "value",
            "cmp": ">",
            "value": 3,
        })
    );
}

#[test]
fn test_normalize_command_not_applicable() {
    let self_reference = r#"{"op": "==", "lhs": {"attr": "a", "of": {"ref": "doc"}}, "rhs": {"attr": "b", "of": {"ref": "doc"}}}"#;

    assert_eq!(normalize(self_reference, "doc"), json!({ "applicable": false }));
    assert_eq!(normalize("[1, 2]", "doc"), json!({ "applicable": false }));
}
