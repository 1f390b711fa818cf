use clove_canon::{Ast, AstNode, CmpOp, Variable, equal_to, hash, hash_with_seed};

fn path(ast: &Ast, var: &Variable, keys: &[&str]) -> AstNode {
    keys.iter()
        .fold(ast.reference(var), |root, key| ast.attribute_access(root, key))
}

fn assert_coherent(lhs: &AstNode, rhs: &AstNode) {
    assert!(equal_to(Some(lhs), Some(rhs)), "expected {:?} nodes to be equal", lhs.kind());
    for seed in [0, 1, 0xdead_beef, u64::MAX] {
        assert_eq!(
            hash_with_seed(Some(lhs), seed),
            hash_with_seed(Some(rhs), seed),
            "equal {:?} nodes hash differently with seed {}",
            lhs.kind(),
            seed
        );
    }
}

// ============================================================================
// Missing Nodes and Seeds
// ============================================================================

#[test]
fn test_missing_node_returns_seed() {
    assert_eq!(hash(None), 0);
    assert_eq!(hash_with_seed(None, 42), 42);
    assert_eq!(hash_with_seed(None, u64::MAX), u64::MAX);
}

#[test]
fn test_default_seed_is_zero() {
    let ast = Ast::new();
    let node = ast.value("abc");

    assert_eq!(hash(Some(&node)), hash_with_seed(Some(&node), 0));
}

#[test]
fn test_seed_changes_hash() {
    let ast = Ast::new();
    let node = ast.value("abc");

    assert_ne!(hash_with_seed(Some(&node), 1), hash_with_seed(Some(&node), 2));
}

#[test]
fn test_hash_is_stable() {
    let mut ast = Ast::new();
    let doc = ast.declare_variable("doc");
    let node = path(&ast, &doc, &["a", "b"]);

    assert_eq!(hash(Some(&node)), hash(Some(&node)));
}

// ============================================================================
// Coherence With Equality
// ============================================================================

#[test]
fn test_equal_literals_hash_equally() {
    let ast = Ast::new();

    assert_coherent(&ast.null(), &ast.null());
    assert_coherent(&ast.value(true), &ast.value(true));
    assert_coherent(&ast.value(7), &ast.value(7));
    assert_coherent(&ast.value(2.5), &ast.value(2.5));
    assert_coherent(&ast.value("abc"), &ast.value("abc"));
}

#[test]
fn test_int_and_integral_double_hash_equally() {
    let ast = Ast::new();

    assert_coherent(&ast.value(1), &ast.value(1.0));
    assert_coherent(&ast.value(-3), &ast.value(-3.0));
}

#[test]
fn test_int_and_tiny_double_are_neither_equal_nor_hash_equal() {
    let ast = Ast::new();

    for tiny in [1e-30, 5e-324] {
        let (zero, double) = (ast.value(0), ast.value(tiny));
        assert!(!equal_to(Some(&zero), Some(&double)));
        assert_ne!(hash(Some(&zero)), hash(Some(&double)));
    }
}

#[test]
fn test_equal_paths_hash_equally() {
    let mut ast = Ast::new();
    let doc = ast.declare_variable("doc");

    assert_coherent(&ast.reference(&doc), &ast.reference(&doc));
    assert_coherent(&path(&ast, &doc, &["a", "b"]), &path(&ast, &doc, &["a", "b"]));
}

#[test]
fn test_expansions_over_different_variables_hash_equally() {
    let mut ast = Ast::new();
    let doc = ast.declare_variable("doc");
    let x = ast.declare_variable("x");
    let y = ast.declare_variable("y");

    let lhs = ast.attribute_access(ast.expand(path(&ast, &doc, &["a"]), &x), "b");
    let rhs = ast.attribute_access(ast.expand(path(&ast, &doc, &["a"]), &y), "b");

    assert_coherent(&lhs, &rhs);
}

#[test]
fn test_equal_composites_hash_equally() {
    let mut ast = Ast::new();
    let doc = ast.declare_variable("doc");
    let length = ast.register_function("LENGTH", true);

    let array = || ast.array(vec![ast.value(1), path(&ast, &doc, &["a"])]);
    let object = || ast.object(vec![("a", ast.value(1)), ("b", ast.array(vec![ast.value("x")]))]);
    let range = || ast.range(ast.value(1), ast.value(5));
    let call = || ast.function_call(&length, vec![path(&ast, &doc, &["a"])]);
    let user = || ast.user_function_call("MY::FN", vec![ast.value(1)]);

    assert_coherent(&array(), &array());
    assert_coherent(&object(), &object());
    assert_coherent(&range(), &range());
    assert_coherent(&call(), &call());
    assert_coherent(&user(), &user());
}

#[test]
fn test_node_hashes_like_itself() {
    let ast = Ast::new();
    let node = ast.compare(CmpOp::Eq, ast.value(1), ast.value(1));

    assert_coherent(&node, &node);
}

// ============================================================================
// Distinguishing Nodes
// ============================================================================

#[test]
fn test_array_order_changes_hash() {
    let ast = Ast::new();
    let lhs = ast.array(vec![ast.value(1), ast.value(2)]);
    let rhs = ast.array(vec![ast.value(2), ast.value(1)]);

    assert_ne!(hash(Some(&lhs)), hash(Some(&rhs)));
}

#[test]
fn test_references_to_different_variables() {
    let mut ast = Ast::new();
    let a = ast.declare_variable("doc");
    let b = ast.declare_variable("doc");

    assert_ne!(hash(Some(&ast.reference(&a))), hash(Some(&ast.reference(&b))));
}

#[test]
fn test_reference_and_declaration_differ() {
    let mut ast = Ast::new();
    let x = ast.declare_variable("x");

    assert_ne!(hash(Some(&ast.reference(&x))), hash(Some(&ast.variable_node(&x))));
}

#[test]
fn test_attribute_and_indexed_access_differ() {
    let mut ast = Ast::new();
    let doc = ast.declare_variable("doc");

    let attribute = ast.attribute_access(ast.reference(&doc), "a");
    let indexed = ast.indexed_access(ast.reference(&doc), ast.value("a"));

    assert_ne!(hash(Some(&attribute)), hash(Some(&indexed)));
}

#[test]
fn test_value_types_differ() {
    let ast = Ast::new();

    assert_ne!(hash(Some(&ast.value(1))), hash(Some(&ast.value("1"))));
    assert_ne!(hash(Some(&ast.value(1))), hash(Some(&ast.value(1.5))));
    assert_ne!(hash(Some(&ast.value(true))), hash(Some(&ast.value(false))));
}

#[test]
fn test_builtin_and_user_calls_differ() {
    let mut ast = Ast::new();
    let length = ast.register_function("LENGTH", true);

    let builtin = ast.function_call(&length, vec![ast.value("x")]);
    let user = ast.user_function_call("LENGTH", vec![ast.value("x")]);

    assert_ne!(hash(Some(&builtin)), hash(Some(&user)));
}

#[test]
fn test_distinct_opaque_nodes_differ() {
    let ast = Ast::new();
    let lhs = ast.opaque(Some("subquery"), vec![]);
    let rhs = ast.opaque(Some("subquery"), vec![]);

    assert!(!equal_to(Some(&lhs), Some(&rhs)));
    assert_ne!(hash(Some(&lhs)), hash(Some(&rhs)));
}

#[test]
fn test_object_keys_change_hash() {
    let ast = Ast::new();
    let lhs = ast.object(vec![("a", ast.value(1))]);
    let rhs = ast.object(vec![("b", ast.value(1))]);

    assert_ne!(hash(Some(&lhs)), hash(Some(&rhs)));
}
