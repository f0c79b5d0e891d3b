//! Tests for the cross-type value order
//!
//! These tests verify:
//! - Ordering within each type class
//! - The numeric class spanning Int and Float
//! - Type-class ordering across heterogeneous values
//! - Tuple component ordering

use std::cmp::Ordering;

use bramble::Value;

// =============================================================================
// Within-Class Ordering
// =============================================================================

#[test]
fn test_int_ordering() {
    assert!(Value::from(1i64) < Value::from(2i64));
    assert!(Value::from(-5i64) < Value::from(0i64));
}

#[test]
fn test_string_ordering() {
    assert!(Value::from("apple") < Value::from("banana"));
    assert!(Value::from("a") < Value::from("ab"));
}

#[test]
fn test_keyword_ordering() {
    assert!(Value::keyword("age") < Value::keyword("name"));
}

#[test]
fn test_bool_ordering() {
    assert!(Value::from(false) < Value::from(true));
}

// =============================================================================
// Numeric Class
// =============================================================================

#[test]
fn test_int_and_float_compare_numerically() {
    assert!(Value::from(1i64) < Value::from(1.5));
    assert!(Value::from(2.5) < Value::from(3i64));
    assert!(Value::from(-1.5) < Value::from(0i64));
}

#[test]
fn test_numeric_tie_orders_int_first() {
    let int = Value::from(1i64);
    let float = Value::from(1.0);

    assert_eq!(int.cmp(&float), Ordering::Less);
    assert_eq!(float.cmp(&int), Ordering::Greater);
    assert_ne!(int, float);
}

#[test]
fn test_nan_is_totally_ordered() {
    let nan = Value::from(f64::NAN);
    assert_eq!(nan.cmp(&nan), Ordering::Equal);
    assert!(Value::from(1.0) < nan);
}

// =============================================================================
// Cross-Class Ordering
// =============================================================================

#[test]
fn test_type_class_order() {
    let bool_v = Value::from(true);
    let num = Value::from(1_000_000i64);
    let string = Value::from("");
    let keyword = Value::keyword("");
    let tuple = Value::tuple(vec![]);

    assert!(bool_v < num);
    assert!(num < string);
    assert!(string < keyword);
    assert!(keyword < tuple);
}

// =============================================================================
// Tuples
// =============================================================================

#[test]
fn test_tuples_compare_elementwise() {
    let a = Value::tuple(vec![Value::from(1i64), Value::from("b")]);
    let b = Value::tuple(vec![Value::from(1i64), Value::from("c")]);
    let c = Value::tuple(vec![Value::from(2i64), Value::from("a")]);

    assert!(a < b);
    assert!(b < c);
}

#[test]
fn test_shorter_tuple_prefix_orders_first() {
    let short = Value::tuple(vec![Value::from(1i64)]);
    let long = Value::tuple(vec![Value::from(1i64), Value::from(0i64)]);

    assert!(short < long);
}

#[test]
fn test_nested_tuples() {
    let a = Value::tuple(vec![Value::tuple(vec![Value::from(1i64)])]);
    let b = Value::tuple(vec![Value::tuple(vec![Value::from(2i64)])]);

    assert!(a < b);
}

// =============================================================================
// Display
// =============================================================================

#[test]
fn test_display_forms() {
    assert_eq!(Value::keyword("name").to_string(), ":name");
    assert_eq!(Value::from(42i64).to_string(), "42");
    assert_eq!(
        Value::tuple(vec![Value::from(1i64), Value::keyword("a")]).to_string(),
        "[1 :a]"
    );
}
