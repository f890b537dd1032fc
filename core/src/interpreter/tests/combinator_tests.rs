//! Tests for control-flow combinators
//!
//! Trees are built directly from node constructors and driven in a context
//! with only the standard operations.

use super::helpers::{drain, empty_context, images, int, ints, op, take};
use crate::interpreter::{Cell, EngineError, Generator, Node, Value};

/* ===================== Leaves ===================== */

#[test]
fn test_constant_yields_once() {
    let mut cx = empty_context();
    let mut node = int(7);
    assert_eq!(ints(&drain(&mut node, &mut cx).unwrap()), vec![7]);
    assert_eq!(drain(&mut node, &mut cx).unwrap(), vec![]);
}

#[test]
fn test_reset_restores_fresh_behaviour() {
    let mut cx = empty_context();
    let mut node = Node::alternation(vec![Node::range(int(1), int(3), None), int(10)]);
    assert_eq!(ints(&take(&mut node, &mut cx, 2)), vec![1, 2]);
    node.reset(&mut cx);
    assert_eq!(ints(&drain(&mut node, &mut cx).unwrap()), vec![1, 2, 3, 10]);
    node.reset(&mut cx);
    assert_eq!(ints(&drain(&mut node, &mut cx).unwrap()), vec![1, 2, 3, 10]);
}

/* ===================== Sequences ===================== */

#[test]
fn test_sequence_resumes_only_last_child() {
    let mut cx = empty_context();
    let mut node = Node::sequence(vec![Node::range(int(1), int(5), None), Node::range(int(1), int(3), None)]);
    assert_eq!(ints(&drain(&mut node, &mut cx).unwrap()), vec![1, 2, 3]);
}

#[test]
fn test_sequence_fails_on_failing_child() {
    let mut cx = empty_context();
    let mut node = Node::sequence(vec![Node::fail(), int(1)]);
    assert_eq!(drain(&mut node, &mut cx).unwrap(), vec![]);
}

#[test]
fn test_block_ignores_failing_statements() {
    let mut cx = empty_context();
    let mut node = Node::block(vec![Node::fail(), int(2)]);
    assert_eq!(ints(&drain(&mut node, &mut cx).unwrap()), vec![2]);

    let mut empty = Node::block(vec![]);
    assert_eq!(drain(&mut empty, &mut cx).unwrap(), vec![Value::Null]);
}

/* ===================== Every / Product ===================== */

#[test]
fn test_every_succeeds_once_whatever_the_generator() {
    let mut cx = empty_context();
    for generator in [Node::fail(), int(1), Node::range(int(1), int(5), None)] {
        let mut node = Node::every(generator, None);
        assert_eq!(drain(&mut node, &mut cx).unwrap(), vec![Value::Null]);
    }
}

#[test]
fn test_every_runs_body_per_result() {
    let mut cx = empty_context();
    let x = Cell::local();
    let sum = Cell::with_value(0.into());
    let mut node = Node::every(
        Node::assign(Node::var(&x), Node::range(int(1), int(5), None)),
        Some(Node::augmented("+", Node::var(&sum), Node::var(&x))),
    );
    assert_eq!(drain(&mut node, &mut cx).unwrap(), vec![Value::Null]);
    assert_eq!(sum.get(), Value::Integer(15));
}

#[test]
fn test_every_break_yields_break_value() {
    let mut cx = empty_context();
    let x = Cell::local();
    let mut node = Node::every(
        Node::assign(Node::var(&x), Node::range(int(1), int(10), None)),
        Some(Node::if_then(
            op("=", vec![Node::var(&x), int(4)]),
            Node::break_with(Some(Node::constant("stop"))),
            None,
        )),
    );
    assert_eq!(drain(&mut node, &mut cx).unwrap(), vec![Value::str("stop")]);
    assert_eq!(x.get(), Value::Integer(4));
}

#[test]
fn test_every_next_skips_rest_of_body() {
    let mut cx = empty_context();
    let x = Cell::local();
    let sum = Cell::with_value(0.into());
    let mut node = Node::every(
        Node::assign(Node::var(&x), Node::range(int(1), int(5), None)),
        Some(Node::block(vec![
            Node::if_then(op("=", vec![Node::var(&x), int(3)]), Node::next(), None),
            Node::augmented("+", Node::var(&sum), Node::var(&x)),
        ])),
    );
    drain(&mut node, &mut cx).unwrap();
    assert_eq!(sum.get(), Value::Integer(12));
}

#[test]
fn test_product_runs_inner_for_each_outer() {
    let mut cx = empty_context();
    let x = Cell::local();
    let mut node = Node::product(
        Node::assign(Node::var(&x), Node::range(int(1), int(2), None)),
        Node::make_list(vec![Node::var(&x), Node::range(int(1), int(3), None)]),
    );
    let results = drain(&mut node, &mut cx).unwrap();
    assert_eq!(
        images(&results),
        vec!["[1,1]", "[1,2]", "[1,3]", "[2,1]", "[2,2]", "[2,3]"]
    );
}

/* ===================== Conditionals and loops ===================== */

#[test]
fn test_if_generates_from_chosen_branch() {
    let mut cx = empty_context();
    let mut then_taken = Node::if_then(int(1), Node::range(int(1), int(2), None), Some(int(0)));
    assert_eq!(ints(&drain(&mut then_taken, &mut cx).unwrap()), vec![1, 2]);

    let mut else_taken = Node::if_then(Node::fail(), int(1), Some(int(0)));
    assert_eq!(ints(&drain(&mut else_taken, &mut cx).unwrap()), vec![0]);

    let mut no_else = Node::if_then(Node::fail(), int(1), None);
    assert_eq!(drain(&mut no_else, &mut cx).unwrap(), vec![]);
}

#[test]
fn test_while_loop_counts() {
    let mut cx = empty_context();
    let i = Cell::with_value(0.into());
    let mut node = Node::while_do(
        op("<", vec![Node::var(&i), int(3)]),
        Some(Node::augmented("+", Node::var(&i), int(1))),
    );
    assert_eq!(drain(&mut node, &mut cx).unwrap(), vec![Value::Null]);
    assert_eq!(i.get(), Value::Integer(3));
}

#[test]
fn test_until_loop_counts() {
    let mut cx = empty_context();
    let i = Cell::with_value(0.into());
    let mut node = Node::until_do(
        op(">=", vec![Node::var(&i), int(4)]),
        Some(Node::augmented("+", Node::var(&i), int(1))),
    );
    assert_eq!(drain(&mut node, &mut cx).unwrap(), vec![Value::Null]);
    assert_eq!(i.get(), Value::Integer(4));
}

#[test]
fn test_repeat_until_break() {
    let mut cx = empty_context();
    let i = Cell::with_value(0.into());
    let mut node = Node::repeat(Node::block(vec![
        Node::augmented("+", Node::var(&i), int(1)),
        Node::if_then(
            op(">=", vec![Node::var(&i), int(3)]),
            Node::break_with(Some(Node::var(&i))),
            None,
        ),
    ]));
    assert_eq!(ints(&drain(&mut node, &mut cx).unwrap()), vec![3]);
}

#[test]
fn test_break_without_value_fails_loop() {
    let mut cx = empty_context();
    let mut node = Node::repeat(Node::break_with(Some(Node::fail())));
    assert_eq!(drain(&mut node, &mut cx).unwrap(), vec![]);
}

/* ===================== Alternation / Not / Limit ===================== */

#[test]
fn test_alternation_concatenates_results() {
    let mut cx = empty_context();
    let mut node = Node::alternation(vec![int(1), Node::range(int(2), int(3), None), Node::fail(), int(4)]);
    assert_eq!(ints(&drain(&mut node, &mut cx).unwrap()), vec![1, 2, 3, 4]);
}

#[test]
fn test_not_inverts_success() {
    let mut cx = empty_context();
    let mut on_fail = Node::not(Node::fail());
    assert_eq!(drain(&mut on_fail, &mut cx).unwrap(), vec![Value::Null]);
    let mut on_success = Node::not(int(1));
    assert_eq!(drain(&mut on_success, &mut cx).unwrap(), vec![]);
}

#[test]
fn test_limit_truncates_generator() {
    let mut cx = empty_context();
    let mut node = Node::limit(Node::range(int(1), int(10), None), int(3));
    assert_eq!(ints(&drain(&mut node, &mut cx).unwrap()), vec![1, 2, 3]);

    let mut zero = Node::limit(Node::range(int(1), int(10), None), int(0));
    assert_eq!(drain(&mut zero, &mut cx).unwrap(), vec![]);
}

#[test]
fn test_negative_limit_is_error() {
    let mut cx = empty_context();
    let mut node = Node::limit(Node::range(int(1), int(10), None), int(-1));
    assert!(matches!(
        drain(&mut node, &mut cx),
        Err(EngineError::TypeMismatch { .. })
    ));
}
