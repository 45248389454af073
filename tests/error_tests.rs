// ABOUTME: Tests for the error taxonomy and throw/try/finally control flow

use cheax::errors::{EDIVZERO, EMATCH, ENOSYM, EOVERFLOW, EREADONLY, ESTACK, EVALUE};
use cheax::{Cheax, ErrState, Value};
use std::rc::Rc;

#[test]
fn test_readonly_enforcement() {
    let mut cx = Cheax::new();
    cx.eval_string("(const x 1)").unwrap();

    let err = cx.eval_string("(set x 2)").unwrap_err();
    assert_eq!(err.code, EREADONLY);
    assert_eq!(cx.errstate(), ErrState::Thrown);
    assert_eq!(cx.errno(), EREADONLY);

    // The binding is untouched.
    assert_eq!(cx.eval_string("x").unwrap(), Value::Int(1));
}

#[test]
fn test_stack_depth_limit_and_recovery() {
    let mut cx = Cheax::new();
    cx.set_max_stack_depth(64).unwrap();
    cx.eval_string(r"(var spin (\ (n) (spin (+ n 1))))").unwrap();

    let before = Rc::clone(cx.env());
    let err = cx.eval_string("(spin 0)").unwrap_err();
    assert_eq!(err.code, ESTACK);

    // The environment stack is back at its pre-call depth.
    assert!(Rc::ptr_eq(&before, cx.env()));

    // And evaluation continues to work.
    assert_eq!(cx.eval_string("(+ 40 2)").unwrap(), Value::Int(42));
}

#[test]
fn test_overflow_then_recovery_via_try() {
    let mut cx = Cheax::new();
    let err = cx.eval_string("(+ 2147483647 1)").unwrap_err();
    assert_eq!(err.code, EOVERFLOW);
    assert_eq!(cx.errstate(), ErrState::Thrown);

    let v = cx
        .eval_string("(try (+ 2147483647 1) (catch EOVERFLOW 'recovered))")
        .unwrap();
    assert_eq!(v, Value::id("recovered"));
    assert_eq!(cx.errstate(), ErrState::Running);
}

#[test]
fn test_division_and_remainder_by_zero() {
    for n in [-7, -1, 0, 1, 12345] {
        let mut cx = Cheax::new();
        let err = cx.eval_string(&format!("(/ {} 0)", n)).unwrap_err();
        assert_eq!(err.code, EDIVZERO);
        let err = cx.eval_string(&format!("(% {} 0)", n)).unwrap_err();
        assert_eq!(err.code, EDIVZERO);
    }
}

#[test]
fn test_finally_runs_exactly_once_per_path() {
    // Count finally runs through a host-synced counter.
    let mut cx = Cheax::new();
    let count = Rc::new(std::cell::Cell::new(0));
    cx.sync_int("count", Rc::clone(&count), cheax::BindingFlags::empty())
        .unwrap();

    // Normal return.
    cx.eval_string("(try 'fine (finally (set count (+ count 1))))")
        .unwrap();
    assert_eq!(count.get(), 1);

    // Caught throw.
    cx.eval_string("(try (throw EVALUE) (catch EVALUE 'c) (finally (set count (+ count 1))))")
        .unwrap();
    assert_eq!(count.get(), 2);

    // Re-thrown.
    let err = cx
        .eval_string("(try (throw EVALUE) (catch EDIVZERO 'c) (finally (set count (+ count 1))))")
        .unwrap_err();
    assert_eq!(err.code, EVALUE);
    assert_eq!(count.get(), 3);
}

#[test]
fn test_nested_try_blocks() {
    let mut cx = Cheax::new();
    let v = cx
        .eval_string(
            "(try
               (try (throw EVALUE \"inner\") (catch EDIVZERO 'wrong))
               (catch EVALUE 'outer))",
        )
        .unwrap();
    assert_eq!(v, Value::id("outer"));
}

#[test]
fn test_errstate_contract() {
    let mut cx = Cheax::new();
    assert_eq!(cx.errstate(), ErrState::Running);
    assert_eq!(cx.errno(), 0);

    cx.eval_string("(throw EVALUE \"boom\")").unwrap_err();
    assert_eq!(cx.errstate(), ErrState::Thrown);
    assert_eq!(cx.errno(), EVALUE);
    assert_eq!(cx.errmsg(), Some("boom"));

    cx.clear();
    assert_eq!(cx.errstate(), ErrState::Running);
    assert_eq!(cx.errno(), 0);
    assert_eq!(cx.errmsg(), None);
}

#[test]
fn test_case_mismatch_is_ematch() {
    let mut cx = Cheax::new();
    let err = cx.eval_string("(case 9 (1 'a))").unwrap_err();
    assert_eq!(err.code, EMATCH);
}

#[test]
fn test_unbound_symbol_reports_enosym() {
    let mut cx = Cheax::new();
    let err = cx.eval_string("(no-such-function 1)").unwrap_err();
    assert_eq!(err.code, ENOSYM);
}

#[test]
fn test_user_error_codes_flow_through_try() {
    let mut cx = Cheax::new();
    let code = cx.new_error_code("EPROTOCOL").unwrap();
    let v = cx
        .eval_string("(try (throw EPROTOCOL \"handshake\") (catch EPROTOCOL (error-msg)))")
        .unwrap();
    assert_eq!(v, Value::string("handshake"));
    assert!(code >= cheax::errors::EUSER0);
}
