//! E2E: whole-program interpreter scenarios.
//!
//! Exercises colon definitions, control flow, and string evaluation the
//! way a user would type them at a prompt, through the public `Vm` API
//! rather than any one module in isolation.

use duckforth::input::InputDescriptor;
use duckforth::interpreter::interpret;
use duckforth::Vm;

fn run(vm: &mut Vm, text: &str) {
    vm.input.push(InputDescriptor::evaluate(text.as_bytes())).expect("push source");
    interpret(vm).expect("interpret");
}

#[test]
fn square_word_computes_its_square() {
    let mut vm = Vm::new(64);
    run(&mut vm, ": SQUARE DUP * ;");
    run(&mut vm, "7 SQUARE");
    assert_eq!(vm.pop().unwrap(), 49);
}

#[test]
fn arithmetic_and_dot_leave_an_empty_stack() {
    let mut vm = Vm::new(64);
    run(&mut vm, "1 2 + .");
    assert_eq!(String::from_utf8_lossy(&vm.output), "3 ");
    assert!(vm.data_stack.is_empty());
}

#[test]
fn begin_until_counts_down_to_zero_while_summing() {
    let mut vm = Vm::new(64);
    run(&mut vm, ": COUNTDOWN ( n -- sum ) 0 SWAP BEGIN SWAP OVER + SWAP 1 - DUP 0= UNTIL DROP ;");
    run(&mut vm, "5 COUNTDOWN");
    assert_eq!(vm.pop().unwrap(), 15);
}

#[test]
fn nested_evaluate_runs_a_string_literal() {
    let mut vm = Vm::new(64);
    run(&mut vm, "S\" 10 20 + \" EVALUATE");
    assert_eq!(vm.pop().unwrap(), 30);
}

#[test]
fn if_else_then_selects_the_right_branch() {
    let mut vm = Vm::new(64);
    run(&mut vm, ": SIGNUM DUP 0< IF DROP -1 ELSE 0> IF 1 ELSE 0 THEN THEN ;");
    run(&mut vm, "-5 SIGNUM");
    assert_eq!(vm.pop().unwrap(), u32::MAX);
    run(&mut vm, "0 SIGNUM");
    assert_eq!(vm.pop().unwrap(), 0);
    run(&mut vm, "5 SIGNUM");
    assert_eq!(vm.pop().unwrap(), 1);
}

#[test]
fn pictured_numeric_output_renders_unsigned_digits() {
    let mut vm = Vm::new(64);
    run(&mut vm, ": U. <# #S #> TYPE ;");
    run(&mut vm, "1234 0 U.");
    assert_eq!(String::from_utf8_lossy(&vm.output), "1234");
}

#[test]
fn sign_prepends_a_minus_for_a_negative_flag() {
    let mut vm = Vm::new(64);
    run(&mut vm, "-1 5 0 <# #S ROT SIGN #> TYPE");
    assert_eq!(String::from_utf8_lossy(&vm.output), "-5");
}

#[test]
fn undefined_word_does_not_poison_the_next_line() {
    let mut vm = Vm::new(64);
    vm.input.push(InputDescriptor::evaluate(b"BOGUSWORD")).unwrap();
    assert!(interpret(&mut vm).is_err());
    run(&mut vm, "3 4 +");
    assert_eq!(vm.pop().unwrap(), 7);
}
