//! The compiler: `:`/`;`, control-flow structures, literals, and the
//! defining words (L5).
//!
//! Migrated from `forth/words/compile.c` (`:`/`;`, `LITERAL`, string
//! literals, `POSTPONE`), `forth/words/control.c` (`IF`/`ELSE`/`THEN`,
//! `BEGIN`/`UNTIL`/`WHILE`/`REPEAT`/`AGAIN`), and `forth/words/value.c`
//! (`VALUE`/`TO`/`2VALUE`/`2VARIABLE`). Every word here is registered
//! directly against [`crate::vm::Vm`]'s dispatch table — the control-flow
//! and defining words are all `IMMEDIATE`, so the ordinary outer
//! interpreter dispatch in `interpreter.rs` runs them at compile time
//! exactly the way it runs any other immediate word.
//!
//! Reading a defining word's name (`: NAME`, `VALUE NAME`, …) uses
//! [`read_word`] directly against the current input line — these names
//! are expected on the same line as the word that introduces them, same
//! as typing `: SQUARE DUP * ;` at one prompt.

use crate::config::CELL;
use crate::dict::{self, SearchResult};
use crate::error::ForthError;
use crate::parser::word::{read_word, WordBuffer};
use crate::vm::{patch_branch, Body, ControlKind, Instr, Vm};

enum ToKind {
    Single(u32),
    Double(u32),
}

pub fn register(vm: &mut Vm) {
    vm.define_native(b":", |vm| {
        let mut buf = WordBuffer::new();
        read_word(vm.input.current_mut(), b' ', &mut buf)?;
        vm.begin_colon(buf.as_counted());
        Ok(())
    });

    let semi = vm.define_native(b";", |vm| vm.end_colon());
    vm.set_immediate(semi);

    let if_addr = vm.define_native(b"IF", |vm| {
        let b = vm.builder()?;
        let idx = b.body.len();
        b.body.push(Instr::ZBranch(0));
        b.control_stack.push((ControlKind::If, idx));
        Ok(())
    });
    vm.set_immediate(if_addr);

    let else_addr = vm.define_native(b"ELSE", |vm| {
        let b = vm.builder()?;
        let (kind, if_idx) = b.control_stack.pop().ok_or(ForthError::InterpretFail)?;
        if kind != ControlKind::If {
            return Err(ForthError::InterpretFail);
        }
        let else_idx = b.body.len();
        b.body.push(Instr::Branch(0));
        let target = b.body.len();
        patch_branch(&mut b.body, if_idx, target, true);
        b.control_stack.push((ControlKind::Else, else_idx));
        Ok(())
    });
    vm.set_immediate(else_addr);

    let then_addr = vm.define_native(b"THEN", |vm| {
        let b = vm.builder()?;
        let (kind, idx) = b.control_stack.pop().ok_or(ForthError::InterpretFail)?;
        if kind != ControlKind::If && kind != ControlKind::Else {
            return Err(ForthError::InterpretFail);
        }
        let target = b.body.len();
        patch_branch(&mut b.body, idx, target, kind == ControlKind::If);
        Ok(())
    });
    vm.set_immediate(then_addr);

    let begin_addr = vm.define_native(b"BEGIN", |vm| {
        let b = vm.builder()?;
        let here = b.body.len();
        b.control_stack.push((ControlKind::Begin, here));
        Ok(())
    });
    vm.set_immediate(begin_addr);

    let until_addr = vm.define_native(b"UNTIL", |vm| {
        let b = vm.builder()?;
        let (kind, begin_idx) = b.control_stack.pop().ok_or(ForthError::InterpretFail)?;
        if kind != ControlKind::Begin {
            return Err(ForthError::InterpretFail);
        }
        let idx = b.body.len();
        b.body.push(Instr::ZBranch(0));
        patch_branch(&mut b.body, idx, begin_idx, true);
        Ok(())
    });
    vm.set_immediate(until_addr);

    let again_addr = vm.define_native(b"AGAIN", |vm| {
        let b = vm.builder()?;
        let (kind, begin_idx) = b.control_stack.pop().ok_or(ForthError::InterpretFail)?;
        if kind != ControlKind::Begin {
            return Err(ForthError::InterpretFail);
        }
        let idx = b.body.len();
        b.body.push(Instr::Branch(0));
        patch_branch(&mut b.body, idx, begin_idx, false);
        Ok(())
    });
    vm.set_immediate(again_addr);

    let while_addr = vm.define_native(b"WHILE", |vm| {
        let b = vm.builder()?;
        if !matches!(b.control_stack.last(), Some((ControlKind::Begin, _))) {
            return Err(ForthError::InterpretFail);
        }
        let idx = b.body.len();
        b.body.push(Instr::ZBranch(0));
        b.control_stack.push((ControlKind::While, idx));
        Ok(())
    });
    vm.set_immediate(while_addr);

    let repeat_addr = vm.define_native(b"REPEAT", |vm| {
        let b = vm.builder()?;
        let (wk, while_idx) = b.control_stack.pop().ok_or(ForthError::InterpretFail)?;
        if wk != ControlKind::While {
            return Err(ForthError::InterpretFail);
        }
        let (bk, begin_idx) = b.control_stack.pop().ok_or(ForthError::InterpretFail)?;
        if bk != ControlKind::Begin {
            return Err(ForthError::InterpretFail);
        }
        let back_idx = b.body.len();
        b.body.push(Instr::Branch(0));
        patch_branch(&mut b.body, back_idx, begin_idx, false);
        let target = b.body.len();
        patch_branch(&mut b.body, while_idx, target, true);
        Ok(())
    });
    vm.set_immediate(repeat_addr);

    let literal_addr = vm.define_native(b"LITERAL", |vm| {
        let v = vm.pop()?;
        vm.builder()?.body.push(Instr::Lit(v));
        Ok(())
    });
    vm.set_immediate(literal_addr);

    let twoliteral_addr = vm.define_native(b"2LITERAL", |vm| {
        let (lo, hi) = vm.pop_double()?;
        vm.builder()?.body.push(Instr::TwoLit(lo, hi));
        Ok(())
    });
    vm.set_immediate(twoliteral_addr);

    vm.define_native(b"S\"", |vm| {
        let mut buf = WordBuffer::new();
        read_word(vm.input.current_mut(), b'"', &mut buf)?;
        let bytes = buf.as_counted().as_bytes().to_vec();
        let addr = vm.mem.push_bytes(&bytes);
        let len = bytes.len() as u32;
        if vm.compiling.is_some() {
            vm.builder()?.body.push(Instr::PushStr(addr, len));
        } else {
            vm.push(addr);
            vm.push(len);
        }
        Ok(())
    });

    vm.define_native(b"C\"", |vm| {
        let mut buf = WordBuffer::new();
        read_word(vm.input.current_mut(), b'"', &mut buf)?;
        let counted = buf.as_counted();
        let addr = vm.mem.here();
        vm.mem.push_byte(counted.len());
        vm.mem.push_bytes(counted.as_bytes());
        if vm.compiling.is_some() {
            vm.builder()?.body.push(Instr::Lit(addr));
        } else {
            vm.push(addr);
        }
        Ok(())
    });

    let postpone_addr = vm.define_native(b"POSTPONE", |vm| {
        let mut buf = WordBuffer::new();
        read_word(vm.input.current_mut(), b' ', &mut buf)?;
        match vm.lookup(buf.as_counted()) {
            SearchResult::Found { header, immediate } => {
                if immediate {
                    vm.execute(header.addr)
                } else {
                    vm.builder()?.body.push(Instr::Call(header.addr));
                    Ok(())
                }
            }
            SearchResult::NotFound => Err(ForthError::UndefinedWord),
        }
    });
    vm.set_immediate(postpone_addr);

    vm.define_native(b"VARIABLE", |vm| {
        let mut buf = WordBuffer::new();
        read_word(vm.input.current_mut(), b' ', &mut buf)?;
        let addr = dict::write_header(&mut vm.mem, vm.latest, buf.as_counted());
        vm.latest = addr;
        vm.mem.align();
        let cell_addr = vm.mem.push_cell(0);
        vm.bodies.insert(addr, Body::Variable(cell_addr));
        Ok(())
    });

    vm.define_native(b"2VARIABLE", |vm| {
        let mut buf = WordBuffer::new();
        read_word(vm.input.current_mut(), b' ', &mut buf)?;
        let addr = dict::write_header(&mut vm.mem, vm.latest, buf.as_counted());
        vm.latest = addr;
        vm.mem.align();
        let cell_addr = vm.mem.push_cell(0);
        vm.mem.push_cell(0);
        vm.bodies.insert(addr, Body::TwoVariable(cell_addr));
        Ok(())
    });

    vm.define_native(b"CONSTANT", |vm| {
        let v = vm.pop()?;
        let mut buf = WordBuffer::new();
        read_word(vm.input.current_mut(), b' ', &mut buf)?;
        let addr = dict::write_header(&mut vm.mem, vm.latest, buf.as_counted());
        vm.latest = addr;
        vm.bodies.insert(addr, Body::Constant(v));
        Ok(())
    });

    vm.define_native(b"VALUE", |vm| {
        let v = vm.pop()?;
        let mut buf = WordBuffer::new();
        read_word(vm.input.current_mut(), b' ', &mut buf)?;
        let addr = dict::write_header(&mut vm.mem, vm.latest, buf.as_counted());
        vm.latest = addr;
        vm.mem.align();
        let cell_addr = vm.mem.push_cell(v);
        vm.bodies.insert(addr, Body::Value(cell_addr));
        Ok(())
    });

    vm.define_native(b"2VALUE", |vm| {
        let (lo, hi) = vm.pop_double()?;
        let mut buf = WordBuffer::new();
        read_word(vm.input.current_mut(), b' ', &mut buf)?;
        let addr = dict::write_header(&mut vm.mem, vm.latest, buf.as_counted());
        vm.latest = addr;
        vm.mem.align();
        let cell_addr = vm.mem.push_cell(lo);
        vm.mem.push_cell(hi);
        vm.bodies.insert(addr, Body::TwoValue(cell_addr));
        Ok(())
    });

    let to_addr = vm.define_native(b"TO", |vm| {
        let mut buf = WordBuffer::new();
        read_word(vm.input.current_mut(), b' ', &mut buf)?;
        let header = match vm.lookup(buf.as_counted()) {
            SearchResult::Found { header, .. } => header,
            SearchResult::NotFound => return Err(ForthError::UndefinedWord),
        };
        let kind = match vm.bodies.get(&header.addr) {
            Some(Body::Value(addr)) => ToKind::Single(*addr),
            Some(Body::TwoValue(addr)) => ToKind::Double(*addr),
            _ => return Err(ForthError::NoInterpretSemantics),
        };
        if vm.compiling.is_some() {
            let b = vm.builder()?;
            match kind {
                ToKind::Single(a) => b.body.push(Instr::StoreValue(a)),
                ToKind::Double(a) => b.body.push(Instr::StoreTwoValue(a)),
            }
        } else {
            match kind {
                ToKind::Single(a) => {
                    let v = vm.pop()?;
                    vm.mem.write_cell(a, v)?;
                }
                ToKind::Double(a) => {
                    let (lo, hi) = vm.pop_double()?;
                    vm.mem.write_cell(a, lo)?;
                    vm.mem.write_cell(a + CELL as u32, hi)?;
                }
            }
        }
        Ok(())
    });
    vm.set_immediate(to_addr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputDescriptor;

    fn run(vm: &mut Vm, text: &[u8]) {
        vm.input.push(InputDescriptor::evaluate(text)).unwrap();
        crate::interpreter::interpret(vm).unwrap();
    }

    #[test]
    fn colon_definition_then_call() {
        let mut vm = Vm::new(16);
        run(&mut vm, b": SQUARE DUP * ;");
        run(&mut vm, b"5 SQUARE");
        assert_eq!(vm.pop().unwrap(), 25);
    }

    #[test]
    fn if_else_then_selects_a_branch() {
        let mut vm = Vm::new(16);
        run(&mut vm, b": SIGNUM DUP 0< IF DROP -1 ELSE 0> IF 1 ELSE 0 THEN THEN ;");
        run(&mut vm, b"-5 SIGNUM");
        assert_eq!(vm.pop().unwrap(), (-1i32) as u32);
        run(&mut vm, b"5 SIGNUM");
        assert_eq!(vm.pop().unwrap(), 1);
        run(&mut vm, b"0 SIGNUM");
        assert_eq!(vm.pop().unwrap(), 0);
    }

    #[test]
    fn begin_until_loops_until_true() {
        let mut vm = Vm::new(16);
        // Counts down from n to 0, leaving nothing on the stack but side
        // effects in `total` (sum 5+4+3+2+1).
        run(&mut vm, b": COUNTDOWN 0 SWAP BEGIN SWAP OVER + SWAP 1 - DUP 0= UNTIL DROP ;");
        run(&mut vm, b"5 COUNTDOWN");
        assert_eq!(vm.pop().unwrap(), 15);
    }

    #[test]
    fn value_and_to_round_trip() {
        let mut vm = Vm::new(16);
        run(&mut vm, b"10 VALUE X");
        run(&mut vm, b"X");
        assert_eq!(vm.pop().unwrap(), 10);
        run(&mut vm, b"20 TO X");
        run(&mut vm, b"X");
        assert_eq!(vm.pop().unwrap(), 20);
    }

    #[test]
    fn string_literal_pushes_addr_and_len() {
        let mut vm = Vm::new(16);
        run(&mut vm, b"S\" hi\"");
        let len = vm.pop().unwrap();
        let addr = vm.pop().unwrap();
        assert_eq!(len, 2);
        assert_eq!(vm.mem.slice(addr, 2), b"hi");
    }
}
