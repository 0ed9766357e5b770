//! The outer interpreter: `INTERPRET`, `EVALUATE`, block loading, and
//! comments (L6).
//!
//! Migrated from `forth/words/interpret.c`'s `do_INTERPRET` decision loop
//! (word found → execute or compile; not found → try as a number; neither
//! → `UndefinedWord`) and `forth/words/block.c`'s `LIST`/`LOAD`/`THRU`.

use crate::config::{BIO_BLOCK_SIZE, LIST_CPL, LIST_LPS};
use crate::dict::{self, SearchResult};
use crate::error::{ForthError, Result};
use crate::input::InputDescriptor;
use crate::parser::word::{parse, read_word, WordBuffer};
use crate::parser::{parse_number, NumberStatus};
use crate::strings::CountedStr;
use crate::vm::{Body, Instr, State, Vm};

/// Runs `INTERPRET` against the current input source until it is
/// exhausted, popping spent `EVALUATE`/block sources and falling through
/// to whatever is underneath. Returns once the bottom (keyboard)
/// descriptor also reports nothing more to read — the caller (a REPL,
/// or `LOAD`/`THRU`) is responsible for `REFILL`ing it and calling again.
pub fn interpret(vm: &mut Vm) -> Result<()> {
    let mut word = WordBuffer::new();
    loop {
        read_word(vm.input.current_mut(), b' ', &mut word)?;
        if word.as_counted().is_empty() {
            if vm.input.depth() > 1 {
                vm.input.pop()?;
                continue;
            }
            return Ok(());
        }
        interpret_one(vm, word.as_counted())?;
    }
}

fn interpret_one(vm: &mut Vm, name: CountedStr) -> Result<()> {
    match vm.lookup(name) {
        SearchResult::Found { header, immediate } => {
            if vm.state == State::Interpret || immediate {
                vm.execute(header.addr)
            } else {
                vm.builder()?.body.push(Instr::Call(header.addr));
                Ok(())
            }
        }
        SearchResult::NotFound => match parse_number(name.as_bytes(), vm.base) {
            Some(n) if n.status == NumberStatus::SingleCell => {
                if vm.state == State::Interpret {
                    vm.push(n.lo);
                } else {
                    vm.builder()?.body.push(Instr::Lit(n.lo));
                }
                Ok(())
            }
            Some(n) => {
                if vm.state == State::Interpret {
                    vm.push_double(n.lo, n.hi);
                } else {
                    vm.builder()?.body.push(Instr::TwoLit(n.lo, n.hi));
                }
                Ok(())
            }
            None => Err(ForthError::UndefinedWord),
        },
    }
}

pub fn register(vm: &mut Vm) {
    let blk_cell = {
        vm.mem.align();
        vm.mem.push_cell(0)
    };
    let blk_addr = dict::write_header(&mut vm.mem, vm.latest, CountedStr::new(b"BLK"));
    vm.latest = blk_addr;
    vm.bodies.insert(blk_addr, Body::Variable(blk_cell));

    vm.define_native(b"EVALUATE", |vm| {
        let len = vm.pop()?;
        let addr = vm.pop()?;
        let text = vm.mem.slice(addr, len as usize).to_vec();
        vm.input.push(InputDescriptor::evaluate(&text))?;
        interpret(vm)
    });

    let backslash_addr = vm.define_native(b"\\", |vm| {
        let desc = vm.input.current_mut();
        desc.index = desc.length;
        Ok(())
    });
    vm.set_immediate(backslash_addr);

    let paren_addr = vm.define_native(b"(", |vm| {
        parse(vm.input.current_mut(), b')');
        Ok(())
    });
    vm.set_immediate(paren_addr);

    // `>IN`/`SET>IN`: accessor pair over the current input descriptor's
    // `index`, the same simplification `BASE`/`SET-BASE` (vm.rs) use for a
    // field that isn't backed by a `Memory` cell (`forth/words/interpret.c::do_TOIN`).
    vm.define_native(b">IN", |vm| {
        vm.push(vm.input.current().index);
        Ok(())
    });
    vm.define_native(b"SET>IN", |vm| {
        let v = vm.pop()?;
        vm.input.current_mut().index = v;
        Ok(())
    });

    vm.define_native(b"PARSE", |vm| {
        let delim = vm.pop()? as u8;
        let (start, len) = parse(vm.input.current_mut(), delim);
        vm.push(start);
        vm.push(len);
        Ok(())
    });

    // `REFILL`: keyboard actually refills (and always reports success);
    // an `EVALUATE`d string reports failure and is left untouched; a block
    // source is dropped and the next one loaded in its place
    // (`forth/words/interpret.c::do_REFILL`).
    vm.define_native(b"REFILL", |vm| {
        match vm.input.current().kind {
            crate::input::RefillKind::Evaluate => {
                vm.push(0);
                Ok(())
            }
            crate::input::RefillKind::Keyboard => {
                vm.refill(true)?;
                vm.push(0xFFFF_FFFF);
                Ok(())
            }
            crate::input::RefillKind::Block => {
                let blk = vm.input.current().blk + 1;
                vm.input.pop()?;
                push_block_input(vm, blk)?;
                vm.push(0xFFFF_FFFF);
                Ok(())
            }
        }
    });

    // `SAVE-INPUT`/`RESTORE-INPUT`: a block source also saves/restores
    // `blk`, reporting/expecting 2 cells instead of 1
    // (`forth/words/interpret.c::do_SAVE_INPUT`/`do_RESTORE_INPUT`).
    vm.define_native(b"SAVE-INPUT", |vm| {
        let desc = vm.input.current();
        let (index, is_block, blk) = (desc.index, desc.is_block(), desc.blk);
        vm.push(index);
        if is_block {
            vm.push(blk);
            vm.push(2);
        } else {
            vm.push(1);
        }
        Ok(())
    });
    vm.define_native(b"RESTORE-INPUT", |vm| {
        let count = vm.pop()?;
        if count == 2 {
            let blk = vm.pop()?;
            let index = vm.pop()?;
            // Ordinarily the saved block is still current and gets
            // dropped before being reloaded; if it was already popped
            // (e.g. exhausted and auto-refilled away) there's nothing to
            // drop, just reload it in place.
            if vm.input.current().is_block() {
                vm.input.pop()?;
            }
            push_block_input(vm, blk)?;
            vm.input.current_mut().index = index;
        } else {
            let index = vm.pop()?;
            vm.input.current_mut().index = index;
        }
        vm.push(0);
        Ok(())
    });

    // Both `BLOCK` and `BUFFER` only refresh the memory-mirrored copy on
    // first load; a repeat call against an already-resident block must
    // not clobber edits made through `!`/`C!`/`TYPE` since that load.
    vm.define_native(b"BLOCK", |vm| {
        let blk = vm.pop()?;
        let fresh = !vm.blocks.is_resident(blk);
        let slot = vm.blocks.block(vm.block_device.as_mut(), blk)?;
        let addr = vm.block_mem_base + (slot as u32) * BIO_BLOCK_SIZE as u32;
        if fresh {
            let data = vm.blocks.buffer(slot).to_vec();
            vm.mem.slice_mut(addr, BIO_BLOCK_SIZE).copy_from_slice(&data);
        }
        vm.last_block_slot = Some(slot);
        vm.push(addr);
        Ok(())
    });

    // `BUFFER` skips the read-through a real implementation would avoid
    // for a block about to be overwritten wholesale; simplified here to
    // behave like `BLOCK` since the in-memory mirror makes the
    // distinction unobservable to a test.
    vm.define_native(b"BUFFER", |vm| {
        let blk = vm.pop()?;
        let fresh = !vm.blocks.is_resident(blk);
        let slot = vm.blocks.block(vm.block_device.as_mut(), blk)?;
        let addr = vm.block_mem_base + (slot as u32) * BIO_BLOCK_SIZE as u32;
        if fresh {
            let data = vm.blocks.buffer(slot).to_vec();
            vm.mem.slice_mut(addr, BIO_BLOCK_SIZE).copy_from_slice(&data);
        }
        vm.last_block_slot = Some(slot);
        vm.push(addr);
        Ok(())
    });

    vm.define_native(b"UPDATE", |vm| {
        if let Some(slot) = vm.last_block_slot {
            let addr = vm.block_mem_base + (slot as u32) * BIO_BLOCK_SIZE as u32;
            let data = vm.mem.slice(addr, BIO_BLOCK_SIZE).to_vec();
            vm.blocks.buffer_mut(slot).copy_from_slice(&data);
            vm.blocks.update(slot);
        }
        Ok(())
    });

    vm.define_native(b"SAVE-BUFFERS", |vm| vm.blocks.save_buffers(vm.block_device.as_mut()));
    vm.define_native(b"FLUSH", |vm| vm.blocks.flush(vm.block_device.as_mut()));
    vm.define_native(b"EMPTY-BUFFERS", |vm| {
        vm.blocks.empty_buffers();
        vm.last_block_slot = None;
        Ok(())
    });

    vm.define_native(b"LOAD", |vm| {
        let blk = vm.pop()?;
        load_block(vm, blk)
    });

    vm.define_native(b"THRU", |vm| {
        let hi = vm.pop()?;
        let lo = vm.pop()?;
        for blk in lo..=hi {
            load_block(vm, blk)?;
        }
        Ok(())
    });

    vm.define_native(b"LIST", |vm| {
        let blk = vm.pop()?;
        let slot = vm.blocks.block(vm.block_device.as_mut(), blk)?;
        let data = vm.blocks.buffer(slot).to_vec();
        for line in 0..LIST_LPS {
            let start = line * LIST_CPL;
            let text = String::from_utf8_lossy(&data[start..start + LIST_CPL]);
            let rendered = format!("{:2} {}\n", line, text.trim_end_matches(['\0', ' ']));
            vm.print(&rendered);
        }
        Ok(())
    });
}

/// Pushes `blk` as the current input source without interpreting it,
/// matching `forth/words/block.c::do_BLK_LOAD`.
fn push_block_input(vm: &mut Vm, blk: u32) -> Result<()> {
    let slot = vm.blocks.block(vm.block_device.as_mut(), blk)?;
    let data = vm.blocks.buffer(slot).to_vec();
    vm.input.push(InputDescriptor::block(blk, data))
}

/// `LOAD`: pushes `blk` and interprets it to exhaustion before returning.
fn load_block(vm: &mut Vm, blk: u32) -> Result<()> {
    push_block_input(vm, blk)?;
    interpret(vm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::InMemoryBlockDevice;

    fn run(vm: &mut Vm, text: &[u8]) {
        vm.input.push(InputDescriptor::evaluate(text)).unwrap();
        interpret(vm).unwrap();
    }

    /// Executes a native/colon word by name without touching `vm.input`,
    /// unlike [`run`] which pushes a new `EVALUATE` source.
    fn exec(vm: &mut Vm, name: &[u8]) {
        match vm.lookup(CountedStr::new(name)) {
            SearchResult::Found { header, .. } => vm.execute(header.addr).unwrap(),
            SearchResult::NotFound => panic!("word not found: {}", String::from_utf8_lossy(name)),
        }
    }

    #[test]
    fn undefined_word_is_an_error() {
        let mut vm = Vm::new(16);
        vm.input.push(InputDescriptor::evaluate(b"NOSUCHWORD")).unwrap();
        assert_eq!(interpret(&mut vm), Err(ForthError::UndefinedWord));
    }

    #[test]
    fn evaluate_runs_nested_source() {
        let mut vm = Vm::new(16);
        run(&mut vm, b"S\" 1 2 +\" EVALUATE");
        assert_eq!(vm.pop().unwrap(), 3);
    }

    #[test]
    fn backslash_discards_rest_of_the_line() {
        let mut vm = Vm::new(16);
        run(&mut vm, b"1 2 + \\ 99 99 99");
        assert_eq!(vm.pop().unwrap(), 3);
        assert!(vm.data_stack.is_empty());
    }

    #[test]
    fn set_in_rewinds_the_parse_position_so_a_word_is_read_again() {
        use crate::parser::word::{read_word, WordBuffer};

        let mut vm = Vm::new(16);
        vm.input.push(InputDescriptor::evaluate(b"FIRST SECOND")).unwrap();

        let mut word = WordBuffer::new();
        read_word(vm.input.current_mut(), b' ', &mut word).unwrap();
        assert_eq!(word.as_counted().as_bytes(), b"FIRST");
        let after_first = vm.input.current().index;

        exec(&mut vm, b">IN");
        assert_eq!(vm.pop().unwrap(), after_first);

        vm.push(0);
        exec(&mut vm, b"SET>IN");
        assert_eq!(vm.input.current().index, 0);

        read_word(vm.input.current_mut(), b' ', &mut word).unwrap();
        assert_eq!(word.as_counted().as_bytes(), b"FIRST", "SET>IN should make the same word readable again");
    }

    #[test]
    fn block_update_flush_round_trips_through_the_device() {
        let mut vm = Vm::new(16);
        vm.set_block_device(Box::new(InMemoryBlockDevice::new(4)));
        run(&mut vm, b"1 BLOCK DROP");
        // Write a recognizable byte through the memory-mirrored buffer.
        let addr = vm.block_mem_base;
        vm.mem.write_u8(addr, 0xCD);
        run(&mut vm, b"UPDATE FLUSH");

        run(&mut vm, b"1 BLOCK");
        let addr2 = vm.pop().unwrap();
        assert_eq!(vm.mem.read_u8(addr2), 0xCD);
    }

    #[test]
    fn load_interprets_a_blocks_source_text() {
        let mut vm = Vm::new(16);
        let mut source = vec![b' '; BIO_BLOCK_SIZE];
        source[..5].copy_from_slice(b"3 4 +");
        vm.set_block_device(Box::new(InMemoryBlockDevice::new(2)));
        {
            let slot = vm.blocks.block(vm.block_device.as_mut(), 1).unwrap();
            vm.blocks.buffer_mut(slot).copy_from_slice(&source);
            vm.blocks.update(slot);
        }
        run(&mut vm, b"1 LOAD");
        assert_eq!(vm.pop().unwrap(), 7);
    }

    struct FakePort(std::collections::VecDeque<u8>);
    impl crate::input::KeyboardPort for FakePort {
        fn poll_byte(&mut self) -> Option<u8> {
            self.0.pop_front()
        }
    }

    #[test]
    fn refill_on_evaluate_source_reports_false_and_leaves_it_in_place() {
        let mut vm = Vm::new(16);
        vm.input.push(InputDescriptor::evaluate(b"1 2 +")).unwrap();
        exec(&mut vm, b"REFILL");
        assert_eq!(vm.pop().unwrap(), 0);
        assert!(vm.input.current().is_evaluate());
    }

    #[test]
    fn refill_on_keyboard_reads_a_new_line_and_reports_true() {
        let mut vm = Vm::new(16);
        vm.set_keyboard_port(Box::new(FakePort(std::collections::VecDeque::from(*b"42\n"))));
        exec(&mut vm, b"REFILL");
        assert_eq!(vm.pop().unwrap(), 0xFFFF_FFFF);
        interpret(&mut vm).unwrap();
        assert_eq!(vm.pop().unwrap(), 42);
    }

    #[test]
    fn refill_on_block_source_chains_into_the_next_block() {
        let mut vm = Vm::new(16);
        let mut block1 = vec![b' '; BIO_BLOCK_SIZE];
        block1[..1].copy_from_slice(b"1");
        let mut block2 = vec![b' '; BIO_BLOCK_SIZE];
        block2[..1].copy_from_slice(b"2");
        vm.set_block_device(Box::new(InMemoryBlockDevice::new(3)));
        {
            let slot = vm.blocks.block(vm.block_device.as_mut(), 1).unwrap();
            vm.blocks.buffer_mut(slot).copy_from_slice(&block1);
            vm.blocks.update(slot);
            let slot = vm.blocks.block(vm.block_device.as_mut(), 2).unwrap();
            vm.blocks.buffer_mut(slot).copy_from_slice(&block2);
            vm.blocks.update(slot);
        }
        push_block_input(&mut vm, 1).unwrap();
        // Exhaust the block without letting `interpret`'s own auto-pop
        // (which, like `__load_refiller`, unconditionally drops an
        // exhausted non-keyboard source) ever see it: `REFILL` is the only
        // thing that chains a spent block into the next one.
        let len = vm.input.current().length;
        vm.input.current_mut().index = len;

        exec(&mut vm, b"REFILL");
        assert_eq!(vm.pop().unwrap(), 0xFFFF_FFFF);
        assert_eq!(vm.input.current().blk, 2);

        interpret(&mut vm).unwrap();
        assert_eq!(vm.pop().unwrap(), 2);
    }

    #[test]
    fn save_input_then_restore_input_round_trips_an_evaluate_source() {
        let mut vm = Vm::new(16);
        vm.input.push(InputDescriptor::evaluate(b"FIRST SECOND")).unwrap();
        let mut word = crate::parser::word::WordBuffer::new();
        crate::parser::word::read_word(vm.input.current_mut(), b' ', &mut word).unwrap();
        let saved_index = vm.input.current().index;

        exec(&mut vm, b"SAVE-INPUT");
        assert_eq!(vm.pop().unwrap(), 1); // count

        // Disturb the index, then restore it.
        vm.input.current_mut().index = 0;
        vm.push(saved_index);
        vm.push(1);
        exec(&mut vm, b"RESTORE-INPUT");
        assert_eq!(vm.pop().unwrap(), 0); // flag: restored ok
        assert_eq!(vm.input.current().index, saved_index);
    }

    #[test]
    fn save_input_then_restore_input_reloads_the_saved_block_even_after_it_was_popped() {
        let mut vm = Vm::new(16);
        let mut source = vec![b' '; BIO_BLOCK_SIZE];
        source[..5].copy_from_slice(b"3 4 +");
        vm.set_block_device(Box::new(InMemoryBlockDevice::new(2)));
        {
            let slot = vm.blocks.block(vm.block_device.as_mut(), 1).unwrap();
            vm.blocks.buffer_mut(slot).copy_from_slice(&source);
            vm.blocks.update(slot);
        }
        push_block_input(&mut vm, 1).unwrap();
        vm.input.current_mut().index = 2; // partway through "3 4 +"

        exec(&mut vm, b"SAVE-INPUT");
        let count = vm.pop().unwrap();
        assert_eq!(count, 2);
        let blk = vm.pop().unwrap();
        let index = vm.pop().unwrap();

        // The block source is gone by the time RESTORE-INPUT runs.
        vm.input.pop().unwrap();
        assert!(vm.input.current().is_keyboard());

        vm.push(index);
        vm.push(blk);
        vm.push(count);
        exec(&mut vm, b"RESTORE-INPUT");
        assert_eq!(vm.pop().unwrap(), 0);
        assert!(vm.input.current().is_block());
        assert_eq!(vm.input.current().blk, 1);
        assert_eq!(vm.input.current().index, 2);
    }
}
