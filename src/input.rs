//! The input source stack (L3).
//!
//! Migrated from `forth/lib/input.c`: a keyboard descriptor permanently at
//! the bottom of the stack, `EVALUATE`'d strings and loaded blocks pushed
//! on top of it, each carrying its own refill behavior. The C source backs
//! this with three separate static arrays (a keyboard singleton, an
//! `EVALUATE` pool, a block/`LOAD` pool) purely because of manual pointer
//! lifetime management; since Rust's `InputDescriptor` owns its buffer
//! outright, this rewrite collapses them into one `Vec`-backed stack
//! capped at `INPUT_STACK_DEPTH` — slot 0 is always the keyboard
//! descriptor, exactly as spec'd.

use crate::config::INPUT_STACK_DEPTH;
use crate::error::{ForthError, Result};

/// Which refill behavior an [`InputDescriptor`] has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillKind {
    /// `source_id == 0`. Reads one line from the keyboard port.
    Keyboard,
    /// `source_id == -1`. A single `EVALUATE`d string; consumed once.
    Evaluate,
    /// `source_id > 0`. A loaded block; consumed once, `blk != 0`.
    Block,
}

/// What a refiller did. Matches the three outcomes spec.md §4.4 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillStatus {
    /// Buffer was updated; keep going with the current source.
    Ok,
    /// This source is spent; pop it and resume with whatever is under it.
    Empty,
    /// Nothing to do yet; retry with whatever source is now current.
    NoInput,
}

/// One entry on the input stack.
#[derive(Debug, Clone)]
pub struct InputDescriptor {
    pub kind: RefillKind,
    pub source_id: i32,
    pub buffer: Vec<u8>,
    pub length: u32,
    pub index: u32,
    pub max_length: u32,
    /// Non-zero when this input is sourced from block storage.
    pub blk: u32,
}

impl InputDescriptor {
    pub fn keyboard(max_length: u32) -> Self {
        InputDescriptor {
            kind: RefillKind::Keyboard,
            source_id: 0,
            buffer: vec![0u8; max_length as usize],
            length: 0,
            index: 0,
            max_length,
            blk: 0,
        }
    }

    pub fn evaluate(text: &[u8]) -> Self {
        InputDescriptor {
            kind: RefillKind::Evaluate,
            source_id: -1,
            length: text.len() as u32,
            max_length: text.len() as u32,
            buffer: text.to_vec(),
            index: 0,
            blk: 0,
        }
    }

    pub fn block(blk: u32, data: Vec<u8>) -> Self {
        let len = data.len() as u32;
        InputDescriptor {
            kind: RefillKind::Block,
            source_id: blk as i32,
            length: len,
            max_length: len,
            buffer: data,
            index: 0,
            blk,
        }
    }

    pub fn is_keyboard(&self) -> bool {
        self.kind == RefillKind::Keyboard
    }

    pub fn is_evaluate(&self) -> bool {
        self.kind == RefillKind::Evaluate
    }

    pub fn is_block(&self) -> bool {
        self.kind == RefillKind::Block
    }
}

/// Source of bytes for the keyboard refiller. Models the MMIO keyboard
/// data register (spec.md §6): `poll_byte` returns `None` where the
/// hardware would have returned `0xFF` (no data yet), and the refiller
/// idles (keeps polling) until it gets `Some`.
pub trait KeyboardPort {
    fn poll_byte(&mut self) -> Option<u8>;
    /// Emit one echoed/erase-sequence byte. A no-op port may ignore this.
    fn put_byte(&mut self, _b: u8) {}
    /// Whether the underlying source has closed for good. A `repl` loop
    /// uses this to stop rather than spin on the synthetic line terminator
    /// `poll_byte` returns past end of input.
    fn is_eof(&self) -> bool {
        false
    }
}

/// A [`KeyboardPort`] with no real source behind it, the default a
/// [`Vm`] is built with before a real port (e.g. stdin) is attached.
/// Every poll immediately returns a line terminator so a refill against
/// it can't spin forever waiting for bytes that will never come.
///
/// [`Vm`]: crate::vm::Vm
pub struct NullKeyboardPort;

impl KeyboardPort for NullKeyboardPort {
    fn poll_byte(&mut self) -> Option<u8> {
        Some(b'\n')
    }
}

const BACKSPACE: u8 = 0x08;

/// Reads one line from `port` into `buf` (capped at `buf.len()`), honoring
/// backspace and stopping at CR/LF. Matches `__read_line_from_kbd`.
pub fn read_line_from_keyboard(port: &mut dyn KeyboardPort, buf: &mut [u8], echo: bool) -> u32 {
    let mut i = 0usize;
    while i < buf.len() {
        let c = loop {
            match port.poll_byte() {
                Some(c) => break c,
                None => continue, // __idle(): nothing to suspend on in-process
            }
        };

        if c == BACKSPACE {
            if i == 0 {
                continue;
            }
            i -= 1;
            continue;
        }

        if echo {
            port.put_byte(c);
        }

        if c == b'\r' || c == b'\n' {
            break;
        }

        buf[i] = c;
        i += 1;
    }
    i as u32
}

/// The input source stack. Slot 0 is always the keyboard descriptor and is
/// never popped (underflow raises [`ForthError::InputStackUnderflow`]).
pub struct InputStack {
    stack: Vec<InputDescriptor>,
}

impl InputStack {
    pub fn new(keyboard_buffer_size: u32) -> Self {
        InputStack { stack: vec![InputDescriptor::keyboard(keyboard_buffer_size)] }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current(&self) -> &InputDescriptor {
        self.stack.last().expect("keyboard descriptor is never popped")
    }

    pub fn current_mut(&mut self) -> &mut InputDescriptor {
        self.stack.last_mut().expect("keyboard descriptor is never popped")
    }

    /// Pushes a new input descriptor on top. Fails with
    /// [`ForthError::InputStackOverflow`] once `INPUT_STACK_DEPTH` is reached.
    pub fn push(&mut self, desc: InputDescriptor) -> Result<()> {
        if self.stack.len() >= INPUT_STACK_DEPTH {
            return Err(ForthError::InputStackOverflow);
        }
        self.stack.push(desc);
        Ok(())
    }

    /// Pops the current input descriptor. Fails with
    /// [`ForthError::InputStackUnderflow`] when only the keyboard remains.
    pub fn pop(&mut self) -> Result<InputDescriptor> {
        if self.stack.len() <= 1 {
            return Err(ForthError::InputStackUnderflow);
        }
        Ok(self.stack.pop().unwrap())
    }

    /// Invokes the current descriptor's refiller, popping the source if it
    /// reports `Empty`. Loops on `NoInput`. Matches `__refill_input_buffer`.
    pub fn refill(&mut self, port: &mut dyn KeyboardPort, echo: bool) -> Result<()> {
        loop {
            let status = match self.current().kind {
                RefillKind::Keyboard => {
                    let desc = self.current_mut();
                    desc.length = read_line_from_keyboard(port, &mut desc.buffer, echo);
                    desc.index = 0;
                    RefillStatus::Ok
                }
                RefillKind::Evaluate | RefillKind::Block => RefillStatus::Empty,
            };

            match status {
                RefillStatus::Ok => return Ok(()),
                RefillStatus::Empty => {
                    self.pop()?;
                    return Ok(());
                }
                RefillStatus::NoInput => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct FakePort(VecDeque<u8>);
    impl KeyboardPort for FakePort {
        fn poll_byte(&mut self) -> Option<u8> {
            self.0.pop_front()
        }
    }

    #[test]
    fn slot_zero_is_always_keyboard_and_never_pops() {
        let mut stack = InputStack::new(16);
        assert!(stack.current().is_keyboard());
        assert_eq!(stack.pop().unwrap_err(), ForthError::InputStackUnderflow);
    }

    #[test]
    fn push_past_depth_overflows() {
        let mut stack = InputStack::new(16);
        for i in 0..(INPUT_STACK_DEPTH - 1) {
            stack.push(InputDescriptor::evaluate(b"x")).unwrap_or_else(|e| panic!("push {i} failed: {e}"));
        }
        assert_eq!(stack.push(InputDescriptor::evaluate(b"x")), Err(ForthError::InputStackOverflow));
    }

    #[test]
    fn evaluate_refill_pops_after_one_use() {
        let mut stack = InputStack::new(16);
        stack.push(InputDescriptor::evaluate(b"1 2 +")).unwrap();
        let mut port = FakePort(VecDeque::new());
        stack.refill(&mut port, false).unwrap();
        assert!(stack.current().is_keyboard());
    }

    #[test]
    fn keyboard_read_line_stops_at_newline_and_handles_backspace() {
        let mut port = FakePort(VecDeque::from(b"ab\x08c\n".to_vec()));
        let mut buf = [0u8; 16];
        let n = read_line_from_keyboard(&mut port, &mut buf, false);
        assert_eq!(&buf[..n as usize], b"ac");
    }
}
