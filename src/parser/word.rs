//! Character and word reading (L4).
//!
//! Migrated from `forth/lib/input.c`: `__read_char`, `__read_word`, and
//! `do_PARSE` from `forth/words/interpret.c`.

use crate::config::WORD_BUFFER_SIZE;
use crate::error::{ForthError, Result};
use crate::input::InputDescriptor;
use crate::strings::CountedStr;

/// Fixed-size scratch buffer a parsed word is copied into, standing in for
/// the static `word_buffer_length` counted string in the original.
pub struct WordBuffer {
    buf: [u8; WORD_BUFFER_SIZE],
    len: usize,
}

impl WordBuffer {
    pub fn new() -> Self {
        WordBuffer { buf: [0; WORD_BUFFER_SIZE], len: 0 }
    }

    pub fn as_counted(&self) -> CountedStr<'_> {
        CountedStr::new(&self.buf[..self.len])
    }
}

impl Default for WordBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the next byte from the current input buffer, or `b'\0'` once
/// exhausted. Advances `index`.
pub fn read_char(desc: &mut InputDescriptor) -> u8 {
    if desc.index == desc.length {
        0
    } else {
        let c = desc.buffer[desc.index as usize];
        desc.index += 1;
        c
    }
}

/// Skips leading `delim`/control bytes, then copies bytes into `out` until
/// `delim`, a control byte, or exhaustion. An input made entirely of
/// delimiters yields an empty word (`out.len == 0`), not an error.
pub fn read_word(desc: &mut InputDescriptor, delim: u8, out: &mut WordBuffer) -> Result<()> {
    out.len = 0;

    let mut c;
    loop {
        c = read_char(desc);
        if c == 0 {
            return Ok(());
        }
        if c == delim || c < b' ' {
            continue;
        }
        break;
    }

    loop {
        if out.len == WORD_BUFFER_SIZE {
            return Err(ForthError::WordTooLong);
        }
        out.buf[out.len] = c;
        out.len += 1;

        c = read_char(desc);
        if c == 0 || c == delim || c < b' ' {
            break;
        }
    }

    Ok(())
}

/// `PARSE`: unlike `read_word`, does not skip leading delimiters. Returns
/// the parsed span as (start index in the buffer, length), since the
/// result aliases the input buffer rather than copying into a scratch
/// area (`forth/words/interpret.c::do_PARSE`).
pub fn parse(desc: &mut InputDescriptor, delim: u8) -> (u32, u32) {
    let c = read_char(desc);
    if c == 0 || c == delim {
        return (desc.index, 0);
    }

    let start = desc.index - 1;
    let mut len = 1u32;
    loop {
        let c = read_char(desc);
        if c == 0 || c == delim {
            break;
        }
        len += 1;
    }
    (start, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(text: &[u8]) -> InputDescriptor {
        InputDescriptor::evaluate(text)
    }

    #[test]
    fn read_word_skips_leading_delimiters() {
        let mut d = desc(b"   DUP foo");
        let mut out = WordBuffer::new();
        read_word(&mut d, b' ', &mut out).unwrap();
        assert_eq!(out.as_counted().as_bytes(), b"DUP");
    }

    #[test]
    fn read_word_on_only_delimiters_yields_empty() {
        let mut d = desc(b"    ");
        let mut out = WordBuffer::new();
        read_word(&mut d, b' ', &mut out).unwrap();
        assert!(out.as_counted().is_empty());
    }

    #[test]
    fn read_word_overflow_raises_word_too_long() {
        let long = vec![b'A'; WORD_BUFFER_SIZE + 10];
        let mut d = desc(&long);
        let mut out = WordBuffer::new();
        assert_eq!(read_word(&mut d, b' ', &mut out), Err(ForthError::WordTooLong));
    }

    #[test]
    fn parse_does_not_skip_leading_delimiter() {
        let mut d = desc(b" rest)");
        let (start, len) = parse(&mut d, b')');
        assert_eq!(&d.buffer[start as usize..(start + len) as usize], b" rest");
    }
}
