//! Interpreter error codes.
//!
//! Migrated from the `halt()` error codes documented in `forth/forth.h`
//! and spec'd precisely in the runtime core specification: every fatal
//! condition the core can raise maps to exactly one of these variants.

use std::fmt;

/// A fault raised by the runtime core. Most variants are fatal (the
/// caller should print a message and halt); [`ForthError::UndefinedWord`]
/// is recoverable unless the VM is configured with `die_on_undef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForthError {
    /// Code 1 — a condition that doesn't fit any other category.
    Unknown,
    /// Code 2 — a word (or a malformed number) could not be found.
    UndefinedWord,
    /// Code 3 — an interrupt arrived with no registered handler.
    /// Modeled for completeness; the core never raises this itself.
    UnhandledIrq,
    /// Code 4 — a word was referenced where interpretation semantics are
    /// required but it has none (e.g. compiling a string literal outside
    /// of compile state).
    NoInterpretSemantics,
    /// Code 5 — the Hardware Description Table failed to parse.
    /// Modeled for completeness; HDT parsing is out of scope for the core.
    MalformedHdt,
    /// Code 6 — an unrecognized command-line or boot argument.
    UnhandledArgument,
    /// Code 7 — pushing past `INPUT_STACK_DEPTH`.
    InputStackOverflow,
    /// Code 8 — popping the keyboard's bottom input descriptor.
    InputStackUnderflow,
    /// Code 9 — a cell access at a non-cell-aligned address.
    UnalignedMemoryAccess,
    /// Code 10 — `INTERPRET` failed in a way that isn't `UndefinedWord`.
    InterpretFail,
    /// Code 11 — a BIO operation returned an error status.
    BioFail {
        storage: u32,
        block: u32,
        status: u32,
        phase: BioPhase,
    },
    /// Code 12 — `read_word` overflowed `WORD_BUFFER_SIZE`.
    WordTooLong,
}

/// Which step of [`crate::block::bio::submit_bio_op`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioPhase {
    Reset,
    Storage,
    Block,
    Count,
    Buffer,
    Result,
}

impl ForthError {
    /// The numeric code this error is persisted as, matching spec.md §6.
    pub fn code(&self) -> i32 {
        match self {
            ForthError::Unknown => 1,
            ForthError::UndefinedWord => 2,
            ForthError::UnhandledIrq => 3,
            ForthError::NoInterpretSemantics => 4,
            ForthError::MalformedHdt => 5,
            ForthError::UnhandledArgument => 6,
            ForthError::InputStackOverflow => 7,
            ForthError::InputStackUnderflow => 8,
            ForthError::UnalignedMemoryAccess => 9,
            ForthError::InterpretFail => 10,
            ForthError::BioFail { .. } => 11,
            ForthError::WordTooLong => 12,
        }
    }

    /// Whether this error is recoverable by default (only `UndefinedWord`).
    /// The caller may still choose to treat it as fatal (`die_on_undef`).
    pub fn is_recoverable_by_default(&self) -> bool {
        matches!(self, ForthError::UndefinedWord)
    }
}

impl fmt::Display for ForthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForthError::Unknown => write!(f, "unknown error"),
            ForthError::UndefinedWord => write!(f, "undefined word"),
            ForthError::UnhandledIrq => write!(f, "unhandled interrupt"),
            ForthError::NoInterpretSemantics => write!(f, "word has no interpretation semantics"),
            ForthError::MalformedHdt => write!(f, "malformed hardware description table"),
            ForthError::UnhandledArgument => write!(f, "unhandled argument"),
            ForthError::InputStackOverflow => write!(f, "input stack overflow"),
            ForthError::InputStackUnderflow => write!(f, "input stack underflow"),
            ForthError::UnalignedMemoryAccess => write!(f, "unaligned memory access"),
            ForthError::InterpretFail => write!(f, "interpret failed"),
            ForthError::BioFail { storage, block, status, phase } => write!(
                f,
                "BIO operation failed: storage={storage} block={block} status=0x{status:08X} phase={phase:?}"
            ),
            ForthError::WordTooLong => write!(f, "word too long"),
        }
    }
}

impl std::error::Error for ForthError {}

pub type Result<T> = std::result::Result<T, ForthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_spec() {
        assert_eq!(ForthError::Unknown.code(), 1);
        assert_eq!(ForthError::UndefinedWord.code(), 2);
        assert_eq!(ForthError::UnhandledIrq.code(), 3);
        assert_eq!(ForthError::NoInterpretSemantics.code(), 4);
        assert_eq!(ForthError::MalformedHdt.code(), 5);
        assert_eq!(ForthError::UnhandledArgument.code(), 6);
        assert_eq!(ForthError::InputStackOverflow.code(), 7);
        assert_eq!(ForthError::InputStackUnderflow.code(), 8);
        assert_eq!(ForthError::UnalignedMemoryAccess.code(), 9);
        assert_eq!(ForthError::InterpretFail.code(), 10);
        assert_eq!(
            ForthError::BioFail { storage: 0, block: 0, status: 0, phase: BioPhase::Reset }.code(),
            11
        );
        assert_eq!(ForthError::WordTooLong.code(), 12);
    }

    #[test]
    fn only_undefined_word_is_recoverable() {
        assert!(ForthError::UndefinedWord.is_recoverable_by_default());
        assert!(!ForthError::WordTooLong.is_recoverable_by_default());
        assert!(!ForthError::InputStackOverflow.is_recoverable_by_default());
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(ForthError::UndefinedWord.to_string(), "undefined word");
    }
}
