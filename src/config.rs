//! Compile-time configuration constants.
//! Migrated from `forth/config.h` (happz/ducky-legacy).

/// Width of a cell in bytes. Everything in the dictionary and on the
/// stacks is cell-sized or a multiple of it.
pub const CELL: usize = 4;

/// Maximum length of a parsed word, in bytes. Corresponds to
/// `CONFIG_WORD_BUFFER_SIZE`.
pub const WORD_BUFFER_SIZE: usize = 255;

/// Depth of each input-descriptor pool (evaluate pool, block/load pool)
/// and of the input stack itself. Corresponds to `CONFIG_INPUT_STACK_DEPTH`.
pub const INPUT_STACK_DEPTH: usize = 16;

/// Maximum number of resident blocks in the block cache. A single `u32`
/// bitmap backs `assigned`/`dirty`, so this can never exceed 32.
/// Corresponds to `CONFIG_BLOCK_CACHE_SIZE`.
pub const BLOCK_CACHE_SIZE: usize = 32;

/// Byte size of one mass-storage block. Corresponds to `BIO_BLOCK_SIZE`.
pub const BIO_BLOCK_SIZE: usize = 1024;

/// Number of lines `LIST` prints per screen. Corresponds to `CONFIG_LIST_LPS`.
pub const LIST_LPS: usize = 16;

/// Number of characters per line `LIST` prints. Corresponds to `CONFIG_LIST_CPL`.
pub const LIST_CPL: usize = 64;

/// Size of the pictured-numeric-output scratch buffer. Corresponds to
/// `CONFIG_PNO_BUFFER_SIZE`.
pub const PNO_BUFFER_SIZE: usize = 68;

const _: () = assert!(BLOCK_CACHE_SIZE <= 32, "a u32 bitmap can track at most 32 blocks");
const _: () = assert!(LIST_LPS * LIST_CPL <= BIO_BLOCK_SIZE, "LIST must not read past one block");
