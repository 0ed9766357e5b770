//! The parser subsystem (L4): turning raw input bytes into words and
//! numbers. See [`word`] for `read_word`/`PARSE` and [`number`] for
//! multi-base number parsing and pictured numeric output.

pub mod number;
pub mod word;

pub use number::{format_signed, format_unsigned, parse_number, uwidth, NumberStatus, ParsedNumber, PictureBuffer};
pub use word::{parse, read_char, read_word, WordBuffer};
