//! Verbosity-gated diagnostic output.
//!
//! Migrated in spirit from `DEBUG_printf`/`DISPLAYLEVEL` in the original
//! sources: a process-wide level plus a macro that gates `eprint!` calls on
//! it, rather than pulling in `log`/`tracing` for a single-process
//! interpreter with no structured sinks.

use std::sync::atomic::{AtomicU32, Ordering};

/// 0 = silent, 1 = errors only, 2 = normal, 3 = verbose, 4 = trace.
static DISPLAY_LEVEL: AtomicU32 = AtomicU32::new(2);

/// Returns the current display level.
pub fn display_level() -> u32 {
    DISPLAY_LEVEL.load(Ordering::Relaxed)
}

/// Sets the display level.
pub fn set_display_level(level: u32) {
    DISPLAY_LEVEL.store(level, Ordering::Relaxed);
}

/// Print to stderr when the current display level is at least `$level`.
#[macro_export]
macro_rules! displaylevel {
    ($level:expr, $($arg:tt)*) => {
        if $crate::logging::display_level() >= $level {
            eprint!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_normal() {
        assert_eq!(display_level(), 2);
    }

    #[test]
    fn set_and_read_level() {
        let prev = display_level();
        set_display_level(4);
        assert_eq!(display_level(), 4);
        set_display_level(prev);
    }
}
