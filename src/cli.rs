//! Command-line argument parsing for the `duckforth` REPL.

use std::path::PathBuf;

use clap::Parser;

/// A FORTH-83/2012-leaning interpreter.
#[derive(Debug, Parser)]
#[command(name = "duckforth", version, about)]
pub struct Args {
    /// A source file to `LOAD` non-interactively before the prompt (or
    /// instead of it, with `--no-repl`).
    pub script: Option<PathBuf>,

    /// Back the block cache with this file instead of an in-memory device.
    #[arg(long, value_name = "PATH")]
    pub blocks: Option<PathBuf>,

    /// Exit after running `script` instead of dropping into the REPL.
    #[arg(long)]
    pub no_repl: bool,

    /// Increase diagnostic verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all but error output.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// The display level `logging::set_display_level` should be set to.
    pub fn display_level(&self) -> u32 {
        if self.quiet {
            1
        } else {
            2 + self.verbose as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_verbose() {
        let args = Args::parse_from(["duckforth", "-q", "-v"]);
        assert_eq!(args.display_level(), 1);
    }

    #[test]
    fn default_level_is_normal() {
        let args = Args::parse_from(["duckforth"]);
        assert_eq!(args.display_level(), 2);
    }

    #[test]
    fn verbose_stacks() {
        let args = Args::parse_from(["duckforth", "-vv"]);
        assert_eq!(args.display_level(), 4);
    }
}
