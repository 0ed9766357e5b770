//! Binary entry point for the `duckforth` interpreter.
//!
//! Parses CLI arguments, optionally loads a script file, then drives an
//! interactive REPL over stdin until end of input or a fatal error.

use std::io::{IsTerminal, Read as _, Write as _};

use anyhow::Context;
use duckforth::block::FileBlockDevice;
use duckforth::displaylevel;
use duckforth::input::KeyboardPort;
use duckforth::logging;
use duckforth::{interpreter, Vm};

mod cli;

use cli::Args;

/// Reads stdin one byte at a time, standing in for the keyboard MMIO port
/// the real core would poll. Once stdin closes, every further poll
/// returns an immediate line terminator so the REPL's `refill` loop can't
/// spin forever waiting for bytes that will never come.
struct StdinPort {
    stdin: std::io::Stdin,
    eof: bool,
}

impl StdinPort {
    fn new() -> Self {
        StdinPort { stdin: std::io::stdin(), eof: false }
    }
}

impl KeyboardPort for StdinPort {
    fn poll_byte(&mut self) -> Option<u8> {
        if self.eof {
            return Some(b'\n');
        }
        let mut byte = [0u8; 1];
        match self.stdin.lock().read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => {
                self.eof = true;
                Some(b'\n')
            }
        }
    }

    fn is_eof(&self) -> bool {
        self.eof
    }
}

fn flush_output(vm: &mut Vm) {
    if !vm.output.is_empty() {
        let _ = std::io::stdout().write_all(&vm.output);
        let _ = std::io::stdout().flush();
        vm.output.clear();
    }
}

/// Runs one source string through the outer interpreter, reporting a
/// recoverable error (e.g. `UndefinedWord`) without killing the process.
fn run_source(vm: &mut Vm, text: &[u8]) -> anyhow::Result<()> {
    vm.input.push(duckforth::input::InputDescriptor::evaluate(text))?;
    match interpreter::interpret(vm) {
        Ok(()) => Ok(()),
        Err(e) if e.is_recoverable_by_default() && !vm.die_on_undef => {
            displaylevel!(1, "duckforth: {e}\n");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn repl(vm: &mut Vm) -> anyhow::Result<()> {
    vm.set_keyboard_port(Box::new(StdinPort::new()));
    let interactive = std::io::stdin().is_terminal();
    loop {
        if interactive {
            displaylevel!(2, "ok> ");
            let _ = std::io::stderr().flush();
        }
        vm.refill(false)?;
        match interpreter::interpret(vm) {
            Ok(()) => {}
            Err(e) if e.is_recoverable_by_default() && !vm.die_on_undef => {
                displaylevel!(1, "duckforth: {e}\n");
            }
            Err(e) => {
                flush_output(vm);
                return Err(e.into());
            }
        }
        flush_output(vm);
        if vm.keyboard_port.is_eof() {
            return Ok(());
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();
    logging::set_display_level(args.display_level());

    let mut vm = Vm::new(duckforth::config::WORD_BUFFER_SIZE as u32);

    if let Some(path) = &args.blocks {
        let device = FileBlockDevice::open(path)
            .with_context(|| format!("opening block device file {}", path.display()))?;
        vm.set_block_device(Box::new(device));
    }

    if let Some(script) = &args.script {
        let text = std::fs::read(script)
            .with_context(|| format!("reading script {}", script.display()))?;
        run_source(&mut vm, &text)?;
        flush_output(&mut vm);
    }

    if !args.no_repl {
        repl(&mut vm)?;
    }

    Ok(())
}
