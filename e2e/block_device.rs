//! E2E: block cache behavior against a real file-backed device.
//!
//! Exercises `BLOCK`/`UPDATE`/`FLUSH`/`LOAD` the way a script editing a
//! block file on disk would, including that writes survive past the
//! `Vm` that made them.

use duckforth::block::FileBlockDevice;
use duckforth::config::BIO_BLOCK_SIZE;
use duckforth::input::InputDescriptor;
use duckforth::interpreter::interpret;
use duckforth::Vm;

fn run(vm: &mut Vm, text: &str) {
    vm.input.push(InputDescriptor::evaluate(text.as_bytes())).expect("push source");
    interpret(vm).expect("interpret");
}

#[test]
fn edits_to_a_block_survive_a_flush_and_a_fresh_vm() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocks.img");

    {
        let mut vm = Vm::new(64);
        vm.set_block_device(Box::new(FileBlockDevice::open(&path).unwrap()));
        run(&mut vm, "2 BLOCK DROP");
        let addr = vm.block_mem_base;
        vm.mem.write_u8(addr, b'O');
        vm.mem.write_u8(addr + 1, b'K');
        run(&mut vm, "UPDATE FLUSH");
    }

    let mut vm = Vm::new(64);
    vm.set_block_device(Box::new(FileBlockDevice::open(&path).unwrap()));
    run(&mut vm, "2 BLOCK");
    let addr = vm.pop().unwrap();
    assert_eq!(vm.mem.read_u8(addr), b'O');
    assert_eq!(vm.mem.read_u8(addr + 1), b'K');
}

#[test]
fn load_interprets_source_text_written_into_a_block_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocks.img");

    let mut source = vec![b' '; BIO_BLOCK_SIZE];
    source[..9].copy_from_slice(b"11 22 + .");
    std::fs::write(&path, &source).unwrap();

    let mut vm = Vm::new(64);
    vm.set_block_device(Box::new(FileBlockDevice::open(&path).unwrap()));
    // Block 1 is the FORTH id for device block 0, where the source above
    // was written.
    run(&mut vm, "1 LOAD");
    assert_eq!(String::from_utf8_lossy(&vm.output), "33 ");
}
