//! Simulated BIO mass-storage controller (L7).
//!
//! Migrated from the register-level protocol implicit in
//! `forth/words/block.c`'s block I/O primitives: a controller exposes one
//! or more storage banks (`SID`), each transaction addressed by `BLOCK`
//! with a fixed `COUNT`/`ADDR` (one block, DMA'd whole), and the result
//! reported through a `STATUS` register (`BUSY`/`RDY`/`ERR` bits). This is
//! a simulation, not an MMIO driver: `submit_bio_op` stands in for the
//! `SRST` + `DMA` + `READ`/`WRITE` register dance a real driver would do.

use super::BlockDevice;
use crate::config::BIO_BLOCK_SIZE;
use crate::error::{BioPhase, ForthError, Result};

pub const BIO_STATUS_BUSY: u32 = 0x01;
pub const BIO_STATUS_RDY: u32 = 0x02;
pub const BIO_STATUS_ERR: u32 = 0x04;

struct Storage {
    blocks: Vec<[u8; BIO_BLOCK_SIZE]>,
}

/// Owns every attached storage bank. `sid` indexes into them, matching the
/// `SID` register.
pub struct BioController {
    storages: Vec<Storage>,
}

impl BioController {
    pub fn new() -> Self {
        BioController { storages: Vec::new() }
    }

    /// Attaches a new storage bank of `num_blocks` blocks, returning its `SID`.
    pub fn attach(&mut self, num_blocks: usize) -> u32 {
        self.storages.push(Storage { blocks: vec![[0u8; BIO_BLOCK_SIZE]; num_blocks] });
        (self.storages.len() - 1) as u32
    }

    /// Drives one transaction through the register protocol: `SRST`, set
    /// `SID`/`BLOCK`/`COUNT`/`ADDR`, fire `READ` or `WRITE`, poll `STATUS`
    /// until `RDY` or `ERR`. `buffer` must be exactly one block long.
    pub fn submit_bio_op(&mut self, sid: u32, block: u32, buffer: &mut [u8], write: bool) -> Result<u32> {
        let storage = self
            .storages
            .get_mut(sid as usize)
            .ok_or(ForthError::BioFail { storage: sid, block, status: BIO_STATUS_ERR, phase: BioPhase::Storage })?;

        if buffer.len() != BIO_BLOCK_SIZE {
            return Err(ForthError::BioFail { storage: sid, block, status: BIO_STATUS_ERR, phase: BioPhase::Count });
        }

        let blk = storage.blocks.get_mut(block as usize).ok_or(ForthError::BioFail {
            storage: sid,
            block,
            status: BIO_STATUS_ERR,
            phase: BioPhase::Block,
        })?;

        if write {
            blk.copy_from_slice(buffer);
        } else {
            buffer.copy_from_slice(blk);
        }

        Ok(BIO_STATUS_RDY)
    }
}

impl Default for BioController {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts one [`BioController`] storage bank to [`BlockDevice`].
pub struct BioBlockDevice<'a> {
    pub controller: &'a mut BioController,
    pub sid: u32,
}

impl BlockDevice for BioBlockDevice<'_> {
    fn read_block(&mut self, block: u32, out: &mut [u8]) -> Result<()> {
        self.controller.submit_bio_op(self.sid, block, out, false)?;
        Ok(())
    }

    fn write_block(&mut self, block: u32, data: &[u8]) -> Result<()> {
        let mut buf = data.to_vec();
        self.controller.submit_bio_op(self.sid, block, &mut buf, true)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut ctl = BioController::new();
        let sid = ctl.attach(4);
        let mut buf = [0xAAu8; BIO_BLOCK_SIZE];
        ctl.submit_bio_op(sid, 1, &mut buf, true).unwrap();

        let mut out = [0u8; BIO_BLOCK_SIZE];
        ctl.submit_bio_op(sid, 1, &mut out, false).unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn unknown_storage_reports_bio_fail() {
        let mut ctl = BioController::new();
        let mut buf = [0u8; BIO_BLOCK_SIZE];
        let err = ctl.submit_bio_op(7, 0, &mut buf, false).unwrap_err();
        assert!(matches!(err, ForthError::BioFail { phase: BioPhase::Storage, .. }));
    }

    #[test]
    fn out_of_range_block_reports_bio_fail() {
        let mut ctl = BioController::new();
        let sid = ctl.attach(2);
        let mut buf = [0u8; BIO_BLOCK_SIZE];
        let err = ctl.submit_bio_op(sid, 99, &mut buf, false).unwrap_err();
        assert!(matches!(err, ForthError::BioFail { phase: BioPhase::Block, .. }));
    }

    #[test]
    fn block_device_adapter_delegates_to_controller() {
        let mut ctl = BioController::new();
        let sid = ctl.attach(2);
        {
            let mut dev = BioBlockDevice { controller: &mut ctl, sid };
            dev.write_block(0, &[7u8; BIO_BLOCK_SIZE]).unwrap();
        }
        let mut dev = BioBlockDevice { controller: &mut ctl, sid };
        let mut out = [0u8; BIO_BLOCK_SIZE];
        dev.read_block(0, &mut out).unwrap();
        assert_eq!(out[0], 7);
    }
}
