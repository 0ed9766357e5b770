//! One cache line (L-companion).
//!
//! Migrated from the per-line bookkeeping in `ducky/native/data_cache.c`:
//! validity, a dirty flag, the tag it currently holds, and an
//! access-order stamp used to pick the least-recently-used line on
//! eviction.

pub struct CacheLine {
    pub valid: bool,
    pub dirty: bool,
    pub tag: u32,
    pub stamp: u64,
    data: Vec<u8>,
}

impl CacheLine {
    pub fn new(line_length: usize) -> Self {
        CacheLine { valid: false, dirty: false, tag: 0, stamp: 0, data: vec![0u8; line_length] }
    }

    pub fn fill(&mut self, tag: u32, data: Vec<u8>, stamp: u64) {
        self.valid = true;
        self.dirty = false;
        self.tag = tag;
        self.data = data;
        self.stamp = stamp;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
        self.dirty = false;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
