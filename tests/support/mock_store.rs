//! An in-memory, fault-injectable `BlockStore` used by the integration tests in this directory,
//! built only against `ecp`'s public surface (it cannot see the crate's own internal
//! `test_support` module, which is `cfg(test)`-gated inside the library itself).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use ecp::{BlockStore, BlockStoreSizes, Md5Digest};
use snafu::Snafu;

#[derive(Debug, Snafu, PartialEq, Eq, Clone)]
pub enum MockStoreError {
    #[snafu(display("stale read: md5 mismatch for block {block_num}"))]
    Stale { block_num: u64 },
    #[snafu(display("simulated I/O failure for block {block_num}"))]
    Io { block_num: u64 },
}

struct MockState {
    blocks: HashMap<u64, Vec<u8>>,
    fail_next_write: HashSet<u64>,
    corrupt_next_read: HashSet<u64>,
    read_count: u64,
    write_count: u64,
}

/// A backend that stores blocks in memory, and can be told in advance to fail the next write to
/// a block, or to serve corrupted (MD5-mismatched) bytes on the next read of a block.
pub struct MockStore {
    block_size: usize,
    state: Mutex<MockState>,
}

impl MockStore {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            state: Mutex::new(MockState {
                blocks: HashMap::new(),
                fail_next_write: HashSet::new(),
                corrupt_next_read: HashSet::new(),
                read_count: 0,
                write_count: 0,
            }),
        }
    }

    pub fn fail_next_write(&self, block_num: u64) {
        self.state.lock().unwrap().fail_next_write.insert(block_num);
    }

    pub fn corrupt_next_read(&self, block_num: u64) {
        self.state
            .lock()
            .unwrap()
            .corrupt_next_read
            .insert(block_num);
    }

    pub fn read_count(&self) -> u64 {
        self.state.lock().unwrap().read_count
    }

    pub fn write_count(&self) -> u64 {
        self.state.lock().unwrap().write_count
    }

    pub fn stored_bytes(&self, block_num: u64) -> Option<Vec<u8>> {
        self.state.lock().unwrap().blocks.get(&block_num).cloned()
    }

    pub fn has_block(&self, block_num: u64) -> bool {
        self.state.lock().unwrap().blocks.contains_key(&block_num)
    }
}

fn md5_of(data: &[u8]) -> Md5Digest {
    use md5::{Digest, Md5};
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

impl BlockStore for MockStore {
    type Error = MockStoreError;

    fn read_block(
        &self,
        block_num: u64,
        dst: &mut [u8],
        expect_md5: Option<Md5Digest>,
    ) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.read_count += 1;

        let corrupt = state.corrupt_next_read.remove(&block_num);
        let stored = state
            .blocks
            .get(&block_num)
            .cloned()
            .unwrap_or_else(|| vec![0u8; self.block_size]);

        let served = if corrupt {
            let mut bytes = stored;
            bytes[0] = bytes[0].wrapping_add(1);
            bytes
        } else {
            stored
        };

        if let Some(expected) = expect_md5 {
            if md5_of(&served) != expected {
                return Err(MockStoreError::Stale { block_num });
            }
        }

        dst.copy_from_slice(&served);
        Ok(())
    }

    fn write_block(
        &self,
        block_num: u64,
        src: Option<&[u8]>,
        _md5: Option<Md5Digest>,
    ) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.write_count += 1;

        if state.fail_next_write.remove(&block_num) {
            return Err(MockStoreError::Io { block_num });
        }

        match src {
            Some(data) => {
                state.blocks.insert(block_num, data.to_vec());
            }
            None => {
                state.blocks.remove(&block_num);
            }
        }

        Ok(())
    }

    fn detect_sizes(&self) -> Result<BlockStoreSizes, Self::Error> {
        let state = self.state.lock().unwrap();
        Ok(BlockStoreSizes {
            file_size: (state.blocks.len() * self.block_size) as u64,
            block_size: self.block_size,
        })
    }

    fn destroy(&self) -> Result<(), Self::Error> {
        self.state.lock().unwrap().blocks.clear();
        Ok(())
    }
}

/// Lets tests hold onto the `MockStore` (to inspect call counts and stored bytes) while also
/// handing a `BlockStore` impl to `EcProtect::new`, which takes its inner store by value.
impl BlockStore for &MockStore {
    type Error = MockStoreError;

    fn read_block(
        &self,
        block_num: u64,
        dst: &mut [u8],
        expect_md5: Option<Md5Digest>,
    ) -> Result<(), Self::Error> {
        (**self).read_block(block_num, dst, expect_md5)
    }

    fn write_block(
        &self,
        block_num: u64,
        src: Option<&[u8]>,
        md5: Option<Md5Digest>,
    ) -> Result<(), Self::Error> {
        (**self).write_block(block_num, src, md5)
    }

    fn detect_sizes(&self) -> Result<BlockStoreSizes, Self::Error> {
        (**self).detect_sizes()
    }

    fn destroy(&self) -> Result<(), Self::Error> {
        (**self).destroy()
    }
}
