//! 稀疏的内存块设备，供测试使用

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::BLOCK_SIZE;

/// 只保存写过的块，未写过的块读出全0
pub struct RamDisk {
    blocks: Mutex<BTreeMap<usize, Box<[u8; BLOCK_SIZE]>>>,
    count: usize,
}

impl RamDisk {
    pub fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            blocks: Mutex::new(BTreeMap::new()),
            count,
        })
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        assert!(block_id < self.count, "block {block_id} out of range");
        match self.blocks.lock().get(&block_id) {
            Some(block) => buf[..BLOCK_SIZE].copy_from_slice(&block[..]),
            None => buf[..BLOCK_SIZE].fill(0),
        }
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        assert!(block_id < self.count, "block {block_id} out of range");
        let mut block = Box::new([0; BLOCK_SIZE]);
        block.copy_from_slice(&buf[..BLOCK_SIZE]);
        self.blocks.lock().insert(block_id, block);
    }
}
