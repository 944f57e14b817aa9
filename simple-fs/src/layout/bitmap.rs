use alloc::vec;
use alloc::vec::Vec;

use crate::block_cache::BlockCacheManager;
use crate::BLOCK_BITS;

/// 位图区域内块的结构
type BitmapBlock = [u64; BLOCK_BITS / 64];

const WORDS_PER_BLOCK: usize = BLOCK_BITS / 64;

/// 空闲块位图，每块一位：**置位为空闲，清零为已用**。
///
/// 内存中保存全部位，修改只记脏，[`Bitmap::flush`] 时写回块缓存。
#[derive(Debug)]
pub struct Bitmap {
    /// 位图的起始块
    start_block_id: usize,
    /// 位图所指示的块数，即整个卷的块数
    total_blocks: usize,
    words: Vec<u64>,
    /// 位图块是否有未写回的修改
    dirty: Vec<bool>,
}

impl Bitmap {
    /// 全部块空闲的新位图；卷末尾不足一个字的多余位记为已用
    pub fn new(start_block_id: usize, total_blocks: usize) -> Self {
        let blocks = super::bitmap_blocks(total_blocks);
        let mut words = vec![0; blocks * WORDS_PER_BLOCK];

        words[..total_blocks / 64].fill(u64::MAX);
        let tail = total_blocks % 64;
        if tail != 0 {
            words[total_blocks / 64] = (1 << tail) - 1;
        }

        Self {
            start_block_id,
            total_blocks,
            words,
            dirty: vec![true; blocks],
        }
    }

    pub fn load(start_block_id: usize, total_blocks: usize, cache: &BlockCacheManager) -> Self {
        let blocks = super::bitmap_blocks(total_blocks);
        let mut words = Vec::with_capacity(blocks * WORDS_PER_BLOCK);

        for block_index in 0..blocks {
            cache
                .get(start_block_id + block_index)
                .lock()
                .map(0, |bitmap_block: &BitmapBlock| {
                    words.extend(bitmap_block.iter().map(|&word| u64::from_le(word)));
                });
        }

        Self {
            start_block_id,
            total_blocks,
            words,
            dirty: vec![false; blocks],
        }
    }

    /// 位图自身占用的块
    #[inline]
    pub fn area(&self) -> core::ops::Range<usize> {
        self.start_block_id..self.start_block_id + self.dirty.len()
    }

    #[inline]
    pub fn is_free(&self, index: u32) -> bool {
        let (word, bit) = Self::locate(index);
        self.words[word] & (1 << bit) != 0
    }

    #[inline]
    pub fn mark_used(&mut self, index: u32) {
        let (word, bit) = Self::locate(index);
        self.words[word] &= !(1 << bit);
        self.dirty[word / WORDS_PER_BLOCK] = true;
    }

    #[inline]
    pub fn mark_free(&mut self, index: u32) {
        let (word, bit) = Self::locate(index);
        self.words[word] |= 1 << bit;
        self.dirty[word / WORDS_PER_BLOCK] = true;
    }

    /// 无条件占用，仅用于格式化时保留元数据区域
    #[inline]
    pub fn force_set(&mut self, index: u32) {
        assert!((index as usize) < self.total_blocks);
        self.mark_used(index);
    }

    /// 分配编号最小的空闲块。若位图的空间用尽，则返回空。
    pub fn alloc(&mut self) -> Option<u32> {
        let (word, bits) = self
            .words
            .iter()
            .enumerate()
            .find(|&(_, &bits)| bits != 0)?;
        let index = (word * 64) as u32 + bits.trailing_zeros();

        self.mark_used(index);
        log::trace!("alloc block {index}");
        Some(index)
    }

    pub fn dealloc(&mut self, index: u32) {
        if self.is_free(index) {
            log::warn!("block {index} freed twice");
            return;
        }
        self.mark_free(index);
        log::trace!("dealloc block {index}");
    }

    pub fn free_count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// 位图的原始编码：小端字序，第 i 块对应第 i/8 字节的第 i%8 位
    pub fn snapshot(&self) -> Vec<u8> {
        self.words.iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    pub fn flush(&mut self, cache: &BlockCacheManager) {
        for (block_index, dirty) in self.dirty.iter_mut().enumerate() {
            if !*dirty {
                continue;
            }
            let words = &self.words[block_index * WORDS_PER_BLOCK..][..WORDS_PER_BLOCK];
            cache
                .get(self.start_block_id + block_index)
                .lock()
                .map_mut(0, |bitmap_block: &mut BitmapBlock| {
                    for (dest, &word) in bitmap_block.iter_mut().zip(words) {
                        *dest = word.to_le();
                    }
                });
            *dirty = false;
        }
    }

    #[inline]
    fn locate(index: u32) -> (usize, u32) {
        (index as usize / 64, index % 64)
    }
}
