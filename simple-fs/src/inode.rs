//! 索引节点的内存形式与块寻址
//!
//! 逻辑块号 `i = offset / BLOCK_SIZE`：
//! - `i < DIRECT_COUNT`：直接索引 `direct[i]`
//! - 否则：间接索引块内第 `i - DIRECT_COUNT` 项
//!
//! 数据块在写入跨过块边界时才分配，分配后清零；间接索引块在第一次溢出时分配。

use alloc::vec::Vec;

use enumflags2::BitFlags;
use vfs::Error;

use crate::block_cache::BlockCacheManager;
use crate::layout::{Bitmap, DiskInode, IndirectBlock, StatKind};
use crate::table::Slot;
use crate::{BLOCK_SIZE, DIRECT_COUNT, DataBlock, INDIRECT_COUNT, MAX_FILE_SIZE};

/// 权限位
const PERMISSION_MASK: u32 = 0o777;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    /// 类型位与权限位
    pub mode: u32,
    /// 硬链接个数
    pub links: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    direct: [Option<u32>; DIRECT_COUNT],
    indirect: Option<u32>,
}

impl Inode {
    pub fn new(kind: StatKind, permissions: u32) -> Self {
        Self {
            mode: kind as u32 | (permissions & PERMISSION_MASK),
            links: 1,
            uid: 0,
            gid: 0,
            size: 0,
            direct: [None; DIRECT_COUNT],
            indirect: None,
        }
    }

    /// 直接索引一段连续的块，仅用于根目录指向目录区域
    pub fn with_blocks(mut self, first_block: u32, count: usize) -> Self {
        assert!(count <= DIRECT_COUNT);
        for (i, slot) in self.direct.iter_mut().take(count).enumerate() {
            *slot = Some(first_block + i as u32);
        }
        self.size = (count * BLOCK_SIZE) as u32;
        self
    }

    pub fn kind(&self) -> StatKind {
        if BitFlags::<StatKind>::from_bits_truncate(self.mode).contains(StatKind::DIR) {
            StatKind::DIR
        } else {
            StatKind::FILE
        }
    }

    /// 逻辑上 inode 指向一系列数据块，此处传入的是这些数据块的索引（逻辑索引），
    /// 然后返回给**块缓存层**使用的ID
    pub fn block_id(&self, block_index: usize, cache: &BlockCacheManager) -> Option<u32> {
        if block_index < DIRECT_COUNT {
            return self.direct[block_index];
        }

        // 剔去直接索引的部分
        let index = block_index - DIRECT_COUNT;
        assert!(index < INDIRECT_COUNT);
        let block_id = cache
            .get(self.indirect? as usize)
            .lock()
            .map(0, |indirect: &IndirectBlock| indirect[index]);
        (block_id != 0).then_some(block_id)
    }

    /// 保证逻辑块 `block_index` 已分配，返回其块ID
    pub fn ensure_block(
        &mut self,
        block_index: usize,
        bitmap: &mut Bitmap,
        cache: &BlockCacheManager,
    ) -> Result<u32, Error> {
        if let Some(block_id) = self.block_id(block_index, cache) {
            return Ok(block_id);
        }

        if block_index < DIRECT_COUNT {
            let block_id = alloc_zeroed(bitmap, cache)?;
            self.direct[block_index] = Some(block_id);
            return Ok(block_id);
        }

        // 这次增长越过了直接索引，创建间接索引块
        let indirect = match self.indirect {
            Some(indirect) => indirect,
            None => {
                let indirect = alloc_zeroed(bitmap, cache)?;
                self.indirect = Some(indirect);
                indirect
            }
        };

        let block_id = alloc_zeroed(bitmap, cache)?;
        cache
            .get(indirect as usize)
            .lock()
            .map_mut(0, |indirect: &mut IndirectBlock| {
                indirect[block_index - DIRECT_COUNT] = block_id
            });
        Ok(block_id)
    }

    /// 分配足够的块，使 `[0, end)` 的每个字节都可寻址。
    ///
    /// 失败时已分配的块仍归属此 inode，`size` 不变。
    pub fn expand_to(
        &mut self,
        end: usize,
        bitmap: &mut Bitmap,
        cache: &BlockCacheManager,
    ) -> Result<(), Error> {
        if end > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge);
        }

        // size 以内的块必然存在，从最后一块开始检查
        for block_index in self.size as usize / BLOCK_SIZE..end.div_ceil(BLOCK_SIZE) {
            self.ensure_block(block_index, bitmap, cache)?;
        }
        Ok(())
    }

    /// 收集此 inode 占用的全部块：数据块以及间接索引块本身
    pub fn block_ids(&self, cache: &BlockCacheManager) -> Vec<u32> {
        let mut blocks: Vec<u32> = self.direct.iter().flatten().copied().collect();

        if let Some(indirect) = self.indirect {
            cache
                .get(indirect as usize)
                .lock()
                .map(0, |indirect: &IndirectBlock| {
                    blocks.extend(indirect.iter().copied().filter(|&id| id != 0));
                });
            blocks.push(indirect);
        }

        blocks
    }

    /// 清空所有索引，返回需要归还给位图的块
    pub fn clear(&mut self, cache: &BlockCacheManager) -> Vec<u32> {
        let blocks = self.block_ids(cache);
        self.direct = [None; DIRECT_COUNT];
        self.indirect = None;
        self.size = 0;
        blocks
    }

    /// 从指定位置(字节偏移)读出数据填充`buf`，越过文件末尾的部分不读
    pub fn read_at(&self, offset: usize, buf: &mut [u8], cache: &BlockCacheManager) -> usize {
        let mut start = offset;
        let end = (offset + buf.len()).min(self.size as usize);

        if start >= end {
            return 0;
        }

        // 已读取多少字节
        let mut read_size = 0;
        while start < end {
            let block_index = start / BLOCK_SIZE;
            // 当前块的末地址(字节)
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_read_size = current_block_end - start;
            let dest = &mut buf[read_size..read_size + block_read_size];

            let block_id = self
                .block_id(block_index, cache)
                .expect("block within file size is not allocated");
            cache
                .get(block_id as usize)
                .lock()
                .map(0, |data_block: &DataBlock| {
                    // 绝对地址 % 块大小 = 块内偏移
                    let src = &data_block[start % BLOCK_SIZE..][..block_read_size];
                    dest.copy_from_slice(src);
                });

            read_size += block_read_size;
            start = current_block_end;
        }

        read_size
    }

    /// 写入前须先 [`Inode::expand_to`]，写入越过末尾时增长 `size`
    pub fn write_at(&mut self, offset: usize, buf: &[u8], cache: &BlockCacheManager) -> usize {
        let mut start = offset;
        let end = offset + buf.len();

        let mut written_size = 0;
        while start < end {
            let block_index = start / BLOCK_SIZE;
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_write_size = current_block_end - start;

            let block_id = self
                .block_id(block_index, cache)
                .expect("block must be allocated before writing");
            cache
                .get(block_id as usize)
                .lock()
                .map_mut(0, |data_block: &mut DataBlock| {
                    let src = &buf[written_size..written_size + block_write_size];
                    data_block[start % BLOCK_SIZE..][..block_write_size].copy_from_slice(src);
                });

            written_size += block_write_size;
            start = current_block_end;
        }

        self.size = self.size.max(end as u32);
        written_size
    }
}

/// 从位图分配一块并清零
fn alloc_zeroed(bitmap: &mut Bitmap, cache: &BlockCacheManager) -> Result<u32, Error> {
    let block_id = bitmap.alloc().ok_or(Error::NoFreeBlocks)?;
    cache
        .get(block_id as usize)
        .lock()
        .map_mut(0, |data_block: &mut DataBlock| data_block.fill(0));
    Ok(block_id)
}

impl From<&Slot<Inode>> for DiskInode {
    fn from(slot: &Slot<Inode>) -> Self {
        let Some(inode) = slot.as_ref() else {
            return Self::default();
        };

        Self {
            used: 1,
            mode: inode.mode,
            link_cnt: inode.links,
            uid: inode.uid,
            gid: inode.gid,
            size: inode.size,
            direct: inode.direct.map(|block| block.unwrap_or(0)),
            indirect: inode.indirect.unwrap_or(0),
        }
    }
}

impl From<&DiskInode> for Slot<Inode> {
    fn from(disk_inode: &DiskInode) -> Self {
        if disk_inode.used == 0 {
            return Self::Free;
        }

        let pointer = |block: u32| (block != 0).then_some(block);
        Self::Occupied(Inode {
            mode: disk_inode.mode,
            links: disk_inode.link_cnt,
            uid: disk_inode.uid,
            gid: disk_inode.gid,
            size: disk_inode.size,
            direct: disk_inode.direct.map(pointer),
            indirect: pointer(disk_inode.indirect),
        })
    }
}
