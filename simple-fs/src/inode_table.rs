use alloc::vec;
use alloc::vec::Vec;
use core::mem;

use crate::block_cache::BlockCacheManager;
use crate::inode::Inode;
use crate::layout::{DiskInode, INODE_AREA_START, INODES_PER_BLOCK};
use crate::table::{self, Slot};
use crate::INODE_COUNT;

const INODE_SIZE: usize = mem::size_of::<DiskInode>();

/// 索引节点表的内存镜像，修改记脏，[`InodeTable::flush`] 时写回
pub struct InodeTable {
    slots: Vec<Slot<Inode>>,
    dirty: Vec<bool>,
}

impl InodeTable {
    /// 全空的表，所有槽位都待写回，用于格式化时清零索引节点区域
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::Free; INODE_COUNT],
            dirty: vec![true; INODE_COUNT],
        }
    }

    pub fn load(cache: &BlockCacheManager) -> Self {
        let slots = (0..INODE_COUNT as u32)
            .map(|inode_id| {
                let (block_id, block_offset) = Self::disk_inode_pos(inode_id);
                cache
                    .get(block_id)
                    .lock()
                    .map(block_offset, |disk_inode: &DiskInode| Slot::from(disk_inode))
            })
            .collect();

        Self {
            slots,
            dirty: vec![false; INODE_COUNT],
        }
    }

    /// 占用编号最小的空闲槽位
    pub fn alloc(&mut self, inode: Inode) -> Option<u32> {
        let inode_id = table::first_free(&self.slots)?;
        self.slots[inode_id] = Slot::Occupied(inode);
        self.dirty[inode_id] = true;
        Some(inode_id as u32)
    }

    /// 释放槽位并交出其中的记录
    pub fn free(&mut self, inode_id: u32) -> Option<Inode> {
        let slot = self.slots.get_mut(inode_id as usize)?;
        self.dirty[inode_id as usize] = true;
        slot.take()
    }

    #[inline]
    pub fn get(&self, inode_id: u32) -> Option<&Inode> {
        self.slots.get(inode_id as usize).and_then(Slot::as_ref)
    }

    /// 可变借用视为修改
    pub fn get_mut(&mut self, inode_id: u32) -> Option<&mut Inode> {
        let inode = self.slots.get_mut(inode_id as usize)?.as_mut()?;
        self.dirty[inode_id as usize] = true;
        Some(inode)
    }

    #[inline]
    pub fn has_free(&self) -> bool {
        table::first_free(&self.slots).is_some()
    }

    /// 已占用的 inode 及其编号
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Inode)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(inode_id, slot)| slot.as_ref().map(|inode| (inode_id as u32, inode)))
    }

    pub fn flush(&mut self, cache: &BlockCacheManager) {
        for (inode_id, dirty) in self.dirty.iter_mut().enumerate() {
            if !*dirty {
                continue;
            }
            let (block_id, block_offset) = Self::disk_inode_pos(inode_id as u32);
            let disk_inode = DiskInode::from(&self.slots[inode_id]);
            cache
                .get(block_id)
                .lock()
                .map_mut(block_offset, |dest: &mut DiskInode| *dest = disk_inode);
            *dirty = false;
        }
    }

    /// 通过ID获取 inode 在磁盘上的位置：**块ID**以及**块内偏移**
    #[inline]
    fn disk_inode_pos(inode_id: u32) -> (usize, usize) {
        let inode_id = inode_id as usize;
        let block_id = INODE_AREA_START + inode_id / INODES_PER_BLOCK;
        let block_offset = inode_id % INODES_PER_BLOCK * INODE_SIZE;

        (block_id, block_offset)
    }
}
